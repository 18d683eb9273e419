pub mod auth;
pub mod authcache;
pub mod authcontroller;
pub mod connectioninfo;
pub mod contentencoding;
pub mod drainer;
pub mod requestheaders;
pub mod requestinfo;
pub mod responseheaders;
pub mod responseinfo;
pub mod retry;
pub mod serverproperties;
pub mod session;
pub mod stream;
pub mod streamfactory;
pub mod transaction;
pub mod uploaddatastream;

// Re-exports for convenience
pub use auth::{
    AuthChallengeInfo, AuthController, AuthControllerFactory, AuthCredentials, HttpAuthTarget,
};
pub use authcache::AuthCache;
pub use authcontroller::{HttpAuthController, HttpAuthControllerFactory};
pub use connectioninfo::{ConnectionInfo, NextProto};
pub use drainer::HttpResponseBodyDrainer;
pub use requestheaders::HttpRequestHeaders;
pub use requestinfo::{HttpRequestInfo, Idempotency, PrivacyMode};
pub use responseheaders::{HttpResponseHeaders, HttpVersion};
pub use responseinfo::HttpResponseInfo;
pub use retry::{RetryBudget, RetryPolicy, RetryReason};
pub use serverproperties::{AlternativeService, HttpServerProperties, HttpServerPropertiesImpl};
pub use session::{HttpNetworkSession, HttpNetworkSessionBuilder, HttpNetworkSessionParams};
pub use stream::{HttpStream, StreamFuture};
pub use streamfactory::{HttpStreamFactory, HttpStreamRequest, StreamRequestEvent};
pub use transaction::HttpNetworkTransaction;
pub use uploaddatastream::{ChunkedUploadDataStream, ElementsUploadDataStream, UploadDataStream};
