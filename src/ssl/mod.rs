//! TLS-facing value types and the shared client-certificate store.
//!
//! Mirrors Chromium's `net/ssl/`. No handshakes happen here; streams report
//! what they negotiated and the transaction records client-cert choices.

pub mod certrequest;
pub mod clientcontext;
pub mod sslinfo;

pub use certrequest::SslCertRequestInfo;
pub use clientcontext::{ClientCertIdentity, SslClientContext, SslPrivateKey};
pub use sslinfo::{CertStatus, SslInfo, X509Certificate};
