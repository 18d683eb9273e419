//! Session-wide configuration and shared collaborators.
//!
//! One `HttpNetworkSession` is shared by every transaction it creates; the
//! stores it hands out are internally synchronized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::authcontroller::HttpAuthControllerFactory;
use super::auth::AuthControllerFactory;
use super::drainer::HttpResponseBodyDrainer;
use super::serverproperties::{HttpServerProperties, HttpServerPropertiesImpl};
use super::stream::HttpStream;
use super::streamfactory::HttpStreamFactory;
use crate::ssl::SslClientContext;

/// Tunables of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpNetworkSessionParams {
    /// On a QUIC protocol error over an alternative service, retry the
    /// request without alternative services.
    pub retry_without_alt_svc_on_quic_errors: bool,
    /// Forward 103 responses received over HTTP/1.1 to the early hints hook.
    pub enable_early_hints_on_http11: bool,
    /// Scratch buffer for background drains.
    pub drainer_buffer_size: usize,
    /// Bodies larger than this are not drained; the connection is closed.
    pub drainer_max_body_bytes: u64,
    pub drainer_timeout: Duration,
}

impl Default for HttpNetworkSessionParams {
    fn default() -> Self {
        Self {
            retry_without_alt_svc_on_quic_errors: true,
            enable_early_hints_on_http11: false,
            drainer_buffer_size: 16 * 1024,
            drainer_max_body_bytes: 16 * 1024 * 4,
            drainer_timeout: Duration::from_secs(5),
        }
    }
}

impl HttpNetworkSessionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_without_alt_svc_on_quic_errors(mut self, enable: bool) -> Self {
        self.retry_without_alt_svc_on_quic_errors = enable;
        self
    }

    pub fn enable_early_hints_on_http11(mut self, enable: bool) -> Self {
        self.enable_early_hints_on_http11 = enable;
        self
    }

    pub fn drainer_buffer_size(mut self, size: usize) -> Self {
        self.drainer_buffer_size = size;
        self
    }

    pub fn drainer_max_body_bytes(mut self, max: u64) -> Self {
        self.drainer_max_body_bytes = max;
        self
    }

    pub fn drainer_timeout(mut self, timeout: Duration) -> Self {
        self.drainer_timeout = timeout;
        self
    }
}

pub struct HttpNetworkSession {
    params: HttpNetworkSessionParams,
    stream_factory: Arc<dyn HttpStreamFactory>,
    server_properties: Arc<dyn HttpServerProperties>,
    ssl_client_context: SslClientContext,
    auth_controller_factory: Arc<dyn AuthControllerFactory>,
}

impl HttpNetworkSession {
    pub fn builder(stream_factory: Arc<dyn HttpStreamFactory>) -> HttpNetworkSessionBuilder {
        HttpNetworkSessionBuilder::new(stream_factory)
    }

    pub fn params(&self) -> &HttpNetworkSessionParams {
        &self.params
    }

    pub fn stream_factory(&self) -> &dyn HttpStreamFactory {
        self.stream_factory.as_ref()
    }

    pub fn http_server_properties(&self) -> &dyn HttpServerProperties {
        self.server_properties.as_ref()
    }

    pub fn ssl_client_context(&self) -> &SslClientContext {
        &self.ssl_client_context
    }

    pub fn auth_controller_factory(&self) -> &dyn AuthControllerFactory {
        self.auth_controller_factory.as_ref()
    }

    /// Read and discard the rest of `stream`'s body in the background, then
    /// return its connection to the pool.
    pub fn start_response_drainer(&self, stream: Box<dyn HttpStream>) {
        HttpResponseBodyDrainer::new(stream, &self.params).start();
    }
}

impl fmt::Debug for HttpNetworkSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpNetworkSession")
            .field("params", &self.params)
            .field("ssl_client_context", &self.ssl_client_context)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpNetworkSession`]. Collaborators not supplied get the
/// in-crate implementations.
pub struct HttpNetworkSessionBuilder {
    params: HttpNetworkSessionParams,
    stream_factory: Arc<dyn HttpStreamFactory>,
    server_properties: Option<Arc<dyn HttpServerProperties>>,
    ssl_client_context: Option<SslClientContext>,
    auth_controller_factory: Option<Arc<dyn AuthControllerFactory>>,
}

impl HttpNetworkSessionBuilder {
    pub fn new(stream_factory: Arc<dyn HttpStreamFactory>) -> Self {
        Self {
            params: HttpNetworkSessionParams::default(),
            stream_factory,
            server_properties: None,
            ssl_client_context: None,
            auth_controller_factory: None,
        }
    }

    pub fn with_params(mut self, params: HttpNetworkSessionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_server_properties(mut self, properties: Arc<dyn HttpServerProperties>) -> Self {
        self.server_properties = Some(properties);
        self
    }

    pub fn with_ssl_client_context(mut self, context: SslClientContext) -> Self {
        self.ssl_client_context = Some(context);
        self
    }

    pub fn with_auth_controller_factory(mut self, factory: Arc<dyn AuthControllerFactory>) -> Self {
        self.auth_controller_factory = Some(factory);
        self
    }

    pub fn build(self) -> Arc<HttpNetworkSession> {
        Arc::new(HttpNetworkSession {
            params: self.params,
            stream_factory: self.stream_factory,
            server_properties: self
                .server_properties
                .unwrap_or_else(|| Arc::new(HttpServerPropertiesImpl::new())),
            ssl_client_context: self.ssl_client_context.unwrap_or_default(),
            auth_controller_factory: self
                .auth_controller_factory
                .unwrap_or_else(|| Arc::new(HttpAuthControllerFactory::default())),
        })
    }
}
