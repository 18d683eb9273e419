//! The stream provider contract (Chromium's `HttpStreamFactory`).
//!
//! A request for a stream resolves to exactly one terminal
//! [`StreamRequestEvent`]; the provider's callback interface is modelled as
//! that closed enum so the transaction can match it exhaustively.

use std::net::SocketAddr;
use std::sync::Arc;

use super::auth::AuthController;
use super::connectioninfo::NextProto;
use super::requestinfo::HttpRequestInfo;
use super::responseheaders::HttpResponseHeaders;
use super::responseinfo::{AlternateProtocolUsage, HttpResponseInfo};
use super::stream::{HttpStream, StreamFuture};
use crate::base::loadstate::LoadState;
use crate::base::neterror::{NetError, NetErrorDetails, ResolveErrorInfo};
use crate::base::networkkey::NetworkAnonymizationKey;
use crate::base::hostportpair::SchemeHostPort;
use crate::base::priority::RequestPriority;
use crate::proxy::ProxyInfo;
use crate::ssl::{CertStatus, SslCertRequestInfo, SslInfo, X509Certificate};

/// A certificate the caller chose to accept despite its errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertAndStatus {
    pub cert: X509Certificate,
    pub cert_status: CertStatus,
}

/// One failed connection attempt, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAttempt {
    pub endpoint: SocketAddr,
    pub result: NetError,
}

/// What the provider reports back for a stream request.
pub enum StreamRequestEvent {
    StreamReady {
        proxy_info: ProxyInfo,
        stream: Box<dyn HttpStream>,
    },
    StreamFailed {
        error: NetError,
        details: NetErrorDetails,
        proxy_info: ProxyInfo,
        resolve_error_info: ResolveErrorInfo,
    },
    CertificateError {
        error: NetError,
        ssl_info: SslInfo,
    },
    /// A CONNECT tunnel was answered with 407.
    NeedsProxyAuth {
        response: HttpResponseInfo,
        proxy_info: ProxyInfo,
        auth_controller: Arc<dyn AuthController>,
    },
    NeedsClientAuth {
        cert_request_info: Arc<SslCertRequestInfo>,
    },
    /// Not terminal: QUIC was found broken and the request carries on.
    QuicBroken,
}

impl StreamRequestEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamRequestEvent::StreamReady { .. } => "stream_ready",
            StreamRequestEvent::StreamFailed { .. } => "stream_failed",
            StreamRequestEvent::CertificateError { .. } => "certificate_error",
            StreamRequestEvent::NeedsProxyAuth { .. } => "needs_proxy_auth",
            StreamRequestEvent::NeedsClientAuth { .. } => "needs_client_auth",
            StreamRequestEvent::QuicBroken => "quic_broken",
        }
    }
}

impl std::fmt::Debug for StreamRequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamRequestEvent::StreamFailed { error, .. }
            | StreamRequestEvent::CertificateError { error, .. } => f
                .debug_struct(self.name())
                .field("error", error)
                .finish(),
            _ => f.write_str(self.name()),
        }
    }
}

/// An in-flight request for a stream.
pub trait HttpStreamRequest: Send {
    /// Wait for the next event. After a terminal event, only
    /// `restart_tunnel_with_proxy_auth` may produce more.
    fn next_event(&mut self) -> StreamFuture<'_, StreamRequestEvent>;

    /// Retry the CONNECT with the credentials now held by the proxy controller.
    fn restart_tunnel_with_proxy_auth(&mut self) -> Result<(), NetError>;

    fn set_priority(&mut self, priority: RequestPriority);

    fn load_state(&self) -> LoadState;

    fn negotiated_protocol(&self) -> NextProto {
        NextProto::Unknown
    }

    fn alternate_protocol_usage(&self) -> AlternateProtocolUsage {
        AlternateProtocolUsage::Unspecified
    }

    fn connection_attempts(&self) -> Vec<ConnectionAttempt> {
        Vec::new()
    }
}

/// Supplies WebSocket handshake details to the provider.
pub trait WebSocketHandshakeStreamCreateHelper: Send + Sync {
    fn requested_subprotocols(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Parameters of one stream request.
pub struct StreamRequestParams<'a> {
    pub request: &'a HttpRequestInfo,
    pub priority: RequestPriority,
    pub allowed_bad_certs: &'a [CertAndStatus],
    pub enable_ip_based_pooling: bool,
    pub enable_alternative_services: bool,
}

pub trait HttpStreamFactory: Send + Sync {
    fn request_stream(&self, params: StreamRequestParams<'_>) -> Box<dyn HttpStreamRequest>;

    fn request_websocket_handshake_stream(
        &self,
        params: StreamRequestParams<'_>,
        helper: Arc<dyn WebSocketHandshakeStreamCreateHelper>,
    ) -> Box<dyn HttpStreamRequest>;

    /// Record Alt-Svc advertisements from a secure response.
    fn process_alternative_services(
        &self,
        _headers: &HttpResponseHeaders,
        _origin: &SchemeHostPort,
        _key: &NetworkAnonymizationKey,
    ) {
    }
}
