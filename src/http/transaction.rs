//! The network transaction: drives one request over the streams handed out
//! by the session's stream factory.
//!
//! Mirrors Chromium's `HttpNetworkTransaction` (net/http/http_network_transaction.cc).
//! Every asynchronous boundary goes through `do_loop`: a `do_*` handler sets
//! the completion state before awaiting its collaborator, and the matching
//! `*_complete` handler receives the result.

use bytes::BytesMut;
use futures::future::BoxFuture;
use http::header::{self, HeaderName, HeaderValue};
use http::Method;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use super::auth::{AuthController, AuthCredentials, HttpAuthTarget};
use super::connectioninfo::{ConnectionInfo, ConnectionInfoCoarse, NextProto};
use super::contentencoding::content_encodings_valid;
use super::requestheaders::HttpRequestHeaders;
use super::requestinfo::{HttpRequestInfo, PrivacyMode};
use super::responseheaders::{HttpResponseHeaders, HttpVersion};
use super::responseinfo::HttpResponseInfo;
use super::retry::{RetryBudget, RetryPolicy, RetryReason};
use super::serverproperties::AlternativeService;
use super::session::HttpNetworkSession;
use super::stream::{HttpStream, RequestHeadersCallback};
use super::streamfactory::{
    CertAndStatus, ConnectionAttempt, HttpStreamRequest, StreamRequestEvent, StreamRequestParams,
    WebSocketHandshakeStreamCreateHelper,
};
use crate::base::hostportpair::{HostPortPair, SchemeHostPort};
use crate::base::loadflags::LoadFlags;
use crate::base::loadstate::LoadState;
use crate::base::loadtiming::LoadTimingInfo;
use crate::base::neterror::{NetError, NetErrorDetails, ResolveErrorInfo};
use crate::base::networkkey::NetworkAnonymizationKey;
use crate::base::priority::RequestPriority;
use crate::base::transportinfo::{TransportInfo, TransportType};
use crate::proxy::ProxyInfo;
use crate::ssl::{SslCertRequestInfo, SslInfo, SslPrivateKey, X509Certificate};

/// Scratch buffer used to drain a body before an auth restart.
pub const DRAIN_BODY_BUFFER_SIZE: usize = 1024;

/// Runs once before the first stream is requested; the request waits for
/// the returned future.
pub type BeforeNetworkStartCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Runs every time a stream is connected. An error stops the transaction.
pub type ConnectedCallback =
    Box<dyn FnMut(&TransportInfo) -> BoxFuture<'static, Result<(), NetError>> + Send>;

/// Sees every response head, including interim ones.
pub type ResponseHeadersCallback = Arc<dyn Fn(&Arc<HttpResponseHeaders>) + Send + Sync>;

/// Receives 103 Early Hints heads.
pub type EarlyResponseHeadersCallback = Arc<dyn Fn(Arc<HttpResponseHeaders>) + Send + Sync>;

/// Last chance to edit the request headers before they are sent.
pub type ModifyRequestHeadersCallback = Box<dyn FnMut(&mut HttpRequestHeaders) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotifyBeforeCreateStream,
    CreateStream,
    CreateStreamComplete,
    ConnectedCallback,
    ConnectedCallbackComplete,
    InitStream,
    InitStreamComplete,
    GenerateProxyAuthToken,
    GenerateProxyAuthTokenComplete,
    GenerateServerAuthToken,
    GenerateServerAuthTokenComplete,
    InitRequestBody,
    InitRequestBodyComplete,
    BuildRequest,
    BuildRequestComplete,
    SendRequest,
    SendRequestComplete,
    ReadHeaders,
    ReadHeadersComplete,
    ReadBody,
    ReadBodyComplete,
    DrainBodyForAuthRestart,
    DrainBodyForAuthRestartComplete,
}

pub struct HttpNetworkTransaction {
    session: Arc<HttpNetworkSession>,
    priority: RequestPriority,

    /// Owned until the final response headers are in.
    request: Option<HttpRequestInfo>,
    url: Option<Url>,
    method: Method,
    privacy_mode: PrivacyMode,
    network_anonymization_key: NetworkAnonymizationKey,
    started: bool,

    next_state: Option<State>,
    /// What the caller sees when the loop pauses on a tunnel auth challenge.
    paused_result: Option<Result<(), NetError>>,

    response: HttpResponseInfo,
    stream: Option<Box<dyn HttpStream>>,
    stream_request: Option<Box<dyn HttpStreamRequest>>,
    proxy_info: ProxyInfo,

    proxy_auth: Option<Arc<dyn AuthController>>,
    server_auth: Option<Arc<dyn AuthController>>,
    pending_auth_target: Option<HttpAuthTarget>,

    budget: RetryBudget,
    can_send_early_data: bool,
    enable_ip_based_pooling: bool,
    enable_alternative_services: bool,
    http_1_1_was_required: bool,
    establishing_tunnel: bool,
    headers_valid: bool,
    configured_client_cert_for_server: bool,
    close_connection_on_destruction: bool,
    /// The final body read happened; the stream is already closed.
    read_done: bool,

    request_headers: HttpRequestHeaders,
    read_buf: BytesMut,

    total_received_bytes: u64,
    total_sent_bytes: u64,
    received_body_bytes: u64,
    remote_endpoint: Option<SocketAddr>,
    send_start_time: Option<Instant>,
    send_end_time: Option<Instant>,
    negotiated_protocol: NextProto,
    net_error_details: NetErrorDetails,
    retried_alternative_service: Option<AlternativeService>,
    observed_bad_certs: Vec<CertAndStatus>,
    connection_attempts: Vec<ConnectionAttempt>,

    websocket_helper: Option<Arc<dyn WebSocketHandshakeStreamCreateHelper>>,
    before_network_start_callback: Option<BeforeNetworkStartCallback>,
    connected_callback: Option<ConnectedCallback>,
    request_headers_callback: Option<RequestHeadersCallback>,
    early_response_headers_callback: Option<EarlyResponseHeadersCallback>,
    response_headers_callback: Option<ResponseHeadersCallback>,
    modify_request_headers_callback: Option<ModifyRequestHeadersCallback>,
}

impl HttpNetworkTransaction {
    pub fn new(priority: RequestPriority, session: Arc<HttpNetworkSession>) -> Self {
        Self {
            session,
            priority,
            request: None,
            url: None,
            method: Method::GET,
            privacy_mode: PrivacyMode::Disabled,
            network_anonymization_key: NetworkAnonymizationKey::default(),
            started: false,
            next_state: None,
            paused_result: None,
            response: HttpResponseInfo::default(),
            stream: None,
            stream_request: None,
            proxy_info: ProxyInfo::default(),
            proxy_auth: None,
            server_auth: None,
            pending_auth_target: None,
            budget: RetryBudget::new(),
            can_send_early_data: false,
            enable_ip_based_pooling: true,
            enable_alternative_services: true,
            http_1_1_was_required: false,
            establishing_tunnel: false,
            headers_valid: false,
            configured_client_cert_for_server: false,
            close_connection_on_destruction: false,
            read_done: false,
            request_headers: HttpRequestHeaders::new(),
            read_buf: BytesMut::new(),
            total_received_bytes: 0,
            total_sent_bytes: 0,
            received_body_bytes: 0,
            remote_endpoint: None,
            send_start_time: None,
            send_end_time: None,
            negotiated_protocol: NextProto::Unknown,
            net_error_details: NetErrorDetails::default(),
            retried_alternative_service: None,
            observed_bad_certs: Vec::new(),
            connection_attempts: Vec::new(),
            websocket_helper: None,
            before_network_start_callback: None,
            connected_callback: None,
            request_headers_callback: None,
            early_response_headers_callback: None,
            response_headers_callback: None,
            modify_request_headers_callback: None,
        }
    }

    // ------------------------------------------------------------------
    // Public API
    // ------------------------------------------------------------------

    /// Run the request up to final response headers (or an auth challenge,
    /// certificate request or error the caller has to act on).
    pub async fn start(&mut self, request: HttpRequestInfo) -> Result<(), NetError> {
        if request.load_flags.contains(LoadFlags::ONLY_FROM_CACHE) {
            return Err(NetError::CacheMiss);
        }
        if self.started {
            tracing::warn!(url = %request.url, "transaction started twice");
            return Err(NetError::Unexpected);
        }
        self.started = true;

        self.url = Some(request.url.clone());
        self.method = request.method.clone();
        self.privacy_mode = request.privacy_mode;
        self.network_anonymization_key = request.network_anonymization_key.clone();
        self.can_send_early_data = request.can_send_early_data();

        if request.load_flags.contains(LoadFlags::PREFETCH) {
            self.response.unused_since_prefetch = true;
        }
        if request
            .load_flags
            .contains(LoadFlags::RESTRICTED_PREFETCH_FOR_MAIN_FRAME)
        {
            self.response.restricted_prefetch = true;
        }
        self.request = Some(request);

        self.next_state = Some(State::NotifyBeforeCreateStream);
        let rv = self.do_loop(Ok(0)).await;
        self.finish(rv).map(|_| ())
    }

    /// Retry after a certificate error, accepting the certificates seen so far.
    pub async fn restart_ignoring_last_error(&mut self) -> Result<(), NetError> {
        if self.stream.is_some() || self.stream_request.is_some() || self.next_state.is_some() {
            tracing::warn!("restart_ignoring_last_error while a request is in flight");
            return Err(NetError::Unexpected);
        }
        if !self.budget.check_max_restarts() {
            return Err(NetError::TooManyRetries);
        }

        self.next_state = Some(State::CreateStream);
        let rv = self.do_loop(Ok(0)).await;
        self.finish(rv).map(|_| ())
    }

    /// Answer a client certificate request. `None` for both continues
    /// without a certificate.
    pub async fn restart_with_certificate(
        &mut self,
        client_cert: Option<X509Certificate>,
        client_private_key: Option<Arc<dyn SslPrivateKey>>,
    ) -> Result<(), NetError> {
        if self.stream.is_some() || self.stream_request.is_some() || self.next_state.is_some() {
            tracing::warn!("restart_with_certificate while a request is in flight");
            return Err(NetError::Unexpected);
        }
        let Some(cert_request_info) = self.response.cert_request_info.clone() else {
            tracing::warn!("restart_with_certificate without a certificate request");
            return Err(NetError::Unexpected);
        };
        let Some(host_and_port) = cert_request_info.host_and_port.clone() else {
            return Err(NetError::Unexpected);
        };
        if !self.budget.check_max_restarts() {
            return Err(NetError::TooManyRetries);
        }

        self.session.ssl_client_context().set_client_certificate(
            host_and_port,
            client_cert,
            client_private_key,
        );
        if !cert_request_info.is_proxy {
            self.configured_client_cert_for_server = true;
        }

        self.reset_state_for_restart();
        self.next_state = Some(State::CreateStream);
        let rv = self.do_loop(Ok(0)).await;
        self.finish(rv).map(|_| ())
    }

    /// Answer the pending auth challenge. Empty credentials retry with
    /// whatever identity the controller can find on its own.
    pub async fn restart_with_auth(&mut self, credentials: &AuthCredentials) -> Result<(), NetError> {
        if !self.budget.check_max_restarts() {
            return Err(NetError::TooManyRetries);
        }
        let Some(target) = self.pending_auth_target else {
            tracing::warn!("restart_with_auth without a pending auth challenge");
            return Err(NetError::Unexpected);
        };
        self.pending_auth_target = None;

        let Some(controller) = self.auth_controller(target).cloned() else {
            return Err(NetError::Unexpected);
        };
        controller.reset_auth(credentials);

        if target == HttpAuthTarget::Proxy && self.establishing_tunnel {
            // The CONNECT is retried by the stream request itself.
            let Some(stream_request) = self.stream_request.as_mut() else {
                return Err(NetError::Unexpected);
            };
            if self.next_state != Some(State::CreateStreamComplete) {
                return Err(NetError::Unexpected);
            }
            stream_request.restart_tunnel_with_proxy_auth()?;
            self.proxy_auth = None;
            self.reset_state_for_restart();

            let rv = self.wait_for_stream_request().await;
            let rv = if rv == Err(NetError::IoPending) {
                rv
            } else {
                self.do_loop(rv).await
            };
            return self.finish(rv).map(|_| ());
        }

        if self.stream_request.is_some() {
            return Err(NetError::Unexpected);
        }
        self.prepare_for_auth_restart(target);
        let rv = self.do_loop(Ok(0)).await;
        self.finish(rv).map(|_| ())
    }

    /// Read response body bytes. `Ok(0)` at the end of the body.
    ///
    /// A cancelled `read` may be followed by another one; bytes the stream
    /// had already handed to the dropped future are lost. Cancelling `start`
    /// or a `restart_*` future leaves the transaction unusable.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        if matches!(
            self.next_state,
            Some(State::ReadBody) | Some(State::ReadBodyComplete)
        ) {
            // The previous read was dropped mid-flight.
            self.next_state = None;
        }
        if self.headers_valid && self.response.headers.is_some() && self.stream_request.is_some() {
            // A 407 from the tunnel proxy: its body may be attacker-controlled.
            return Err(NetError::TunnelConnectionFailed);
        }
        if self.next_state.is_some() || !self.headers_valid {
            tracing::warn!("read before response headers are available");
            return Err(NetError::Unexpected);
        }
        if self.read_done || buf.is_empty() {
            return Ok(0);
        }
        if self.stream.is_none() {
            tracing::warn!("read without a stream");
            return Err(NetError::Unexpected);
        }

        self.read_buf.clear();
        self.read_buf.resize(buf.len(), 0);
        self.next_state = Some(State::ReadBody);
        let rv = self.do_loop(Ok(0)).await;
        let rv = self.finish(rv);
        if let Ok(n) = rv {
            buf[..n].copy_from_slice(&self.read_buf[..n]);
        }
        self.read_buf.clear();
        rv
    }

    /// A challenge is pending and its controller already has an identity to
    /// try, so `restart_with_auth` can go ahead with empty credentials.
    pub fn is_ready_to_restart_for_auth(&self) -> bool {
        self.pending_auth_target
            .is_some_and(|target| self.have_auth(target))
    }

    pub fn get_response_info(&self) -> &HttpResponseInfo {
        &self.response
    }

    pub fn get_load_state(&self) -> LoadState {
        match self.next_state {
            Some(State::CreateStream) => LoadState::WaitingForDelegate,
            Some(State::CreateStreamComplete) => self
                .stream_request
                .as_ref()
                .map(|request| request.load_state())
                .unwrap_or_default(),
            Some(State::GenerateProxyAuthTokenComplete)
            | Some(State::GenerateServerAuthTokenComplete)
            | Some(State::SendRequestComplete) => LoadState::SendingRequest,
            Some(State::ReadHeadersComplete) => LoadState::WaitingForResponse,
            Some(State::ReadBodyComplete) => LoadState::ReadingResponse,
            _ => LoadState::Idle,
        }
    }

    pub fn set_priority(&mut self, priority: RequestPriority) {
        self.priority = priority;
        if let Some(stream_request) = self.stream_request.as_mut() {
            stream_request.set_priority(priority);
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_priority(priority);
        }
    }

    pub fn priority(&self) -> RequestPriority {
        self.priority
    }

    pub fn get_total_received_bytes(&self) -> u64 {
        self.total_received_bytes
            + self
                .stream
                .as_ref()
                .map_or(0, |stream| stream.total_received_bytes())
    }

    pub fn get_total_sent_bytes(&self) -> u64 {
        self.total_sent_bytes
            + self
                .stream
                .as_ref()
                .map_or(0, |stream| stream.total_sent_bytes())
    }

    pub fn get_received_body_bytes(&self) -> u64 {
        self.received_body_bytes
    }

    pub fn get_remote_endpoint(&self) -> Option<SocketAddr> {
        self.remote_endpoint
    }

    pub fn get_load_timing_info(&self) -> Option<LoadTimingInfo> {
        let mut info = self.stream.as_ref()?.load_timing_info()?;
        info.proxy_resolve_start = self.proxy_info.proxy_resolve_start;
        info.proxy_resolve_end = self.proxy_info.proxy_resolve_end;
        info.send_start = self.send_start_time;
        info.send_end = self.send_end_time;
        Some(info)
    }

    pub fn populate_net_error_details(&self) -> NetErrorDetails {
        let mut details = self.net_error_details.clone();
        if let Some(stream) = self.stream.as_ref() {
            stream.populate_net_error_details(&mut details);
        }
        details
    }

    /// Connection attempts of every stream request made so far.
    pub fn get_connection_attempts(&self) -> Vec<ConnectionAttempt> {
        self.connection_attempts.clone()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.budget.retry_attempts()
    }

    pub fn num_restarts(&self) -> u32 {
        self.budget.num_restarts()
    }

    /// Never return the connection to the pool when this transaction goes away.
    pub fn close_connection_on_destruction(&mut self) {
        self.close_connection_on_destruction = true;
    }

    pub fn set_websocket_handshake_stream_create_helper(
        &mut self,
        helper: Arc<dyn WebSocketHandshakeStreamCreateHelper>,
    ) {
        self.websocket_helper = Some(helper);
    }

    pub fn set_before_network_start_callback(&mut self, callback: BeforeNetworkStartCallback) {
        self.before_network_start_callback = Some(callback);
    }

    pub fn set_connected_callback(&mut self, callback: ConnectedCallback) {
        self.connected_callback = Some(callback);
    }

    pub fn set_request_headers_callback(&mut self, callback: RequestHeadersCallback) {
        self.request_headers_callback = Some(callback);
    }

    pub fn set_early_response_headers_callback(&mut self, callback: EarlyResponseHeadersCallback) {
        self.early_response_headers_callback = Some(callback);
    }

    pub fn set_response_headers_callback(&mut self, callback: ResponseHeadersCallback) {
        self.response_headers_callback = Some(callback);
    }

    pub fn set_modify_request_headers_callback(&mut self, callback: ModifyRequestHeadersCallback) {
        self.modify_request_headers_callback = Some(callback);
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    async fn do_loop(&mut self, result: Result<usize, NetError>) -> Result<usize, NetError> {
        let mut rv = result;
        while let Some(state) = self.next_state.take() {
            tracing::trace!(state = ?state, "http transaction step");
            rv = match state {
                State::NotifyBeforeCreateStream => self.do_notify_before_create_stream().await,
                State::CreateStream => self.do_create_stream().await,
                State::CreateStreamComplete => self.do_create_stream_complete(rv),
                State::ConnectedCallback => self.do_connected_callback().await,
                State::ConnectedCallbackComplete => self.do_connected_callback_complete(rv),
                State::InitStream => self.do_init_stream().await,
                State::InitStreamComplete => self.do_init_stream_complete(rv),
                State::GenerateProxyAuthToken => self.do_generate_proxy_auth_token().await,
                State::GenerateProxyAuthTokenComplete => {
                    self.do_generate_proxy_auth_token_complete(rv)
                }
                State::GenerateServerAuthToken => self.do_generate_server_auth_token().await,
                State::GenerateServerAuthTokenComplete => {
                    self.do_generate_server_auth_token_complete(rv)
                }
                State::InitRequestBody => self.do_init_request_body().await,
                State::InitRequestBodyComplete => self.do_init_request_body_complete(rv),
                State::BuildRequest => self.do_build_request(),
                State::BuildRequestComplete => self.do_build_request_complete(rv),
                State::SendRequest => self.do_send_request().await,
                State::SendRequestComplete => self.do_send_request_complete(rv),
                State::ReadHeaders => self.do_read_headers().await,
                State::ReadHeadersComplete => self.do_read_headers_complete(rv),
                State::ReadBody => self.do_read_body().await,
                State::ReadBodyComplete => self.do_read_body_complete(rv),
                State::DrainBodyForAuthRestart => self.do_drain_body_for_auth_restart().await,
                State::DrainBodyForAuthRestartComplete => {
                    self.do_drain_body_for_auth_restart_complete(rv)
                }
            };
            if rv == Err(NetError::IoPending) {
                break;
            }
        }
        rv
    }

    /// Map the internal pause marker to what the caller should see.
    fn finish(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        match rv {
            Err(NetError::IoPending) => match self.paused_result.take() {
                Some(result) => result.map(|()| 0),
                None => Err(NetError::Unexpected),
            },
            other => other,
        }
    }

    async fn do_notify_before_create_stream(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::CreateStream);
        if let Some(callback) = self.before_network_start_callback.take() {
            callback().await;
        }
        Ok(0)
    }

    async fn do_create_stream(&mut self) -> Result<usize, NetError> {
        self.response.network_accessed = true;

        let for_websocket = self.for_websocket_handshake();
        let stream_request = {
            let Some(request) = self.request.as_ref() else {
                return Err(NetError::Unexpected);
            };
            let params = StreamRequestParams {
                request,
                priority: self.priority,
                allowed_bad_certs: &self.observed_bad_certs,
                enable_ip_based_pooling: self.enable_ip_based_pooling,
                enable_alternative_services: self.enable_alternative_services,
            };
            let factory = self.session.stream_factory();
            match (&self.websocket_helper, for_websocket) {
                (Some(helper), true) => {
                    factory.request_websocket_handshake_stream(params, Arc::clone(helper))
                }
                _ => factory.request_stream(params),
            }
        };
        self.stream_request = Some(stream_request);
        self.next_state = Some(State::CreateStreamComplete);
        self.wait_for_stream_request().await
    }

    /// Wait for the stream request's terminal event and apply it.
    async fn wait_for_stream_request(&mut self) -> Result<usize, NetError> {
        loop {
            let event = match self.stream_request.as_mut() {
                Some(stream_request) => stream_request.next_event().await,
                None => return Err(NetError::Unexpected),
            };
            tracing::trace!(event = event.name(), "stream request event");

            match event {
                StreamRequestEvent::QuicBroken => {
                    self.net_error_details.quic_broken = true;
                }
                StreamRequestEvent::StreamReady { proxy_info, stream } => {
                    self.on_stream_ready(proxy_info, stream);
                    return Ok(0);
                }
                StreamRequestEvent::StreamFailed {
                    error,
                    details,
                    proxy_info,
                    resolve_error_info,
                } => {
                    self.on_stream_failed(details, proxy_info, resolve_error_info);
                    return Err(error);
                }
                StreamRequestEvent::CertificateError { error, ssl_info } => {
                    self.on_certificate_error(ssl_info);
                    return Err(error);
                }
                StreamRequestEvent::NeedsProxyAuth {
                    response,
                    proxy_info,
                    auth_controller,
                } => {
                    self.on_needs_proxy_auth(response, proxy_info, auth_controller);
                    return Err(NetError::IoPending);
                }
                StreamRequestEvent::NeedsClientAuth { cert_request_info } => {
                    self.on_needs_client_auth(cert_request_info);
                    return Err(NetError::SslClientAuthCertNeeded);
                }
            }
        }
    }

    fn on_stream_ready(&mut self, proxy_info: ProxyInfo, mut stream: Box<dyn HttpStream>) {
        if let Some(old) = self.stream.as_ref() {
            self.total_received_bytes += old.total_received_bytes();
            self.total_sent_bytes += old.total_sent_bytes();
        }
        stream.set_request_headers_callback(self.request_headers_callback.clone());
        self.proxy_info = proxy_info;

        if let Some(stream_request) = self.stream_request.as_ref() {
            self.negotiated_protocol = stream_request.negotiated_protocol();
            self.response.alternate_protocol_usage = stream_request.alternate_protocol_usage();
        }
        self.response.was_alpn_negotiated = self.negotiated_protocol != NextProto::Unknown;
        self.response.alpn_negotiated_protocol = self.negotiated_protocol.as_str().to_string();
        self.response.was_fetched_via_spdy = self.negotiated_protocol == NextProto::Http2;
        self.response.dns_aliases = stream.dns_aliases();

        self.stream = Some(stream);
        self.set_proxy_info_in_response();
    }

    fn on_stream_failed(
        &mut self,
        details: NetErrorDetails,
        proxy_info: ProxyInfo,
        resolve_error_info: ResolveErrorInfo,
    ) {
        let quic_broken = self.net_error_details.quic_broken;
        self.net_error_details = details;
        self.net_error_details.quic_broken |= quic_broken;
        self.proxy_info = proxy_info;
        self.set_proxy_info_in_response();
        self.response.resolve_error_info = resolve_error_info;
    }

    fn on_certificate_error(&mut self, ssl_info: SslInfo) {
        if let Some(cert) = ssl_info.cert.clone() {
            self.observed_bad_certs.push(CertAndStatus {
                cert,
                cert_status: ssl_info.cert_status,
            });
        }
        self.response.ssl_info = ssl_info;
    }

    fn on_needs_proxy_auth(
        &mut self,
        proxy_response: HttpResponseInfo,
        proxy_info: ProxyInfo,
        auth_controller: Arc<dyn AuthController>,
    ) {
        self.establishing_tunnel = true;
        self.response.headers = proxy_response.headers;
        self.response.auth_challenge = proxy_response.auth_challenge;
        self.response.did_use_http_auth = proxy_response.did_use_http_auth;
        self.proxy_info = proxy_info;
        self.set_proxy_info_in_response();

        if !self.content_encodings_valid() {
            self.paused_result = Some(Err(NetError::ContentDecodingFailed));
            return;
        }

        self.headers_valid = true;
        self.proxy_auth = Some(auth_controller);
        self.pending_auth_target = Some(HttpAuthTarget::Proxy);
        self.paused_result = Some(Ok(()));
    }

    fn on_needs_client_auth(&mut self, cert_request_info: Arc<SslCertRequestInfo>) {
        self.response.cert_request_info = Some(cert_request_info);
    }

    fn do_create_stream_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        self.copy_connection_attempts_from_stream_request();
        let rv = match rv {
            Ok(_) => {
                self.next_state = Some(State::ConnectedCallback);
                Ok(0)
            }
            Err(e @ (NetError::Http11Required | NetError::ProxyHttp11Required)) => {
                self.handle_http11_required(e)
            }
            Err(e) => self.handle_ssl_client_auth_error(e),
        };
        self.stream_request = None;
        rv
    }

    async fn do_connected_callback(&mut self) -> Result<usize, NetError> {
        let is_secure = self.is_secure_request();
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        if let Some(request) = self.request.as_ref() {
            stream.register_request(request);
        }
        self.next_state = Some(State::ConnectedCallbackComplete);

        let endpoint = match stream.remote_endpoint() {
            Ok(endpoint) => endpoint,
            // The pooled socket was closed by the peer before we got to use it.
            Err(e) => return self.handle_io_error(e),
        };
        self.remote_endpoint = Some(endpoint);

        let Some(callback) = self.connected_callback.as_mut() else {
            return Ok(0);
        };
        let transport_type = if self.proxy_info.is_direct() {
            TransportType::Direct
        } else {
            TransportType::Proxied
        };
        let cert_is_issued_by_known_root = is_secure
            && stream
                .ssl_info()
                .is_some_and(|ssl_info| ssl_info.is_issued_by_known_root);
        let info = TransportInfo {
            transport_type,
            endpoint,
            accept_ch_frame: stream.accept_ch_via_alps(),
            cert_is_issued_by_known_root,
            negotiated_protocol: NextProto::from_alpn(&self.response.alpn_negotiated_protocol),
        };
        callback(&info).await.map(|()| 0)
    }

    fn do_connected_callback_complete(
        &mut self,
        rv: Result<usize, NetError>,
    ) -> Result<usize, NetError> {
        if let Err(e) = rv {
            if let Some(stream) = self.stream.as_mut() {
                stream.close(false);
            }
            return Err(e);
        }
        self.next_state = Some(State::InitStream);
        Ok(0)
    }

    async fn do_init_stream(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::InitStreamComplete);
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        stream
            .initialize_stream(self.can_send_early_data, self.priority)
            .await
            .map(|()| 0)
    }

    fn do_init_stream_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        if let Err(e) = rv {
            let rv = self.handle_io_error(e);
            // The stream will never be useful.
            if let Some(stream) = self.stream.as_ref() {
                self.total_received_bytes += stream.total_received_bytes();
                self.total_sent_bytes += stream.total_sent_bytes();
            }
            self.cache_net_error_details_and_reset_stream();
            return rv;
        }
        self.next_state = Some(State::GenerateProxyAuthToken);
        Ok(0)
    }

    async fn do_generate_proxy_auth_token(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::GenerateProxyAuthTokenComplete);
        if !self.should_apply_proxy_auth() {
            return Ok(0);
        }
        let Some(controller) = self.get_or_create_auth_controller(HttpAuthTarget::Proxy) else {
            return Ok(0);
        };
        let method = self.method.clone();
        let url = self.url()?.clone();
        controller
            .maybe_generate_auth_token(&method, &url)
            .await
            .map(|()| 0)
    }

    fn do_generate_proxy_auth_token_complete(
        &mut self,
        rv: Result<usize, NetError>,
    ) -> Result<usize, NetError> {
        if rv.is_ok() {
            self.next_state = Some(State::GenerateServerAuthToken);
        }
        rv
    }

    async fn do_generate_server_auth_token(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::GenerateServerAuthTokenComplete);
        let Some(controller) = self.get_or_create_auth_controller(HttpAuthTarget::Server) else {
            return Ok(0);
        };
        if !self.should_apply_server_auth() {
            return Ok(0);
        }
        let method = self.method.clone();
        let url = self.url()?.clone();
        controller
            .maybe_generate_auth_token(&method, &url)
            .await
            .map(|()| 0)
    }

    fn do_generate_server_auth_token_complete(
        &mut self,
        rv: Result<usize, NetError>,
    ) -> Result<usize, NetError> {
        if rv.is_ok() {
            self.next_state = Some(State::InitRequestBody);
        }
        rv
    }

    async fn do_init_request_body(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::InitRequestBodyComplete);
        match self
            .request
            .as_mut()
            .and_then(|request| request.upload_data_stream.as_deref_mut())
        {
            Some(body) => body.init().await.map(|()| 0),
            None => Ok(0),
        }
    }

    fn do_init_request_body_complete(
        &mut self,
        rv: Result<usize, NetError>,
    ) -> Result<usize, NetError> {
        if rv.is_ok() {
            self.next_state = Some(State::BuildRequest);
        }
        rv
    }

    fn do_build_request(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::BuildRequestComplete);
        self.headers_valid = false;

        // Built lazily so the proxy decision is known.
        if self.request_headers.is_empty() {
            let using_http_proxy_without_tunnel = self.using_http_proxy_without_tunnel();
            return self.build_request_headers(using_http_proxy_without_tunnel);
        }
        Ok(0)
    }

    fn build_request_headers(
        &mut self,
        using_http_proxy_without_tunnel: bool,
    ) -> Result<usize, NetError> {
        let host = host_and_optional_port(self.url()?)?;
        self.request_headers.set_header(header::HOST, host);

        let keep_alive = HeaderValue::from_static("keep-alive");
        if using_http_proxy_without_tunnel {
            self.request_headers.set_header(
                HeaderName::from_static(HttpRequestHeaders::PROXY_CONNECTION),
                keep_alive,
            );
        } else {
            self.request_headers.set_header(header::CONNECTION, keep_alive);
        }

        let request = self.request()?;
        let body_framing = request
            .upload_data_stream
            .as_ref()
            .map(|body| (body.is_chunked(), body.size()));
        let needs_empty_content_length =
            request.method == Method::POST || request.method == Method::PUT;
        let load_flags = request.load_flags;

        match body_framing {
            Some((true, _)) => self
                .request_headers
                .set_header(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked")),
            Some((false, size)) => self
                .request_headers
                .set_header(header::CONTENT_LENGTH, HeaderValue::from(size)),
            None if needs_empty_content_length => self
                .request_headers
                .set_header(header::CONTENT_LENGTH, HeaderValue::from_static("0")),
            None => {}
        }

        // Honor load flags that impact proxy caches.
        if load_flags.contains(LoadFlags::BYPASS_CACHE) {
            let no_cache = HeaderValue::from_static("no-cache");
            self.request_headers.set_header(header::PRAGMA, no_cache.clone());
            self.request_headers.set_header(header::CACHE_CONTROL, no_cache);
        } else if load_flags.contains(LoadFlags::VALIDATE_CACHE) {
            self.request_headers
                .set_header(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        }

        if self.should_apply_proxy_auth() && self.have_auth(HttpAuthTarget::Proxy) {
            if let Some(controller) = self.proxy_auth.as_ref() {
                controller.add_authorization_header(&mut self.request_headers);
            }
        }
        if self.should_apply_server_auth() && self.have_auth(HttpAuthTarget::Server) {
            if let Some(controller) = self.server_auth.as_ref() {
                controller.add_authorization_header(&mut self.request_headers);
            }
        }

        if let Some(request) = self.request.as_ref() {
            self.request_headers.merge_from(&request.extra_headers);
        }
        if let Some(callback) = self.modify_request_headers_callback.as_mut() {
            callback(&mut self.request_headers);
        }

        self.response.did_use_http_auth = self.request_headers.has_header("authorization")
            || self.request_headers.has_header("proxy-authorization");
        Ok(0)
    }

    fn do_build_request_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        if rv.is_ok() {
            self.next_state = Some(State::SendRequest);
        }
        rv
    }

    async fn do_send_request(&mut self) -> Result<usize, NetError> {
        self.send_start_time = Some(Instant::now());
        self.next_state = Some(State::SendRequestComplete);

        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        let body = match self.request.as_mut() {
            Some(request) => {
                stream.set_request_idempotency(request.idempotency);
                request.upload_data_stream.as_deref_mut()
            }
            None => None,
        };
        stream
            .send_request(&self.request_headers, body, &mut self.response)
            .await
            .map(|()| 0)
    }

    fn do_send_request_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        self.send_end_time = Some(Instant::now());
        match rv {
            Err(e @ (NetError::Http11Required | NetError::ProxyHttp11Required)) => {
                self.handle_http11_required(e)
            }
            Err(e) => self.handle_io_error(e),
            Ok(_) => {
                self.next_state = Some(State::ReadHeaders);
                Ok(0)
            }
        }
    }

    async fn do_read_headers(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::ReadHeadersComplete);
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        stream
            .read_response_headers(&mut self.response)
            .await
            .map(|()| 0)
    }

    fn do_read_headers_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        // Renegotiation can ask for a client certificate at any point.
        if rv == Err(NetError::SslClientAuthCertNeeded) {
            if let Some(mut stream) = self.stream.take() {
                self.response.cert_request_info = stream.ssl_cert_request_info();
                self.total_received_bytes += stream.total_received_bytes();
                self.total_sent_bytes += stream.total_sent_bytes();
                stream.close(true);
                stream.populate_net_error_details(&mut self.net_error_details);
            }
        }

        let rv = match rv {
            Err(e @ (NetError::Http11Required | NetError::ProxyHttp11Required)) => {
                return self.handle_http11_required(e);
            }
            // Make the best of partial headers.
            Err(NetError::ConnectionClosed) if self.response.headers.is_some() => Ok(0),
            other => other,
        };
        if let Err(e) = rv {
            return self.handle_io_error(e);
        }

        let Some(headers) = self.response.headers.clone() else {
            return Err(NetError::Unexpected);
        };
        let response_code = headers.response_code();

        if response_code == 103 {
            if self.for_websocket_handshake() {
                return Err(NetError::Failed);
            }
            if self.early_hints_are_allowed_on(self.response.connection_info) {
                if let Some(callback) = self.early_response_headers_callback.as_ref() {
                    callback(Arc::clone(&headers));
                }
            }
            self.response.headers = Some(Arc::new(HttpResponseHeaders::empty()));
            self.next_state = Some(State::ReadHeaders);
            return Ok(0);
        }

        if !self.content_encodings_valid() {
            return Err(NetError::ContentDecodingFailed);
        }

        // A 408 on a stale HTTP/1.x socket. HTTP/2 and QUIC multiplex and
        // never need this.
        if response_code == 408
            && self.response.connection_info.coarse() == ConnectionInfoCoarse::Http1
            && self
                .stream
                .as_ref()
                .is_some_and(|stream| stream.is_connection_reused())
        {
            self.reset_connection_and_request_for_resend(RetryReason::HttpRequestTimeout);
            return Ok(0);
        }

        if let Some(callback) = self.response_headers_callback.as_ref() {
            callback(&headers);
        }

        // HTTP/0.9 cannot answer a PUT.
        if headers.http_version() < HttpVersion::HTTP_1_0 && self.method == Method::PUT {
            return Err(NetError::MethodNotSupported);
        }

        if self.can_send_early_data && response_code == 425 {
            return self.handle_io_error(NetError::EarlyDataRejected);
        }

        // 100 Continue and friends are skipped; WebSocket handshakes see them.
        if response_code / 100 == 1 && !self.for_websocket_handshake() {
            self.response.headers = Some(Arc::new(HttpResponseHeaders::empty()));
            self.next_state = Some(State::ReadHeaders);
            return Ok(0);
        }

        let has_body_with_null_source = self
            .request
            .as_ref()
            .is_some_and(|request| request.has_single_use_body());
        if response_code == 421
            && (self.enable_ip_based_pooling || self.enable_alternative_services)
            && !has_body_with_null_source
        {
            self.enable_ip_based_pooling = false;
            self.enable_alternative_services = false;
            self.reset_connection_and_request_for_resend(RetryReason::HttpMisdirectedRequest);
            return Ok(0);
        }

        if self.is_secure_request() {
            if let Some(stream) = self.stream.as_ref() {
                self.response.ssl_info = stream.ssl_info().unwrap_or_default();
            }
            if self.response.ssl_info.is_valid() && !self.response.ssl_info.cert_status.is_error() {
                if let Some(origin) = self.url.as_ref().and_then(SchemeHostPort::from_url) {
                    self.session.stream_factory().process_alternative_services(
                        &headers,
                        &origin,
                        &self.network_anonymization_key,
                    );
                }
            }
        }

        self.handle_auth_challenge()?;

        self.headers_valid = true;
        // The body phase never looks at the request.
        if self.pending_auth_target.is_none() {
            self.request = None;
        }
        Ok(0)
    }

    async fn do_read_body(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::ReadBodyComplete);
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        stream.read_response_body(&mut self.read_buf[..]).await
    }

    fn do_read_body_complete(&mut self, rv: Result<usize, NetError>) -> Result<usize, NetError> {
        let done = !matches!(rv, Ok(n) if n > 0);
        if let Ok(n) = rv {
            self.received_body_bytes += n as u64;
        }

        if done {
            self.read_done = true;
            if let Some(stream) = self.stream.as_mut() {
                let keep_alive = stream.is_response_body_complete() && stream.can_reuse_connection();
                stream.close(!keep_alive);
            }

            // The retry without alternative services worked: the service
            // really is broken.
            if rv.is_ok() && !self.enable_alternative_services {
                if let Some(service) = self.retried_alternative_service.take() {
                    if service.protocol != NextProto::Unknown {
                        tracing::debug!(service = %service, "marking alternative service broken");
                        self.session
                            .http_server_properties()
                            .mark_alternative_service_broken(
                                &service,
                                &self.network_anonymization_key,
                            );
                    }
                }
            }
        }
        rv
    }

    async fn do_drain_body_for_auth_restart(&mut self) -> Result<usize, NetError> {
        self.next_state = Some(State::DrainBodyForAuthRestartComplete);
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetError::Unexpected);
        };
        stream.read_response_body(&mut self.read_buf[..]).await
    }

    fn do_drain_body_for_auth_restart_complete(
        &mut self,
        rv: Result<usize, NetError>,
    ) -> Result<usize, NetError> {
        let body_complete = self
            .stream
            .as_ref()
            .is_some_and(|stream| stream.is_response_body_complete());
        let (done, keep_alive) = match rv {
            Err(_) => (true, false),
            // The peer closed before the body ended; the connection is unusable.
            Ok(0) if !body_complete => (true, false),
            Ok(_) => (body_complete, true),
        };

        if done {
            self.did_drain_body_for_auth_restart(keep_alive);
        } else {
            self.next_state = Some(State::DrainBodyForAuthRestart);
        }
        Ok(0)
    }

    // ------------------------------------------------------------------
    // Error handling and retries
    // ------------------------------------------------------------------

    /// The single choke point for possibly transient transport errors.
    /// `Ok` means the request was reset and will be resent.
    fn handle_io_error(&mut self, error: NetError) -> Result<usize, NetError> {
        let error = match self.handle_ssl_client_auth_error(error) {
            Ok(rv) => return Ok(rv),
            Err(e) => e,
        };

        let Some(reason) = RetryReason::from_io_error(error) else {
            return Err(error);
        };

        match reason.policy() {
            RetryPolicy::IfConnectionReused => {
                if self.should_resend_request() {
                    self.reset_connection_and_request_for_resend(reason);
                    return Ok(0);
                }
                Err(error)
            }
            RetryPolicy::WithoutEarlyData => {
                self.can_send_early_data = false;
                self.reset_connection_and_request_for_resend(reason);
                Ok(0)
            }
            RetryPolicy::Budgeted => {
                if !self.consume_retry_for(reason) {
                    tracing::debug!(reason = %reason, error = %error, "retry budget exhausted");
                    return Err(NetError::TooManyRetries);
                }
                self.reset_connection_and_request_for_resend(reason);
                Ok(0)
            }
            RetryPolicy::AlternativeServiceFallback => {
                self.handle_quic_protocol_error(reason, error)
            }
            RetryPolicy::Always => Err(error),
        }
    }

    /// Charge `reason` against the retry budget when it counts; `false` once
    /// the budget is spent.
    fn consume_retry_for(&mut self, reason: RetryReason) -> bool {
        !reason.consumes_retry_budget() || self.budget.consume_retry()
    }

    fn handle_quic_protocol_error(
        &mut self,
        reason: RetryReason,
        error: NetError,
    ) -> Result<usize, NetError> {
        // Headers already went up, or there is no alternative service to blame.
        if self.response.headers.is_some() {
            return Err(error);
        }
        let Some(service) = self
            .stream
            .as_ref()
            .and_then(|stream| stream.alternative_service())
        else {
            return Err(error);
        };
        self.retried_alternative_service = Some(service.clone());

        if self.budget.has_exceeded_max_retries() {
            tracing::debug!(reason = %reason, error = %error, "retry budget exhausted");
            return Err(NetError::TooManyRetries);
        }

        let server_properties = self.session.http_server_properties();
        if server_properties.is_alternative_service_broken(&service, &self.network_anonymization_key) {
            // Marked broken while in flight; the retry will not pick it.
            self.consume_retry_for(reason);
            self.reset_connection_and_request_for_resend(reason);
            Ok(0)
        } else if self.session.params().retry_without_alt_svc_on_quic_errors {
            self.enable_alternative_services = false;
            self.consume_retry_for(reason);
            self.reset_connection_and_request_for_resend(reason);
            Ok(0)
        } else {
            Err(error)
        }
    }

    fn handle_http11_required(&mut self, error: NetError) -> Result<usize, NetError> {
        tracing::debug!(error = %error, "server requires HTTP/1.1");
        self.http_1_1_was_required = true;
        // The server properties remember the requirement, so the retry
        // negotiates HTTP/1.1.
        self.reset_connection_and_request_for_resend(RetryReason::Http11Required);
        Ok(0)
    }

    /// Client certificate failures from the origin (or from a proxy that is
    /// not tunneled). Retries once when a stale key failed to sign.
    fn handle_ssl_client_auth_error(&mut self, error: NetError) -> Result<usize, NetError> {
        if error != NetError::SslProtocolError && !error.is_client_certificate_error() {
            return Err(error);
        }

        let is_server = !self.using_http_proxy_without_tunnel();
        let host_port_pair = if is_server {
            self.url.as_ref().and_then(HostPortPair::from_url)
        } else if self.proxy_info.proxy_chain().is_single_proxy() {
            self.proxy_info
                .proxy_chain()
                .first()
                .map(|server| server.host_port_pair().clone())
        } else {
            None
        };
        let Some(host_port_pair) = host_port_pair else {
            return Err(error);
        };

        if self
            .session
            .ssl_client_context()
            .clear_client_certificate(&host_port_pair)
            && is_server
            && error == NetError::SslClientAuthSignatureFailed
            && !self.configured_client_cert_for_server
            && self.consume_retry_for(RetryReason::SslClientAuthSignatureFailed)
        {
            self.reset_connection_and_request_for_resend(
                RetryReason::SslClientAuthSignatureFailed,
            );
            return Ok(0);
        }
        Err(error)
    }

    fn should_resend_request(&self) -> bool {
        let connection_is_proven = self
            .stream
            .as_ref()
            .is_some_and(|stream| stream.is_connection_reused());
        let has_received_headers = self.response.headers.is_some();
        // Only reused keep-alive connections are retried, which bounds the
        // loop by the number of idle sockets.
        connection_is_proven && !has_received_headers
    }

    fn reset_connection_and_request_for_resend(&mut self, reason: RetryReason) {
        tracing::debug!(
            reason = %reason,
            retry_attempts = self.budget.retry_attempts(),
            "resending request"
        );
        if let Some(stream) = self.stream.as_mut() {
            stream.close(true);
        }
        // May have to resend a CONNECT first.
        self.request_headers.clear();
        self.next_state = Some(State::CreateStream);
        self.reset_state_for_restart();
    }

    fn reset_state_for_restart(&mut self) {
        self.reset_state_for_auth_restart();
        if let Some(stream) = self.stream.as_ref() {
            self.total_received_bytes += stream.total_received_bytes();
            self.total_sent_bytes += stream.total_sent_bytes();
        }
        self.cache_net_error_details_and_reset_stream();
    }

    fn reset_state_for_auth_restart(&mut self) {
        self.send_start_time = None;
        self.send_end_time = None;
        self.pending_auth_target = None;
        self.read_buf.clear();
        self.headers_valid = false;
        self.request_headers.clear();
        self.response = HttpResponseInfo::default();
        self.set_proxy_info_in_response();
        self.establishing_tunnel = false;
        self.remote_endpoint = None;
        self.net_error_details.quic_broken = false;
        self.net_error_details.quic_connection_error = None;
    }

    fn cache_net_error_details_and_reset_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.populate_net_error_details(&mut self.net_error_details);
        }
    }

    fn copy_connection_attempts_from_stream_request(&mut self) {
        if let Some(stream_request) = self.stream_request.as_ref() {
            self.connection_attempts
                .extend(stream_request.connection_attempts());
        }
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    fn auth_controller(&self, target: HttpAuthTarget) -> Option<&Arc<dyn AuthController>> {
        match target {
            HttpAuthTarget::Proxy => self.proxy_auth.as_ref(),
            HttpAuthTarget::Server => self.server_auth.as_ref(),
        }
    }

    fn get_or_create_auth_controller(
        &mut self,
        target: HttpAuthTarget,
    ) -> Option<Arc<dyn AuthController>> {
        if let Some(controller) = self.auth_controller(target) {
            return Some(Arc::clone(controller));
        }
        let auth_url = self.auth_url(target)?;
        let controller = self.session.auth_controller_factory().create_auth_controller(
            target,
            &auth_url,
            &self.network_anonymization_key,
        );
        match target {
            HttpAuthTarget::Proxy => self.proxy_auth = Some(Arc::clone(&controller)),
            HttpAuthTarget::Server => self.server_auth = Some(Arc::clone(&controller)),
        }
        Some(controller)
    }

    fn have_auth(&self, target: HttpAuthTarget) -> bool {
        self.auth_controller(target)
            .is_some_and(|controller| controller.have_auth())
    }

    /// The URL credentials are scoped to: the proxy's origin, or the request
    /// URL with ws/wss mapped to http/https.
    fn auth_url(&self, target: HttpAuthTarget) -> Option<Url> {
        match target {
            HttpAuthTarget::Proxy => {
                let chain = self.proxy_info.proxy_chain();
                if !chain.is_valid() || chain.is_direct() || !chain.is_single_proxy() {
                    return None;
                }
                let server = chain.first()?;
                let scheme = if server.is_secure_http_like() {
                    "https"
                } else {
                    "http"
                };
                Url::parse(&format!(
                    "{}://{}",
                    scheme,
                    server.host_port_pair().host_for_url()
                ))
                .ok()
            }
            HttpAuthTarget::Server => {
                let mut url = self.url.clone()?;
                if self.for_websocket_handshake() {
                    let scheme = if url.scheme() == "wss" { "https" } else { "http" };
                    if url.set_scheme(scheme).is_err() {
                        return None;
                    }
                }
                Some(url)
            }
        }
    }

    fn should_apply_proxy_auth(&self) -> bool {
        // Multi-proxy chains never get proxy auth.
        if self.proxy_info.proxy_chain().is_multi_proxy() {
            return false;
        }
        self.using_http_proxy_without_tunnel()
    }

    fn should_apply_server_auth(&self) -> bool {
        self.privacy_mode == PrivacyMode::Disabled
    }

    fn handle_auth_challenge(&mut self) -> Result<(), NetError> {
        let Some(headers) = self.response.headers.clone() else {
            return Err(NetError::Unexpected);
        };
        let target = match headers.response_code() {
            401 => HttpAuthTarget::Server,
            407 => HttpAuthTarget::Proxy,
            _ => return Ok(()),
        };
        if target == HttpAuthTarget::Proxy && self.proxy_info.is_direct() {
            return Err(NetError::UnexpectedProxyAuth);
        }
        // An HTTPS server answering 407 through a proxy that never asked.
        let Some(controller) = self.auth_controller(target).cloned() else {
            return Err(NetError::UnexpectedProxyAuth);
        };

        let rv = controller.handle_auth_challenge(
            &headers,
            &self.response.ssl_info,
            !self.should_apply_server_auth(),
            false,
        );
        if controller.have_auth_handler() {
            self.pending_auth_target = Some(target);
        }
        self.response.auth_challenge = controller.take_auth_info();
        rv
    }

    fn prepare_for_auth_restart(&mut self, target: HttpAuthTarget) {
        if target == HttpAuthTarget::Server
            && self
                .server_auth
                .as_ref()
                .is_some_and(|controller| controller.needs_http11())
        {
            if let Some(origin) = self.url.as_ref().and_then(SchemeHostPort::from_url) {
                self.session
                    .http_server_properties()
                    .set_http11_required(&origin, &self.network_anonymization_key);
            }
        }

        let mut keep_alive = false;
        if let Some(stream) = self.stream.as_ref() {
            // Reuse needs the end of this response to be found first.
            if stream.can_reuse_connection() {
                if !stream.is_response_body_complete() {
                    self.next_state = Some(State::DrainBodyForAuthRestart);
                    self.read_buf.clear();
                    self.read_buf.resize(DRAIN_BODY_BUFFER_SIZE, 0);
                    return;
                }
                keep_alive = true;
            }
        }
        self.did_drain_body_for_auth_restart(keep_alive);
    }

    fn did_drain_body_for_auth_restart(&mut self, keep_alive: bool) {
        match self.stream.take() {
            Some(mut stream) => {
                self.total_received_bytes += stream.total_received_bytes();
                self.total_sent_bytes += stream.total_sent_bytes();

                let mut new_stream = None;
                if keep_alive && stream.can_reuse_connection() {
                    stream.set_connection_reused();
                    new_stream = stream.renew_stream_for_auth();
                }
                match new_stream {
                    Some(new_stream) => {
                        self.stream = Some(new_stream);
                        self.next_state = Some(State::ConnectedCallback);
                    }
                    None => {
                        stream.close(true);
                        self.next_state = Some(State::CreateStream);
                    }
                }
            }
            None => self.next_state = Some(State::CreateStream),
        }
        self.reset_state_for_auth_restart();
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn request(&self) -> Result<&HttpRequestInfo, NetError> {
        self.request.as_ref().ok_or(NetError::Unexpected)
    }

    fn url(&self) -> Result<&Url, NetError> {
        self.url.as_ref().ok_or(NetError::Unexpected)
    }

    fn is_secure_request(&self) -> bool {
        self.url
            .as_ref()
            .is_some_and(|url| matches!(url.scheme(), "https" | "wss"))
    }

    fn using_http_proxy_without_tunnel(&self) -> bool {
        self.proxy_info.proxy_chain().is_get_to_proxy_allowed()
            && self.url.as_ref().is_some_and(|url| url.scheme() == "http")
    }

    fn for_websocket_handshake(&self) -> bool {
        self.websocket_helper.is_some()
            && self
                .url
                .as_ref()
                .is_some_and(|url| matches!(url.scheme(), "ws" | "wss"))
    }

    fn early_hints_are_allowed_on(&self, connection_info: ConnectionInfo) -> bool {
        match connection_info {
            ConnectionInfo::Http09 | ConnectionInfo::Http10 => false,
            ConnectionInfo::Http11 => self.session.params().enable_early_hints_on_http11,
            _ => true,
        }
    }

    fn content_encodings_valid(&self) -> bool {
        let Some(headers) = self.response.headers.as_deref() else {
            return false;
        };
        let accept_encoding = self
            .request_headers
            .get_header("accept-encoding")
            .and_then(|value| value.to_str().ok());
        content_encodings_valid(accept_encoding, headers)
    }

    fn set_proxy_info_in_response(&mut self) {
        self.response.proxy_chain = self.proxy_info.proxy_chain().clone();
    }
}

impl Drop for HttpNetworkTransaction {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.read_done && !self.close_connection_on_destruction {
                // Closed by the final read.
            } else if !stream.can_reuse_connection()
                || self.next_state.is_some()
                || self.close_connection_on_destruction
            {
                stream.close(true);
            } else if stream.is_response_body_complete() {
                stream.close(false);
            } else {
                stream.drain(&self.session);
            }
        }
        if let Some(body) = self
            .request
            .as_mut()
            .and_then(|request| request.upload_data_stream.as_deref_mut())
        {
            body.reset();
        }
    }
}

impl std::fmt::Debug for HttpNetworkTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNetworkTransaction")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("next_state", &self.next_state)
            .field("headers_valid", &self.headers_valid)
            .field("pending_auth_target", &self.pending_auth_target)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// `host[:port]` with the port omitted when it is the scheme default.
fn host_and_optional_port(url: &Url) -> Result<HeaderValue, NetError> {
    let host = url.host_str().ok_or(NetError::InvalidUrl)?;
    let value = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).map_err(|_| NetError::InvalidUrl)
}
