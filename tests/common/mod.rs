//! Scripted collaborators shared by the integration tests.
//!
//! A [`MockStreamFactory`] hands out one [`MockStreamRequest`] per stream
//! request, each replaying a queued list of [`StreamRequestEvent`]s. Streams
//! are [`MockStream`]s built from a script of response heads and body chunks;
//! everything they see is recorded in a [`SharedLog`].

#![allow(dead_code)]

use bytes::Bytes;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

use httpdriver::base::loadstate::LoadState;
use httpdriver::base::networkkey::NetworkAnonymizationKey;
use httpdriver::base::neterror::NetError;
use httpdriver::base::priority::RequestPriority;
use httpdriver::http::auth::{AuthController, AuthControllerFactory, HttpAuthTarget};
use httpdriver::http::authcontroller::HttpAuthControllerFactory;
use httpdriver::http::connectioninfo::{ConnectionInfo, NextProto};
use httpdriver::http::requestheaders::HttpRequestHeaders;
use httpdriver::http::requestinfo::HttpRequestInfo;
use httpdriver::http::responseheaders::{HttpResponseHeaders, HttpVersion};
use httpdriver::http::responseinfo::HttpResponseInfo;
use httpdriver::http::serverproperties::AlternativeService;
use httpdriver::http::session::{HttpNetworkSession, HttpNetworkSessionParams};
use httpdriver::http::stream::{HttpStream, RequestHeadersCallback, StreamFuture};
use httpdriver::http::streamfactory::{
    ConnectionAttempt, HttpStreamFactory, HttpStreamRequest, StreamRequestEvent,
    StreamRequestParams, WebSocketHandshakeStreamCreateHelper,
};
use httpdriver::http::transaction::HttpNetworkTransaction;
use httpdriver::http::uploaddatastream::UploadDataStream;
use httpdriver::proxy::ProxyInfo;
use httpdriver::ssl::{SslCertRequestInfo, SslInfo};

/// Bytes accounted for every response head a stream reads.
pub const HEADER_BYTES: u64 = 64;

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn response(code: u16) -> HttpResponseHeaders {
    HttpResponseHeaders::new(HttpVersion::HTTP_1_1, code)
}

pub fn endpoint() -> SocketAddr {
    "10.0.0.1:443".parse().unwrap()
}

// ----------------------------------------------------------------------
// Streams
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub stream_id: usize,
    pub headers: HttpRequestHeaders,
    pub body: Vec<u8>,
    /// What the stream had received before this request went out.
    pub received_bytes_before_send: u64,
}

#[derive(Debug, Default)]
pub struct StreamLog {
    next_id: usize,
    pub sent: Vec<SentRequest>,
    /// `(stream id, not_reusable)` per `close` call.
    pub closed: Vec<(usize, bool)>,
    pub drained: Vec<usize>,
    pub marked_reused: Vec<usize>,
    /// `(stream id, can_send_early_data)` per `initialize_stream` call.
    pub initialized: Vec<(usize, bool)>,
    pub priorities: Vec<(usize, RequestPriority)>,
}

#[derive(Debug, Clone, Default)]
pub struct SharedLog(Arc<Mutex<StreamLog>>);

impl SharedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> MutexGuard<'_, StreamLog> {
        lock(&self.0)
    }

    fn next_id(&self) -> usize {
        let mut log = self.get();
        log.next_id += 1;
        log.next_id
    }
}

type HeadersStep = (Option<HttpResponseHeaders>, Result<(), NetError>);

pub struct MockStream {
    id: usize,
    log: SharedLog,
    init_result: Result<(), NetError>,
    send_result: Result<(), NetError>,
    responses: VecDeque<HeadersStep>,
    body: VecDeque<Result<Bytes, NetError>>,
    connection_info: ConnectionInfo,
    reused: bool,
    reusable: bool,
    /// A body read failed; the body never completes.
    body_failed: bool,
    /// Reads past the queued chunks return `Ok(0)` without completing.
    truncated: bool,
    /// The first body read never resolves.
    stall_first_read: bool,
    renewed: Option<Box<MockStream>>,
    alternative_service: Option<AlternativeService>,
    endpoint: Result<SocketAddr, NetError>,
    ssl_info: Option<SslInfo>,
    cert_request: Option<Arc<SslCertRequestInfo>>,
    accept_ch: String,
    received_bytes: u64,
    sent_bytes: u64,
    request_headers_callback: Option<RequestHeadersCallback>,
}

impl MockStream {
    pub fn new(log: &SharedLog) -> Self {
        Self {
            id: log.next_id(),
            log: log.clone(),
            init_result: Ok(()),
            send_result: Ok(()),
            responses: VecDeque::new(),
            body: VecDeque::new(),
            connection_info: ConnectionInfo::Http11,
            reused: false,
            reusable: true,
            body_failed: false,
            truncated: false,
            stall_first_read: false,
            renewed: None,
            alternative_service: None,
            endpoint: Ok(endpoint()),
            ssl_info: None,
            cert_request: None,
            accept_ch: String::new(),
            received_bytes: 0,
            sent_bytes: 0,
            request_headers_callback: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn response(mut self, headers: HttpResponseHeaders) -> Self {
        self.responses.push_back((Some(headers), Ok(())));
        self
    }

    pub fn headers_error(mut self, error: NetError) -> Self {
        self.responses.push_back((None, Err(error)));
        self
    }

    /// Store `headers` and still fail the read.
    pub fn partial_headers(mut self, headers: HttpResponseHeaders, error: NetError) -> Self {
        self.responses.push_back((Some(headers), Err(error)));
        self
    }

    pub fn body(mut self, chunk: &[u8]) -> Self {
        self.body.push_back(Ok(Bytes::copy_from_slice(chunk)));
        self
    }

    pub fn body_error(mut self, error: NetError) -> Self {
        self.body.push_back(Err(error));
        self
    }

    /// The peer closes after the queued chunks, before the body ends.
    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn stall_first_read(mut self) -> Self {
        self.stall_first_read = true;
        self
    }

    pub fn init_error(mut self, error: NetError) -> Self {
        self.init_result = Err(error);
        self
    }

    pub fn send_error(mut self, error: NetError) -> Self {
        self.send_result = Err(error);
        self
    }

    pub fn connection_info(mut self, info: ConnectionInfo) -> Self {
        self.connection_info = info;
        self
    }

    pub fn reused(mut self) -> Self {
        self.reused = true;
        self
    }

    pub fn not_reusable(mut self) -> Self {
        self.reusable = false;
        self
    }

    pub fn renews_to(mut self, stream: MockStream) -> Self {
        self.renewed = Some(Box::new(stream));
        self
    }

    pub fn alternative_service(mut self, service: AlternativeService) -> Self {
        self.alternative_service = Some(service);
        self
    }

    pub fn endpoint_error(mut self, error: NetError) -> Self {
        self.endpoint = Err(error);
        self
    }

    pub fn ssl_info(mut self, info: SslInfo) -> Self {
        self.ssl_info = Some(info);
        self
    }

    /// Ask for a client certificate while reading the response head.
    pub fn requests_client_cert(mut self, info: SslCertRequestInfo) -> Self {
        self.cert_request = Some(Arc::new(info));
        self.headers_error(NetError::SslClientAuthCertNeeded)
    }

    pub fn accept_ch(mut self, value: &str) -> Self {
        self.accept_ch = value.to_string();
        self
    }
}

impl HttpStream for MockStream {
    fn initialize_stream(
        &mut self,
        can_send_early_data: bool,
        _priority: RequestPriority,
    ) -> StreamFuture<'_, Result<(), NetError>> {
        self.log.get().initialized.push((self.id, can_send_early_data));
        let result = self.init_result;
        Box::pin(async move { result })
    }

    fn send_request<'a>(
        &'a mut self,
        headers: &'a HttpRequestHeaders,
        body: Option<&'a mut (dyn UploadDataStream + 'static)>,
        _response: &'a mut HttpResponseInfo,
    ) -> StreamFuture<'a, Result<(), NetError>> {
        Box::pin(async move {
            let mut sent_body = Vec::new();
            if let Some(body) = body {
                let mut buf = [0u8; 256];
                while !body.is_eof() {
                    let n = body.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    sent_body.extend_from_slice(&buf[..n]);
                }
            }
            if let Some(callback) = self.request_headers_callback.as_ref() {
                callback(headers);
            }
            self.sent_bytes += (headers.wire_len() + sent_body.len()) as u64;
            self.log.get().sent.push(SentRequest {
                stream_id: self.id,
                headers: headers.clone(),
                body: sent_body,
                received_bytes_before_send: self.received_bytes,
            });
            self.send_result
        })
    }

    fn read_response_headers<'a>(
        &'a mut self,
        response: &'a mut HttpResponseInfo,
    ) -> StreamFuture<'a, Result<(), NetError>> {
        Box::pin(async move {
            let Some((headers, result)) = self.responses.pop_front() else {
                return Err(NetError::ConnectionClosed);
            };
            if let Some(headers) = headers {
                self.received_bytes += HEADER_BYTES;
                response.headers = Some(Arc::new(headers));
                response.connection_info = self.connection_info;
            }
            result
        })
    }

    fn read_response_body<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> StreamFuture<'a, Result<usize, NetError>> {
        Box::pin(async move {
            if self.stall_first_read {
                self.stall_first_read = false;
                std::future::pending::<()>().await;
            }
            match self.body.pop_front() {
                None => Ok(0),
                Some(Err(e)) => {
                    self.body_failed = true;
                    Err(e)
                }
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.body.push_front(Ok(chunk.split_off(n)));
                    }
                    self.received_bytes += n as u64;
                    Ok(n)
                }
            }
        })
    }

    fn close(&mut self, not_reusable: bool) {
        self.log.get().closed.push((self.id, not_reusable));
    }

    fn drain(self: Box<Self>, _session: &HttpNetworkSession) {
        self.log.get().drained.push(self.id);
    }

    fn renew_stream_for_auth(&mut self) -> Option<Box<dyn HttpStream>> {
        self.renewed
            .take()
            .map(|stream| stream as Box<dyn HttpStream>)
    }

    fn is_response_body_complete(&self) -> bool {
        self.body.is_empty() && !self.body_failed && !self.truncated
    }

    fn is_connection_reused(&self) -> bool {
        self.reused
    }

    fn set_connection_reused(&mut self) {
        self.reused = true;
        self.log.get().marked_reused.push(self.id);
    }

    fn can_reuse_connection(&self) -> bool {
        self.reusable
    }

    fn total_received_bytes(&self) -> u64 {
        self.received_bytes
    }

    fn total_sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    fn set_priority(&mut self, priority: RequestPriority) {
        self.log.get().priorities.push((self.id, priority));
    }

    fn remote_endpoint(&self) -> Result<SocketAddr, NetError> {
        self.endpoint
    }

    fn ssl_info(&self) -> Option<SslInfo> {
        self.ssl_info.clone()
    }

    fn ssl_cert_request_info(&self) -> Option<Arc<SslCertRequestInfo>> {
        self.cert_request.clone()
    }

    fn alternative_service(&self) -> Option<AlternativeService> {
        self.alternative_service.clone()
    }

    fn accept_ch_via_alps(&self) -> String {
        self.accept_ch.clone()
    }

    fn set_request_headers_callback(&mut self, callback: Option<RequestHeadersCallback>) {
        self.request_headers_callback = callback;
    }
}

// ----------------------------------------------------------------------
// Stream provider
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub url: Url,
    pub priority: RequestPriority,
    pub allowed_bad_certs: usize,
    pub enable_ip_based_pooling: bool,
    pub enable_alternative_services: bool,
    pub websocket: bool,
}

#[derive(Debug, Default)]
pub struct FactoryLog {
    pub requests: Vec<RequestRecord>,
    pub tunnel_restarts: usize,
    pub alt_svc_processed: usize,
}

pub struct MockStreamRequest {
    events: VecDeque<StreamRequestEvent>,
    attempts: Vec<ConnectionAttempt>,
    negotiated_protocol: NextProto,
    log: Arc<Mutex<FactoryLog>>,
}

impl HttpStreamRequest for MockStreamRequest {
    fn next_event(&mut self) -> StreamFuture<'_, StreamRequestEvent> {
        let event = self.events.pop_front().unwrap_or_else(|| failed(NetError::Failed));
        Box::pin(async move { event })
    }

    fn restart_tunnel_with_proxy_auth(&mut self) -> Result<(), NetError> {
        lock(&self.log).tunnel_restarts += 1;
        Ok(())
    }

    fn set_priority(&mut self, _priority: RequestPriority) {}

    fn load_state(&self) -> LoadState {
        LoadState::Connecting
    }

    fn negotiated_protocol(&self) -> NextProto {
        self.negotiated_protocol
    }

    fn connection_attempts(&self) -> Vec<ConnectionAttempt> {
        self.attempts.clone()
    }
}

struct Script {
    events: Vec<StreamRequestEvent>,
    attempts: Vec<ConnectionAttempt>,
    negotiated_protocol: NextProto,
}

type Fallback = Box<dyn Fn() -> Vec<StreamRequestEvent> + Send + Sync>;

#[derive(Default)]
pub struct MockStreamFactory {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Mutex<Option<Fallback>>,
    log: Arc<Mutex<FactoryLog>>,
}

impl MockStreamFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the events for the next stream request.
    pub fn push(&self, events: Vec<StreamRequestEvent>) {
        self.push_script(events, Vec::new(), NextProto::Unknown);
    }

    pub fn push_ready(&self, stream: MockStream) {
        self.push(vec![ready(stream)]);
    }

    pub fn push_script(
        &self,
        events: Vec<StreamRequestEvent>,
        attempts: Vec<ConnectionAttempt>,
        negotiated_protocol: NextProto,
    ) {
        lock(&self.scripts).push_back(Script {
            events,
            attempts,
            negotiated_protocol,
        });
    }

    /// Events for every request once the queue runs dry.
    pub fn set_fallback(&self, fallback: impl Fn() -> Vec<StreamRequestEvent> + Send + Sync + 'static) {
        *lock(&self.fallback) = Some(Box::new(fallback));
    }

    pub fn log(&self) -> MutexGuard<'_, FactoryLog> {
        lock(&self.log)
    }

    pub fn request_count(&self) -> usize {
        self.log().requests.len()
    }

    fn next_request(&self, params: &StreamRequestParams<'_>, websocket: bool) -> Box<dyn HttpStreamRequest> {
        self.log().requests.push(RequestRecord {
            url: params.request.url.clone(),
            priority: params.priority,
            allowed_bad_certs: params.allowed_bad_certs.len(),
            enable_ip_based_pooling: params.enable_ip_based_pooling,
            enable_alternative_services: params.enable_alternative_services,
            websocket,
        });
        let script = lock(&self.scripts).pop_front().unwrap_or_else(|| Script {
            events: lock(&self.fallback)
                .as_ref()
                .map(|fallback| fallback())
                .unwrap_or_default(),
            attempts: Vec::new(),
            negotiated_protocol: NextProto::Unknown,
        });
        Box::new(MockStreamRequest {
            events: script.events.into(),
            attempts: script.attempts,
            negotiated_protocol: script.negotiated_protocol,
            log: Arc::clone(&self.log),
        })
    }
}

impl HttpStreamFactory for MockStreamFactory {
    fn request_stream(&self, params: StreamRequestParams<'_>) -> Box<dyn HttpStreamRequest> {
        self.next_request(&params, false)
    }

    fn request_websocket_handshake_stream(
        &self,
        params: StreamRequestParams<'_>,
        _helper: Arc<dyn WebSocketHandshakeStreamCreateHelper>,
    ) -> Box<dyn HttpStreamRequest> {
        self.next_request(&params, true)
    }

    fn process_alternative_services(
        &self,
        _headers: &HttpResponseHeaders,
        _origin: &httpdriver::base::hostportpair::SchemeHostPort,
        _key: &NetworkAnonymizationKey,
    ) {
        self.log().alt_svc_processed += 1;
    }
}

pub struct WebSocketHelper;

impl WebSocketHandshakeStreamCreateHelper for WebSocketHelper {}

// ----------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------

/// Records which controllers the transaction asked for.
#[derive(Default)]
pub struct CountingAuthFactory {
    inner: HttpAuthControllerFactory,
    pub created: Mutex<Vec<HttpAuthTarget>>,
}

impl AuthControllerFactory for CountingAuthFactory {
    fn create_auth_controller(
        &self,
        target: HttpAuthTarget,
        auth_url: &Url,
        key: &NetworkAnonymizationKey,
    ) -> Arc<dyn AuthController> {
        lock(&self.created).push(target);
        self.inner.create_auth_controller(target, auth_url, key)
    }
}

// ----------------------------------------------------------------------
// Events and sessions
// ----------------------------------------------------------------------

pub fn ready(stream: MockStream) -> StreamRequestEvent {
    ready_via(ProxyInfo::direct(), stream)
}

pub fn ready_via(proxy_info: ProxyInfo, stream: MockStream) -> StreamRequestEvent {
    StreamRequestEvent::StreamReady {
        proxy_info,
        stream: Box::new(stream),
    }
}

pub fn failed(error: NetError) -> StreamRequestEvent {
    StreamRequestEvent::StreamFailed {
        error,
        details: Default::default(),
        proxy_info: ProxyInfo::direct(),
        resolve_error_info: Default::default(),
    }
}

pub fn session(factory: &Arc<MockStreamFactory>) -> Arc<HttpNetworkSession> {
    HttpNetworkSession::builder(factory.clone()).build()
}

pub fn session_with_params(
    factory: &Arc<MockStreamFactory>,
    params: HttpNetworkSessionParams,
) -> Arc<HttpNetworkSession> {
    HttpNetworkSession::builder(factory.clone())
        .with_params(params)
        .build()
}

pub fn transaction(session: &Arc<HttpNetworkSession>) -> HttpNetworkTransaction {
    HttpNetworkTransaction::new(RequestPriority::Medium, Arc::clone(session))
}

pub fn get(s: &str) -> HttpRequestInfo {
    HttpRequestInfo::get(url(s))
}

/// Read the body to the end.
pub async fn read_all(trans: &mut HttpNetworkTransaction) -> Result<Vec<u8>, NetError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 16];
    loop {
        let n = trans.read(&mut buf).await?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}
