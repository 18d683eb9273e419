//! The transport stream contract (Chromium's `HttpStream`).
//!
//! One implementation per wire protocol (HTTP/1.1, HTTP/2, QUIC) lives
//! outside this crate. The transaction owns exactly one stream at a time and
//! replaces it, never mutates it, on restart.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use super::requestheaders::HttpRequestHeaders;
use super::requestinfo::{HttpRequestInfo, Idempotency};
use super::responseinfo::HttpResponseInfo;
use super::serverproperties::AlternativeService;
use super::session::HttpNetworkSession;
use super::uploaddatastream::UploadDataStream;
use crate::base::loadtiming::LoadTimingInfo;
use crate::base::neterror::{NetError, NetErrorDetails};
use crate::base::priority::RequestPriority;
use crate::ssl::{SslCertRequestInfo, SslInfo};

/// Boxed future returned by collaborator traits.
pub type StreamFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Observes the exact headers written to the wire.
pub type RequestHeadersCallback = Arc<dyn Fn(&HttpRequestHeaders) + Send + Sync>;

pub trait HttpStream: Send {
    /// Hand the request over before `initialize_stream`.
    fn register_request(&mut self, _request: &HttpRequestInfo) {}

    fn initialize_stream(
        &mut self,
        can_send_early_data: bool,
        priority: RequestPriority,
    ) -> StreamFuture<'_, Result<(), NetError>>;

    /// Write the request line, `headers` and the body.
    fn send_request<'a>(
        &'a mut self,
        headers: &'a HttpRequestHeaders,
        body: Option<&'a mut (dyn UploadDataStream + 'static)>,
        response: &'a mut HttpResponseInfo,
    ) -> StreamFuture<'a, Result<(), NetError>>;

    /// Parse the next response head into `response.headers`.
    ///
    /// On `ConnectionClosed` the stream may still have stored partial headers.
    fn read_response_headers<'a>(
        &'a mut self,
        response: &'a mut HttpResponseInfo,
    ) -> StreamFuture<'a, Result<(), NetError>>;

    /// `Ok(0)` at the end of the body.
    fn read_response_body<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> StreamFuture<'a, Result<usize, NetError>>;

    fn close(&mut self, not_reusable: bool);

    /// Give the stream to the session to drain in the background.
    fn drain(self: Box<Self>, session: &HttpNetworkSession);

    /// A fresh stream on the same connection, for the authenticated retry.
    fn renew_stream_for_auth(&mut self) -> Option<Box<dyn HttpStream>>;

    fn is_response_body_complete(&self) -> bool;

    fn is_connection_reused(&self) -> bool;

    fn set_connection_reused(&mut self);

    fn can_reuse_connection(&self) -> bool;

    fn total_received_bytes(&self) -> u64;

    fn total_sent_bytes(&self) -> u64;

    fn set_priority(&mut self, priority: RequestPriority);

    fn remote_endpoint(&self) -> Result<SocketAddr, NetError>;

    fn ssl_info(&self) -> Option<SslInfo> {
        None
    }

    /// What the server asked for when it requested a client certificate
    /// mid-connection.
    fn ssl_cert_request_info(&self) -> Option<Arc<SslCertRequestInfo>> {
        None
    }

    fn load_timing_info(&self) -> Option<LoadTimingInfo> {
        None
    }

    /// The alternative service this stream was established over, if any.
    fn alternative_service(&self) -> Option<AlternativeService> {
        None
    }

    fn dns_aliases(&self) -> Vec<String> {
        Vec::new()
    }

    /// Accept-CH received via ALPS for the connection.
    fn accept_ch_via_alps(&self) -> String {
        String::new()
    }

    fn populate_net_error_details(&self, _details: &mut NetErrorDetails) {}

    fn set_request_idempotency(&mut self, _idempotency: Idempotency) {}

    fn set_request_headers_callback(&mut self, _callback: Option<RequestHeadersCallback>) {}
}
