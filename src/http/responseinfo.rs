use std::sync::Arc;

use super::auth::AuthChallengeInfo;
use super::connectioninfo::ConnectionInfo;
use super::responseheaders::HttpResponseHeaders;
use crate::base::neterror::ResolveErrorInfo;
use crate::proxy::ProxyChain;
use crate::ssl::{SslCertRequestInfo, SslInfo};

/// How the alternative-service race went for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlternateProtocolUsage {
    #[default]
    Unspecified,
    NoRace,
    WonRace,
    MainJobWonRace,
    MainJobOnly,
    Broken,
}

/// Everything the caller may learn about a response, filled in
/// incrementally as the transaction progresses.
#[derive(Debug, Clone, Default)]
pub struct HttpResponseInfo {
    pub headers: Option<Arc<HttpResponseHeaders>>,
    pub connection_info: ConnectionInfo,
    pub was_alpn_negotiated: bool,
    pub alpn_negotiated_protocol: String,
    pub alternate_protocol_usage: AlternateProtocolUsage,
    pub was_fetched_via_spdy: bool,
    pub network_accessed: bool,
    pub unused_since_prefetch: bool,
    pub restricted_prefetch: bool,
    /// An Authorization or Proxy-Authorization header went out.
    pub did_use_http_auth: bool,
    /// Invalid until the stream provider reports its proxy decision.
    pub proxy_chain: ProxyChain,
    pub ssl_info: SslInfo,
    pub cert_request_info: Option<Arc<SslCertRequestInfo>>,
    pub auth_challenge: Option<AuthChallengeInfo>,
    pub dns_aliases: Vec<String>,
    pub resolve_error_info: ResolveErrorInfo,
}

impl HttpResponseInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> Option<&HttpResponseHeaders> {
        self.headers.as_deref()
    }

    pub fn response_code(&self) -> Option<u16> {
        self.headers.as_ref().map(|h| h.response_code())
    }

    pub fn was_fetched_via_proxy(&self) -> bool {
        self.proxy_chain.is_valid() && !self.proxy_chain.is_direct()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::responseheaders::HttpVersion;
    use crate::proxy::ProxyServer;

    #[test]
    fn test_default_has_no_headers() {
        let info = HttpResponseInfo::new();
        assert!(info.headers().is_none());
        assert_eq!(info.response_code(), None);
        assert!(!info.was_fetched_via_proxy());
    }

    #[test]
    fn test_fetched_via_proxy() {
        let mut info = HttpResponseInfo::new();
        info.proxy_chain = ProxyChain::direct();
        assert!(!info.was_fetched_via_proxy());

        info.proxy_chain = ProxyChain::single(ProxyServer::from_uri("http://p:8080").unwrap());
        assert!(info.was_fetched_via_proxy());
    }

    #[test]
    fn test_response_code() {
        let mut info = HttpResponseInfo::new();
        info.headers = Some(Arc::new(HttpResponseHeaders::new(HttpVersion::HTTP_1_1, 204)));
        assert_eq!(info.response_code(), Some(204));
    }
}
