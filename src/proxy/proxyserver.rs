use std::fmt;
use url::Url;

use crate::base::hostportpair::HostPortPair;

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyScheme {
    /// HTTP proxy (CONNECT for HTTPS)
    Http,
    /// HTTPS proxy (TLS to proxy)
    Https,
    /// QUIC proxy
    Quic,
    Socks4,
    Socks5,
}

impl ProxyScheme {
    fn default_port(self) -> u16 {
        match self {
            ProxyScheme::Http => 80,
            ProxyScheme::Https | ProxyScheme::Quic => 443,
            ProxyScheme::Socks4 | ProxyScheme::Socks5 => 1080,
        }
    }
}

/// One hop of a proxy chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyServer {
    scheme: ProxyScheme,
    host_port: HostPortPair,
}

impl ProxyServer {
    pub fn new(scheme: ProxyScheme, host_port: HostPortPair) -> Self {
        Self { scheme, host_port }
    }

    /// Parse a proxy URI such as `http://proxy.com:8080` or `socks5://10.0.0.1`.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let url = Url::parse(uri).ok()?;
        let scheme = match url.scheme() {
            "http" => ProxyScheme::Http,
            "https" => ProxyScheme::Https,
            "quic" => ProxyScheme::Quic,
            "socks4" | "socks4a" => ProxyScheme::Socks4,
            "socks5" | "socks5h" => ProxyScheme::Socks5,
            _ => return None,
        };
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Some(Self::new(scheme, HostPortPair::new(url.host_str()?, port)))
    }

    pub fn scheme(&self) -> ProxyScheme {
        self.scheme
    }

    pub fn host_port_pair(&self) -> &HostPortPair {
        &self.host_port
    }

    pub fn is_http(&self) -> bool {
        self.scheme == ProxyScheme::Http
    }

    pub fn is_https(&self) -> bool {
        self.scheme == ProxyScheme::Https
    }

    /// Speaks HTTP to the proxy itself (CONNECT tunnels, GET-to-proxy).
    pub fn is_http_like(&self) -> bool {
        matches!(
            self.scheme,
            ProxyScheme::Http | ProxyScheme::Https | ProxyScheme::Quic
        )
    }

    pub fn is_secure_http_like(&self) -> bool {
        matches!(self.scheme, ProxyScheme::Https | ProxyScheme::Quic)
    }
}

impl fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Quic => "quic",
            ProxyScheme::Socks4 => "socks4",
            ProxyScheme::Socks5 => "socks5",
        };
        write!(f, "{}://{}", scheme, self.host_port)
    }
}
