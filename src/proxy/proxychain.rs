use std::fmt;

use super::proxyserver::{ProxyScheme, ProxyServer};

/// An ordered list of proxies, first hop first. An empty valid chain is DIRECT.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProxyChain {
    servers: Vec<ProxyServer>,
    valid: bool,
}

impl ProxyChain {
    pub fn direct() -> Self {
        Self {
            servers: Vec::new(),
            valid: true,
        }
    }

    pub fn single(server: ProxyServer) -> Self {
        Self::multi(vec![server])
    }

    pub fn multi(servers: Vec<ProxyServer>) -> Self {
        Self {
            servers,
            valid: true,
        }
    }

    /// The unset chain; `Default` produces the same.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_direct(&self) -> bool {
        self.valid && self.servers.is_empty()
    }

    pub fn is_single_proxy(&self) -> bool {
        self.valid && self.servers.len() == 1
    }

    pub fn is_multi_proxy(&self) -> bool {
        self.valid && self.servers.len() > 1
    }

    pub fn servers(&self) -> &[ProxyServer] {
        &self.servers
    }

    pub fn first(&self) -> Option<&ProxyServer> {
        self.servers.first()
    }

    /// Plain `http://` URLs may be sent as absolute-form GETs to a single
    /// HTTP or HTTPS proxy instead of tunnelling.
    pub fn is_get_to_proxy_allowed(&self) -> bool {
        self.is_single_proxy()
            && matches!(
                self.servers[0].scheme(),
                ProxyScheme::Http | ProxyScheme::Https
            )
    }
}

impl fmt::Display for ProxyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "INVALID_PROXY_CHAIN");
        }
        if self.servers.is_empty() {
            return write!(f, "direct://");
        }
        let hops: Vec<String> = self.servers.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", hops.join(", "))
    }
}
