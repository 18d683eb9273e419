use std::time::Instant;

use super::proxychain::ProxyChain;

/// The proxy decision for one request, as reported by the stream provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyInfo {
    chain: ProxyChain,
    pub proxy_resolve_start: Option<Instant>,
    pub proxy_resolve_end: Option<Instant>,
}

impl ProxyInfo {
    /// A resolved DIRECT decision.
    pub fn direct() -> Self {
        Self::from_chain(ProxyChain::direct())
    }

    pub fn from_chain(chain: ProxyChain) -> Self {
        Self {
            chain,
            proxy_resolve_start: None,
            proxy_resolve_end: None,
        }
    }

    pub fn use_direct(&mut self) {
        self.chain = ProxyChain::direct();
    }

    pub fn use_proxy_chain(&mut self, chain: ProxyChain) {
        self.chain = chain;
    }

    /// Nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        !self.chain.is_valid()
    }

    pub fn is_direct(&self) -> bool {
        self.chain.is_direct()
    }

    pub fn proxy_chain(&self) -> &ProxyChain {
        &self.chain
    }
}
