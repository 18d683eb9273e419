//! Proxy value types.
//!
//! Mirrors Chromium's `net/base/proxy_server.h`, `proxy_chain.h` and
//! `net/proxy_resolution/proxy_info.h`. Resolution itself belongs to the
//! stream factory; the transaction only reads the outcome.

pub mod proxychain;
pub mod proxyinfo;
pub mod proxyserver;

pub use proxychain::ProxyChain;
pub use proxyinfo::ProxyInfo;
pub use proxyserver::{ProxyScheme, ProxyServer};
