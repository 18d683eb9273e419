//! Origin identity types: `HostPortPair` and `SchemeHostPort`.

use std::fmt;
use url::Url;

/// A host and port, the key for per-server TLS state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostPortPair {
    host: String,
    port: u16,
}

impl HostPortPair {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// Extract host and port from a URL, using the scheme's default port.
    pub fn from_url(url: &Url) -> Option<Self> {
        Some(Self::new(url.host_str()?, url.port_or_known_default()?))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Host suitable for a `Host` header: IPv6 literals keep their brackets.
    pub fn host_for_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for HostPortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_for_url(), self.port)
    }
}

/// A (scheme, host, port) origin triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemeHostPort {
    scheme: String,
    host: String,
    port: u16,
}

impl SchemeHostPort {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    pub fn from_url(url: &Url) -> Option<Self> {
        Some(Self::new(
            url.scheme(),
            url.host_str()?,
            url.port_or_known_default()?,
        ))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host_port_pair(&self) -> HostPortPair {
        HostPortPair::new(self.host.clone(), self.port)
    }
}

impl fmt::Display for SchemeHostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
