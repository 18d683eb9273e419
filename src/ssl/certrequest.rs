use crate::base::hostportpair::HostPortPair;

/// A server (or proxy) asked for a client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslCertRequestInfo {
    /// The party that asked; the key under which the answer is stored.
    pub host_and_port: Option<HostPortPair>,
    /// The request came from a proxy rather than the origin.
    pub is_proxy: bool,
    /// DER-encoded distinguished names of acceptable CAs.
    pub cert_authorities: Vec<Vec<u8>>,
    /// TLS SignatureScheme values the server accepts.
    pub signature_algorithms: Vec<u16>,
}

impl SslCertRequestInfo {
    pub fn new(host_and_port: HostPortPair, is_proxy: bool) -> Self {
        Self {
            host_and_port: Some(host_and_port),
            is_proxy,
            ..Default::default()
        }
    }
}
