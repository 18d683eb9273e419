use std::net::SocketAddr;

use crate::http::connectioninfo::NextProto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Connected straight to the origin.
    Direct,
    /// Connected through at least one proxy.
    Proxied,
}

/// Describes the transport handed to the connected hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub transport_type: TransportType,
    pub endpoint: SocketAddr,
    /// Accept-CH value received via ALPS, empty when none.
    pub accept_ch_frame: String,
    pub cert_is_issued_by_known_root: bool,
    pub negotiated_protocol: NextProto,
}
