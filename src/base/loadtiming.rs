use std::time::Instant;

/// Connection setup timings reported by the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectTiming {
    pub domain_lookup_start: Option<Instant>,
    pub domain_lookup_end: Option<Instant>,
    pub connect_start: Option<Instant>,
    pub connect_end: Option<Instant>,
    pub ssl_start: Option<Instant>,
    pub ssl_end: Option<Instant>,
}

/// Timing breakdown of one attempt (mirrors net/base/load_timing_info.h).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadTimingInfo {
    /// The connection was reused, so `connect_timing` is empty.
    pub socket_reused: bool,
    pub connect_timing: ConnectTiming,
    pub proxy_resolve_start: Option<Instant>,
    pub proxy_resolve_end: Option<Instant>,
    pub send_start: Option<Instant>,
    pub send_end: Option<Instant>,
    pub receive_headers_start: Option<Instant>,
    pub receive_headers_end: Option<Instant>,
}
