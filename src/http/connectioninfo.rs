//! Negotiated protocol descriptors (net/socket/next_proto.h and
//! net/http/http_connection_info.h).

use serde::{Deserialize, Serialize};

/// ALPN protocol negotiated for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NextProto {
    #[default]
    Unknown,
    Http11,
    Http2,
    Quic,
}

impl NextProto {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextProto::Unknown => "unknown",
            NextProto::Http11 => "http/1.1",
            NextProto::Http2 => "h2",
            NextProto::Quic => "h3",
        }
    }

    pub fn from_alpn(alpn: &str) -> Self {
        match alpn {
            "http/1.1" => NextProto::Http11,
            "h2" => NextProto::Http2,
            "h3" => NextProto::Quic,
            _ => NextProto::Unknown,
        }
    }
}

/// Wire protocol the response actually arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionInfo {
    #[default]
    Unknown,
    Http09,
    Http10,
    Http11,
    Http2,
    Quic,
}

/// Coarse buckets of [`ConnectionInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionInfoCoarse {
    Http1,
    Http2,
    Quic,
    Other,
}

impl ConnectionInfo {
    pub fn coarse(&self) -> ConnectionInfoCoarse {
        match self {
            ConnectionInfo::Http09 | ConnectionInfo::Http10 | ConnectionInfo::Http11 => {
                ConnectionInfoCoarse::Http1
            }
            ConnectionInfo::Http2 => ConnectionInfoCoarse::Http2,
            ConnectionInfo::Quic => ConnectionInfoCoarse::Quic,
            ConnectionInfo::Unknown => ConnectionInfoCoarse::Other,
        }
    }

    /// Multiplexed protocols never need a resend after a 408.
    pub fn is_multiplexed(&self) -> bool {
        matches!(self, ConnectionInfo::Http2 | ConnectionInfo::Quic)
    }
}
