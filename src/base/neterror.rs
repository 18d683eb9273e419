use thiserror::Error;

use crate::http::connectioninfo::ConnectionInfo;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Generic Errors
    #[error("Operation pending")]
    IoPending,
    #[error("Generic failure")]
    Failed,
    #[error("Operation aborted")]
    Aborted,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Operation timed out")]
    TimedOut,
    #[error("Unexpected error")]
    Unexpected,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("SSL client auth cert needed")]
    SslClientAuthCertNeeded,
    #[error("Tunnel connection failed")]
    TunnelConnectionFailed,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Bad SSL client auth cert")]
    BadSslClientAuthCert,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Proxy auth requested")]
    ProxyAuthRequested,
    #[error("SSL client auth private key access denied")]
    SslClientAuthPrivateKeyAccessDenied,
    #[error("SSL client auth cert no private key")]
    SslClientAuthCertNoPrivateKey,
    #[error("SSL client auth signature failed")]
    SslClientAuthSignatureFailed,
    #[error("SSL client auth no common algorithms")]
    SslClientAuthNoCommonAlgorithms,
    #[error("TLS early data rejected")]
    EarlyDataRejected,
    #[error("Wrong TLS version on early data")]
    WrongVersionOnEarlyData,

    // Certificate Errors
    #[error("Certificate common name invalid")]
    CertCommonNameInvalid,
    #[error("Certificate date invalid")]
    CertDateInvalid,
    #[error("Certificate authority invalid")]
    CertAuthorityInvalid,
    #[error("Certificate revoked")]
    CertRevoked,
    #[error("Certificate invalid")]
    CertInvalid,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Method not supported")]
    MethodNotSupported,
    #[error("Unexpected proxy auth")]
    UnexpectedProxyAuth,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Content decoding failed")]
    ContentDecodingFailed,
    #[error("HTTP/2 protocol error")]
    Http2ProtocolError,
    #[error("Response body too big to drain")]
    ResponseBodyTooBigToDrain,
    #[error("HTTP/2 server refused stream")]
    Http2ServerRefusedStream,
    #[error("HTTP/2 ping failed")]
    Http2PingFailed,
    #[error("QUIC protocol error")]
    QuicProtocolError,
    #[error("QUIC handshake failed")]
    QuicHandshakeFailed,
    #[error("HTTP/1.1 required")]
    Http11Required,
    #[error("Proxy HTTP/1.1 required")]
    ProxyHttp11Required,
    #[error("Too many retries")]
    TooManyRetries,
    #[error("QUIC GOAWAY, request can be retried")]
    QuicGoawayRequestCanBeRetried,

    // Cache Errors
    #[error("Cache miss")]
    CacheMiss,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::IoPending => -1,
            NetError::Failed => -2,
            NetError::Aborted => -3,
            NetError::InvalidArgument => -4,
            NetError::TimedOut => -7,
            NetError::Unexpected => -9,
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::SslClientAuthCertNeeded => -110,
            NetError::TunnelConnectionFailed => -111,
            NetError::SocketNotConnected => -112,
            NetError::BadSslClientAuthCert => -117,
            NetError::ConnectionTimedOut => -118,
            NetError::ProxyAuthRequested => -127,
            NetError::SslClientAuthPrivateKeyAccessDenied => -134,
            NetError::SslClientAuthCertNoPrivateKey => -135,
            NetError::SslClientAuthSignatureFailed => -141,
            NetError::SslClientAuthNoCommonAlgorithms => -177,
            NetError::EarlyDataRejected => -178,
            NetError::WrongVersionOnEarlyData => -179,
            NetError::CertCommonNameInvalid => -200,
            NetError::CertDateInvalid => -201,
            NetError::CertAuthorityInvalid => -202,
            NetError::CertRevoked => -206,
            NetError::CertInvalid => -207,
            NetError::InvalidUrl => -300,
            NetError::InvalidResponse => -320,
            NetError::MethodNotSupported => -322,
            NetError::UnexpectedProxyAuth => -323,
            NetError::EmptyResponse => -324,
            NetError::ContentDecodingFailed => -330,
            NetError::Http2ProtocolError => -337,
            NetError::ResponseBodyTooBigToDrain => -345,
            NetError::Http2ServerRefusedStream => -351,
            NetError::Http2PingFailed => -352,
            NetError::QuicProtocolError => -356,
            NetError::QuicHandshakeFailed => -358,
            NetError::Http11Required => -365,
            NetError::ProxyHttp11Required => -366,
            NetError::TooManyRetries => -375,
            NetError::QuicGoawayRequestCanBeRetried => -381,
            NetError::CacheMiss => -400,
            NetError::Unknown(code) => *code,
        }
    }

    /// Certificate verification failures (`ERR_CERT_BEGIN..ERR_CERT_END`).
    pub fn is_certificate_error(&self) -> bool {
        let code = self.as_i32();
        (-299..=-200).contains(&code)
    }

    /// Errors that mean the client certificate (not the server's) is at fault.
    pub fn is_client_certificate_error(&self) -> bool {
        matches!(
            self,
            NetError::BadSslClientAuthCert
                | NetError::SslClientAuthPrivateKeyAccessDenied
                | NetError::SslClientAuthCertNoPrivateKey
                | NetError::SslClientAuthSignatureFailed
                | NetError::SslClientAuthNoCommonAlgorithms
        )
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -1 => NetError::IoPending,
            -2 => NetError::Failed,
            -3 => NetError::Aborted,
            -4 => NetError::InvalidArgument,
            -7 => NetError::TimedOut,
            -9 => NetError::Unexpected,
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -107 => NetError::SslProtocolError,
            -110 => NetError::SslClientAuthCertNeeded,
            -111 => NetError::TunnelConnectionFailed,
            -112 => NetError::SocketNotConnected,
            -117 => NetError::BadSslClientAuthCert,
            -118 => NetError::ConnectionTimedOut,
            -127 => NetError::ProxyAuthRequested,
            -134 => NetError::SslClientAuthPrivateKeyAccessDenied,
            -135 => NetError::SslClientAuthCertNoPrivateKey,
            -141 => NetError::SslClientAuthSignatureFailed,
            -177 => NetError::SslClientAuthNoCommonAlgorithms,
            -178 => NetError::EarlyDataRejected,
            -179 => NetError::WrongVersionOnEarlyData,
            -200 => NetError::CertCommonNameInvalid,
            -201 => NetError::CertDateInvalid,
            -202 => NetError::CertAuthorityInvalid,
            -206 => NetError::CertRevoked,
            -207 => NetError::CertInvalid,
            -300 => NetError::InvalidUrl,
            -320 => NetError::InvalidResponse,
            -322 => NetError::MethodNotSupported,
            -323 => NetError::UnexpectedProxyAuth,
            -324 => NetError::EmptyResponse,
            -330 => NetError::ContentDecodingFailed,
            -337 => NetError::Http2ProtocolError,
            -345 => NetError::ResponseBodyTooBigToDrain,
            -351 => NetError::Http2ServerRefusedStream,
            -352 => NetError::Http2PingFailed,
            -356 => NetError::QuicProtocolError,
            -358 => NetError::QuicHandshakeFailed,
            -365 => NetError::Http11Required,
            -366 => NetError::ProxyHttp11Required,
            -375 => NetError::TooManyRetries,
            -381 => NetError::QuicGoawayRequestCanBeRetried,
            -400 => NetError::CacheMiss,
            _ => NetError::Unknown(code),
        }
    }
}

/// Extra context about a failed request, filled by the stream and its provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetErrorDetails {
    /// The provider reported QUIC as broken for this origin.
    pub quic_broken: bool,
    /// QUIC connection close code, when the failure came from a QUIC session.
    pub quic_connection_error: Option<u64>,
    pub connection_info: ConnectionInfo,
}

/// Outcome of the host resolution step of a failed stream request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveErrorInfo {
    pub error: Option<NetError>,
    pub is_secure_network_error: bool,
}
