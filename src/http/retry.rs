//! Transport-error classification and the retry/restart budgets.
//!
//! Based on Chromium's `HttpNetworkTransaction::RetryReason` enum and
//! `GetRetryReasonForIOError`.
//! See: net/http/http_network_transaction.h

use crate::base::neterror::NetError;

/// Transport-error retries allowed per transaction.
pub const MAX_RETRY_ATTEMPTS: u32 = 2;

/// Caller-initiated restarts (auth, certificate, ignore-last-error) allowed
/// per transaction.
pub const MAX_RESTARTS: u32 = 32;

/// Why a request was sent again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryReason {
    ConnectionReset,
    ConnectionClosed,
    ConnectionAborted,
    /// The FIN raced with the pool's liveness check on a reused socket.
    SocketNotConnected,
    EmptyResponse,
    EarlyDataRejected,
    WrongVersionOnEarlyData,
    Http2PingFailed,
    Http2ServerRefusedStream,
    QuicHandshakeFailed,
    QuicGoawayRequestCanBeRetried,
    QuicProtocolError,

    // Never produced by `from_io_error`.
    Http11Required,
    HttpMisdirectedRequest,
    HttpRequestTimeout,
    SslClientAuthSignatureFailed,
}

/// What must hold before a given reason is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Only on a reused connection that has not produced response headers.
    /// Free: does not touch the retry budget.
    IfConnectionReused,
    /// Always, with early data turned off for the resend.
    WithoutEarlyData,
    /// While retry attempts remain.
    Budgeted,
    /// While retry attempts remain, before any headers, and only when an
    /// alternative service was used.
    AlternativeServiceFallback,
    /// Server-driven renegotiation; always resent, never budgeted.
    Always,
}

impl RetryReason {
    /// Map a transport error to a retry reason, if the error may be transient.
    pub fn from_io_error(error: NetError) -> Option<Self> {
        match error {
            NetError::ConnectionReset => Some(Self::ConnectionReset),
            NetError::ConnectionClosed => Some(Self::ConnectionClosed),
            NetError::ConnectionAborted => Some(Self::ConnectionAborted),
            NetError::SocketNotConnected => Some(Self::SocketNotConnected),
            NetError::EmptyResponse => Some(Self::EmptyResponse),
            NetError::EarlyDataRejected => Some(Self::EarlyDataRejected),
            NetError::WrongVersionOnEarlyData => Some(Self::WrongVersionOnEarlyData),
            NetError::Http2PingFailed => Some(Self::Http2PingFailed),
            NetError::Http2ServerRefusedStream => Some(Self::Http2ServerRefusedStream),
            NetError::QuicHandshakeFailed => Some(Self::QuicHandshakeFailed),
            NetError::QuicGoawayRequestCanBeRetried => Some(Self::QuicGoawayRequestCanBeRetried),
            NetError::QuicProtocolError => Some(Self::QuicProtocolError),
            _ => None,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        match self {
            Self::ConnectionReset
            | Self::ConnectionClosed
            | Self::ConnectionAborted
            | Self::SocketNotConnected
            | Self::EmptyResponse => RetryPolicy::IfConnectionReused,
            Self::EarlyDataRejected | Self::WrongVersionOnEarlyData => {
                RetryPolicy::WithoutEarlyData
            }
            Self::Http2PingFailed
            | Self::Http2ServerRefusedStream
            | Self::QuicHandshakeFailed
            | Self::QuicGoawayRequestCanBeRetried
            | Self::SslClientAuthSignatureFailed => RetryPolicy::Budgeted,
            Self::QuicProtocolError => RetryPolicy::AlternativeServiceFallback,
            Self::Http11Required | Self::HttpMisdirectedRequest | Self::HttpRequestTimeout => {
                RetryPolicy::Always
            }
        }
    }

    /// Whether a retry for this reason counts against `MAX_RETRY_ATTEMPTS`.
    pub fn consumes_retry_budget(&self) -> bool {
        matches!(
            self.policy(),
            RetryPolicy::Budgeted | RetryPolicy::AlternativeServiceFallback
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "connection_reset",
            Self::ConnectionClosed => "connection_closed",
            Self::ConnectionAborted => "connection_aborted",
            Self::SocketNotConnected => "socket_not_connected",
            Self::EmptyResponse => "empty_response",
            Self::EarlyDataRejected => "early_data_rejected",
            Self::WrongVersionOnEarlyData => "wrong_version_on_early_data",
            Self::Http2PingFailed => "http2_ping_failed",
            Self::Http2ServerRefusedStream => "http2_server_refused_stream",
            Self::QuicHandshakeFailed => "quic_handshake_failed",
            Self::QuicGoawayRequestCanBeRetried => "quic_goaway_request_can_be_retried",
            Self::QuicProtocolError => "quic_protocol_error",
            Self::Http11Required => "http_1_1_required",
            Self::HttpMisdirectedRequest => "http_misdirected_request",
            Self::HttpRequestTimeout => "http_request_timeout",
            Self::SslClientAuthSignatureFailed => "ssl_client_auth_signature_failed",
        }
    }
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two monotonic counters of a transaction. Neither is ever reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    retry_attempts: u32,
    num_restarts: u32,
}

impl RetryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn num_restarts(&self) -> u32 {
        self.num_restarts
    }

    pub fn has_exceeded_max_retries(&self) -> bool {
        self.retry_attempts >= MAX_RETRY_ATTEMPTS
    }

    /// Take one retry attempt; `false` if none remain.
    pub fn consume_retry(&mut self) -> bool {
        if self.has_exceeded_max_retries() {
            return false;
        }
        self.retry_attempts += 1;
        true
    }

    /// Take one restart; `false` once `MAX_RESTARTS` have been used.
    pub fn check_max_restarts(&mut self) -> bool {
        if self.num_restarts >= MAX_RESTARTS {
            return false;
        }
        self.num_restarts += 1;
        true
    }
}
