/// The current state of a transaction, for progress reporting.
/// This roughly matches net/base/load_states.h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The request is idle.
    #[default]
    Idle,

    /// Waiting for a socket from a stalled pool.
    WaitingForStalledSocketPool,

    /// Waiting for an available socket.
    WaitingForAvailableSocket,

    /// Waiting for the embedder to let the request proceed.
    WaitingForDelegate,

    /// Resolving the proxy.
    ResolvingProxyForUrl,

    /// Establishing proxy tunnel.
    EstablishingProxyTunnel,

    /// Resolving the host.
    ResolvingHost,

    /// Connecting to the host (TCP handshake).
    Connecting,

    /// Establishing an SSL connection.
    SslHandshake,

    /// Sending the HTTP request.
    SendingRequest,

    /// Waiting for the server response (TTFB).
    WaitingForResponse,

    /// Reading the response body.
    ReadingResponse,
}

impl LoadState {
    /// Chromium's `LOAD_STATE_*` name, as shown in net-internals.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Idle => "IDLE",
            LoadState::WaitingForStalledSocketPool => "WAITING_FOR_STALLED_SOCKET_POOL",
            LoadState::WaitingForAvailableSocket => "WAITING_FOR_AVAILABLE_SOCKET",
            LoadState::WaitingForDelegate => "WAITING_FOR_DELEGATE",
            LoadState::ResolvingProxyForUrl => "RESOLVING_PROXY_FOR_URL",
            LoadState::EstablishingProxyTunnel => "ESTABLISHING_PROXY_TUNNEL",
            LoadState::ResolvingHost => "RESOLVING_HOST",
            LoadState::Connecting => "CONNECTING",
            LoadState::SslHandshake => "SSL_HANDSHAKE",
            LoadState::SendingRequest => "SENDING_REQUEST",
            LoadState::WaitingForResponse => "WAITING_FOR_RESPONSE",
            LoadState::ReadingResponse => "READING_RESPONSE",
        }
    }
}
