//! HTTP authentication contracts.
//!
//! The transaction keeps one [`AuthController`] per [`HttpAuthTarget`] and
//! only drives it: token generation before a send, challenge handling after
//! a 401/407, and credential reset on restart. Scheme logic lives behind the
//! trait.

use http::Method;
use std::fmt;
use std::sync::Arc;
use url::Url;
use zeroize::Zeroizing;

use super::requestheaders::HttpRequestHeaders;
use super::responseheaders::HttpResponseHeaders;
use super::stream::StreamFuture;
use crate::base::hostportpair::SchemeHostPort;
use crate::base::neterror::NetError;
use crate::base::networkkey::NetworkAnonymizationKey;
use crate::ssl::SslInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpAuthTarget {
    Proxy,
    Server,
}

impl HttpAuthTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpAuthTarget::Proxy => "proxy",
            HttpAuthTarget::Server => "server",
        }
    }

    /// Header carrying the challenge.
    pub fn challenge_header(&self) -> &'static str {
        match self {
            HttpAuthTarget::Proxy => "proxy-authenticate",
            HttpAuthTarget::Server => "www-authenticate",
        }
    }

    /// Header carrying the answer.
    pub fn authorization_header(&self) -> http::header::HeaderName {
        match self {
            HttpAuthTarget::Proxy => http::header::PROXY_AUTHORIZATION,
            HttpAuthTarget::Server => http::header::AUTHORIZATION,
        }
    }
}

/// Username and password supplied by the caller.
#[derive(Clone, Default)]
pub struct AuthCredentials {
    username: String,
    /// Zeroized on drop
    password: Zeroizing<String>,
}

impl AuthCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// No credentials: "use whatever identity you already found".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl PartialEq for AuthCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username && *self.password == *other.password
    }
}

impl Eq for AuthCredentials {}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A challenge surfaced to the caller on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallengeInfo {
    pub is_proxy: bool,
    pub challenger: SchemeHostPort,
    /// Lowercase scheme name, e.g. `basic`.
    pub scheme: String,
    pub realm: String,
    /// The raw challenge header value.
    pub challenge: String,
    pub path: String,
}

pub trait AuthController: Send + Sync {
    fn target(&self) -> HttpAuthTarget;

    /// Prepare an authorization token for the next send, if an identity is known.
    fn maybe_generate_auth_token<'a>(
        &'a self,
        method: &'a Method,
        url: &'a Url,
    ) -> StreamFuture<'a, Result<(), NetError>>;

    /// Add the prepared token, if any, to `headers`.
    fn add_authorization_header(&self, headers: &mut HttpRequestHeaders);

    /// Parse a 401/407. On success the controller may or may not have a
    /// handler; `have_auth_handler` says whether the caller can answer.
    fn handle_auth_challenge(
        &self,
        headers: &HttpResponseHeaders,
        ssl_info: &SslInfo,
        do_not_send_server_auth: bool,
        establishing_tunnel: bool,
    ) -> Result<(), NetError>;

    /// Apply caller credentials (empty means keep the cached identity).
    fn reset_auth(&self, credentials: &AuthCredentials);

    fn have_auth_handler(&self) -> bool;

    /// A handler exists and an identity is ready to try.
    fn have_auth(&self) -> bool;

    fn take_auth_info(&self) -> Option<AuthChallengeInfo>;

    /// The selected scheme cannot run over HTTP/2 or QUIC.
    fn needs_http11(&self) -> bool {
        false
    }
}

pub trait AuthControllerFactory: Send + Sync {
    fn create_auth_controller(
        &self,
        target: HttpAuthTarget,
        auth_url: &Url,
        key: &NetworkAnonymizationKey,
    ) -> Arc<dyn AuthController>;
}
