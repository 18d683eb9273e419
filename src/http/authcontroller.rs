//! Basic-scheme [`AuthController`] backed by the shared [`AuthCache`].
//!
//! Identity selection follows Chromium's `HttpAuthController`: credentials
//! embedded in the URL are tried first, then the cache, then the caller is
//! asked. Credentials answered by another challenge are treated as rejected
//! and evicted from the cache.

use base64::{engine::general_purpose, Engine as _};
use http::header::HeaderValue;
use http::Method;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

use super::auth::{
    AuthChallengeInfo, AuthController, AuthControllerFactory, AuthCredentials, HttpAuthTarget,
};
use super::authcache::AuthCache;
use super::requestheaders::HttpRequestHeaders;
use super::responseheaders::HttpResponseHeaders;
use super::stream::StreamFuture;
use crate::base::hostportpair::SchemeHostPort;
use crate::base::neterror::NetError;
use crate::base::networkkey::NetworkAnonymizationKey;
use crate::ssl::SslInfo;

const BASIC: &str = "basic";

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Extract the realm of a `Basic` challenge. A missing realm is the empty realm.
pub fn parse_basic_realm(challenge: &str) -> Option<String> {
    let challenge = challenge.trim();
    let (scheme, params) = match challenge.split_once([' ', '\t']) {
        Some((scheme, params)) => (scheme, params),
        None => (challenge, ""),
    };
    if !scheme.eq_ignore_ascii_case(BASIC) {
        return None;
    }

    let mut rest = params.trim_start();
    while !rest.is_empty() {
        let (name, after_name) = rest.split_once('=')?;
        let name = name.trim().trim_start_matches(',').trim();
        let after_name = after_name.trim_start();
        let (value, remainder) = if let Some(quoted) = after_name.strip_prefix('"') {
            let mut value = String::new();
            let mut escaped = false;
            let mut end = None;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    value.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    end = Some(i);
                    break;
                } else {
                    value.push(c);
                }
            }
            (value, &quoted[end? + 1..])
        } else {
            let end = after_name.find(',').unwrap_or(after_name.len());
            (after_name[..end].trim().to_string(), &after_name[end..])
        };
        if name.eq_ignore_ascii_case("realm") {
            return Some(value);
        }
        rest = remainder.trim_start().trim_start_matches(',').trim_start();
    }
    Some(String::new())
}

/// `Basic base64(user:pass)`.
pub fn basic_auth_token(credentials: &AuthCredentials) -> String {
    let creds = format!("{}:{}", credentials.username(), credentials.password());
    format!("Basic {}", general_purpose::STANDARD.encode(creds))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentitySource {
    Url,
    Cache,
    External,
}

#[derive(Debug, Default)]
struct ControllerState {
    /// Realm and raw header of the accepted challenge.
    handler: Option<(String, String)>,
    identity: Option<(AuthCredentials, IdentitySource)>,
    embedded_identity_used: bool,
    cache_tried: bool,
    auth_token: Option<String>,
    /// A token went out since the last challenge.
    identity_sent: bool,
    auth_info: Option<AuthChallengeInfo>,
}

pub struct HttpAuthController {
    target: HttpAuthTarget,
    auth_url: Url,
    origin: Option<SchemeHostPort>,
    cache: AuthCache,
    state: Mutex<ControllerState>,
}

impl HttpAuthController {
    pub fn new(target: HttpAuthTarget, auth_url: Url, cache: AuthCache) -> Self {
        Self {
            target,
            origin: SchemeHostPort::from_url(&auth_url),
            auth_url,
            cache,
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn embedded_identity(&self) -> Option<AuthCredentials> {
        if self.auth_url.username().is_empty() {
            return None;
        }
        Some(AuthCredentials::new(
            self.auth_url.username(),
            self.auth_url.password().unwrap_or_default(),
        ))
    }

    fn invalidate_rejected_identity(&self, state: &mut ControllerState) {
        if let (Some((realm, _)), Some((_, source)), Some(origin)) =
            (&state.handler, &state.identity, &self.origin)
        {
            if *source != IdentitySource::Url {
                self.cache.remove(origin, realm, BASIC);
            }
        }
        tracing::debug!(target_kind = self.target.as_str(), "credentials rejected");
        state.identity = None;
        state.auth_token = None;
    }

    fn select_next_identity(&self, state: &mut ControllerState, realm: &str) {
        if state.identity.is_some() {
            return;
        }
        if !state.embedded_identity_used {
            state.embedded_identity_used = true;
            if let Some(identity) = self.embedded_identity() {
                state.identity = Some((identity, IdentitySource::Url));
                return;
            }
        }
        if !state.cache_tried {
            state.cache_tried = true;
            if let Some(entry) = self
                .origin
                .as_ref()
                .and_then(|origin| self.cache.lookup(origin, realm, BASIC))
            {
                state.identity = Some((entry.credentials, IdentitySource::Cache));
            }
        }
    }
}

impl AuthController for HttpAuthController {
    fn target(&self) -> HttpAuthTarget {
        self.target
    }

    fn maybe_generate_auth_token<'a>(
        &'a self,
        _method: &'a Method,
        _url: &'a Url,
    ) -> StreamFuture<'a, Result<(), NetError>> {
        let mut state = lock_unpoisoned(&self.state);
        if state.handler.is_some() {
            state.auth_token = state
                .identity
                .as_ref()
                .map(|(identity, _)| basic_auth_token(identity));
        }
        Box::pin(async { Ok(()) })
    }

    fn add_authorization_header(&self, headers: &mut HttpRequestHeaders) {
        let mut state = lock_unpoisoned(&self.state);
        let Some(token) = state.auth_token.take() else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(&token) {
            headers.set_header(self.target.authorization_header(), value);
            state.identity_sent = true;
        }
    }

    fn handle_auth_challenge(
        &self,
        headers: &HttpResponseHeaders,
        _ssl_info: &SslInfo,
        do_not_send_server_auth: bool,
        _establishing_tunnel: bool,
    ) -> Result<(), NetError> {
        let mut state = lock_unpoisoned(&self.state);
        if std::mem::take(&mut state.identity_sent) {
            self.invalidate_rejected_identity(&mut state);
        }

        if self.target == HttpAuthTarget::Server && do_not_send_server_auth {
            state.handler = None;
            state.auth_info = None;
            return Ok(());
        }

        let challenge = headers
            .enumerate_header(self.target.challenge_header())
            .find_map(|raw| parse_basic_realm(raw).map(|realm| (realm, raw.to_string())));
        let Some((realm, raw)) = challenge else {
            // No scheme we support; the response is handed back as-is.
            state.handler = None;
            state.auth_info = None;
            return Ok(());
        };

        self.select_next_identity(&mut state, &realm);
        state.auth_info = match (&state.identity, &self.origin) {
            (None, Some(origin)) => Some(AuthChallengeInfo {
                is_proxy: self.target == HttpAuthTarget::Proxy,
                challenger: origin.clone(),
                scheme: BASIC.to_string(),
                realm: realm.clone(),
                challenge: raw.clone(),
                path: self.auth_url.path().to_string(),
            }),
            _ => None,
        };
        state.handler = Some((realm, raw));
        Ok(())
    }

    fn reset_auth(&self, credentials: &AuthCredentials) {
        let mut state = lock_unpoisoned(&self.state);
        if !credentials.is_empty() {
            state.identity = Some((credentials.clone(), IdentitySource::External));
        }
        if let (Some((realm, _)), Some((identity, source)), Some(origin)) =
            (&state.handler, &state.identity, &self.origin)
        {
            if *source != IdentitySource::Url {
                self.cache.store(origin, realm, BASIC, identity.clone());
            }
        }
    }

    fn have_auth_handler(&self) -> bool {
        lock_unpoisoned(&self.state).handler.is_some()
    }

    fn have_auth(&self) -> bool {
        let state = lock_unpoisoned(&self.state);
        state.handler.is_some() && state.identity.is_some()
    }

    fn take_auth_info(&self) -> Option<AuthChallengeInfo> {
        lock_unpoisoned(&self.state).auth_info.take()
    }
}

/// Creates [`HttpAuthController`]s sharing one [`AuthCache`].
#[derive(Clone, Default)]
pub struct HttpAuthControllerFactory {
    cache: AuthCache,
}

impl HttpAuthControllerFactory {
    pub fn new(cache: AuthCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }
}

impl AuthControllerFactory for HttpAuthControllerFactory {
    fn create_auth_controller(
        &self,
        target: HttpAuthTarget,
        auth_url: &Url,
        _key: &NetworkAnonymizationKey,
    ) -> Arc<dyn AuthController> {
        Arc::new(HttpAuthController::new(
            target,
            auth_url.clone(),
            self.cache.clone(),
        ))
    }
}
