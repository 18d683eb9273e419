//! HTTP Authentication Cache for proxy and server credentials.
//!
//! Caches credentials to avoid re-prompting users. Shared by every
//! transaction of a session. Based on Chromium's HttpAuthCache.

use dashmap::DashMap;
use std::sync::Arc;

use super::auth::AuthCredentials;
use crate::base::hostportpair::SchemeHostPort;

/// Cached credentials for one (origin, realm, scheme).
#[derive(Debug, Clone)]
pub struct AuthCacheEntry {
    pub origin: SchemeHostPort,
    pub realm: String,
    /// Lowercase scheme name
    pub scheme: String,
    pub credentials: AuthCredentials,
}

/// Thread-safe authentication cache.
/// Keys entries by origin + realm + scheme.
#[derive(Clone, Default)]
pub struct AuthCache {
    entries: Arc<DashMap<String, AuthCacheEntry>>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(origin: &SchemeHostPort, realm: &str, scheme: &str) -> String {
        format!("{}|{}|{}", origin, scheme.to_ascii_lowercase(), realm)
    }

    pub fn lookup(&self, origin: &SchemeHostPort, realm: &str, scheme: &str) -> Option<AuthCacheEntry> {
        self.entries
            .get(&Self::key(origin, realm, scheme))
            .map(|e| e.clone())
    }

    pub fn store(
        &self,
        origin: &SchemeHostPort,
        realm: &str,
        scheme: &str,
        credentials: AuthCredentials,
    ) {
        let entry = AuthCacheEntry {
            origin: origin.clone(),
            realm: realm.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            credentials,
        };
        self.entries.insert(Self::key(origin, realm, scheme), entry);
    }

    /// Remove one entry. Returns true if it existed.
    pub fn remove(&self, origin: &SchemeHostPort, realm: &str, scheme: &str) -> bool {
        self.entries.remove(&Self::key(origin, realm, scheme)).is_some()
    }

    /// Remove every realm cached for `origin`.
    pub fn remove_origin(&self, origin: &SchemeHostPort) {
        self.entries.retain(|_, e| e.origin != *origin);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
