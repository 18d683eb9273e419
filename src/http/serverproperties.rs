//! Per-origin protocol knowledge shared across transactions.
//!
//! Based on Chromium's `HttpServerProperties`: which origins insist on
//! HTTP/1.1 and which alternative services are broken. Entries are
//! partitioned by [`NetworkAnonymizationKey`].

use dashmap::DashSet;
use std::fmt;
use std::sync::Arc;

use super::connectioninfo::NextProto;
use crate::base::hostportpair::SchemeHostPort;
use crate::base::networkkey::NetworkAnonymizationKey;

/// A server-advertised alternative endpoint for an origin (Alt-Svc).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlternativeService {
    pub protocol: NextProto,
    pub host: String,
    pub port: u16,
}

impl AlternativeService {
    pub fn new(protocol: NextProto, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for AlternativeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

pub trait HttpServerProperties: Send + Sync {
    /// Remember that `origin` rejected anything newer than HTTP/1.1.
    fn set_http11_required(&self, origin: &SchemeHostPort, key: &NetworkAnonymizationKey);

    fn requires_http11(&self, origin: &SchemeHostPort, key: &NetworkAnonymizationKey) -> bool;

    fn mark_alternative_service_broken(
        &self,
        service: &AlternativeService,
        key: &NetworkAnonymizationKey,
    );

    fn is_alternative_service_broken(
        &self,
        service: &AlternativeService,
        key: &NetworkAnonymizationKey,
    ) -> bool;
}

/// In-memory [`HttpServerProperties`].
#[derive(Debug, Clone, Default)]
pub struct HttpServerPropertiesImpl {
    http11_required: Arc<DashSet<(NetworkAnonymizationKey, SchemeHostPort)>>,
    broken_alternative_services: Arc<DashSet<(NetworkAnonymizationKey, AlternativeService)>>,
}

impl HttpServerPropertiesImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.http11_required.clear();
        self.broken_alternative_services.clear();
    }
}

impl HttpServerProperties for HttpServerPropertiesImpl {
    fn set_http11_required(&self, origin: &SchemeHostPort, key: &NetworkAnonymizationKey) {
        tracing::debug!(origin = %origin, "origin requires HTTP/1.1");
        self.http11_required.insert((key.clone(), origin.clone()));
    }

    fn requires_http11(&self, origin: &SchemeHostPort, key: &NetworkAnonymizationKey) -> bool {
        self.http11_required.contains(&(key.clone(), origin.clone()))
    }

    fn mark_alternative_service_broken(
        &self,
        service: &AlternativeService,
        key: &NetworkAnonymizationKey,
    ) {
        tracing::debug!(service = %service, "alternative service marked broken");
        self.broken_alternative_services
            .insert((key.clone(), service.clone()));
    }

    fn is_alternative_service_broken(
        &self,
        service: &AlternativeService,
        key: &NetworkAnonymizationKey,
    ) -> bool {
        self.broken_alternative_services
            .contains(&(key.clone(), service.clone()))
    }
}
