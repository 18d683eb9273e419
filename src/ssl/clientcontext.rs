//! Client certificate store shared by all transactions of a session.
//!
//! Based on Chromium's `SSLClientContext` / `SSLClientAuthCache`. A stored
//! `None` certificate is a deliberate "continue without a certificate".

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use super::sslinfo::X509Certificate;
use crate::base::hostportpair::HostPortPair;

/// Opaque handle to a private key that can sign TLS handshakes.
pub trait SslPrivateKey: Send + Sync + fmt::Debug {
    /// Name of the key provider, for logging.
    fn provider_name(&self) -> String;
}

/// The answer to a client certificate request.
#[derive(Debug, Clone, Default)]
pub struct ClientCertIdentity {
    pub certificate: Option<X509Certificate>,
    pub private_key: Option<Arc<dyn SslPrivateKey>>,
}

/// Thread-safe client certificate store, keyed by server host:port.
#[derive(Debug, Clone, Default)]
pub struct SslClientContext {
    identities: Arc<DashMap<HostPortPair, ClientCertIdentity>>,
}

impl SslClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the certificate to present to `server`.
    pub fn set_client_certificate(
        &self,
        server: HostPortPair,
        certificate: Option<X509Certificate>,
        private_key: Option<Arc<dyn SslPrivateKey>>,
    ) {
        tracing::debug!(server = %server, has_cert = certificate.is_some(), "client certificate set");
        self.identities.insert(
            server,
            ClientCertIdentity {
                certificate,
                private_key,
            },
        );
    }

    /// Forget the choice for `server`. Returns true if there was one.
    pub fn clear_client_certificate(&self, server: &HostPortPair) -> bool {
        self.identities.remove(server).is_some()
    }

    pub fn get_client_certificate(&self, server: &HostPortPair) -> Option<ClientCertIdentity> {
        self.identities.get(server).map(|entry| entry.clone())
    }

    pub fn has_client_certificate(&self, server: &HostPortPair) -> bool {
        self.identities.contains_key(server)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
