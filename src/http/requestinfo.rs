use http::header::{HeaderName, HeaderValue};
use http::Method;
use std::fmt;
use url::Url;

use super::requestheaders::HttpRequestHeaders;
use super::uploaddatastream::UploadDataStream;
use crate::base::loadflags::LoadFlags;
use crate::base::networkkey::NetworkAnonymizationKey;

/// Whether a request may be replayed (and so sent as TLS early data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Idempotency {
    /// Decide from the method: safe methods are idempotent.
    #[default]
    Default,
    Idempotent,
    NotIdempotent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacyMode {
    #[default]
    Disabled,
    Enabled,
    EnabledWithoutClientCerts,
    EnabledPartitionedState,
}

/// Everything the transaction needs to know about one request.
///
/// Owned by the transaction from `start` until the response headers are
/// final; the body phase never consults it.
pub struct HttpRequestInfo {
    pub url: Url,
    pub method: Method,
    pub extra_headers: HttpRequestHeaders,
    pub upload_data_stream: Option<Box<dyn UploadDataStream>>,
    pub load_flags: LoadFlags,
    pub privacy_mode: PrivacyMode,
    pub idempotency: Idempotency,
    pub network_anonymization_key: NetworkAnonymizationKey,
}

impl HttpRequestInfo {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            extra_headers: HttpRequestHeaders::new(),
            upload_data_stream: None,
            load_flags: LoadFlags::NORMAL,
            privacy_mode: PrivacyMode::Disabled,
            idempotency: Idempotency::Default,
            network_anonymization_key: NetworkAnonymizationKey::default(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl UploadDataStream + 'static) -> Self {
        self.upload_data_stream = Some(Box::new(body));
        self
    }

    pub fn with_load_flags(mut self, flags: LoadFlags) -> Self {
        self.load_flags = flags;
        self
    }

    pub fn with_privacy_mode(mut self, mode: PrivacyMode) -> Self {
        self.privacy_mode = mode;
        self
    }

    pub fn with_idempotency(mut self, idempotency: Idempotency) -> Self {
        self.idempotency = idempotency;
        self
    }

    pub fn with_network_anonymization_key(mut self, key: NetworkAnonymizationKey) -> Self {
        self.network_anonymization_key = key;
        self
    }

    /// RFC 9110 §9.2.1 safe methods.
    pub fn is_method_safe(&self) -> bool {
        matches!(
            self.method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
        )
    }

    /// Early data is allowed for explicitly idempotent requests and for safe
    /// methods left at the default idempotency.
    pub fn can_send_early_data(&self) -> bool {
        match self.idempotency {
            Idempotency::Idempotent => true,
            Idempotency::NotIdempotent => false,
            Idempotency::Default => self.is_method_safe(),
        }
    }

    pub fn has_upload_data(&self) -> bool {
        self.upload_data_stream.is_some()
    }

    /// The body cannot be replayed, so a resend after it was sent is impossible.
    pub fn has_single_use_body(&self) -> bool {
        self.upload_data_stream
            .as_ref()
            .is_some_and(|body| body.has_null_source())
    }
}

impl fmt::Debug for HttpRequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequestInfo")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("extra_headers", &self.extra_headers.len())
            .field("has_upload_data", &self.has_upload_data())
            .field("load_flags", &self.load_flags)
            .field("privacy_mode", &self.privacy_mode)
            .field("idempotency", &self.idempotency)
            .finish()
    }
}
