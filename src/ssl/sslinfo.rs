use bytes::Bytes;
use std::fmt;

/// A DER-encoded certificate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct X509Certificate {
    der: Bytes,
}

impl X509Certificate {
    pub fn from_der(der: impl Into<Bytes>) -> Self {
        Self { der: der.into() }
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Certificate verification status bits (net/cert/cert_status_flags_list.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CertStatus(u32);

impl CertStatus {
    pub const COMMON_NAME_INVALID: CertStatus = CertStatus(1 << 0);
    pub const DATE_INVALID: CertStatus = CertStatus(1 << 1);
    pub const AUTHORITY_INVALID: CertStatus = CertStatus(1 << 2);
    pub const NO_REVOCATION_MECHANISM: CertStatus = CertStatus(1 << 4);
    pub const UNABLE_TO_CHECK_REVOCATION: CertStatus = CertStatus(1 << 5);
    pub const REVOKED: CertStatus = CertStatus(1 << 6);
    pub const INVALID: CertStatus = CertStatus(1 << 7);
    pub const WEAK_SIGNATURE_ALGORITHM: CertStatus = CertStatus(1 << 8);
    pub const IS_EV: CertStatus = CertStatus(1 << 16);

    const ALL_ERRORS: u32 = Self::COMMON_NAME_INVALID.0
        | Self::DATE_INVALID.0
        | Self::AUTHORITY_INVALID.0
        | Self::REVOKED.0
        | Self::INVALID.0
        | Self::WEAK_SIGNATURE_ALGORITHM.0;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: CertStatus) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_error(&self) -> bool {
        self.0 & Self::ALL_ERRORS != 0
    }
}

impl std::ops::BitOr for CertStatus {
    type Output = CertStatus;

    fn bitor(self, rhs: CertStatus) -> CertStatus {
        CertStatus(self.0 | rhs.0)
    }
}

/// What the stream learned about the server's TLS identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslInfo {
    pub cert: Option<X509Certificate>,
    pub cert_status: CertStatus,
    pub is_issued_by_known_root: bool,
    /// The client certificate sent, if any.
    pub client_cert_sent: bool,
}

impl SslInfo {
    pub fn is_valid(&self) -> bool {
        self.cert.is_some()
    }
}
