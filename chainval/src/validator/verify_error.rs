//! Closed vocabulary of verification outcomes reported by path constructors

use core::fmt;

use crate::util::error::{Error, Result};

/// [`VerifyErrorCode`] enumerates the outcomes a path constructor may report for one depth of a
/// chain. The discriminants follow the widely used `X509_V_ERR_*` numbering so adapters for
/// native verifiers can convert raw codes with [`VerifyErrorCode::from_raw`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum VerifyErrorCode {
    /// No error
    Ok = 0,
    /// Issuer certificate could not be found
    UnableToGetIssuerCert = 2,
    /// CRL could not be found
    UnableToGetCrl = 3,
    /// Certificate signature could not be decrypted
    UnableToDecryptCertSignature = 4,
    /// CRL signature could not be decrypted
    UnableToDecryptCrlSignature = 5,
    /// Issuer public key could not be decoded
    UnableToDecodeIssuerPublicKey = 6,
    /// Certificate signature did not verify
    CertSignatureFailure = 7,
    /// CRL signature did not verify
    CrlSignatureFailure = 8,
    /// Certificate is not yet valid
    CertNotYetValid = 9,
    /// Certificate has expired
    CertHasExpired = 10,
    /// CRL is not yet valid
    CrlNotYetValid = 11,
    /// CRL has expired
    CrlHasExpired = 12,
    /// Certificate notBefore field is malformed
    ErrorInCertNotBeforeField = 13,
    /// Certificate notAfter field is malformed
    ErrorInCertNotAfterField = 14,
    /// CRL lastUpdate field is malformed
    ErrorInCrlLastUpdateField = 15,
    /// CRL nextUpdate field is malformed
    ErrorInCrlNextUpdateField = 16,
    /// Allocation failure
    OutOfMem = 17,
    /// Leaf certificate is self-signed
    DepthZeroSelfSignedCert = 18,
    /// Self-signed certificate in chain
    SelfSignedCertInChain = 19,
    /// Issuer certificate could not be found locally
    UnableToGetIssuerCertLocally = 20,
    /// First certificate could not be verified
    UnableToVerifyLeafSignature = 21,
    /// Chain is longer than the configured maximum
    CertChainTooLong = 22,
    /// Certificate is revoked
    CertRevoked = 23,
    /// CA certificate is invalid
    InvalidCa = 24,
    /// Path length constraint exceeded
    PathLengthExceeded = 25,
    /// Certificate is not valid for the requested purpose
    InvalidPurpose = 26,
    /// Certificate is not trusted
    CertUntrusted = 27,
    /// Certificate is explicitly rejected
    CertRejected = 28,
    /// Key usage does not include certificate signing
    KeyUsageNoCertSign = 32,
    /// CRL issuer could not be found
    UnableToGetCrlIssuer = 33,
    /// Unhandled critical certificate extension
    UnhandledCriticalExtension = 34,
    /// Key usage does not include CRL signing
    KeyUsageNoCrlSign = 35,
    /// Unhandled critical CRL extension
    UnhandledCriticalCrlExtension = 36,
    /// Non-CA certificate asserts CA-only content
    InvalidNonCa = 37,
    /// Key usage does not include digital signature
    KeyUsageNoDigitalSignature = 39,
    /// Extension is malformed or inconsistent
    InvalidExtension = 41,
    /// Policy extension is malformed or inconsistent
    InvalidPolicyExtension = 42,
    /// Explicit policy required but no acceptable policy present
    NoExplicitPolicy = 43,
}

use VerifyErrorCode as V;

static ALL_CODES: &[VerifyErrorCode] = &[
    V::Ok,
    V::UnableToGetIssuerCert,
    V::UnableToGetCrl,
    V::UnableToDecryptCertSignature,
    V::UnableToDecryptCrlSignature,
    V::UnableToDecodeIssuerPublicKey,
    V::CertSignatureFailure,
    V::CrlSignatureFailure,
    V::CertNotYetValid,
    V::CertHasExpired,
    V::CrlNotYetValid,
    V::CrlHasExpired,
    V::ErrorInCertNotBeforeField,
    V::ErrorInCertNotAfterField,
    V::ErrorInCrlLastUpdateField,
    V::ErrorInCrlNextUpdateField,
    V::OutOfMem,
    V::DepthZeroSelfSignedCert,
    V::SelfSignedCertInChain,
    V::UnableToGetIssuerCertLocally,
    V::UnableToVerifyLeafSignature,
    V::CertChainTooLong,
    V::CertRevoked,
    V::InvalidCa,
    V::PathLengthExceeded,
    V::InvalidPurpose,
    V::CertUntrusted,
    V::CertRejected,
    V::KeyUsageNoCertSign,
    V::UnableToGetCrlIssuer,
    V::UnhandledCriticalExtension,
    V::KeyUsageNoCrlSign,
    V::UnhandledCriticalCrlExtension,
    V::InvalidNonCa,
    V::KeyUsageNoDigitalSignature,
    V::InvalidExtension,
    V::InvalidPolicyExtension,
    V::NoExplicitPolicy,
];

impl VerifyErrorCode {
    /// Converts a raw numeric code. Codes with no counterpart are rejected rather than folded into
    /// a catch-all so the mapping table stays total.
    pub fn from_raw(code: i32) -> Result<VerifyErrorCode> {
        ALL_CODES
            .iter()
            .find(|c| **c as i32 == code)
            .copied()
            .ok_or(Error::UnrecognizedVerifyError(code))
    }

    /// Numeric value of the code
    pub fn as_raw(&self) -> i32 {
        *self as i32
    }

    /// Human readable description of the code
    pub fn description(&self) -> &'static str {
        match self {
            V::Ok => "ok",
            V::UnableToGetIssuerCert => "unable to get issuer certificate",
            V::UnableToGetCrl => "unable to get certificate CRL",
            V::UnableToDecryptCertSignature => "unable to decrypt certificate's signature",
            V::UnableToDecryptCrlSignature => "unable to decrypt CRL's signature",
            V::UnableToDecodeIssuerPublicKey => "unable to decode issuer public key",
            V::CertSignatureFailure => "certificate signature failure",
            V::CrlSignatureFailure => "CRL signature failure",
            V::CertNotYetValid => "certificate is not yet valid",
            V::CertHasExpired => "certificate has expired",
            V::CrlNotYetValid => "CRL is not yet valid",
            V::CrlHasExpired => "CRL has expired",
            V::ErrorInCertNotBeforeField => "format error in certificate's notBefore field",
            V::ErrorInCertNotAfterField => "format error in certificate's notAfter field",
            V::ErrorInCrlLastUpdateField => "format error in CRL's lastUpdate field",
            V::ErrorInCrlNextUpdateField => "format error in CRL's nextUpdate field",
            V::OutOfMem => "out of memory",
            V::DepthZeroSelfSignedCert => "self signed certificate",
            V::SelfSignedCertInChain => "self signed certificate in certificate chain",
            V::UnableToGetIssuerCertLocally => "unable to get local issuer certificate",
            V::UnableToVerifyLeafSignature => "unable to verify the first certificate",
            V::CertChainTooLong => "certificate chain too long",
            V::CertRevoked => "certificate revoked",
            V::InvalidCa => "invalid CA certificate",
            V::PathLengthExceeded => "path length constraint exceeded",
            V::InvalidPurpose => "unsupported certificate purpose",
            V::CertUntrusted => "certificate not trusted",
            V::CertRejected => "certificate rejected",
            V::KeyUsageNoCertSign => "key usage does not include certificate signing",
            V::UnableToGetCrlIssuer => "unable to get CRL issuer certificate",
            V::UnhandledCriticalExtension => "unhandled critical extension",
            V::KeyUsageNoCrlSign => "key usage does not include CRL signing",
            V::UnhandledCriticalCrlExtension => "unhandled critical CRL extension",
            V::InvalidNonCa => "invalid non-CA certificate (has CA markings)",
            V::KeyUsageNoDigitalSignature => "key usage does not include digital signature",
            V::InvalidExtension => "invalid or inconsistent certificate extension",
            V::InvalidPolicyExtension => "invalid or inconsistent certificate policy extension",
            V::NoExplicitPolicy => "no explicit policy",
        }
    }
}

impl fmt::Display for VerifyErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl TryFrom<i32> for VerifyErrorCode {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        VerifyErrorCode::from_raw(code)
    }
}

#[test]
fn from_raw_test() {
    for code in ALL_CODES {
        assert_eq!(*code, VerifyErrorCode::from_raw(code.as_raw()).unwrap());
    }
    assert_eq!(V::Ok, VerifyErrorCode::from_raw(0).unwrap());
    assert_eq!(V::CertRevoked, VerifyErrorCode::from_raw(23).unwrap());
    assert_eq!(V::NoExplicitPolicy, VerifyErrorCode::from_raw(43).unwrap());
    assert_eq!(
        Err(Error::UnrecognizedVerifyError(1)),
        VerifyErrorCode::from_raw(1)
    );
    assert_eq!(
        Err(Error::UnrecognizedVerifyError(9999)),
        VerifyErrorCode::try_from(9999)
    );
}

#[test]
fn description_test() {
    use alloc::format;
    assert_eq!("certificate has expired", format!("{}", V::CertHasExpired));
    assert_eq!("certificate rejected", V::CertRejected.description());
}
