//! Engine-level status vocabulary and the table that maps verification codes onto it

use alloc::string::{String, ToString};
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::util::error::{Error, Result};
use crate::VerifyErrorCode;

/// [`ChainStatusFlag`] names one kind of trust problem. The discriminants are the conventional bit
/// values so a set of flags can be folded into a single mask with [`status_mask`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ChainStatusFlag {
    /// No problem was found
    NoError = 0,
    /// Verification time is outside the certificate validity period
    NotTimeValid = 0x1,
    /// Certificate is revoked
    Revoked = 0x4,
    /// Signature does not verify
    NotSignatureValid = 0x8,
    /// Certificate is not valid for the requested usage
    NotValidForUsage = 0x10,
    /// Chain terminates in a root that is not trusted
    UntrustedRoot = 0x20,
    /// Revocation status could not be determined
    RevocationStatusUnknown = 0x40,
    /// An extension is invalid
    InvalidExtension = 0x100,
    /// Certificate policy requirements are not met
    InvalidPolicyConstraints = 0x200,
    /// Basic constraints, path length or CA key usage are violated
    InvalidBasicConstraints = 0x400,
    /// Chain could not be built up to a root
    PartialChain = 0x10000,
    /// Revocation information was too stale to use
    OfflineRevocation = 0x1000000,
    /// Certificate is explicitly distrusted
    ExplicitDistrust = 0x4000000,
    /// A critical extension is not supported
    HasNotSupportedCriticalExtension = 0x8000000,
}

impl ChainStatusFlag {
    /// Bit value of the flag
    pub fn bits(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for ChainStatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// `status_mask` folds a sequence of flags into a single bit mask.
pub fn status_mask<'a, I: IntoIterator<Item = &'a ChainStatusFlag>>(flags: I) -> u32 {
    flags.into_iter().fold(0, |acc, f| acc | f.bits())
}

/// A status flag accompanied by diagnostic text
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainStatus {
    /// The kind of problem
    pub status: ChainStatusFlag,
    /// Diagnostic text
    pub status_information: String,
}

impl ChainStatus {
    /// Creates a status with the given diagnostic text
    pub fn new(status: ChainStatusFlag, status_information: &str) -> Self {
        ChainStatus {
            status,
            status_information: status_information.to_string(),
        }
    }

    /// The status every chain element starts with
    pub fn no_error() -> Self {
        ChainStatus::new(ChainStatusFlag::NoError, "")
    }

    /// `from_verify_error` maps the code and uses its description as the diagnostic text.
    pub fn from_verify_error(code: VerifyErrorCode) -> Result<Self> {
        let status = map_verify_error(code)?;
        Ok(ChainStatus::new(status, code.description()))
    }
}

/// `map_verify_error` is the single place where path constructor codes are translated into engine
/// status flags. Every code maps to exactly one flag except chain-too-long and out-of-memory,
/// which abort the build.
pub fn map_verify_error(code: VerifyErrorCode) -> Result<ChainStatusFlag> {
    use ChainStatusFlag::*;
    use VerifyErrorCode as V;

    let flag = match code {
        V::Ok => NoError,

        V::CertNotYetValid
        | V::CertHasExpired
        | V::ErrorInCertNotBeforeField
        | V::ErrorInCertNotAfterField => NotTimeValid,

        V::CertRevoked => Revoked,

        V::CertSignatureFailure
        | V::UnableToDecryptCertSignature
        | V::UnableToDecodeIssuerPublicKey => NotSignatureValid,

        V::CertUntrusted | V::DepthZeroSelfSignedCert | V::SelfSignedCertInChain => {
            UntrustedRoot
        }

        V::CrlHasExpired => OfflineRevocation,

        V::CrlNotYetValid
        | V::CrlSignatureFailure
        | V::ErrorInCrlLastUpdateField
        | V::ErrorInCrlNextUpdateField
        | V::KeyUsageNoCrlSign
        | V::UnableToDecryptCrlSignature
        | V::UnableToGetCrl
        | V::UnableToGetCrlIssuer
        | V::UnhandledCriticalCrlExtension => RevocationStatusUnknown,

        V::InvalidExtension => InvalidExtension,

        V::UnableToGetIssuerCert
        | V::UnableToGetIssuerCertLocally
        | V::UnableToVerifyLeafSignature => PartialChain,

        V::InvalidPurpose => NotValidForUsage,

        V::InvalidCa
        | V::InvalidNonCa
        | V::PathLengthExceeded
        | V::KeyUsageNoCertSign
        | V::KeyUsageNoDigitalSignature => InvalidBasicConstraints,

        V::InvalidPolicyExtension | V::NoExplicitPolicy => InvalidPolicyConstraints,

        V::CertRejected => ExplicitDistrust,

        V::UnhandledCriticalExtension => HasNotSupportedCriticalExtension,

        V::CertChainTooLong => return Err(Error::ChainTooLong),
        V::OutOfMem => return Err(Error::OutOfMemory),
    };
    Ok(flag)
}

/// `map_raw_verify_error` converts and maps a raw numeric code in one step.
pub fn map_raw_verify_error(code: i32) -> Result<ChainStatusFlag> {
    map_verify_error(VerifyErrorCode::from_raw(code)?)
}
