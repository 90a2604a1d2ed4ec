//! The chain_environment_traits module features trait definitions and type definitions that are
//! used by [`ChainEnvironment`] to provide functionality that supports building and evaluating
//! certificate chains.

use alloc::{string::String, vec::Vec};
use core::time::Duration;

use der::asn1::ObjectIdentifier;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use serde::{Deserialize, Serialize};

use crate::util::error::*;
use crate::{
    CandidateStore, ChainBuildSettings, ChainCertificate, ChainEnvironment, ConstructedPath,
    RevocationMode, SharedCertificate, TimeBudget, VerificationTime, VerifyErrorCode,
};

/// `VerifyIssued` provides a function signature for implementations that determine whether the
/// second certificate was issued by the first, i.e., whether the names chain and the subject's
/// signature verifies with the issuer's public key.
pub type VerifyIssued = fn(
    &ChainEnvironment,
    &ChainCertificate, // issuer
    &ChainCertificate, // subject
) -> Result<()>;

/// `VerifySignatureMessage` provides a function signature for implementations that perform
/// signature verification over a message, e.g., the to-be-signed portion of a CRL.
pub type VerifySignatureMessage = fn(
    &ChainEnvironment,
    &[u8],                      // message to hash and verify
    &[u8],                      // signature
    &AlgorithmIdentifierOwned,  // signature algorithm
    &SubjectPublicKeyInfoOwned, // public key
) -> Result<()>;

/// `DecodeAia` provides a function signature for implementations that decode an encoded
/// Authority Information Access extension value into (access method, URI) pairs. Access locations
/// that are not URIs are omitted.
pub type DecodeAia = fn(&[u8]) -> Result<Vec<(ObjectIdentifier, String)>>;

/// `ConstructPath` provides a function signature for implementations that construct and verify a
/// single path from the leaf using only the certificates in the candidate store. This is the
/// engine's "native" primitive: it reports the first problem it encounters along with the depth
/// at which it occurred.
pub type ConstructPath = fn(
    &ChainEnvironment,
    &CandidateStore,      // candidates, distrusted certificates and revocation configuration
    &SharedCertificate,   // leaf
    &ChainBuildSettings,  // settings to govern construction
) -> Result<ConstructedPath>;

/// Kind of certificate store addressed through a [`TrustStoreAccessor`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreName {
    /// Trusted roots
    Root,
    /// Intermediate certification authorities
    CertificateAuthority,
    /// Explicitly distrusted certificates
    Disallowed,
}

/// Scope of a certificate store addressed through a [`TrustStoreAccessor`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreLocation {
    /// Stores belonging to the current user
    CurrentUser,
    /// Stores shared by the machine
    LocalMachine,
}

/// The [`TrustStoreAccessor`] trait enables trait objects to provide access to certificate stores
/// backed via some means, i.e., in-memory, file-based, system store accessed via FFI, etc.
///
/// Implementations are only read during a chain build.
pub trait TrustStoreAccessor {
    /// get_certificates returns the certificates in the given store. An absent store is reported
    /// as an empty vector.
    fn get_certificates(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> Result<Vec<SharedCertificate>>;
}

/// The [`AssetDownloader`] trait defines the interface for retrieving certificates and CRLs from
/// remote locations.
pub trait AssetDownloader {
    /// download returns the body retrieved from `uri`. Implementations must not block for longer
    /// than `timeout`.
    fn download(&self, uri: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Revocation status determination for a single certificate
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RevocationStatus {
    /// Certificate is not revoked
    Good,
    /// Certificate is revoked
    Revoked,
    /// Status could not be determined for the given reason
    Undetermined(VerifyErrorCode),
}

/// The [`RevocationStatusProvider`] trait defines the interface for collaborators that answer "is
/// this certificate revoked as of time T". Providers manage their own caches and network policy.
pub trait RevocationStatusProvider {
    /// prepare gives the provider a chance to retrieve revocation information for `cert` before
    /// path construction begins. Network activity must be charged against `budget`.
    fn prepare(
        &self,
        env: &ChainEnvironment,
        cert: &ChainCertificate,
        mode: RevocationMode,
        time: &VerificationTime,
        budget: &mut TimeBudget,
    ) -> Result<()>;

    /// get_status returns the revocation status of `cert`, whose signer is `issuer`.
    fn get_status(
        &self,
        env: &ChainEnvironment,
        cert: &ChainCertificate,
        issuer: &ChainCertificate,
        time: &VerificationTime,
    ) -> RevocationStatus;
}
