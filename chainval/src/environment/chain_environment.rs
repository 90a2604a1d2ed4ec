//! ChainEnvironment aggregates a set of function pointers and trait objects that supply the
//! collaborators a chain build relies upon: the issuer-validity predicate, trust store enumeration,
//! AIA decoding, downloading, revocation status and path construction.
//!
//! The sample below illustrates preparation of a ChainEnvironment object for use in building
//! chains.
//! ```
//! use chainval::*;
//!
//! let mut env = ChainEnvironment::default();
//!
//! // add signature verification, AIA decoding and path construction capabilities
//! populate_default_chain_environment(&mut env);
//!
//! // add a store provider. certificates may be added programmatically or loaded from folders.
//! let stores = CertificateStores::default();
//! env.add_trust_store_accessor(Box::new(stores));
//! ```
//!
//! The aggregation of function pointers and trait objects allows for implementations of features to
//! vary. For example, one app may use a system store accessed via FFI while another uses a small
//! in-memory set of roots, and tests may substitute the issuer-validity predicate entirely.

use alloc::boxed::Box;
use alloc::{format, string::String, vec, vec::Vec};

use der::asn1::ObjectIdentifier;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::{
    environment::chain_environment_traits::*, util::error::*, util::logging::*, CandidateStore,
    ChainBuildSettings, ChainCertificate, ConstructedPath, RevocationMode, SharedCertificate,
    TimeBudget, VerificationTime, VerifyErrorCode,
};

/// [`ChainEnvironment`] provides a switchboard of callback functions that allow support to vary on
/// different platforms or to allow support to be tailored for specific use cases.
pub struct ChainEnvironment {
    //--------------------------------------------------------------------------
    //Crypto interfaces
    //--------------------------------------------------------------------------
    /// List of functions that determine whether one certificate issued another
    verify_issued_callbacks: Vec<VerifyIssued>,

    /// List of functions that verify a signature over a message
    verify_signature_message_callbacks: Vec<VerifySignatureMessage>,

    //--------------------------------------------------------------------------
    //Chain processing interfaces
    //--------------------------------------------------------------------------
    /// List of functions that construct and verify a path from a candidate store
    construct_path_callbacks: Vec<ConstructPath>,

    /// List of functions that decode AIA extensions
    decode_aia_callbacks: Vec<DecodeAia>,

    //--------------------------------------------------------------------------
    //Storage and retrieval interfaces
    //--------------------------------------------------------------------------
    /// List of trait objects that provide access to certificate stores
    trust_store_accessors: Vec<Box<(dyn TrustStoreAccessor + Send + Sync)>>,

    /// List of trait objects that retrieve remote assets
    asset_downloaders: Vec<Box<(dyn AssetDownloader + Send + Sync)>>,

    /// List of trait objects that provide revocation status determinations
    revocation_providers: Vec<Box<(dyn RevocationStatusProvider + Send + Sync)>>,
}

impl Default for ChainEnvironment {
    /// ChainEnvironment::default returns a new [`ChainEnvironment`] with empty callback vectors for
    /// each type of callback.
    fn default() -> Self {
        ChainEnvironment::new()
    }
}

impl ChainEnvironment {
    /// ChainEnvironment::new returns a new [`ChainEnvironment`] with empty callback vectors for
    /// each type of callback
    pub fn new() -> ChainEnvironment {
        ChainEnvironment {
            verify_issued_callbacks: vec![],
            verify_signature_message_callbacks: vec![],
            construct_path_callbacks: vec![],
            decode_aia_callbacks: vec![],
            trust_store_accessors: vec![],
            asset_downloaders: vec![],
            revocation_providers: vec![],
        }
    }

    /// clear_all_callbacks clears the contents of all function pointer and trait object vectors
    /// associated with an instance of [`ChainEnvironment`].
    pub fn clear_all_callbacks(&mut self) {
        self.clear_verify_issued_callbacks();
        self.clear_verify_signature_message_callbacks();
        self.clear_construct_path_callbacks();
        self.clear_decode_aia_callbacks();
        self.clear_trust_store_accessors();
        self.clear_asset_downloaders();
        self.clear_revocation_providers();
    }

    /// add_verify_issued_callback adds a [`VerifyIssued`] callback to the list used by
    /// verify_issued.
    pub fn add_verify_issued_callback(&mut self, c: VerifyIssued) {
        self.verify_issued_callbacks.push(c);
    }

    /// clear_verify_issued_callbacks clears the list of [`VerifyIssued`] callbacks.
    pub fn clear_verify_issued_callbacks(&mut self) {
        self.verify_issued_callbacks.clear();
    }

    /// verify_issued returns true if any registered [`VerifyIssued`] callback accepts `subject` as
    /// issued by `issuer`.
    pub fn verify_issued(&self, issuer: &ChainCertificate, subject: &ChainCertificate) -> bool {
        self.verify_issued_callbacks
            .iter()
            .any(|f| f(self, issuer, subject).is_ok())
    }

    /// add_verify_signature_message_callback adds a [`VerifySignatureMessage`] callback to the list
    /// used by verify_signature_message.
    pub fn add_verify_signature_message_callback(&mut self, c: VerifySignatureMessage) {
        self.verify_signature_message_callbacks.push(c);
    }

    /// clear_verify_signature_message_callbacks clears the list of [`VerifySignatureMessage`]
    /// callbacks.
    pub fn clear_verify_signature_message_callbacks(&mut self) {
        self.verify_signature_message_callbacks.clear();
    }

    /// verify_signature_message verifies a signature using the available
    /// [`VerifySignatureMessage`] implementations until a definitive answer is found or all
    /// avenues have been tried.
    pub fn verify_signature_message(
        &self,
        message_to_verify: &[u8],
        signature: &[u8],
        signature_alg: &AlgorithmIdentifierOwned,
        spki: &SubjectPublicKeyInfoOwned,
    ) -> Result<()> {
        let mut retval = Err(Error::Unrecognized);
        for f in &self.verify_signature_message_callbacks {
            retval = f(self, message_to_verify, signature, signature_alg, spki);
            if retval.is_ok() {
                return retval;
            }
        }
        retval
    }

    /// add_construct_path_callback adds a [`ConstructPath`] callback to the list used by
    /// construct_path.
    pub fn add_construct_path_callback(&mut self, c: ConstructPath) {
        self.construct_path_callbacks.push(c);
    }

    /// clear_construct_path_callbacks clears the list of [`ConstructPath`] callbacks.
    pub fn clear_construct_path_callbacks(&mut self) {
        self.construct_path_callbacks.clear();
    }

    /// construct_path runs [`ConstructPath`] callbacks until one succeeds. Fatal conditions reported
    /// by a callback end the search.
    pub fn construct_path(
        &self,
        store: &CandidateStore,
        leaf: &SharedCertificate,
        cbs: &ChainBuildSettings,
    ) -> Result<ConstructedPath> {
        let mut last_err = Error::Unrecognized;
        for f in &self.construct_path_callbacks {
            match f(self, store, leaf, cbs) {
                Ok(path) => return Ok(path),
                Err(e @ (Error::ChainTooLong | Error::OutOfMemory)) => return Err(e),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// add_decode_aia_callback adds a [`DecodeAia`] callback to the list used by decode_aia.
    pub fn add_decode_aia_callback(&mut self, c: DecodeAia) {
        self.decode_aia_callbacks.push(c);
    }

    /// clear_decode_aia_callbacks clears the list of [`DecodeAia`] callbacks.
    pub fn clear_decode_aia_callbacks(&mut self) {
        self.decode_aia_callbacks.clear();
    }

    /// decode_aia returns the access descriptions from the first [`DecodeAia`] callback able to
    /// decode the presented extension value. Undecodable values yield an empty vector.
    pub fn decode_aia(&self, enc_aia: &[u8]) -> Vec<(ObjectIdentifier, String)> {
        for f in &self.decode_aia_callbacks {
            if let Ok(records) = f(enc_aia) {
                return records;
            }
        }
        log_message(
            &ChainLogLevels::ChainDebug,
            "Failed to decode authority information access extension",
        );
        vec![]
    }

    /// add_trust_store_accessor adds a [`TrustStoreAccessor`] object to the list used by
    /// get_store_certificates.
    pub fn add_trust_store_accessor(&mut self, c: Box<(dyn TrustStoreAccessor + Send + Sync)>) {
        self.trust_store_accessors.push(c);
    }

    /// clear_trust_store_accessors clears the list of [`TrustStoreAccessor`] objects.
    pub fn clear_trust_store_accessors(&mut self) {
        self.trust_store_accessors.clear();
    }

    /// get_store_certificates returns the concatenation of the given store's contents across all
    /// registered [`TrustStoreAccessor`] objects.
    pub fn get_store_certificates(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> Vec<SharedCertificate> {
        let mut retval = vec![];
        for s in &self.trust_store_accessors {
            match s.get_certificates(name, location) {
                Ok(certs) => retval.extend(certs),
                Err(e) => log_message(
                    &ChainLogLevels::ChainWarn,
                    &format!(
                        "Failed to read {:?} store at {:?} location: {}",
                        name, location, e
                    ),
                ),
            }
        }
        retval
    }

    /// add_asset_downloader adds an [`AssetDownloader`] object to the list used by download.
    pub fn add_asset_downloader(&mut self, c: Box<(dyn AssetDownloader + Send + Sync)>) {
        self.asset_downloaders.push(c);
    }

    /// clear_asset_downloaders clears the list of [`AssetDownloader`] objects.
    pub fn clear_asset_downloaders(&mut self) {
        self.asset_downloaders.clear();
    }

    /// download tries each [`AssetDownloader`] in turn, charging the time spent against `budget`.
    /// Returns None without attempting anything once the budget is exhausted.
    pub fn download(&self, uri: &str, budget: &mut TimeBudget) -> Option<Vec<u8>> {
        for d in &self.asset_downloaders {
            if budget.is_exhausted() {
                log_message(
                    &ChainLogLevels::ChainInfo,
                    &format!("Skipping download of {}: time budget exhausted", uri),
                );
                return None;
            }
            match budget.run_timed(|timeout| d.download(uri, timeout)) {
                Ok(body) => {
                    log_message(
                        &ChainLogLevels::ChainInfo,
                        &format!("Downloaded {} bytes from {}", body.len(), uri),
                    );
                    return Some(body);
                }
                Err(e) => log_message(
                    &ChainLogLevels::ChainError,
                    &format!("Failed to download {}: {}", uri, e),
                ),
            }
        }
        None
    }

    /// add_revocation_provider adds a [`RevocationStatusProvider`] object to the list used by
    /// prepare_revocation and get_revocation_status.
    pub fn add_revocation_provider(
        &mut self,
        c: Box<(dyn RevocationStatusProvider + Send + Sync)>,
    ) {
        self.revocation_providers.push(c);
    }

    /// clear_revocation_providers clears the list of [`RevocationStatusProvider`] objects.
    pub fn clear_revocation_providers(&mut self) {
        self.revocation_providers.clear();
    }

    /// prepare_revocation asks each [`RevocationStatusProvider`] to ready status information for
    /// `cert`. Failures are logged and otherwise ignored.
    pub fn prepare_revocation(
        &self,
        cert: &ChainCertificate,
        mode: RevocationMode,
        time: &VerificationTime,
        budget: &mut TimeBudget,
    ) {
        for p in &self.revocation_providers {
            if let Err(e) = p.prepare(self, cert, mode, time, budget) {
                log_error_for_cert(
                    cert,
                    &format!("Failed to prepare revocation information: {}", e),
                );
            }
        }
    }

    /// get_revocation_status returns the first definitive answer given by a
    /// [`RevocationStatusProvider`]. When none is definitive, the last reason reported is returned,
    /// or [`VerifyErrorCode::UnableToGetCrl`] if no provider is registered.
    pub fn get_revocation_status(
        &self,
        cert: &ChainCertificate,
        issuer: &ChainCertificate,
        time: &VerificationTime,
    ) -> RevocationStatus {
        let mut retval = RevocationStatus::Undetermined(VerifyErrorCode::UnableToGetCrl);
        for p in &self.revocation_providers {
            match p.get_status(self, cert, issuer, time) {
                RevocationStatus::Undetermined(code) => {
                    retval = RevocationStatus::Undetermined(code)
                }
                status => return status,
            }
        }
        retval
    }
}

/// `populate_default_chain_environment` populates a [`ChainEnvironment`] object with the default
/// implementations: [`verify_issued_rust_crypto`](crate::verify_issued_rust_crypto),
/// [`verify_signature_message_rust_crypto`](crate::verify_signature_message_rust_crypto),
/// [`decode_aia_der`](crate::decode_aia_der) and
/// [`construct_path_rfc5280`](crate::construct_path_rfc5280). When the `remote` feature is
/// enabled, an [`HttpAssetDownloader`](crate::HttpAssetDownloader) is added too.
pub fn populate_default_chain_environment(env: &mut ChainEnvironment) {
    env.add_verify_issued_callback(crate::verify_issued_rust_crypto);
    env.add_verify_signature_message_callback(crate::verify_signature_message_rust_crypto);
    env.add_decode_aia_callback(crate::decode_aia_der);
    env.add_construct_path_callback(crate::construct_path_rfc5280);

    #[cfg(feature = "remote")]
    env.add_asset_downloader(Box::new(crate::HttpAssetDownloader::default()));
}
