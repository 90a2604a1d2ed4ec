//! The cert_stores module provides an in-memory implementation of [`TrustStoreAccessor`]. Stores
//! are populated programmatically or, with the `std` feature, from folders of DER or PEM files.
//!
//! ```
//! use chainval::*;
//!
//! let mut stores = CertificateStores::default();
//! // stores.load_folder(StoreName::Root, StoreLocation::LocalMachine, "/path/to/roots");
//!
//! let mut env = ChainEnvironment::default();
//! env.add_trust_store_accessor(Box::new(stores));
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::{
    util::error::*, CertificateCollection, ChainCertificate, SharedCertificate, StoreLocation,
    StoreName, TrustStoreAccessor,
};

/// [`CertificateStores`] maps each (location, name) pair onto a [`CertificateCollection`].
#[derive(Clone, Debug, Default)]
pub struct CertificateStores {
    stores: BTreeMap<(StoreLocation, StoreName), CertificateCollection>,
}

impl CertificateStores {
    /// Creates an empty set of stores
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shared certificate to a store. Returns false if the store already held it.
    pub fn add_certificate(
        &mut self,
        name: StoreName,
        location: StoreLocation,
        cert: SharedCertificate,
    ) -> bool {
        self.stores.entry((location, name)).or_default().push(cert)
    }

    /// Parses and adds a DER-encoded certificate to a store.
    pub fn add_encoded_certificate(
        &mut self,
        name: StoreName,
        location: StoreLocation,
        enc_cert: &[u8],
    ) -> Result<bool> {
        let cert = ChainCertificate::try_from(enc_cert)?;
        Ok(self
            .stores
            .entry((location, name))
            .or_default()
            .push_cert(cert))
    }

    /// Returns the collection backing a store, if any certificate has been added to it
    pub fn get_store(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> Option<&CertificateCollection> {
        self.stores.get(&(location, name))
    }

    /// `load_folder` recursively reads DER or PEM encoded certificates from `folder` into a store
    /// and returns the number of certificates added.
    #[cfg(feature = "std")]
    pub fn load_folder(
        &mut self,
        name: StoreName,
        location: StoreLocation,
        folder: &str,
    ) -> Result<usize> {
        let certs = crate::cert_folder_to_vec(folder)?;
        let store = self.stores.entry((location, name)).or_default();
        let mut added = 0;
        for c in certs {
            if store.push_cert(c) {
                added += 1;
            }
        }
        Ok(added)
    }
}

impl TrustStoreAccessor for CertificateStores {
    fn get_certificates(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> Result<Vec<SharedCertificate>> {
        Ok(self
            .get_store(name, location)
            .map(|s| s.to_vec())
            .unwrap_or_default())
    }
}
