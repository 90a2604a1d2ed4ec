//! The cert_collection module provides an insertion-ordered set of shared certificates. Collections
//! represent the extra store supplied by a caller, the candidate set discovered from a leaf, the
//! certificates obtained by download and the locally trusted roots.

use alloc::collections::BTreeSet;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{CertIdentity, ChainCertificate, SharedCertificate};

/// [`CertificateCollection`] keeps certificates in the order they were added, discarding any whose
/// [`CertIdentity`] is already present.
#[derive(Clone, Debug, Default)]
pub struct CertificateCollection {
    certs: Vec<SharedCertificate>,
    index: BTreeSet<CertIdentity>,
}

impl CertificateCollection {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection from the given certificates, dropping duplicates
    pub fn from_certs<I: IntoIterator<Item = SharedCertificate>>(certs: I) -> Self {
        let mut retval = Self::default();
        for c in certs {
            retval.push(c);
        }
        retval
    }

    /// Adds a certificate. Returns false if an equivalent certificate was already present.
    pub fn push(&mut self, cert: SharedCertificate) -> bool {
        if self.index.insert(cert.identity().clone()) {
            self.certs.push(cert);
            true
        } else {
            false
        }
    }

    /// Wraps and adds a certificate
    pub fn push_cert(&mut self, cert: ChainCertificate) -> bool {
        self.push(Arc::new(cert))
    }

    /// Adds every certificate from `other`
    pub fn extend_from(&mut self, other: &CertificateCollection) {
        for c in other.iter() {
            self.push(c.clone());
        }
    }

    /// True if a certificate with the same identity is present
    pub fn contains(&self, cert: &ChainCertificate) -> bool {
        self.index.contains(cert.identity())
    }

    /// Returns the certificates whose subject matches the issuer name of `cert`
    pub fn find_named_issuers(&self, cert: &ChainCertificate) -> Vec<SharedCertificate> {
        self.certs
            .iter()
            .filter(|c| cert.is_named_issuer(c))
            .cloned()
            .collect()
    }

    /// Iterates in insertion order
    pub fn iter(&self) -> core::slice::Iter<'_, SharedCertificate> {
        self.certs.iter()
    }

    /// Number of certificates
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// True if the collection holds no certificates
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Copies the certificates out in insertion order
    pub fn to_vec(&self) -> Vec<SharedCertificate> {
        self.certs.clone()
    }
}

impl<'a> IntoIterator for &'a CertificateCollection {
    type Item = &'a SharedCertificate;
    type IntoIter = core::slice::Iter<'a, SharedCertificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certs.iter()
    }
}

impl FromIterator<SharedCertificate> for CertificateCollection {
    fn from_iter<I: IntoIterator<Item = SharedCertificate>>(iter: I) -> Self {
        Self::from_certs(iter)
    }
}
