//! Breadth-first discovery of every certificate that could participate in a chain for a leaf

use alloc::collections::VecDeque;
use alloc::{format, vec};

use crate::{
    util::logging::*, CertificateCollection, ChainEnvironment, IssuerResolver, SharedCertificate,
    StoreLocation, StoreName, TimeBudget,
};

/// Result of candidate discovery for one leaf
#[derive(Clone, Debug, Default)]
pub struct CandidateSet {
    /// The leaf followed by every issuer reachable from it, in discovery order
    pub candidates: CertificateCollection,
    /// Candidates obtained via AIA download
    pub downloaded: CertificateCollection,
    /// Contents of the user and machine root stores
    pub system_trusted: CertificateCollection,
    /// Contents of the user and machine disallowed stores
    pub disallowed: CertificateCollection,
}

/// [`CandidateSetBuilder`] snapshots the environment's stores when created. The snapshot is
/// used for a single build.
pub struct CandidateSetBuilder<'a> {
    env: &'a ChainEnvironment,
    user_intermediates: CertificateCollection,
    machine_intermediates: CertificateCollection,
    user_roots: CertificateCollection,
    machine_roots: CertificateCollection,
    disallowed: CertificateCollection,
}

impl<'a> CandidateSetBuilder<'a> {
    /// Reads the intermediate, root and disallowed stores from `env`
    pub fn new(env: &'a ChainEnvironment) -> Self {
        let read = |name, location| {
            CertificateCollection::from_certs(env.get_store_certificates(name, location))
        };
        let mut disallowed = read(StoreName::Disallowed, StoreLocation::CurrentUser);
        disallowed.extend_from(&read(StoreName::Disallowed, StoreLocation::LocalMachine));
        CandidateSetBuilder {
            env,
            user_intermediates: read(StoreName::CertificateAuthority, StoreLocation::CurrentUser),
            machine_intermediates: read(
                StoreName::CertificateAuthority,
                StoreLocation::LocalMachine,
            ),
            user_roots: read(StoreName::Root, StoreLocation::CurrentUser),
            machine_roots: read(StoreName::Root, StoreLocation::LocalMachine),
            disallowed,
        }
    }

    /// `build` walks issuers breadth-first from `leaf`. Certificates are deduplicated by identity so
    /// mutually referencing certificates are visited once. Issuers are searched in `extra`, then the
    /// user and machine intermediate stores, then the user and machine root stores.
    pub fn build(
        &self,
        leaf: &SharedCertificate,
        extra: &CertificateCollection,
        budget: &mut TimeBudget,
    ) -> CandidateSet {
        let resolver = IssuerResolver::new(
            self.env,
            vec![
                extra,
                &self.user_intermediates,
                &self.machine_intermediates,
                &self.user_roots,
                &self.machine_roots,
            ],
        );

        let mut system_trusted = self.user_roots.clone();
        system_trusted.extend_from(&self.machine_roots);

        let mut candidates = CertificateCollection::new();
        let mut downloaded = CertificateCollection::new();
        let mut queue = VecDeque::new();
        candidates.push(leaf.clone());
        queue.push_back(leaf.clone());

        while let Some(cur) = queue.pop_front() {
            for issuer in resolver.find_issuers(&cur, &mut downloaded, budget) {
                if candidates.push(issuer.clone()) {
                    queue.push_back(issuer);
                }
            }
        }

        log_message(
            &ChainLogLevels::ChainDebug,
            &format!(
                "Found {} candidates ({} downloaded) for {}",
                candidates.len(),
                downloaded.len(),
                leaf.subject()
            ),
        );

        CandidateSet {
            candidates,
            downloaded,
            system_trusted,
            disallowed: self.disallowed.clone(),
        }
    }
}
