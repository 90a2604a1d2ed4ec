//! Secondary pass over a built chain that checks requested certificate and application policies

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;

use crate::util::logging::*;
use crate::{
    build_policy_graph, policy_processing_order, ChainResult, ChainStatus, ChainStatusFlag,
    SharedCertificate,
};

/// anyExtendedKeyUsage from RFC 5280 section 4.2.1.12
pub const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// Diagnostic text attached when a requested policy is not satisfied
pub static NO_POLICY_MATCH: &str = "The certificate chain does not satisfy the requested policies";

/// `matches_certificate_policies` returns true if every OID in `requested` is acceptable for the
/// chain per the RFC 5280 valid policy graph. Policy processing failures count as no match.
pub fn matches_certificate_policies(
    path: &[SharedCertificate],
    requested: &[ObjectIdentifier],
) -> bool {
    if requested.is_empty() {
        return true;
    }
    match build_policy_graph(&policy_processing_order(path)) {
        Ok(graph) => graph.satisfies(requested),
        Err(_) => false,
    }
}

/// `matches_application_policies` returns true if every OID in `requested` survives the
/// intersection of the extended key usage extensions across the chain. Certificates without the
/// extension, or asserting anyExtendedKeyUsage, do not restrict usage.
pub fn matches_application_policies(
    path: &[SharedCertificate],
    requested: &[ObjectIdentifier],
) -> bool {
    if requested.is_empty() {
        return true;
    }
    let mut permitted: Option<BTreeSet<ObjectIdentifier>> = None;
    for cert in path {
        let eku = match cert.extended_key_usage() {
            Some(eku) => eku,
            None => continue,
        };
        if eku.0.contains(&ANY_EXTENDED_KEY_USAGE) {
            continue;
        }
        let asserted: BTreeSet<ObjectIdentifier> = eku.0.iter().copied().collect();
        permitted = Some(match permitted {
            Some(p) => p.intersection(&asserted).copied().collect(),
            None => asserted,
        });
    }
    match permitted {
        Some(p) => requested.iter().all(|oid| p.contains(oid)),
        None => true,
    }
}

/// [`PolicyEvaluator`] carries the policies requested for a build.
#[derive(Clone, Debug, Default)]
pub struct PolicyEvaluator {
    certificate_policy: Vec<ObjectIdentifier>,
    application_policy: Vec<ObjectIdentifier>,
}

impl PolicyEvaluator {
    /// Creates an evaluator for the requested certificate and application policies
    pub fn new(
        certificate_policy: &[ObjectIdentifier],
        application_policy: &[ObjectIdentifier],
    ) -> Self {
        PolicyEvaluator {
            certificate_policy: certificate_policy.to_vec(),
            application_policy: application_policy.to_vec(),
        }
    }

    /// `apply` adds [`ChainStatusFlag::InvalidPolicyConstraints`] to the leaf element and the
    /// overall status when either requested policy list is not satisfied. Nothing is evaluated
    /// when both lists are empty. Returns true if the policies are satisfied.
    pub fn apply(&self, result: &mut ChainResult) -> bool {
        if self.certificate_policy.is_empty() && self.application_policy.is_empty() {
            return true;
        }
        let path: Vec<SharedCertificate> = result
            .elements
            .iter()
            .map(|e| e.certificate.clone())
            .collect();
        if path.is_empty() {
            return true;
        }

        let cp_ok = matches_certificate_policies(&path, &self.certificate_policy);
        let ap_ok = matches_application_policies(&path, &self.application_policy);
        if cp_ok && ap_ok {
            return true;
        }

        log_debug_for_cert(&path[0], "Requested policies are not satisfied");
        result.add_element_status(
            0,
            ChainStatus::new(ChainStatusFlag::InvalidPolicyConstraints, NO_POLICY_MATCH),
        );
        false
    }
}
