//! Policy graph-based certificate policy processing
//!
//! The graph is held as a pool of nodes and one row of pool indices per depth. Nodes refer to
//! their parents by index, so a node may have several parents as in draft-davidben-x509-policy-graph.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::{vec, vec::Vec};

use const_oid::db::rfc5280::ANY_POLICY;
use const_oid::db::rfc5912::{
    ID_CE_CERTIFICATE_POLICIES, ID_CE_INHIBIT_ANY_POLICY, ID_CE_POLICY_CONSTRAINTS,
    ID_CE_POLICY_MAPPINGS,
};
use der::asn1::ObjectIdentifier;

use crate::util::logging::*;
use crate::{CertExtension, ChainCertificate, ExtensionProcessing, SharedCertificate};

/// Set of object identifiers
pub type ObjectIdentifierSet = BTreeSet<ObjectIdentifier>;

/// Indices into the node pool for the nodes at one depth
type PolicyGraphRow = Vec<usize>;

#[derive(Clone, Debug)]
struct PolicyNode {
    valid_policy: ObjectIdentifier,
    expected_policy_set: ObjectIdentifierSet,
    parents: Vec<usize>,
}

/// Reasons policy processing can fail. Each carries the chain index (leaf is 0) of the certificate
/// being processed when the failure was detected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PolicyGraphFailure {
    /// anyPolicy appears as an issuer or subject domain policy in a policy mapping
    AnyPolicyMapped(usize),
    /// An explicit policy is required but the valid policy graph is null
    NoExplicitPolicy(usize),
}

/// The valid policy graph after processing a chain with an initial policy set of anyPolicy and
/// all initial indicators clear.
#[derive(Clone, Debug)]
pub struct ValidPolicyGraph {
    pool: Vec<PolicyNode>,
    rows: Vec<PolicyGraphRow>,
    null: bool,
}

fn add_node(
    pool: &mut Vec<PolicyNode>,
    row: &mut PolicyGraphRow,
    valid_policy: ObjectIdentifier,
    expected_policy_set: ObjectIdentifierSet,
    parents: Vec<usize>,
) {
    let index = pool.len();
    pool.push(PolicyNode {
        valid_policy,
        expected_policy_set,
        parents,
    });
    row.push(index);
}

fn row_node_with_policy(
    pool: &[PolicyNode],
    row: &PolicyGraphRow,
    policy: &ObjectIdentifier,
) -> Option<usize> {
    row.iter().copied().find(|i| pool[*i].valid_policy == *policy)
}

/// Removes childless nodes at depths `depth` and shallower.
fn prune_childless(pool: &[PolicyNode], rows: &mut [PolicyGraphRow], depth: usize) {
    for d in (0..=depth).rev() {
        if d + 1 >= rows.len() {
            continue;
        }
        let (upper, lower) = rows.split_at_mut(d + 1);
        let children = &lower[0];
        upper[d].retain(|p| children.iter().any(|c| pool[*c].parents.contains(p)));
    }
}

/// Certificates subject to policy processing, from the top of the chain down to the leaf. A
/// self-signed top element is treated as the trust anchor and excluded unless it is the only
/// certificate.
pub fn policy_processing_order(path: &[SharedCertificate]) -> Vec<&ChainCertificate> {
    let mut n = path.len();
    if n > 1 && path[n - 1].is_self_signed() {
        n -= 1;
    }
    path[..n].iter().rev().map(|c| c.as_ref()).collect()
}

/// `build_policy_graph` performs RFC 5280 section 6.1.3 (d) through (f), 6.1.4 (a), (b), (h),
/// (i) and (j) and the explicit policy portions of 6.1.5 over `certs`, ordered from the top of
/// the chain down to the leaf.
pub fn build_policy_graph(
    certs: &[&ChainCertificate],
) -> core::result::Result<ValidPolicyGraph, PolicyGraphFailure> {
    let n = certs.len();
    let mut explicit_policy = n as u32 + 1;
    let mut inhibit_any_policy = n as u32 + 1;
    let mut policy_mapping = n as u32 + 1;

    let mut pool = vec![];
    let mut root_row = PolicyGraphRow::new();
    add_node(
        &mut pool,
        &mut root_row,
        ANY_POLICY,
        ObjectIdentifierSet::from([ANY_POLICY]),
        vec![],
    );
    let mut rows = vec![root_row];
    let mut null = false;

    for (pos, cert) in certs.iter().enumerate() {
        let i = pos + 1;
        let chain_index = n - i;
        let self_issued = cert.is_self_signed();
        rows.push(PolicyGraphRow::new());

        let cps = match cert.get_extension(&ID_CE_CERTIFICATE_POLICIES) {
            Ok(Some(CertExtension::CertificatePolicies(cps))) => Some(cps),
            _ => None,
        };

        match cps {
            Some(cps) if !null => {
                let mut any_policy_asserted = false;
                for pi in &cps.0 {
                    let p_oid = pi.policy_identifier;
                    if p_oid == ANY_POLICY {
                        any_policy_asserted = true;
                        continue;
                    }
                    // parents expecting P, else the anyPolicy node
                    let mut parents: Vec<usize> = rows[i - 1]
                        .iter()
                        .copied()
                        .filter(|p| pool[*p].expected_policy_set.contains(&p_oid))
                        .collect();
                    if parents.is_empty() {
                        if let Some(ap) = row_node_with_policy(&pool, &rows[i - 1], &ANY_POLICY) {
                            parents.push(ap);
                        }
                    }
                    if !parents.is_empty()
                        && row_node_with_policy(&pool, &rows[i], &p_oid).is_none()
                    {
                        add_node(
                            &mut pool,
                            &mut rows[i],
                            p_oid,
                            ObjectIdentifierSet::from([p_oid]),
                            parents,
                        );
                    }
                }

                if any_policy_asserted && (inhibit_any_policy > 0 || (i < n && self_issued)) {
                    let mut expected: BTreeMap<ObjectIdentifier, Vec<usize>> = BTreeMap::new();
                    for p in &rows[i - 1] {
                        for ep in &pool[*p].expected_policy_set {
                            expected.entry(*ep).or_default().push(*p);
                        }
                    }
                    for (ep, parents) in expected {
                        if row_node_with_policy(&pool, &rows[i], &ep).is_none() {
                            add_node(
                                &mut pool,
                                &mut rows[i],
                                ep,
                                ObjectIdentifierSet::from([ep]),
                                parents,
                            );
                        }
                    }
                }

                prune_childless(&pool, &mut rows, i - 1);
                if rows[i].is_empty() {
                    null = true;
                }
            }
            _ => null = true,
        }

        if explicit_policy == 0 && null {
            log_debug_for_cert(cert, "Valid policy graph is null with explicit policy required");
            return Err(PolicyGraphFailure::NoExplicitPolicy(chain_index));
        }

        if i != n {
            if let Ok(Some(CertExtension::PolicyMappings(pm))) =
                cert.get_extension(&ID_CE_POLICY_MAPPINGS)
            {
                let mut mappings: BTreeMap<ObjectIdentifier, ObjectIdentifierSet> =
                    BTreeMap::new();
                for m in &pm.0 {
                    if m.issuer_domain_policy == ANY_POLICY
                        || m.subject_domain_policy == ANY_POLICY
                    {
                        log_error_for_cert(cert, "anyPolicy appears in policy mappings");
                        return Err(PolicyGraphFailure::AnyPolicyMapped(chain_index));
                    }
                    mappings
                        .entry(m.issuer_domain_policy)
                        .or_default()
                        .insert(m.subject_domain_policy);
                }

                if !null {
                    if policy_mapping > 0 {
                        let mut unmatched = mappings.clone();
                        for idx in rows[i].clone() {
                            if let Some(sdps) = mappings.get(&pool[idx].valid_policy) {
                                pool[idx].expected_policy_set = sdps.clone();
                                unmatched.remove(&pool[idx].valid_policy);
                            }
                        }
                        if let Some(ap) = row_node_with_policy(&pool, &rows[i], &ANY_POLICY) {
                            let parents = pool[ap].parents.clone();
                            for (idp, sdps) in unmatched {
                                add_node(&mut pool, &mut rows[i], idp, sdps, parents.clone());
                            }
                        }
                    } else {
                        rows[i].retain(|x| !mappings.contains_key(&pool[*x].valid_policy));
                        prune_childless(&pool, &mut rows, i - 1);
                        if rows[i].is_empty() {
                            null = true;
                        }
                    }
                }
            }

            if !self_issued {
                explicit_policy = explicit_policy.saturating_sub(1);
                policy_mapping = policy_mapping.saturating_sub(1);
                inhibit_any_policy = inhibit_any_policy.saturating_sub(1);
            }

            if let Ok(Some(CertExtension::PolicyConstraints(pc))) =
                cert.get_extension(&ID_CE_POLICY_CONSTRAINTS)
            {
                if let Some(rep) = pc.require_explicit_policy {
                    explicit_policy = explicit_policy.min(rep);
                }
                if let Some(ipm) = pc.inhibit_policy_mapping {
                    policy_mapping = policy_mapping.min(ipm);
                }
            }

            if let Ok(Some(CertExtension::InhibitAnyPolicy(iap))) =
                cert.get_extension(&ID_CE_INHIBIT_ANY_POLICY)
            {
                inhibit_any_policy = inhibit_any_policy.min(iap.0);
            }
        } else {
            // wrap-up
            explicit_policy = explicit_policy.saturating_sub(1);
            if let Ok(Some(CertExtension::PolicyConstraints(pc))) =
                cert.get_extension(&ID_CE_POLICY_CONSTRAINTS)
            {
                if pc.require_explicit_policy == Some(0) {
                    explicit_policy = 0;
                }
            }
            if explicit_policy == 0 && null {
                log_debug_for_cert(cert, "Valid policy graph is null with explicit policy required");
                return Err(PolicyGraphFailure::NoExplicitPolicy(chain_index));
            }
        }
    }

    Ok(ValidPolicyGraph { pool, rows, null })
}

impl ValidPolicyGraph {
    /// True if the graph was reduced to NULL
    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Authority-domain policies reachable from `index`. anyPolicy is reported when the node is
    /// connected to the root only through anyPolicy nodes.
    fn authority_policies(&self, index: usize, acc: &mut ObjectIdentifierSet) {
        let node = &self.pool[index];
        if node.parents.is_empty() {
            acc.insert(node.valid_policy);
            return;
        }
        for p in &node.parents {
            if self.pool[*p].valid_policy == ANY_POLICY && node.valid_policy != ANY_POLICY {
                acc.insert(node.valid_policy);
            } else {
                self.authority_policies(*p, acc);
            }
        }
    }

    /// `authority_constrained_policies` returns the authority-domain policies for which the chain
    /// is valid. anyPolicy in the result means every policy is acceptable.
    pub fn authority_constrained_policies(&self) -> ObjectIdentifierSet {
        let mut retval = ObjectIdentifierSet::new();
        if self.null {
            return retval;
        }
        if let Some(last) = self.rows.last() {
            for index in last {
                self.authority_policies(*index, &mut retval);
            }
        }
        retval
    }

    /// `satisfies` returns true if every policy in `requested` is acceptable.
    pub fn satisfies(&self, requested: &[ObjectIdentifier]) -> bool {
        if self.null {
            return false;
        }
        let acceptable = self.authority_constrained_policies();
        acceptable.contains(&ANY_POLICY) || requested.iter().all(|p| acceptable.contains(p))
    }
}
