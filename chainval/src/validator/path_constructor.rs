//! Default path construction and verification primitive
//!
//! [`construct_path_rfc5280`] plays the role of a native verifier: it builds a single path from
//! the leaf using only the candidate store, then checks it and reports the first problem found
//! along with the depth at which it occurred.

use alloc::{format, vec, vec::Vec};

use x509_cert::certificate::Version;
use x509_cert::ext::pkix::KeyUsages;

use crate::util::error::*;
use crate::util::logging::*;
use crate::{
    build_policy_graph, get_max_chain_depth, policy_processing_order, CertificateCollection,
    ChainBuildSettings, ChainCertificate, ChainEnvironment, PolicyGraphFailure, RevocationFlag,
    RevocationStatus, SharedCertificate, TimeValidity, VerificationTime, VerifyErrorCode,
};

/// Trust-store-equivalent structure handed to a [`ConstructPath`](crate::ConstructPath)
/// implementation
#[derive(Clone, Debug)]
pub struct CandidateStore {
    /// Every certificate that may appear in the path
    pub candidates: CertificateCollection,
    /// Explicitly distrusted certificates
    pub disallowed: CertificateCollection,
    /// Elements whose revocation status is consulted, or None when revocation is not checked
    pub revocation_flag: Option<RevocationFlag>,
    /// Time at which validity is evaluated
    pub verification_time: VerificationTime,
}

/// First problem reported by a path constructor
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PathFailure {
    /// What went wrong
    pub code: VerifyErrorCode,
    /// Index of the affected certificate, leaf is 0
    pub depth: usize,
}

/// Path produced by a [`ConstructPath`](crate::ConstructPath) implementation
#[derive(Clone, Debug, Default)]
pub struct ConstructedPath {
    /// Certificates from the leaf to the last reachable certificate
    pub path: Vec<SharedCertificate>,
    /// First problem found, if any
    pub error: Option<PathFailure>,
}

impl ConstructedPath {
    fn failed(path: Vec<SharedCertificate>, code: VerifyErrorCode, depth: usize) -> Self {
        ConstructedPath {
            path,
            error: Some(PathFailure { code, depth }),
        }
    }
}

fn key_ids_compatible(subject: &ChainCertificate, issuer: &ChainCertificate) -> bool {
    match (subject.akid(), issuer.skid()) {
        (Some(akid), Some(skid)) => akid == skid,
        _ => true,
    }
}

/// Picks the issuer of `cur` from the store, preferring candidates whose signature relationship
/// holds and then those valid at the verification time. Ties go to the earliest candidate.
fn select_issuer(
    env: &ChainEnvironment,
    store: &CandidateStore,
    cur: &ChainCertificate,
    path: &[SharedCertificate],
) -> Option<SharedCertificate> {
    let mut best: Option<(u8, &SharedCertificate)> = None;
    for candidate in store.candidates.iter() {
        if !cur.is_named_issuer(candidate)
            || !key_ids_compatible(cur, candidate)
            || path.iter().any(|p| p.identity() == candidate.identity())
        {
            continue;
        }
        let mut rank = 0;
        if env.verify_issued(candidate, cur) {
            rank += 2;
        }
        if candidate.validity_at(&store.verification_time) == TimeValidity::Valid {
            rank += 1;
        }
        if best.map_or(true, |(r, _)| rank > r) {
            best = Some((rank, candidate));
        }
    }
    best.map(|(_, c)| c.clone())
}

fn acts_as_ca(cert: &ChainCertificate) -> bool {
    if cert.is_ca() {
        return true;
    }
    // version 1 self-signed roots carry no extensions
    cert.basic_constraints().is_none()
        && cert.is_self_signed()
        && cert.decoded_cert.tbs_certificate.version == Version::V1
}

fn check_extensions(path: &[SharedCertificate]) -> Option<(VerifyErrorCode, usize)> {
    for (i, cert) in path.iter().enumerate() {
        if !cert.malformed_extensions().is_empty() {
            log_error_for_cert(cert, "Malformed extension");
            return Some((VerifyErrorCode::InvalidExtension, i));
        }
        if !cert.unhandled_critical_extensions().is_empty() {
            log_error_for_cert(cert, "Unhandled critical extension");
            return Some((VerifyErrorCode::UnhandledCriticalExtension, i));
        }
        if i == 0 {
            continue;
        }
        if !acts_as_ca(cert) {
            log_error_for_cert(cert, "Issuer is not a CA");
            return Some((VerifyErrorCode::InvalidCa, i));
        }
        if let Some(ku) = cert.key_usage() {
            if !ku.0.contains(KeyUsages::KeyCertSign) {
                log_error_for_cert(cert, "Key usage lacks keyCertSign");
                return Some((VerifyErrorCode::KeyUsageNoCertSign, i));
            }
        }
        if let Some(plc) = cert.basic_constraints().and_then(|bc| bc.path_len_constraint) {
            let intermediates_below = path[1..i].iter().filter(|c| !c.is_self_signed()).count();
            if intermediates_below > plc as usize {
                log_error_for_cert(cert, "Path length constraint exceeded");
                return Some((VerifyErrorCode::PathLengthExceeded, i));
            }
        }
    }
    None
}

fn revocation_indices(path: &[SharedCertificate], flag: RevocationFlag) -> Vec<usize> {
    match flag {
        RevocationFlag::EndCertificateOnly => vec![0],
        RevocationFlag::ExcludeRoot => {
            let n = path.len();
            if n > 1 && path[n - 1].is_self_signed() {
                (0..n - 1).collect()
            } else {
                (0..n).collect()
            }
        }
        RevocationFlag::EntireChain => (0..path.len()).collect(),
    }
}

fn check_revocation(
    env: &ChainEnvironment,
    store: &CandidateStore,
    path: &[SharedCertificate],
    flag: RevocationFlag,
) -> Option<(VerifyErrorCode, usize)> {
    for i in revocation_indices(path, flag) {
        let cert = &path[i];
        let issuer = match path.get(i + 1) {
            Some(issuer) => issuer,
            None if cert.is_self_signed() => cert,
            None => continue,
        };
        match env.get_revocation_status(cert, issuer, &store.verification_time) {
            RevocationStatus::Good => {}
            RevocationStatus::Revoked => {
                log_error_for_cert(cert, "Certificate is revoked");
                return Some((VerifyErrorCode::CertRevoked, i));
            }
            RevocationStatus::Undetermined(code) => {
                log_debug_for_cert(cert, &format!("Revocation status not determined: {}", code));
                return Some((code, i));
            }
        }
    }
    None
}

fn check_signatures_and_times(
    env: &ChainEnvironment,
    store: &CandidateStore,
    path: &[SharedCertificate],
) -> Option<(VerifyErrorCode, usize)> {
    for i in (0..path.len()).rev() {
        let cert = &path[i];
        if let Some(issuer) = path.get(i + 1) {
            if !env.verify_issued(issuer, cert) {
                log_error_for_cert(cert, "Signature verification failed");
                return Some((VerifyErrorCode::CertSignatureFailure, i));
            }
        }
        match cert.validity_at(&store.verification_time) {
            TimeValidity::Valid => {}
            TimeValidity::NotYetValid => return Some((VerifyErrorCode::CertNotYetValid, i)),
            TimeValidity::Expired => return Some((VerifyErrorCode::CertHasExpired, i)),
        }
    }
    None
}

/// `construct_path_rfc5280` implements the [`ConstructPath`](crate::ConstructPath) interface for
/// [`ChainEnvironment`].
///
/// A single path is built from `leaf` by repeatedly selecting an issuer from the store until a
/// self-signed certificate is reached. The path is then checked in this order, stopping at the
/// first problem: extensions and CA constraints (leaf first), explicit distrust, revocation,
/// signatures and validity periods (top first) and certificate policy processing.
///
/// Exceeding [`CBS_MAX_CHAIN_DEPTH`](crate::CBS_MAX_CHAIN_DEPTH) is reported as
/// [`VerifyErrorCode::CertChainTooLong`], which aborts the build.
pub fn construct_path_rfc5280(
    env: &ChainEnvironment,
    store: &CandidateStore,
    leaf: &SharedCertificate,
    cbs: &ChainBuildSettings,
) -> Result<ConstructedPath> {
    let max_depth = get_max_chain_depth(cbs) as usize;
    let mut path = vec![leaf.clone()];

    loop {
        let cur = match path.last() {
            Some(cur) => cur.clone(),
            None => return Err(Error::Unrecognized),
        };
        if cur.is_self_signed() {
            break;
        }
        match select_issuer(env, store, &cur, &path) {
            Some(issuer) => {
                if path.len() >= max_depth {
                    let depth = path.len() - 1;
                    return Ok(ConstructedPath::failed(
                        path,
                        VerifyErrorCode::CertChainTooLong,
                        depth,
                    ));
                }
                path.push(issuer);
            }
            None => {
                let depth = path.len() - 1;
                let code = if depth == 0 {
                    VerifyErrorCode::UnableToVerifyLeafSignature
                } else {
                    VerifyErrorCode::UnableToGetIssuerCertLocally
                };
                log_debug_for_cert(&cur, "No issuer found among candidates");
                return Ok(ConstructedPath::failed(path, code, depth));
            }
        }
    }

    if let Some((code, depth)) = check_extensions(&path) {
        return Ok(ConstructedPath::failed(path, code, depth));
    }

    if let Some(depth) = path.iter().position(|c| store.disallowed.contains(c)) {
        log_error_for_cert(&path[depth], "Certificate is explicitly distrusted");
        return Ok(ConstructedPath::failed(
            path,
            VerifyErrorCode::CertRejected,
            depth,
        ));
    }

    if let Some(flag) = store.revocation_flag {
        if let Some((code, depth)) = check_revocation(env, store, &path, flag) {
            return Ok(ConstructedPath::failed(path, code, depth));
        }
    }

    if let Some((code, depth)) = check_signatures_and_times(env, store, &path) {
        return Ok(ConstructedPath::failed(path, code, depth));
    }

    match build_policy_graph(&policy_processing_order(&path)) {
        Ok(_) => {}
        Err(PolicyGraphFailure::AnyPolicyMapped(depth)) => {
            return Ok(ConstructedPath::failed(
                path,
                VerifyErrorCode::InvalidPolicyExtension,
                depth,
            ));
        }
        Err(PolicyGraphFailure::NoExplicitPolicy(depth)) => {
            return Ok(ConstructedPath::failed(
                path,
                VerifyErrorCode::NoExplicitPolicy,
                depth,
            ));
        }
    }

    Ok(ConstructedPath { path, error: None })
}
