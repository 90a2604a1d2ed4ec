//! Builds the authoritative path for a leaf from its candidate set and annotates each element

use alloc::format;

use crate::util::error::*;
use crate::util::logging::*;
use crate::{
    get_application_policy_as_oids, get_certificate_policy_as_oids, get_revocation_flag,
    get_revocation_mode, get_verification_flags_as_set, get_verification_time_or_now,
    CandidateSet, CandidateSetBuilder, CandidateStore, CertificateCollection, ChainBuildSettings,
    ChainElement, ChainEnvironment, ChainResult, ChainStatus, PolicyEvaluator, RevocationFlag,
    RevocationMode, SharedCertificate, TimeBudget, VerificationTime, VerifyErrorCode,
};

/// [`ChainVerifier`] runs the environment's path constructor over a candidate set and turns the
/// outcome into a [`ChainResult`].
pub struct ChainVerifier<'a> {
    env: &'a ChainEnvironment,
}

impl<'a> ChainVerifier<'a> {
    /// Creates a verifier that uses the collaborators registered with `env`
    pub fn new(env: &'a ChainEnvironment) -> Self {
        ChainVerifier { env }
    }

    /// `verify` constructs a path from `leaf` and annotates it.
    ///
    /// When `mode` is not [`RevocationMode::NoCheck`], revocation providers are prepared for the
    /// leaf and, unless `flag` is [`RevocationFlag::EndCertificateOnly`], for every other candidate
    /// before the path constructor runs. The constructor's error, if any, is mapped onto the element
    /// at the reported depth. Independently, a self-signed last element that was downloaded or is
    /// absent from the trusted root stores is marked [`UntrustedRoot`](crate::ChainStatusFlag::UntrustedRoot).
    ///
    /// Chain-too-long, out-of-memory and unrecognized codes are returned as errors.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        leaf: &SharedCertificate,
        candidate_set: &CandidateSet,
        mode: RevocationMode,
        flag: RevocationFlag,
        time: &VerificationTime,
        cbs: &ChainBuildSettings,
        budget: &mut TimeBudget,
    ) -> Result<ChainResult> {
        let revocation_flag = if RevocationMode::NoCheck == mode {
            None
        } else {
            let mut lookup = true;
            for cert in candidate_set.candidates.iter() {
                if !lookup {
                    break;
                }
                self.env.prepare_revocation(cert, mode, time, budget);
                lookup = flag != RevocationFlag::EndCertificateOnly;
            }
            Some(flag)
        };

        let store = CandidateStore {
            candidates: candidate_set.candidates.clone(),
            disallowed: candidate_set.disallowed.clone(),
            revocation_flag,
            verification_time: *time,
        };

        let constructed = self.env.construct_path(&store, leaf, cbs)?;

        let mut result = ChainResult::new();
        for cert in &constructed.path {
            result.elements.push(ChainElement::new(cert.clone()));
        }

        if let Some(failure) = constructed.error {
            let status = ChainStatus::from_verify_error(failure.code)?;
            if failure.depth < result.elements.len() {
                log_message(
                    &ChainLogLevels::ChainDebug,
                    &format!(
                        "Path for {} failed at depth {}: {}",
                        leaf.subject(),
                        failure.depth,
                        failure.code
                    ),
                );
                result.add_element_status(failure.depth, status);
            } else {
                log_message(
                    &ChainLogLevels::ChainWarn,
                    &format!(
                        "Ignoring error reported at depth {} for a path of length {}",
                        failure.depth,
                        result.elements.len()
                    ),
                );
            }
        }

        if let Some(last) = constructed.path.last() {
            if last.is_self_signed()
                && (candidate_set.downloaded.contains(last)
                    || !candidate_set.system_trusted.contains(last))
            {
                let depth = constructed.path.len() - 1;
                log_debug_for_cert(last, "Root is not trusted");
                result.add_element_status(
                    depth,
                    ChainStatus::from_verify_error(VerifyErrorCode::CertUntrusted)?,
                );
            }
        }

        Ok(result)
    }
}

/// `build_chain` discovers candidates for `leaf`, constructs and annotates a path and applies the
/// requested policies. Settings are read from `cbs`; see [`ChainBuildSettings`].
///
/// Any verification flag is rejected with [`Error::NotSupported`] before other work is done.
/// Network activity is charged against `budget`, and once it is exhausted no further downloads are
/// attempted.
pub fn build_chain(
    env: &ChainEnvironment,
    leaf: &SharedCertificate,
    extra: &CertificateCollection,
    cbs: &ChainBuildSettings,
    budget: &mut TimeBudget,
) -> Result<ChainResult> {
    if !get_verification_flags_as_set(cbs)?.is_empty() {
        log_message(
            &ChainLogLevels::ChainError,
            "Verification flags are not supported",
        );
        return Err(Error::NotSupported);
    }
    let time = get_verification_time_or_now(cbs)?;
    let mode = get_revocation_mode(cbs);
    let flag = get_revocation_flag(cbs);
    let certificate_policy = get_certificate_policy_as_oids(cbs);
    let application_policy = get_application_policy_as_oids(cbs);

    let candidate_set = CandidateSetBuilder::new(env).build(leaf, extra, budget);
    let mut result =
        ChainVerifier::new(env).verify(leaf, &candidate_set, mode, flag, &time, cbs, budget)?;
    PolicyEvaluator::new(&certificate_policy, &application_policy).apply(&mut result);
    Ok(result)
}
