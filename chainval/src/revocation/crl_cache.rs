//! In-memory CRL store implementing [`RevocationStatusProvider`]

use alloc::collections::BTreeMap;
use alloc::{format, string::String, vec::Vec};
use std::sync::RwLock;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_CRL_NUMBER, ID_CE_CRL_REASONS,
    ID_CE_HOLD_INSTRUCTION_CODE, ID_CE_INVALIDITY_DATE, ID_CE_ISSUING_DISTRIBUTION_POINT,
};
use der::{Decode, Encode};
use x509_cert::crl::CertificateList;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::time::Time;

use crate::util::error::*;
use crate::util::logging::*;
use crate::{
    collect_crl_dp_uris, name_to_string, normalize_name, ChainCertificate, ChainEnvironment,
    RevocationMode, RevocationStatus, RevocationStatusProvider, TimeBudget, VerificationTime,
    VerifyErrorCode,
};

fn unix_secs(t: &Time) -> u64 {
    t.to_unix_duration().as_secs()
}

/// `parse_crl` accepts a DER or PEM ("X509 CRL") encoded certificate revocation list.
pub fn parse_crl(bytes: &[u8]) -> Result<CertificateList> {
    if let Ok(crl) = CertificateList::from_der(bytes) {
        return Ok(crl);
    }
    match pem_rfc7468::decode_vec(bytes) {
        Ok((label, der)) if label == "X509 CRL" => Ok(CertificateList::from_der(&der)?),
        _ => Err(Error::ParseError),
    }
}

/// True when the CRL's validity window covers `time`
fn is_current(crl: &CertificateList, time: &VerificationTime) -> bool {
    let toi = time.as_unix_secs();
    if unix_secs(&crl.tbs_cert_list.this_update) > toi {
        return false;
    }
    match &crl.tbs_cert_list.next_update {
        Some(nu) => unix_secs(nu) >= toi,
        None => true,
    }
}

fn has_unhandled_critical_extension(crl: &CertificateList) -> bool {
    let handled = [
        ID_CE_ISSUING_DISTRIBUTION_POINT,
        ID_CE_CRL_NUMBER,
        ID_CE_AUTHORITY_KEY_IDENTIFIER,
    ];
    if let Some(exts) = &crl.tbs_cert_list.crl_extensions {
        if exts
            .iter()
            .any(|e| e.critical && !handled.contains(&e.extn_id))
        {
            return true;
        }
    }
    let entry_handled = [
        ID_CE_INVALIDITY_DATE,
        ID_CE_CRL_REASONS,
        ID_CE_HOLD_INSTRUCTION_CODE,
    ];
    if let Some(rcs) = &crl.tbs_cert_list.revoked_certificates {
        for rc in rcs {
            if let Some(exts) = &rc.crl_entry_extensions {
                if exts
                    .iter()
                    .any(|e| e.critical && !entry_handled.contains(&e.extn_id))
                {
                    return true;
                }
            }
        }
    }
    false
}

/// [`CrlCache`] holds CRLs keyed by normalized issuer name and answers revocation queries from
/// them. In [`RevocationMode::Online`], `prepare` fetches CRLs named by a certificate's `http`
/// CRL distribution points when no current CRL for its issuer is cached.
///
/// Delta CRLs and indirect CRLs are not supported.
#[derive(Debug, Default)]
pub struct CrlCache {
    crls: RwLock<BTreeMap<String, Vec<CertificateList>>>,
}

impl CrlCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        CrlCache::default()
    }

    /// `add_crl` parses a DER or PEM encoded CRL and adds it to the cache. A CRL already present is
    /// not added twice.
    pub fn add_crl(&self, enc_crl: &[u8]) -> Result<()> {
        let crl = parse_crl(enc_crl)?;
        let key = normalize_name(&crl.tbs_cert_list.issuer);
        let mut crls = self.crls.write().map_err(|_| Error::Unrecognized)?;
        let entry = crls.entry(key).or_default();
        if !entry.contains(&crl) {
            log_message(
                &ChainLogLevels::ChainDebug,
                &format!(
                    "Caching CRL issued by {}",
                    name_to_string(&crl.tbs_cert_list.issuer)
                ),
            );
            entry.push(crl);
        }
        Ok(())
    }

    /// Number of CRLs held for all issuers
    pub fn len(&self) -> usize {
        match self.crls.read() {
            Ok(crls) => crls.values().map(|v| v.len()).sum(),
            Err(_) => 0,
        }
    }

    /// True when no CRLs are cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_current_crl(&self, issuer_key: &str, time: &VerificationTime) -> bool {
        match self.crls.read() {
            Ok(crls) => crls
                .get(issuer_key)
                .map_or(false, |v| v.iter().any(|crl| is_current(crl, time))),
            Err(_) => false,
        }
    }

    /// Returns the most recent CRL for `issuer_key` issued at or before `time`, or the code that
    /// explains why none is usable.
    fn select_crl(
        &self,
        issuer_key: &str,
        time: &VerificationTime,
    ) -> core::result::Result<CertificateList, VerifyErrorCode> {
        let crls = self.crls.read().map_err(|_| VerifyErrorCode::UnableToGetCrl)?;
        let candidates = match crls.get(issuer_key) {
            Some(v) if !v.is_empty() => v,
            _ => return Err(VerifyErrorCode::UnableToGetCrl),
        };
        let toi = time.as_unix_secs();
        candidates
            .iter()
            .filter(|crl| unix_secs(&crl.tbs_cert_list.this_update) <= toi)
            .max_by_key(|crl| unix_secs(&crl.tbs_cert_list.this_update))
            .cloned()
            .ok_or(VerifyErrorCode::CrlNotYetValid)
    }
}

impl RevocationStatusProvider for CrlCache {
    fn prepare(
        &self,
        env: &ChainEnvironment,
        cert: &ChainCertificate,
        mode: RevocationMode,
        time: &VerificationTime,
        budget: &mut TimeBudget,
    ) -> Result<()> {
        if mode != RevocationMode::Online {
            return Ok(());
        }
        let issuer_key = normalize_name(&cert.decoded_cert.tbs_certificate.issuer);
        if self.has_current_crl(&issuer_key, time) {
            return Ok(());
        }
        for uri in collect_crl_dp_uris(cert) {
            if budget.is_exhausted() {
                log_message(
                    &ChainLogLevels::ChainDebug,
                    &format!("Skipping CRL retrieval from {} with no time remaining", uri),
                );
                break;
            }
            if let Some(body) = env.download(&uri, budget) {
                match self.add_crl(&body) {
                    Ok(()) => return Ok(()),
                    Err(e) => log_message(
                        &ChainLogLevels::ChainInfo,
                        &format!("Failed to parse CRL retrieved from {}: {}", uri, e),
                    ),
                }
            }
        }
        Ok(())
    }

    fn get_status(
        &self,
        env: &ChainEnvironment,
        cert: &ChainCertificate,
        issuer: &ChainCertificate,
        time: &VerificationTime,
    ) -> RevocationStatus {
        let issuer_key = normalize_name(&cert.decoded_cert.tbs_certificate.issuer);
        let crl = match self.select_crl(&issuer_key, time) {
            Ok(crl) => crl,
            Err(code) => return RevocationStatus::Undetermined(code),
        };

        if let Some(ku) = issuer.key_usage() {
            if !ku.0.contains(KeyUsages::CRLSign) {
                log_error_for_cert(issuer, "crlSign is not set in key usage extension");
                return RevocationStatus::Undetermined(VerifyErrorCode::KeyUsageNoCrlSign);
            }
        }

        let tbs = match crl.tbs_cert_list.to_der() {
            Ok(tbs) => tbs,
            Err(_) => return RevocationStatus::Undetermined(VerifyErrorCode::CrlSignatureFailure),
        };
        if env
            .verify_signature_message(
                &tbs,
                crl.signature.raw_bytes(),
                &crl.signature_algorithm,
                &issuer.decoded_cert.tbs_certificate.subject_public_key_info,
            )
            .is_err()
        {
            log_error_for_cert(issuer, "CRL signature verification failed");
            return RevocationStatus::Undetermined(VerifyErrorCode::CrlSignatureFailure);
        }

        if let Some(nu) = &crl.tbs_cert_list.next_update {
            if unix_secs(nu) < time.as_unix_secs() {
                return RevocationStatus::Undetermined(VerifyErrorCode::CrlHasExpired);
            }
        }

        if has_unhandled_critical_extension(&crl) {
            return RevocationStatus::Undetermined(VerifyErrorCode::UnhandledCriticalCrlExtension);
        }

        if let Some(rcs) = &crl.tbs_cert_list.revoked_certificates {
            let serial = cert.decoded_cert.tbs_certificate.serial_number.as_bytes();
            for rc in rcs {
                if rc.serial_number.as_bytes() == serial
                    && unix_secs(&rc.revocation_date) <= time.as_unix_secs()
                {
                    log_error_for_cert(cert, "Serial number is listed on CRL");
                    return RevocationStatus::Revoked;
                }
            }
        }
        RevocationStatus::Good
    }
}
