//! Locates the issuers of a single certificate across an ordered list of local sources, falling
//! back to the HTTP CA issuers location from the certificate's AIA extension.

use alloc::{format, vec, vec::Vec};
use alloc::sync::Arc;

use const_oid::db::rfc5912::ID_PE_AUTHORITY_INFO_ACCESS;

use crate::{
    certificates_from_buffer, find_http_aia_record, util::logging::*, CertificateCollection,
    ChainEnvironment, SharedCertificate, TimeBudget,
};

/// [`IssuerResolver`] searches `sources` in order. The first source containing at least one
/// certificate that the environment's issuer-validity predicate accepts supplies the result; later
/// sources are not consulted.
pub struct IssuerResolver<'a> {
    env: &'a ChainEnvironment,
    sources: Vec<&'a CertificateCollection>,
}

impl<'a> IssuerResolver<'a> {
    /// Creates a resolver over the given sources, listed from highest to lowest priority
    pub fn new(env: &'a ChainEnvironment, sources: Vec<&'a CertificateCollection>) -> Self {
        IssuerResolver { env, sources }
    }

    /// `find_issuers` returns the issuers of `cert`.
    ///
    /// Self-signed certificates have no issuers. When no local source yields a match, the first
    /// `http` CA issuers URI from the AIA extension is downloaded, provided `budget` is not
    /// exhausted. A downloaded certificate is returned as the sole issuer and recorded in
    /// `downloaded`. Decoding and download failures are reported as no issuers.
    pub fn find_issuers(
        &self,
        cert: &SharedCertificate,
        downloaded: &mut CertificateCollection,
        budget: &mut TimeBudget,
    ) -> Vec<SharedCertificate> {
        if cert.is_self_signed() {
            return vec![];
        }

        for source in &self.sources {
            let issuers: Vec<SharedCertificate> = source
                .find_named_issuers(cert)
                .into_iter()
                .filter(|candidate| self.env.verify_issued(candidate, cert))
                .collect();
            if !issuers.is_empty() {
                return issuers;
            }
        }

        self.download_issuer(cert, downloaded, budget)
            .map(|issuer| vec![issuer])
            .unwrap_or_default()
    }

    fn download_issuer(
        &self,
        cert: &SharedCertificate,
        downloaded: &mut CertificateCollection,
        budget: &mut TimeBudget,
    ) -> Option<SharedCertificate> {
        let enc_aia = cert.raw_extension(&ID_PE_AUTHORITY_INFO_ACCESS)?;
        let uri = find_http_aia_record(&self.env.decode_aia(enc_aia))?;

        if budget.is_exhausted() {
            log_debug_for_cert(
                cert,
                &format!("Not retrieving {}: time budget exhausted", uri),
            );
            return None;
        }

        let body = self.env.download(&uri, budget)?;
        match certificates_from_buffer(&body, &uri).into_iter().next() {
            Some(issuer) => {
                let issuer = Arc::new(issuer);
                log_message(
                    &ChainLogLevels::ChainInfo,
                    &format!(
                        "Retrieved {} from {} for {}",
                        issuer.subject(),
                        uri,
                        cert.subject()
                    ),
                );
                downloaded.push(issuer.clone());
                Some(issuer)
            }
            None => {
                log_error_for_cert(
                    cert,
                    &format!("No certificate could be parsed from {}", uri),
                );
                None
            }
        }
    }
}
