//! Utility functions that support chain building

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use lazy_static::lazy_static;
use regex::Regex;

use const_oid::db::rfc5912::{ID_AD_CA_ISSUERS, ID_CE_CRL_DISTRIBUTION_POINTS};
use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::name::Name;

use crate::{CertExtension, ChainCertificate, ExtensionProcessing};

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// `name_to_string` returns an RFC 4514 string representation of the presented name.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// `normalize_name` returns the string form of a name with whitespace runs collapsed and case
/// folded. It is only used to key cached CRLs; chaining and identity compare exact strings.
pub fn normalize_name(name: &Name) -> String {
    let s = name.to_string().trim().to_lowercase();
    WHITESPACE_RE.replace_all(&s, " ").to_string()
}

/// `find_http_aia_record` returns the first CA issuers URI with an absolute `http` scheme.
///
/// https, ldap and ftp locations are never chased.
pub fn find_http_aia_record(records: &[(ObjectIdentifier, String)]) -> Option<String> {
    records
        .iter()
        .filter(|(method, _)| *method == ID_AD_CA_ISSUERS)
        .map(|(_, uri)| uri)
        .find(|uri| is_absolute_http_uri(uri))
        .cloned()
}

/// True when `uri` has exactly the `http` scheme followed by an authority.
pub fn is_absolute_http_uri(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, rest)) => scheme.eq_ignore_ascii_case("http") && !rest.is_empty(),
        None => false,
    }
}

/// `collect_crl_dp_uris` gathers `http` URIs from the fullName form of each CRL distribution point.
pub fn collect_crl_dp_uris(cert: &ChainCertificate) -> Vec<String> {
    let mut uris = Vec::new();
    if let Ok(Some(CertExtension::CrlDistributionPoints(dps))) =
        cert.get_extension(&ID_CE_CRL_DISTRIBUTION_POINTS)
    {
        for dp in &dps.0 {
            if let Some(DistributionPointName::FullName(names)) = &dp.distribution_point {
                for gn in names {
                    if let GeneralName::UniformResourceIdentifier(uri) = gn {
                        let s = uri.to_string();
                        if is_absolute_http_uri(&s) && !uris.contains(&s) {
                            uris.push(s);
                        }
                    }
                }
            }
        }
    }
    uris
}
