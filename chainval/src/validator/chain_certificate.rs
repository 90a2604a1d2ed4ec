//! Wrapper around a decoded certificate that caches the values consulted during chain building

use alloc::sync::Arc;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use der::{asn1::ObjectIdentifier, Decode, Encode};
use log::error;
use x509_cert::ext::{pkix::crl::CrlDistributionPoints, pkix::*};
use x509_cert::time::Time;
use x509_cert::Certificate;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_EXT_KEY_USAGE, ID_CE_INHIBIT_ANY_POLICY, ID_CE_KEY_USAGE,
    ID_CE_POLICY_CONSTRAINTS, ID_CE_POLICY_MAPPINGS, ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_PE_AUTHORITY_INFO_ACCESS,
};

use crate::util::chain_utilities::name_to_string;
use crate::util::error::*;
use crate::{validator::cert_extension::*, VerificationTime};

/// Certificates are shared read-only between the candidate set, the constructed path and the
/// resulting chain elements.
pub type SharedCertificate = Arc<ChainCertificate>;

/// Logical identity of a certificate. Two certificates with the same identity are treated as the
/// same candidate regardless of which source supplied them.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct CertIdentity {
    /// Subject name in RFC 4514 form
    pub subject: String,
    /// Issuer name in RFC 4514 form
    pub issuer: String,
    /// Serial number bytes as encoded
    pub serial: Vec<u8>,
}

/// Position of a verification time relative to a certificate validity period
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeValidity {
    /// notBefore <= time <= notAfter
    Valid,
    /// time < notBefore
    NotYetValid,
    /// time > notAfter
    Expired,
}

/// [`ChainCertificate`] aggregates a binary, DER-encoded Certificate, a parsed Certificate and the
/// extensions of interest decoded from it.
#[derive(Clone, Debug, Eq, PartialEq)]
#[readonly::make]
pub struct ChainCertificate {
    /// Binary, encoded Certificate object
    #[readonly]
    pub encoded_cert: Vec<u8>,
    /// Decoded Certificate object
    #[readonly]
    pub decoded_cert: Certificate,
    /// Optional file name, URI or other locator for troubleshooting purposes
    pub locator: Option<String>,
    parsed_extensions: ParsedExtensions,
    malformed_extensions: Vec<ObjectIdentifier>,
    identity: CertIdentity,
}

impl TryFrom<&[u8]> for ChainCertificate {
    type Error = der::Error;

    fn try_from(enc_cert: &[u8]) -> der::Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        Ok(ChainCertificate::new(enc_cert.to_vec(), cert))
    }
}

impl TryFrom<Certificate> for ChainCertificate {
    type Error = der::Error;

    fn try_from(cert: Certificate) -> der::Result<Self> {
        let enc_cert = cert.to_der()?;
        Ok(ChainCertificate::new(enc_cert, cert))
    }
}

impl ExtensionProcessing for ChainCertificate {
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ CertExtension>> {
        Ok(self.parsed_extensions.get(oid))
    }
}

impl ChainCertificate {
    fn new(encoded_cert: Vec<u8>, decoded_cert: Certificate) -> Self {
        let tbs = &decoded_cert.tbs_certificate;
        let identity = CertIdentity {
            subject: name_to_string(&tbs.subject),
            issuer: name_to_string(&tbs.issuer),
            serial: tbs.serial_number.as_bytes().to_vec(),
        };
        let mut retval = ChainCertificate {
            identity,
            encoded_cert,
            decoded_cert,
            locator: None,
            parsed_extensions: ParsedExtensions::new(),
            malformed_extensions: Vec::new(),
        };
        retval.parse_extensions();
        retval
    }

    fn parse_extensions(&mut self) {
        macro_rules! decode_into {
            ($v:ident, $oid:ident, $t:ident) => {
                match $t::from_der($v) {
                    Ok(r) => {
                        self.parsed_extensions.insert($oid, CertExtension::$t(r));
                    }
                    Err(e) => {
                        error!(
                            "Failed to decode {} extension from certificate issued to {}: {}",
                            $oid, self.identity.subject, e
                        );
                        self.malformed_extensions.push($oid);
                    }
                }
            };
        }

        let exts = match self.decoded_cert.tbs_certificate.extensions.as_ref() {
            Some(exts) => exts.clone(),
            None => return,
        };
        for ext in &exts {
            let v = ext.extn_value.as_bytes();
            match ext.extn_id {
                ID_CE_BASIC_CONSTRAINTS => {
                    decode_into!(v, ID_CE_BASIC_CONSTRAINTS, BasicConstraints)
                }
                ID_CE_KEY_USAGE => decode_into!(v, ID_CE_KEY_USAGE, KeyUsage),
                ID_CE_EXT_KEY_USAGE => decode_into!(v, ID_CE_EXT_KEY_USAGE, ExtendedKeyUsage),
                ID_PE_AUTHORITY_INFO_ACCESS => {
                    decode_into!(v, ID_PE_AUTHORITY_INFO_ACCESS, AuthorityInfoAccessSyntax)
                }
                ID_CE_CERTIFICATE_POLICIES => {
                    decode_into!(v, ID_CE_CERTIFICATE_POLICIES, CertificatePolicies)
                }
                ID_CE_POLICY_MAPPINGS => decode_into!(v, ID_CE_POLICY_MAPPINGS, PolicyMappings),
                ID_CE_POLICY_CONSTRAINTS => {
                    decode_into!(v, ID_CE_POLICY_CONSTRAINTS, PolicyConstraints)
                }
                ID_CE_INHIBIT_ANY_POLICY => {
                    decode_into!(v, ID_CE_INHIBIT_ANY_POLICY, InhibitAnyPolicy)
                }
                ID_CE_SUBJECT_KEY_IDENTIFIER => {
                    decode_into!(v, ID_CE_SUBJECT_KEY_IDENTIFIER, SubjectKeyIdentifier)
                }
                ID_CE_AUTHORITY_KEY_IDENTIFIER => {
                    decode_into!(v, ID_CE_AUTHORITY_KEY_IDENTIFIER, AuthorityKeyIdentifier)
                }
                ID_CE_CRL_DISTRIBUTION_POINTS => {
                    decode_into!(v, ID_CE_CRL_DISTRIBUTION_POINTS, CrlDistributionPoints)
                }
                _ => {
                    // not of interest
                }
            }
        }
    }

    /// Subject name in RFC 4514 form
    pub fn subject(&self) -> &str {
        &self.identity.subject
    }

    /// Issuer name in RFC 4514 form
    pub fn issuer(&self) -> &str {
        &self.identity.issuer
    }

    /// Serial number bytes as encoded
    pub fn serial(&self) -> &[u8] {
        &self.identity.serial
    }

    /// Identity used to deduplicate certificates obtained from different sources
    pub fn identity(&self) -> &CertIdentity {
        &self.identity
    }

    /// Heuristic root detection: the subject and issuer strings are identical. Names that differ
    /// only in case or spacing are different names. No signature is checked.
    pub fn is_self_signed(&self) -> bool {
        self.identity.subject == self.identity.issuer
    }

    /// True if `candidate`'s subject string is identical to this certificate's issuer string
    pub fn is_named_issuer(&self, candidate: &ChainCertificate) -> bool {
        self.identity.issuer == candidate.identity.subject
    }

    /// notBefore
    pub fn not_before(&self) -> &Time {
        &self.decoded_cert.tbs_certificate.validity.not_before
    }

    /// notAfter
    pub fn not_after(&self) -> &Time {
        &self.decoded_cert.tbs_certificate.validity.not_after
    }

    /// `validity_at` evaluates notBefore first, then notAfter.
    pub fn validity_at(&self, time: &VerificationTime) -> TimeValidity {
        if *time < *self.not_before() {
            TimeValidity::NotYetValid
        } else if *time > *self.not_after() {
            TimeValidity::Expired
        } else {
            TimeValidity::Valid
        }
    }

    /// OIDs of extensions of interest whose encodings could not be decoded
    pub fn malformed_extensions(&self) -> &[ObjectIdentifier] {
        &self.malformed_extensions
    }

    /// OIDs of critical extensions this crate does not process
    pub fn unhandled_critical_extensions(&self) -> Vec<ObjectIdentifier> {
        match &self.decoded_cert.tbs_certificate.extensions {
            Some(exts) => exts
                .iter()
                .filter(|e| e.critical && !is_extension_of_interest(&e.extn_id))
                .map(|e| e.extn_id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Raw extension value for the given OID, if present
    pub fn raw_extension(&self, oid: &ObjectIdentifier) -> Option<&[u8]> {
        self.decoded_cert
            .tbs_certificate
            .extensions
            .as_ref()
            .and_then(|exts| exts.iter().find(|e| e.extn_id == *oid))
            .map(|e| e.extn_value.as_bytes())
    }

    /// Decoded basicConstraints, if present
    pub fn basic_constraints(&self) -> Option<&BasicConstraints> {
        match self.parsed_extensions.get(&ID_CE_BASIC_CONSTRAINTS) {
            Some(CertExtension::BasicConstraints(bc)) => Some(bc),
            _ => None,
        }
    }

    /// True if basicConstraints is present with cA set
    pub fn is_ca(&self) -> bool {
        matches!(self.basic_constraints(), Some(bc) if bc.ca)
    }

    /// Decoded keyUsage, if present
    pub fn key_usage(&self) -> Option<&KeyUsage> {
        match self.parsed_extensions.get(&ID_CE_KEY_USAGE) {
            Some(CertExtension::KeyUsage(ku)) => Some(ku),
            _ => None,
        }
    }

    /// Decoded extKeyUsage, if present
    pub fn extended_key_usage(&self) -> Option<&ExtendedKeyUsage> {
        match self.parsed_extensions.get(&ID_CE_EXT_KEY_USAGE) {
            Some(CertExtension::ExtendedKeyUsage(eku)) => Some(eku),
            _ => None,
        }
    }

    /// Subject key identifier bytes, if present
    pub fn skid(&self) -> Option<&[u8]> {
        match self.parsed_extensions.get(&ID_CE_SUBJECT_KEY_IDENTIFIER) {
            Some(CertExtension::SubjectKeyIdentifier(skid)) => Some(skid.0.as_bytes()),
            _ => None,
        }
    }

    /// Authority key identifier keyIdentifier bytes, if present
    pub fn akid(&self) -> Option<&[u8]> {
        match self.parsed_extensions.get(&ID_CE_AUTHORITY_KEY_IDENTIFIER) {
            Some(CertExtension::AuthorityKeyIdentifier(akid)) => {
                akid.key_identifier.as_ref().map(|k| k.as_bytes())
            }
            _ => None,
        }
    }

    /// Decoded cRLDistributionPoints, if present
    pub fn crl_distribution_points(&self) -> Option<&CrlDistributionPoints> {
        match self.parsed_extensions.get(&ID_CE_CRL_DISTRIBUTION_POINTS) {
            Some(CertExtension::CrlDistributionPoints(dps)) => Some(dps),
            _ => None,
        }
    }
}

/// `parse_cert` takes a buffer containing a binary DER encoded certificate and returns
/// a [`ChainCertificate`] with the locator set if parsing was successful.
pub fn parse_cert(buffer: &[u8], locator: &str) -> Result<ChainCertificate> {
    match ChainCertificate::try_from(buffer) {
        Ok(mut cert) => {
            cert.locator = Some(locator.to_string());
            Ok(cert)
        }
        Err(e) => {
            error!("Failed to parse certificate from {}: {}", locator, e);
            Err(Error::Asn1Error(e))
        }
    }
}
