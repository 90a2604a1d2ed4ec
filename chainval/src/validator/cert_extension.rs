//! Decoded forms of the certificate extensions consulted while building and verifying chains

use alloc::collections::BTreeMap;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_EXT_KEY_USAGE, ID_CE_INHIBIT_ANY_POLICY, ID_CE_KEY_USAGE,
    ID_CE_POLICY_CONSTRAINTS, ID_CE_POLICY_MAPPINGS, ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_PE_AUTHORITY_INFO_ACCESS,
};
use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::{crl::CrlDistributionPoints, *};

use crate::util::error::*;

/// Extensions that are decoded when a [`ChainCertificate`](crate::ChainCertificate) is loaded.
///
/// These are also the extensions the default path constructor knows how to process. A critical
/// extension with any other type causes `UnhandledCriticalExtension` to be reported. Name
/// constraints are not enforced, so nameConstraints and the alternative name extensions are not
/// listed here and a critical instance of any of them is unhandled.
pub static EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_KEY_USAGE,
    ID_CE_EXT_KEY_USAGE,
    ID_PE_AUTHORITY_INFO_ACCESS,
    ID_CE_CERTIFICATE_POLICIES,
    ID_CE_POLICY_MAPPINGS,
    ID_CE_POLICY_CONSTRAINTS,
    ID_CE_INHIBIT_ANY_POLICY,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
    ID_CE_CRL_DISTRIBUTION_POINTS,
];

/// The [`ExtensionProcessing`] trait provides a common means of retrieving decoded extensions from
/// objects that cache them.
pub trait ExtensionProcessing {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// the previously parsed [`CertExtension`] if the extension was present and decodable.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ CertExtension>>;
}

/// [`ParsedExtensions`] associates decoded [`CertExtension`] objects with their object identifiers so
/// extensions are decoded once per certificate.
pub type ParsedExtensions = BTreeMap<ObjectIdentifier, CertExtension>;

/// [`CertExtension`] provides a wrapper for supported extension types.
#[derive(PartialEq, Clone, Eq, Debug)]
pub enum CertExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed SubjectKeyIdentifier extension
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed AuthorityInfoAccessSyntax extension
    AuthorityInfoAccessSyntax(AuthorityInfoAccessSyntax),
    /// Parsed KeyUsage extension
    KeyUsage(KeyUsage),
    /// Parsed CertificatePolicies extension
    CertificatePolicies(CertificatePolicies),
    /// Parsed PolicyMappings extension
    PolicyMappings(PolicyMappings),
    /// Parsed AuthorityKeyIdentifier extension
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    /// Parsed PolicyConstraints extension
    PolicyConstraints(PolicyConstraints),
    /// Parsed InhibitAnyPolicy extension
    InhibitAnyPolicy(InhibitAnyPolicy),
    /// Parsed CRLDistributionPoints extension
    CrlDistributionPoints(CrlDistributionPoints),
}

/// `is_extension_of_interest` returns true if the OID is one of the [`EXTS_OF_INTEREST`].
pub fn is_extension_of_interest(oid: &ObjectIdentifier) -> bool {
    EXTS_OF_INTEREST.contains(oid)
}
