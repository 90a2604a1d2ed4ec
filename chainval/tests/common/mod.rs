#![allow(dead_code)]

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainval::*;
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ID_AD_CA_ISSUERS, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE, ID_EC_PUBLIC_KEY,
    ID_PE_AUTHORITY_INFO_ACCESS,
};
use der::asn1::{BitString, Ia5String, ObjectIdentifier, OctetString, UtcTime};
use der::Encode;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, KeyUsages,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

/// 2023-11-14T22:13:20Z
pub const NOW: u64 = 1_700_000_000;
/// 2020-09-13T12:26:40Z
pub const NOT_BEFORE: u64 = 1_600_000_000;
/// 2027-01-15T08:00:00Z
pub const NOT_AFTER: u64 = 1_800_000_000;

/// Signature value the stub predicates reject
pub const BAD_SIGNATURE: &[u8] = b"bad signature";

pub fn time(secs: u64) -> Time {
    Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

pub fn ext<T: Encode>(oid: ObjectIdentifier, critical: bool, value: &T) -> Extension {
    Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
    }
}

pub fn ca_extensions() -> Vec<Extension> {
    vec![
        ext(
            ID_CE_BASIC_CONSTRAINTS,
            true,
            &BasicConstraints {
                ca: true,
                path_len_constraint: None,
            },
        ),
        ext(
            ID_CE_KEY_USAGE,
            true,
            &KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign),
        ),
    ]
}

pub fn policies_ext(oids: &[&str]) -> Extension {
    let policies = oids
        .iter()
        .map(|o| PolicyInformation {
            policy_identifier: ObjectIdentifier::new_unwrap(o),
            policy_qualifiers: None,
        })
        .collect();
    ext(
        ID_CE_CERTIFICATE_POLICIES,
        false,
        &CertificatePolicies(policies),
    )
}

pub fn eku_ext(oids: &[&str]) -> Extension {
    let ekus = oids.iter().map(|o| ObjectIdentifier::new_unwrap(o)).collect();
    ext(ID_CE_EXT_KEY_USAGE, false, &ExtendedKeyUsage(ekus))
}

pub fn aia_ext(uri: &str) -> Extension {
    let aia = AuthorityInfoAccessSyntax(vec![AccessDescription {
        access_method: ID_AD_CA_ISSUERS,
        access_location: GeneralName::UniformResourceIdentifier(Ia5String::new(uri).unwrap()),
    }]);
    ext(ID_PE_AUTHORITY_INFO_ACCESS, false, &aia)
}

pub fn crl_dp_ext(uri: &str) -> Extension {
    let dps = CrlDistributionPoints(vec![DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(vec![
            GeneralName::UniformResourceIdentifier(Ia5String::new(uri).unwrap()),
        ])),
        reasons: None,
        crl_issuer: None,
    }]);
    ext(ID_CE_CRL_DISTRIBUTION_POINTS, false, &dps)
}

fn signature_alg() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

fn placeholder_spki() -> SubjectPublicKeyInfoOwned {
    SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: ID_EC_PUBLIC_KEY,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(&[4; 65]).unwrap(),
    }
}

/// Describes a synthesized certificate. Signatures are placeholders; tests substitute the
/// issuer-validity predicate with [`verify_issued_by_name`].
#[derive(Clone)]
pub struct CertTemplate {
    pub subject: String,
    pub issuer: String,
    pub serial: u8,
    pub not_before: u64,
    pub not_after: u64,
    pub extensions: Vec<Extension>,
    pub signature: Vec<u8>,
}

impl CertTemplate {
    pub fn new(subject: &str, issuer: &str, serial: u8) -> Self {
        CertTemplate {
            subject: subject.to_string(),
            issuer: issuer.to_string(),
            serial,
            not_before: NOT_BEFORE,
            not_after: NOT_AFTER,
            extensions: vec![],
            signature: vec![1, 2, 3, 4],
        }
    }

    pub fn ca(mut self) -> Self {
        self.extensions.extend(ca_extensions());
        self
    }

    pub fn validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn with(mut self, e: Extension) -> Self {
        self.extensions.push(e);
        self
    }

    pub fn bad_signature(mut self) -> Self {
        self.signature = BAD_SIGNATURE.to_vec();
        self
    }

    pub fn to_der(&self) -> Vec<u8> {
        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[self.serial]).unwrap(),
            signature: signature_alg(),
            issuer: Name::from_str(&self.issuer).unwrap(),
            validity: Validity {
                not_before: time(self.not_before),
                not_after: time(self.not_after),
            },
            subject: Name::from_str(&self.subject).unwrap(),
            subject_public_key_info: placeholder_spki(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if self.extensions.is_empty() {
                None
            } else {
                Some(self.extensions.clone())
            },
        };
        Certificate {
            tbs_certificate: tbs,
            signature_algorithm: signature_alg(),
            signature: BitString::from_bytes(&self.signature).unwrap(),
        }
        .to_der()
        .unwrap()
    }

    pub fn build(&self) -> SharedCertificate {
        Arc::new(ChainCertificate::try_from(self.to_der().as_slice()).unwrap())
    }
}

pub fn root(name: &str) -> CertTemplate {
    CertTemplate::new(name, name, 1).ca()
}

pub fn intermediate(name: &str, issuer: &str) -> CertTemplate {
    CertTemplate::new(name, issuer, 2).ca()
}

pub fn leaf(name: &str, issuer: &str) -> CertTemplate {
    CertTemplate::new(name, issuer, 3)
}

/// Name-chaining stand-in for the signature-checking issuer predicate
pub fn verify_issued_by_name(
    _env: &ChainEnvironment,
    issuer: &ChainCertificate,
    subject: &ChainCertificate,
) -> chainval::Result<()> {
    if !subject.is_named_issuer(issuer) {
        return Err(Error::NotFound);
    }
    if subject.decoded_cert.signature.raw_bytes() == BAD_SIGNATURE {
        return Err(Error::SignatureVerificationFailure);
    }
    Ok(())
}

/// Accepts every message signature except [`BAD_SIGNATURE`]
pub fn verify_message_stub(
    _env: &ChainEnvironment,
    _message: &[u8],
    signature: &[u8],
    _alg: &AlgorithmIdentifierOwned,
    _spki: &SubjectPublicKeyInfoOwned,
) -> chainval::Result<()> {
    if signature == BAD_SIGNATURE {
        Err(Error::SignatureVerificationFailure)
    } else {
        Ok(())
    }
}

pub fn test_environment(stores: CertificateStores) -> ChainEnvironment {
    let mut env = ChainEnvironment::default();
    env.add_verify_issued_callback(verify_issued_by_name);
    env.add_verify_signature_message_callback(verify_message_stub);
    env.add_decode_aia_callback(decode_aia_der);
    env.add_construct_path_callback(construct_path_rfc5280);
    env.add_trust_store_accessor(Box::new(stores));
    env
}

pub fn trusted_root_stores(roots: &[&SharedCertificate]) -> CertificateStores {
    let mut stores = CertificateStores::new();
    for r in roots {
        stores.add_certificate(
            StoreName::Root,
            StoreLocation::LocalMachine,
            (*r).clone(),
        );
    }
    stores
}

pub fn no_check_settings() -> ChainBuildSettings {
    let mut cbs = ChainBuildSettings::new();
    set_verification_time(&mut cbs, NOW);
    set_revocation_mode(&mut cbs, RevocationMode::NoCheck);
    cbs
}

pub fn build(
    env: &ChainEnvironment,
    leaf: &SharedCertificate,
    extra: &[&SharedCertificate],
    cbs: &ChainBuildSettings,
) -> chainval::Result<ChainResult> {
    let extra = CertificateCollection::from_certs(extra.iter().map(|c| (*c).clone()));
    let mut budget = TimeBudget::new(Duration::from_secs(15));
    build_chain(env, leaf, &extra, cbs, &mut budget)
}

/// Serves fixed bodies by URI and counts every request
#[derive(Clone, Default)]
pub struct MapDownloader {
    pub bodies: BTreeMap<String, Vec<u8>>,
    pub requests: Arc<AtomicUsize>,
}

impl MapDownloader {
    pub fn new(bodies: &[(&str, Vec<u8>)]) -> Self {
        MapDownloader {
            bodies: bodies
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl AssetDownloader for MapDownloader {
    fn download(&self, uri: &str, _timeout: Duration) -> chainval::Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.bodies.get(uri).cloned().ok_or(Error::NetworkError)
    }
}

/// Reports a fixed status for every certificate whose serial is listed and Good otherwise
pub struct FixedRevocation {
    pub serials: Vec<u8>,
    pub status: RevocationStatus,
    pub prepared: Arc<AtomicUsize>,
}

impl FixedRevocation {
    pub fn new(serials: &[u8], status: RevocationStatus) -> Self {
        FixedRevocation {
            serials: serials.to_vec(),
            status,
            prepared: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RevocationStatusProvider for FixedRevocation {
    fn prepare(
        &self,
        _env: &ChainEnvironment,
        _cert: &ChainCertificate,
        _mode: RevocationMode,
        _time: &VerificationTime,
        _budget: &mut TimeBudget,
    ) -> chainval::Result<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_status(
        &self,
        _env: &ChainEnvironment,
        cert: &ChainCertificate,
        _issuer: &ChainCertificate,
        _time: &VerificationTime,
    ) -> RevocationStatus {
        match cert.serial().first() {
            Some(s) if self.serials.contains(s) => self.status,
            _ => RevocationStatus::Good,
        }
    }
}

/// Synthesizes a DER encoded CRL with placeholder signature
pub fn make_crl(
    issuer: &str,
    this_update: u64,
    next_update: Option<u64>,
    revoked: &[(u8, u64)],
    signature: &[u8],
) -> Vec<u8> {
    let revoked_certificates = if revoked.is_empty() {
        None
    } else {
        Some(
            revoked
                .iter()
                .map(|(serial, when)| RevokedCert {
                    serial_number: SerialNumber::new(&[*serial]).unwrap(),
                    revocation_date: time(*when),
                    crl_entry_extensions: None,
                })
                .collect(),
        )
    };
    CertificateList {
        tbs_cert_list: TbsCertList {
            version: Version::V2,
            signature: signature_alg(),
            issuer: Name::from_str(issuer).unwrap(),
            this_update: time(this_update),
            next_update: next_update.map(time),
            revoked_certificates,
            crl_extensions: None,
        },
        signature_algorithm: signature_alg(),
        signature: BitString::from_bytes(signature).unwrap(),
    }
    .to_der()
    .unwrap()
}
