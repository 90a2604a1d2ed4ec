mod common;

use std::time::Duration;

use const_oid::db::rfc5912::{ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE};
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage, KeyUsages};

use chainval::*;
use common::*;

const ROOT: &str = "CN=Store Root";
const ICA: &str = "CN=Store Intermediate";
const EE: &str = "CN=store.example.test";

#[test]
fn first_source_with_a_match_wins() {
    let r = root(ROOT).build();
    let from_extra = intermediate(ICA, ROOT).build();
    let from_store = CertTemplate::new(ICA, ROOT, 7).ca().build();
    let l = leaf(EE, ICA).build();

    let mut stores = trusted_root_stores(&[&r]);
    stores.add_certificate(
        StoreName::CertificateAuthority,
        StoreLocation::LocalMachine,
        from_store.clone(),
    );
    let env = test_environment(stores);

    let extra = CertificateCollection::from_certs(vec![from_extra.clone()]);
    let mut budget = TimeBudget::new(Duration::from_secs(15));
    let candidate_set = CandidateSetBuilder::new(&env).build(&l, &extra, &mut budget);
    assert!(candidate_set.candidates.contains(&from_extra));
    assert!(!candidate_set.candidates.contains(&from_store));
    assert!(candidate_set.system_trusted.contains(&r));

    let candidate_set =
        CandidateSetBuilder::new(&env).build(&l, &CertificateCollection::new(), &mut budget);
    assert!(candidate_set.candidates.contains(&from_store));
    assert_eq!(3, candidate_set.candidates.len());
}

#[test]
fn collections_deduplicate_by_identity() {
    let r = root(ROOT).build();
    let mut copy = (*r).clone();
    copy.locator = Some("elsewhere".to_string());

    let mut collection = CertificateCollection::new();
    assert!(collection.push(r.clone()));
    assert!(!collection.push_cert(copy));
    assert_eq!(1, collection.len());

    let mut stores = CertificateStores::new();
    assert!(stores.add_certificate(StoreName::Root, StoreLocation::CurrentUser, r.clone()));
    assert!(!stores
        .add_encoded_certificate(StoreName::Root, StoreLocation::CurrentUser, &r.encoded_cert)
        .unwrap());
    assert_eq!(
        1,
        stores
            .get_certificates(StoreName::Root, StoreLocation::CurrentUser)
            .unwrap()
            .len()
    );
    assert!(stores
        .get_certificates(StoreName::Root, StoreLocation::LocalMachine)
        .unwrap()
        .is_empty());
}

#[test]
fn trust_store_from_folder() {
    let r = root(ROOT);
    let i = intermediate(ICA, ROOT);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("root.der"), r.to_der()).unwrap();
    let pem = pem_rfc7468::encode_string(
        "CERTIFICATE",
        pem_rfc7468::LineEnding::LF,
        &i.to_der(),
    )
    .unwrap();
    std::fs::write(dir.path().join("ica.pem"), pem).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a certificate").unwrap();

    let mut stores = CertificateStores::new();
    let folder = dir.path().to_str().unwrap();
    assert_eq!(
        2,
        stores
            .load_folder(StoreName::Root, StoreLocation::LocalMachine, folder)
            .unwrap()
    );
    assert_eq!(
        0,
        stores
            .load_folder(StoreName::Root, StoreLocation::LocalMachine, folder)
            .unwrap()
    );
    assert!(stores
        .load_folder(StoreName::Root, StoreLocation::LocalMachine, "/no/such/folder")
        .is_err());
}

#[test]
fn ca_constraints() {
    let r = root(ROOT).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    // keyUsage without keyCertSign
    let i = CertTemplate::new(ICA, ROOT, 2)
        .with(ext(
            ID_CE_BASIC_CONSTRAINTS,
            true,
            &BasicConstraints {
                ca: true,
                path_len_constraint: None,
            },
        ))
        .with(ext(
            ID_CE_KEY_USAGE,
            true,
            &KeyUsage(KeyUsages::CRLSign.into()),
        ))
        .build();
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::InvalidBasicConstraints],
        result.elements[1].flags()
    );

    // root permits no intermediates
    let constrained_root = CertTemplate::new(ROOT, ROOT, 1)
        .with(ext(
            ID_CE_BASIC_CONSTRAINTS,
            true,
            &BasicConstraints {
                ca: true,
                path_len_constraint: Some(0),
            },
        ))
        .build();
    let i = intermediate(ICA, ROOT).build();
    let env = test_environment(trusted_root_stores(&[&constrained_root]));
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.elements[1].is_no_error());
    assert_eq!(
        vec![ChainStatusFlag::InvalidBasicConstraints],
        result.elements[2].flags()
    );
}

fn failing_constructor(
    _env: &ChainEnvironment,
    _store: &CandidateStore,
    _leaf: &SharedCertificate,
    _cbs: &ChainBuildSettings,
) -> chainval::Result<ConstructedPath> {
    Err(Error::Unrecognized)
}

fn out_of_memory_constructor(
    _env: &ChainEnvironment,
    _store: &CandidateStore,
    leaf: &SharedCertificate,
    _cbs: &ChainBuildSettings,
) -> chainval::Result<ConstructedPath> {
    Ok(ConstructedPath {
        path: vec![leaf.clone()],
        error: Some(PathFailure {
            code: VerifyErrorCode::OutOfMem,
            depth: 0,
        }),
    })
}

#[test]
fn path_constructor_fallback() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();

    let mut env = ChainEnvironment::default();
    env.add_verify_issued_callback(verify_issued_by_name);
    env.add_trust_store_accessor(Box::new(trusted_root_stores(&[&r])));
    assert_eq!(
        Err(Error::Unrecognized),
        build(&env, &l, &[&i], &no_check_settings())
    );

    env.add_construct_path_callback(failing_constructor);
    env.add_construct_path_callback(construct_path_rfc5280);
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());

    env.clear_construct_path_callbacks();
    env.add_construct_path_callback(out_of_memory_constructor);
    assert_eq!(
        Err(Error::OutOfMemory),
        build(&env, &l, &[&i], &no_check_settings())
    );
}
