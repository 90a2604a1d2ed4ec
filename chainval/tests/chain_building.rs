mod common;

use std::time::Duration;

use chainval::*;
use common::*;

const ROOT: &str = "CN=Test Root,O=Chainval";
const ICA: &str = "CN=Test Intermediate,O=Chainval";
const EE: &str = "CN=leaf.example.test";

fn flags_at(result: &ChainResult, depth: usize) -> Vec<ChainStatusFlag> {
    result.elements[depth].flags()
}

fn assert_status_invariants(result: &ChainResult) {
    let mut union = vec![];
    for element in &result.elements {
        let flags = element.flags();
        assert!(!flags.is_empty());
        if flags.contains(&ChainStatusFlag::NoError) {
            assert_eq!(1, flags.len());
        }
        for f in flags {
            if f != ChainStatusFlag::NoError && !union.contains(&f) {
                union.push(f);
            }
        }
    }
    let mut overall = result.overall_flags();
    overall.sort();
    union.sort();
    assert_eq!(union, overall);
}

#[test]
fn self_signed_leaf_is_its_own_chain() {
    let solo = root("CN=Solo").build();
    let other_root = root(ROOT).build();
    let env = test_environment(trusted_root_stores(&[&other_root]));

    let mut budget = TimeBudget::new(Duration::from_secs(15));
    let candidate_set =
        CandidateSetBuilder::new(&env).build(&solo, &CertificateCollection::new(), &mut budget);
    assert_eq!(1, candidate_set.candidates.len());
    assert!(candidate_set.candidates.contains(&solo));

    let result = build(&env, &solo, &[], &no_check_settings()).unwrap();
    assert_eq!(1, result.elements.len());
    assert_eq!(vec![ChainStatusFlag::UntrustedRoot], flags_at(&result, 0));
    assert_status_invariants(&result);

    let env = test_environment(trusted_root_stores(&[&solo]));
    let result = build(&env, &solo, &[], &no_check_settings()).unwrap();
    assert_eq!(1, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn trusted_three_element_chain() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert_eq!(l.identity(), result.elements[0].certificate.identity());
    assert_eq!(i.identity(), result.elements[1].certificate.identity());
    assert_eq!(r.identity(), result.elements[2].certificate.identity());
    for element in &result.elements {
        assert!(element.is_no_error());
    }
    assert!(result.overall_status.is_empty());
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn intermediate_from_store_is_found() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let mut stores = trusted_root_stores(&[&r]);
    stores.add_certificate(StoreName::CertificateAuthority, StoreLocation::CurrentUser, i);
    let env = test_environment(stores);

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn root_absent_from_trust_store() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(CertificateStores::new());

    let result = build(&env, &l, &[&i, &r], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert!(result.elements[1].is_no_error());
    assert_eq!(vec![ChainStatusFlag::UntrustedRoot], flags_at(&result, 2));
    assert_eq!(vec![ChainStatusFlag::UntrustedRoot], result.overall_flags());
    assert!(!result.verify(VerificationFlags::default()).unwrap());
    assert_status_invariants(&result);
}

#[test]
fn expired_intermediate() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .validity(NOT_BEFORE, NOW - 1000)
        .build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert_eq!(vec![ChainStatusFlag::NotTimeValid], flags_at(&result, 1));
    assert!(result.elements[2].is_no_error());
    assert!(!result.verify(VerificationFlags::default()).unwrap());
    assert_status_invariants(&result);
}

#[test]
fn not_yet_valid_leaf() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).validity(NOW + 1000, NOT_AFTER).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(vec![ChainStatusFlag::NotTimeValid], flags_at(&result, 0));
    assert!(result.elements[1].is_no_error());
}

#[test]
fn missing_issuer_yields_partial_chain() {
    let l = leaf(EE, ICA).build();
    let env = test_environment(CertificateStores::new());

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(1, result.elements.len());
    assert_eq!(vec![ChainStatusFlag::PartialChain], flags_at(&result, 0));

    // the intermediate is present, but its issuer is not
    let i = intermediate(ICA, ROOT).build();
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(2, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert_eq!(vec![ChainStatusFlag::PartialChain], flags_at(&result, 1));
    assert_status_invariants(&result);
}

#[test]
fn issuer_with_bad_signature_is_not_a_candidate() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).bad_signature().build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(2, result.elements.len());
    assert_eq!(vec![ChainStatusFlag::PartialChain], flags_at(&result, 1));
}

#[test]
fn issuer_without_ca_basic_constraints() {
    let r = root(ROOT).build();
    let i = CertTemplate::new(ICA, ROOT, 2).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert_eq!(
        vec![ChainStatusFlag::InvalidBasicConstraints],
        flags_at(&result, 1)
    );
}

#[test]
fn unhandled_critical_extension() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let unknown = ext(
        der::asn1::ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1"),
        true,
        &der::asn1::Null,
    );
    let l = leaf(EE, ICA).with(unknown).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::HasNotSupportedCriticalExtension],
        flags_at(&result, 0)
    );
}

fn dns_name_constraints(permitted: &str, critical: bool) -> x509_cert::ext::Extension {
    use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::ext::pkix::NameConstraints;

    let nc = NameConstraints {
        permitted_subtrees: Some(vec![GeneralSubtree {
            base: GeneralName::DnsName(der::asn1::Ia5String::new(permitted).unwrap()),
            minimum: 0,
            maximum: None,
        }]),
        excluded_subtrees: None,
    };
    ext(
        const_oid::db::rfc5912::ID_CE_NAME_CONSTRAINTS,
        critical,
        &nc,
    )
}

fn dns_san(name: &str) -> x509_cert::ext::Extension {
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::ext::pkix::SubjectAltName;

    let san = SubjectAltName(vec![GeneralName::DnsName(
        der::asn1::Ia5String::new(name).unwrap(),
    )]);
    ext(const_oid::db::rfc5912::ID_CE_SUBJECT_ALT_NAME, false, &san)
}

#[test]
fn critical_name_constraints_are_not_supported() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .with(dns_name_constraints("good.test", true))
        .build();
    let l = leaf(EE, ICA).with(dns_san("evil.other")).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert_eq!(
        vec![ChainStatusFlag::HasNotSupportedCriticalExtension],
        flags_at(&result, 1)
    );
    assert!(!result.verify(VerificationFlags::default()).unwrap());
    assert_status_invariants(&result);

    // non-critical instances are ignored
    let i = intermediate(ICA, ROOT)
        .with(dns_name_constraints("good.test", false))
        .build();
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn issuer_name_differing_only_in_case_is_chased() {
    let r = root(ROOT).build();
    let i = intermediate("CN=LEAF", ROOT).build();
    let l = leaf("CN=Leaf", "CN=LEAF").build();
    assert!(!l.is_self_signed());
    assert!(l.is_named_issuer(&i));
    assert_ne!(l.identity().subject, i.identity().subject);

    let lowercase_root = root("CN=test root,O=Chainval").build();
    assert!(!i.is_named_issuer(&lowercase_root));

    let env = test_environment(trusted_root_stores(&[&r]));
    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert_eq!(i.identity(), result.elements[1].certificate.identity());
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn explicitly_distrusted_intermediate() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let mut stores = trusted_root_stores(&[&r]);
    stores.add_certificate(
        StoreName::Disallowed,
        StoreLocation::CurrentUser,
        i.clone(),
    );
    let env = test_environment(stores);

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert_eq!(vec![ChainStatusFlag::ExplicitDistrust], flags_at(&result, 1));
    assert!(result.has_status(ChainStatusFlag::ExplicitDistrust));
}

#[test]
fn building_twice_gives_identical_results() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .validity(NOT_BEFORE, NOW - 1000)
        .build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(CertificateStores::new());
    let cbs = no_check_settings();

    let first = build(&env, &l, &[&i, &r], &cbs).unwrap();
    let second = build(&env, &l, &[&i, &r], &cbs).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.verify(VerificationFlags::default()).unwrap(),
        second.verify(VerificationFlags::default()).unwrap()
    );
}

#[test]
fn verification_flags_are_rejected() {
    let r = root(ROOT).build();
    let l = leaf(EE, ROOT).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_verification_flags_from_set(&mut cbs, VerificationFlag::IgnoreNotTimeValid.into());
    assert_eq!(Err(Error::NotSupported), build(&env, &l, &[], &cbs));

    // bits with no defined flag
    set_verification_flags(&mut cbs, 0x8000);
    assert_eq!(Err(Error::NotSupported), build(&env, &l, &[], &cbs));

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(
        Err(Error::NotSupported),
        result.verify(VerificationFlag::AllowUnknownCertificateAuthority.into())
    );
}

#[test]
fn chain_longer_than_limit_is_fatal() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_max_chain_depth(&mut cbs, 2);
    assert_eq!(Err(Error::ChainTooLong), build(&env, &l, &[&i], &cbs));

    set_max_chain_depth(&mut cbs, 3);
    assert!(build(&env, &l, &[&i], &cbs).is_ok());
}

#[test]
fn aia_download_supplies_intermediate() {
    let uri = "http://pki.example.test/ica.cer";
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT);
    let l = leaf(EE, ICA).with(aia_ext(uri)).build();
    let downloader = MapDownloader::new(&[(uri, i.to_der())]);
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_asset_downloader(Box::new(downloader.clone()));

    let mut budget = TimeBudget::new(Duration::from_secs(15));
    let candidate_set =
        CandidateSetBuilder::new(&env).build(&l, &CertificateCollection::new(), &mut budget);
    let i = i.build();
    assert!(candidate_set.candidates.contains(&i));
    assert!(candidate_set.downloaded.contains(&i));
    assert!(!candidate_set.downloaded.contains(&r));
    assert_eq!(1, downloader.request_count());

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(3, result.elements.len());
    assert!(result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn downloaded_root_is_untrusted() {
    let uri = "http://pki.example.test/root.cer";
    let r = root(ROOT);
    let l = leaf(EE, ROOT).with(aia_ext(uri)).build();
    let mut env = test_environment(CertificateStores::new());
    env.add_asset_downloader(Box::new(MapDownloader::new(&[(uri, r.to_der())])));

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(2, result.elements.len());
    assert!(result.elements[0].is_no_error());
    assert_eq!(vec![ChainStatusFlag::UntrustedRoot], flags_at(&result, 1));
}

#[test]
fn exhausted_budget_prevents_downloads() {
    let uri = "http://pki.example.test/ica.cer";
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT);
    let l = leaf(EE, ICA).with(aia_ext(uri)).build();
    let downloader = MapDownloader::new(&[(uri, i.to_der())]);
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_asset_downloader(Box::new(downloader.clone()));

    let mut budget = TimeBudget::exhausted();
    let candidate_set =
        CandidateSetBuilder::new(&env).build(&l, &CertificateCollection::new(), &mut budget);
    assert_eq!(1, candidate_set.candidates.len());
    assert!(candidate_set.downloaded.is_empty());

    let mut budget = TimeBudget::exhausted();
    let result = build_chain(
        &env,
        &l,
        &CertificateCollection::new(),
        &no_check_settings(),
        &mut budget,
    )
    .unwrap();
    assert_eq!(1, result.elements.len());
    assert_eq!(vec![ChainStatusFlag::PartialChain], flags_at(&result, 0));
    assert_eq!(0, downloader.request_count());
}

#[test]
fn non_http_aia_is_not_chased() {
    let uri = "https://pki.example.test/ica.cer";
    let i = intermediate(ICA, ROOT);
    let l = leaf(EE, ICA).with(aia_ext(uri)).build();
    let downloader = MapDownloader::new(&[(uri, i.to_der())]);
    let mut env = test_environment(CertificateStores::new());
    env.add_asset_downloader(Box::new(downloader.clone()));

    let result = build(&env, &l, &[], &no_check_settings()).unwrap();
    assert_eq!(1, result.elements.len());
    assert_eq!(0, downloader.request_count());
}

#[test]
fn certificate_policy_not_asserted() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .with(policies_ext(&["2.16.840.1.101.3.2.1.48.1"]))
        .build();
    let l = leaf(EE, ICA)
        .validity(NOT_BEFORE, NOW - 10)
        .with(policies_ext(&["2.16.840.1.101.3.2.1.48.1"]))
        .build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_certificate_policy(&mut cbs, vec!["2.16.840.1.101.3.2.1.48.2".to_string()]);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    let leaf_flags = flags_at(&result, 0);
    assert!(leaf_flags.contains(&ChainStatusFlag::NotTimeValid));
    assert!(leaf_flags.contains(&ChainStatusFlag::InvalidPolicyConstraints));
    assert_eq!(
        1,
        result
            .overall_flags()
            .iter()
            .filter(|f| **f == ChainStatusFlag::InvalidPolicyConstraints)
            .count()
    );
    assert!(result.elements[1].is_no_error());
    assert_status_invariants(&result);
}

#[test]
fn certificate_policy_asserted_by_every_certificate() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .with(policies_ext(&["2.16.840.1.101.3.2.1.48.1"]))
        .build();
    let l = leaf(EE, ICA)
        .with(policies_ext(&["2.16.840.1.101.3.2.1.48.1"]))
        .build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_certificate_policy(&mut cbs, vec!["2.16.840.1.101.3.2.1.48.1".to_string()]);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());

    // the intermediate asserts no policies, so the valid policy graph is null
    let i = intermediate(ICA, ROOT).build();
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::InvalidPolicyConstraints],
        flags_at(&result, 0)
    );
}

#[test]
fn application_policy_intersection() {
    let server_auth = "1.3.6.1.5.5.7.3.1";
    let client_auth = "1.3.6.1.5.5.7.3.2";
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT)
        .with(eku_ext(&[server_auth, client_auth]))
        .build();
    let l = leaf(EE, ICA).with(eku_ext(&[server_auth])).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_application_policy(&mut cbs, vec![server_auth.to_string()]);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());

    set_application_policy(&mut cbs, vec![client_auth.to_string()]);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::InvalidPolicyConstraints],
        flags_at(&result, 0)
    );
    assert!(result.elements[1].is_no_error());
}

#[test]
fn no_check_never_reports_revocation() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let provider = FixedRevocation::new(&[1, 2, 3], RevocationStatus::Revoked);
    let prepared = provider.prepared.clone();
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_revocation_provider(Box::new(provider));

    let result = build(&env, &l, &[&i], &no_check_settings()).unwrap();
    for f in [
        ChainStatusFlag::Revoked,
        ChainStatusFlag::RevocationStatusUnknown,
        ChainStatusFlag::OfflineRevocation,
    ] {
        assert!(!result.has_status(f));
    }
    assert_eq!(0, prepared.load(std::sync::atomic::Ordering::SeqCst));
}

#[test]
fn revoked_leaf() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_revocation_provider(Box::new(FixedRevocation::new(
        &[3],
        RevocationStatus::Revoked,
    )));

    let mut cbs = no_check_settings();
    set_revocation_mode(&mut cbs, RevocationMode::Online);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(vec![ChainStatusFlag::Revoked], flags_at(&result, 0));
    assert!(result.elements[1].is_no_error());
    assert!(!result.verify(VerificationFlags::default()).unwrap());
}

#[test]
fn revocation_flag_scope() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let unknown = RevocationStatus::Undetermined(VerifyErrorCode::UnableToGetCrl);

    // root status is not consulted with the default flag
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_revocation_provider(Box::new(FixedRevocation::new(&[1], unknown)));
    let mut cbs = no_check_settings();
    set_revocation_mode(&mut cbs, RevocationMode::Offline);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());

    set_revocation_flag(&mut cbs, RevocationFlag::EntireChain);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::RevocationStatusUnknown],
        flags_at(&result, 2)
    );

    // only the leaf is prepared and consulted
    let provider = FixedRevocation::new(&[2], unknown);
    let prepared = provider.prepared.clone();
    let mut env = test_environment(trusted_root_stores(&[&r]));
    env.add_revocation_provider(Box::new(provider));
    set_revocation_flag(&mut cbs, RevocationFlag::EndCertificateOnly);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert!(result.verify(VerificationFlags::default()).unwrap());
    assert_eq!(1, prepared.load(std::sync::atomic::Ordering::SeqCst));

    set_revocation_flag(&mut cbs, RevocationFlag::ExcludeRoot);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::RevocationStatusUnknown],
        flags_at(&result, 1)
    );
}

#[test]
fn revocation_without_providers_is_unknown() {
    let r = root(ROOT).build();
    let i = intermediate(ICA, ROOT).build();
    let l = leaf(EE, ICA).build();
    let env = test_environment(trusted_root_stores(&[&r]));

    let mut cbs = no_check_settings();
    set_revocation_mode(&mut cbs, RevocationMode::Offline);
    let result = build(&env, &l, &[&i], &cbs).unwrap();
    assert_eq!(
        vec![ChainStatusFlag::RevocationStatusUnknown],
        flags_at(&result, 0)
    );
    assert_status_invariants(&result);
}
