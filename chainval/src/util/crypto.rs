//! Provides implementations of crypto-related [`ChainEnvironment`] interfaces using libraries from
//! the [Rust Crypto](https://github.com/RustCrypto) project for support.

use alloc::{format, vec::Vec};

use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, SECP_256_R_1, SECP_384_R_1,
    SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION, SHA_512_WITH_RSA_ENCRYPTION,
};
use der::{asn1::ObjectIdentifier, Decode, Encode};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::{Error, Result};
use crate::{log_message, ChainCertificate, ChainEnvironment, ChainLogLevels};

/// is_rsa returns true if the presented OID is one of the supported RSA PKCS #1 v1.5 signature
/// algorithms.
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == SHA_256_WITH_RSA_ENCRYPTION
        || *oid == SHA_384_WITH_RSA_ENCRYPTION
        || *oid == SHA_512_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true if the presented OID is one of the supported ECDSA signature algorithms.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == ECDSA_WITH_SHA_256 || *oid == ECDSA_WITH_SHA_384
}

fn verify_rsa(
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &ObjectIdentifier,
    enc_spki: &[u8],
) -> Result<()> {
    let rsa = RsaPublicKey::from_public_key_der(enc_spki).map_err(|_| Error::ParseError)?;
    let r = match *signature_alg {
        SHA_256_WITH_RSA_ENCRYPTION => rsa.verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(message_to_verify),
            signature,
        ),
        SHA_384_WITH_RSA_ENCRYPTION => rsa.verify(
            Pkcs1v15Sign::new::<Sha384>(),
            &Sha384::digest(message_to_verify),
            signature,
        ),
        SHA_512_WITH_RSA_ENCRYPTION => rsa.verify(
            Pkcs1v15Sign::new::<Sha512>(),
            &Sha512::digest(message_to_verify),
            signature,
        ),
        _ => return Err(Error::Unrecognized),
    };
    r.map_err(|_| Error::SignatureVerificationFailure)
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    match &alg_id.parameters {
        Some(params) => {
            let enc = params.to_der()?;
            Ok(ObjectIdentifier::from_der(&enc)?)
        }
        None => Err(Error::ParseError),
    }
}

fn verify_ecdsa(
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &ObjectIdentifier,
    spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    let named_curve = get_named_curve_parameter(&spki.algorithm)?;
    let key_bytes = spki.subject_public_key.raw_bytes();
    match (named_curve, *signature_alg) {
        (SECP_256_R_1, ECDSA_WITH_SHA_256) => {
            use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
            let vk = VerifyingKey::from_sec1_bytes(key_bytes).map_err(|_| Error::ParseError)?;
            let s = Signature::from_der(signature).map_err(|_| Error::ParseError)?;
            vk.verify(message_to_verify, &s)
                .map_err(|_| Error::SignatureVerificationFailure)
        }
        (SECP_384_R_1, ECDSA_WITH_SHA_384) => {
            use p384::ecdsa::{signature::Verifier, Signature, VerifyingKey};
            let vk = VerifyingKey::from_sec1_bytes(key_bytes).map_err(|_| Error::ParseError)?;
            let s = Signature::from_der(signature).map_err(|_| Error::ParseError)?;
            vk.verify(message_to_verify, &s)
                .map_err(|_| Error::SignatureVerificationFailure)
        }
        _ => {
            log_message(
                &ChainLogLevels::ChainError,
                format!(
                    "Unsupported curve and signature algorithm combination: {} with {}",
                    named_curve, signature_alg
                )
                .as_str(),
            );
            Err(Error::Unrecognized)
        }
    }
}

/// verify_signature_message_rust_crypto verifies a signature over an arbitrary message using the
/// presented public key.
///
/// RSA PKCS #1 v1.5 with SHA-256, SHA-384 or SHA-512, ECDSA P-256 with SHA-256 and ECDSA P-384 with
/// SHA-384 are supported.
pub fn verify_signature_message_rust_crypto(
    _env: &ChainEnvironment,
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &AlgorithmIdentifierOwned,
    spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let enc_spki: Vec<u8> = spki.to_der()?;
        verify_rsa(message_to_verify, signature, &signature_alg.oid, &enc_spki)
    } else if is_ecdsa(&signature_alg.oid) {
        verify_ecdsa(message_to_verify, signature, &signature_alg.oid, spki)
    } else {
        log_message(
            &ChainLogLevels::ChainError,
            format!("Unrecognized signature algorithm: {}", signature_alg.oid).as_str(),
        );
        Err(Error::Unrecognized)
    }
}

/// verify_issued_rust_crypto implements the [`VerifyIssued`](crate::VerifyIssued) interface for
/// [`ChainEnvironment`].
///
/// The issuer's subject name must match the subject's issuer name and the subject's signature must
/// verify using the issuer's public key via [`ChainEnvironment::verify_signature_message`].
pub fn verify_issued_rust_crypto(
    env: &ChainEnvironment,
    issuer: &ChainCertificate,
    subject: &ChainCertificate,
) -> Result<()> {
    if !subject.is_named_issuer(issuer) {
        return Err(Error::NotFound);
    }
    let tbs = subject.decoded_cert.tbs_certificate.to_der()?;
    env.verify_signature_message(
        &tbs,
        subject.decoded_cert.signature.raw_bytes(),
        &subject.decoded_cert.signature_algorithm,
        &issuer.decoded_cert.tbs_certificate.subject_public_key_info,
    )
}

#[test]
fn test_algorithm_classification() {
    assert!(is_rsa(&SHA_256_WITH_RSA_ENCRYPTION));
    assert!(is_rsa(&SHA_512_WITH_RSA_ENCRYPTION));
    assert!(!is_rsa(&ECDSA_WITH_SHA_256));
    assert!(is_ecdsa(&ECDSA_WITH_SHA_384));
    assert!(!is_ecdsa(&SHA_384_WITH_RSA_ENCRYPTION));
}

#[test]
fn test_unsupported_signature_algorithm() {
    use der::asn1::BitString;
    use spki::AlgorithmIdentifier;

    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifier {
            oid: const_oid::db::rfc5912::ID_EC_PUBLIC_KEY,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(&[4, 1, 2, 3]).unwrap(),
    };
    let alg = AlgorithmIdentifier {
        oid: const_oid::db::rfc5912::DSA_WITH_SHA_256,
        parameters: None,
    };
    let env = ChainEnvironment::default();
    assert_eq!(
        Err(Error::Unrecognized),
        verify_signature_message_rust_crypto(&env, b"abc", &[1, 2, 3], &alg, &spki)
    );

    // missing named curve parameter
    let alg = AlgorithmIdentifier {
        oid: ECDSA_WITH_SHA_256,
        parameters: None,
    };
    assert_eq!(
        Err(Error::ParseError),
        verify_signature_message_rust_crypto(&env, b"abc", &[1, 2, 3], &alg, &spki)
    );
}

#[cfg(test)]
fn fixture_pair(root: &[u8], leaf: &[u8]) -> (ChainCertificate, ChainCertificate) {
    (
        ChainCertificate::try_from(root).unwrap(),
        ChainCertificate::try_from(leaf).unwrap(),
    )
}

#[test]
fn test_verify_issued_rsa_sha256() {
    let (root, leaf) = fixture_pair(
        include_bytes!("../../tests/examples/rsa_root.der"),
        include_bytes!("../../tests/examples/rsa_leaf.der"),
    );
    let impostor =
        ChainCertificate::try_from(&include_bytes!("../../tests/examples/rsa_impostor.der")[..])
            .unwrap();
    assert_eq!(SHA_256_WITH_RSA_ENCRYPTION, leaf.decoded_cert.signature_algorithm.oid);

    let mut env = ChainEnvironment::default();
    crate::populate_default_chain_environment(&mut env);
    assert_eq!(Ok(()), verify_issued_rust_crypto(&env, &root, &leaf));
    assert_eq!(Ok(()), verify_issued_rust_crypto(&env, &root, &root));
    assert!(env.verify_issued(&root, &leaf));

    // same name, different key
    assert_eq!(
        Err(Error::SignatureVerificationFailure),
        verify_issued_rust_crypto(&env, &impostor, &leaf)
    );
    assert!(!env.verify_issued(&impostor, &leaf));

    // names do not chain
    assert_eq!(
        Err(Error::NotFound),
        verify_issued_rust_crypto(&env, &leaf, &root)
    );
}

#[test]
fn test_verify_issued_p256() {
    let (root, leaf) = fixture_pair(
        include_bytes!("../../tests/examples/p256_root.der"),
        include_bytes!("../../tests/examples/p256_leaf.der"),
    );
    let impostor =
        ChainCertificate::try_from(&include_bytes!("../../tests/examples/p256_impostor.der")[..])
            .unwrap();
    assert_eq!(ECDSA_WITH_SHA_256, leaf.decoded_cert.signature_algorithm.oid);

    let mut env = ChainEnvironment::default();
    crate::populate_default_chain_environment(&mut env);
    assert_eq!(Ok(()), verify_issued_rust_crypto(&env, &root, &leaf));
    assert_eq!(
        Err(Error::SignatureVerificationFailure),
        verify_issued_rust_crypto(&env, &impostor, &leaf)
    );

    // RSA key presented for an ECDSA signature
    let rsa_root =
        ChainCertificate::try_from(&include_bytes!("../../tests/examples/rsa_root.der")[..])
            .unwrap();
    assert!(verify_signature_message_rust_crypto(
        &env,
        &leaf.decoded_cert.tbs_certificate.to_der().unwrap(),
        leaf.decoded_cert.signature.raw_bytes(),
        &leaf.decoded_cert.signature_algorithm,
        &rsa_root.decoded_cert.tbs_certificate.subject_public_key_info,
    )
    .is_err());
}

#[test]
fn test_verify_signature_message() {
    let env = ChainEnvironment::default();
    let msg = b"chainval signed message";
    for (root, sig) in [
        (
            &include_bytes!("../../tests/examples/rsa_root.der")[..],
            &include_bytes!("../../tests/examples/rsa_message.sig")[..],
        ),
        (
            &include_bytes!("../../tests/examples/p256_root.der")[..],
            &include_bytes!("../../tests/examples/p256_message.sig")[..],
        ),
    ] {
        let root = ChainCertificate::try_from(root).unwrap();
        let alg = &root.decoded_cert.signature_algorithm;
        let spki = &root.decoded_cert.tbs_certificate.subject_public_key_info;
        assert_eq!(
            Ok(()),
            verify_signature_message_rust_crypto(&env, msg, sig, alg, spki)
        );
        assert!(
            verify_signature_message_rust_crypto(&env, b"other message", sig, alg, spki).is_err()
        );

        let mut tampered = sig.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(verify_signature_message_rust_crypto(&env, msg, &tampered, alg, spki).is_err());
    }
}
