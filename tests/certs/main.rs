#[allow(dead_code)]
#[path = "../keys/keys.rs"]
mod keys;

use bytes::Bytes;
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

fn decode_pubkey(pubkey_base64: &str) -> kagi::Pubkey {
    let blob = Bytes::from(keys::decode_base64(pubkey_base64));
    kagi::Pubkey::decode(blob).expect("could not decode pubkey blob")
}

fn decode_alice_cert() -> kagi::Cert {
    let blob = Bytes::from(keys::decode_base64(keys::ALICE_ED25519_CERT_BASE64));
    let pubkey = kagi::Pubkey::decode(blob).expect("could not decode certificate");
    match pubkey {
        kagi::Pubkey::Cert(cert) => *cert,
        pubkey => panic!("expected a certificate, decoded {:?}", pubkey),
    }
}

#[test]
fn test_decode_alice_cert() {
    let cert = decode_alice_cert();
    assert_eq!(cert.serial, 42);
    assert_eq!(cert.cert_type, kagi::CertType::User);
    assert_eq!(cert.key_id, "alice-cert");
    assert_eq!(cert.valid_principals, vec!["alice".to_string(), "alice2".to_string()]);
    assert_eq!(cert.valid_after, 1577836800);
    assert_eq!(cert.valid_before, 1893456000);

    assert_eq!(cert.pubkey, decode_pubkey(keys::ALICE_ED25519_PUBKEY_BASE64));
    assert_eq!(cert.signature_key, decode_pubkey(keys::CA_ED25519_PUBKEY_BASE64));

    assert!(cert.critical_options().is_empty());
    let extension_names = cert.extensions().iter()
        .map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(extension_names, vec![
        "permit-X11-forwarding", "permit-agent-forwarding", "permit-port-forwarding",
        "permit-pty", "permit-user-rc",
    ]);
}

#[test]
fn test_cert_pubkey_view() {
    let blob = Bytes::from(keys::decode_base64(keys::ALICE_ED25519_CERT_BASE64));
    let pubkey = kagi::Pubkey::decode(blob.clone()).expect("could not decode certificate");

    assert!(pubkey.is_cert());
    assert_eq!(pubkey.key_type(), kagi::KeyType::Ed25519);
    assert_eq!(pubkey.type_name(), "ssh-ed25519-cert-v01@openssh.com");
    assert_eq!(pubkey.plain(), &decode_pubkey(keys::ALICE_ED25519_PUBKEY_BASE64));
    assert!(pubkey.equals_plain(&decode_pubkey(keys::ALICE_ED25519_PUBKEY_BASE64)));

    // reencoding a certificate must reproduce the signed bytes exactly
    assert_eq!(pubkey.encode(), blob);
}

#[test]
fn test_check_authority() {
    let cert = decode_alice_cert();
    let now = 1700000000;

    assert!(cert.check_authority(Some("alice"), now, kagi::CertType::User).is_ok());
    assert!(cert.check_authority(Some("alice2"), now, kagi::CertType::User).is_ok());
    assert!(cert.check_authority(None, now, kagi::CertType::User).is_ok());

    assert!(cert.check_authority(Some("bob"), now, kagi::CertType::User).is_err());
    assert!(cert.check_authority(Some("alice"), now, kagi::CertType::Host).is_err());
    assert!(cert.check_authority(Some("alice"), cert.valid_after - 1,
        kagi::CertType::User).is_err());
    assert!(cert.check_authority(Some("alice"), cert.valid_before,
        kagi::CertType::User).is_err());
}

#[test]
fn test_decode_tampered_cert() {
    let mut blob = keys::decode_base64(keys::ALICE_ED25519_CERT_BASE64);
    // flip a bit inside the nonce, which does not disturb the structure of the blob
    blob[45] ^= 0x01;
    let err = kagi::Pubkey::decode(Bytes::from(blob)).unwrap_err();
    assert!(matches!(err, kagi::Error::Signature), "unexpected error: {:?}", err);
}

#[test]
fn test_certify_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(20);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate CA key");
    let subject = kagi::Privkey::generate(kagi::KeyType::EcdsaP256, 0, &mut rng)
        .expect("could not generate subject key");

    let params = kagi::CertParams {
        serial: 7,
        cert_type: kagi::CertType::Host,
        key_id: "host.example.com".into(),
        valid_principals: vec!["host.example.com".into()],
        valid_after: 1000,
        valid_before: 2000,
        critical_options: Vec::new(),
        extensions: Vec::new(),
    };
    let cert = kagi::pubkey::certify(
            &subject.pubkey(), params, &mut ca_privkey, &kagi::pubkey::SSH_ED25519, &mut rng)
        .expect("could not certify the subject key");

    assert_eq!(cert.pubkey, subject.pubkey());
    assert_eq!(cert.signature_key, ca_privkey.pubkey());
    assert!(cert.check_authority(Some("host.example.com"), 1500, kagi::CertType::Host).is_ok());
    assert!(cert.check_authority(Some("host.example.com"), 2500, kagi::CertType::Host).is_err());

    // the produced blob must decode back, which also verifies the CA signature
    let decoded = kagi::Pubkey::decode(cert.blob.clone())
        .expect("could not decode the produced certificate");
    match decoded {
        kagi::Pubkey::Cert(decoded) => assert_eq!(*decoded, cert),
        decoded => panic!("expected a certificate, decoded {:?}", decoded),
    }
}

#[test]
fn test_certify_with_rsa_ca() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Rsa, 1024, &mut rng)
        .expect("could not generate CA key");
    let subject = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate subject key");

    let params = kagi::CertParams {
        key_id: "rsa-signed".into(),
        ..kagi::CertParams::default()
    };
    let cert = kagi::pubkey::certify(
            &subject.pubkey(), params, &mut ca_privkey, &kagi::pubkey::RSA_SHA2_512, &mut rng)
        .expect("could not certify the subject key");

    let decoded = kagi::Pubkey::decode(cert.blob.clone())
        .expect("could not decode the produced certificate");
    assert_eq!(decoded.cert().expect("expected a certificate").key_id, "rsa-signed");
}

#[test]
fn test_certify_rejects_cert_of_cert() {
    let mut rng = ChaCha8Rng::seed_from_u64(22);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate CA key");
    let blob = Bytes::from(keys::decode_base64(keys::ALICE_ED25519_CERT_BASE64));
    let cert_pubkey = kagi::Pubkey::decode(blob).expect("could not decode certificate");

    let err = kagi::pubkey::certify(
            &cert_pubkey, kagi::CertParams::default(),
            &mut ca_privkey, &kagi::pubkey::SSH_ED25519, &mut rng)
        .unwrap_err();
    assert!(matches!(err, kagi::Error::CertInvalid(_)), "unexpected error: {:?}", err);
}

#[test]
fn test_certify_rejects_xmss_ca() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Xmss, 0, &mut rng)
        .expect("could not generate CA key");
    let subject = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate subject key");

    let err = kagi::pubkey::certify(
            &subject.pubkey(), kagi::CertParams::default(),
            &mut ca_privkey, &kagi::pubkey::SSH_XMSS, &mut rng)
        .unwrap_err();
    assert!(matches!(err, kagi::Error::CertSignKey), "unexpected error: {:?}", err);
}

#[test]
fn test_certify_rejects_too_many_principals() {
    let mut rng = ChaCha8Rng::seed_from_u64(24);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate CA key");
    let subject = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate subject key");

    let params = kagi::CertParams {
        valid_principals: (0..=kagi::pubkey::CERT_MAX_PRINCIPALS)
            .map(|i| format!("principal-{}", i)).collect(),
        ..kagi::CertParams::default()
    };
    let err = kagi::pubkey::certify(
            &subject.pubkey(), params, &mut ca_privkey, &kagi::pubkey::SSH_ED25519, &mut rng)
        .unwrap_err();
    assert!(matches!(err, kagi::Error::CertInvalid(_)), "unexpected error: {:?}", err);
}

#[test]
fn test_decode_malformed_critical_options() {
    let mut rng = ChaCha8Rng::seed_from_u64(25);
    let subject = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate subject key");
    let encoded = subject.pubkey().encode();
    let pubkey_parts = encoded.slice(4 + "ssh-ed25519".len()..);

    let mut blob = kagi::PacketEncode::new();
    blob.put_str("ssh-ed25519-cert-v01@openssh.com");
    blob.put_bytes(&[0x5a; 32]);
    blob.put_raw(&pubkey_parts);
    blob.put_u64(0);
    blob.put_u32(1);
    blob.put_str("malformed");
    blob.put_bytes(b"");
    blob.put_u64(0);
    blob.put_u64(u64::MAX);
    // a pair list that announces a string longer than the list itself
    blob.put_bytes(&[0xff, 0xff, 0xff, 0xff]);

    let err = kagi::Pubkey::decode(blob.finish()).unwrap_err();
    assert!(matches!(err, kagi::Error::CertInvalid(_)), "unexpected error: {:?}", err);
}

#[test]
fn test_certified_keypair_file_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(26);
    let mut ca_privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate CA key");
    let subject = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng)
        .expect("could not generate subject key");

    let params = kagi::CertParams {
        key_id: "stored-cert".into(),
        ..kagi::CertParams::default()
    };
    let cert = kagi::pubkey::certify(
            &subject.pubkey(), params, &mut ca_privkey, &kagi::pubkey::SSH_ED25519, &mut rng)
        .expect("could not certify the subject key");

    let keypair = kagi::keys::OpensshKeypair {
        pubkey: cert.into_pubkey(),
        privkey: subject,
        comment: "cert@example.com".into(),
    };
    let pem_data = kagi::keys::encode_openssh_pem_keypair(
            &keypair, b"", kagi::keys::EncryptionParams::default(), &mut rng)
        .expect("could not encode keypair");

    let decoded = kagi::keys::decode_openssh_pem_keypair(pem_data.as_bytes(), b"")
        .expect("could not decode the encoded keypair");
    assert!(decoded.pubkey.is_cert());
    assert_eq!(decoded.pubkey, keypair.pubkey);
    assert_eq!(decoded.pubkey.cert().expect("expected a certificate").key_id, "stored-cert");
    assert!(decoded.privkey == keypair.privkey, "privkeys are not equal");
}
