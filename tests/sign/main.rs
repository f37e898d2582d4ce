use bytes::Bytes;
use ed25519_dalek::Signer as _;
use kagi::ecdsa::signature::DigestSigner as _;
use kagi::elliptic_curve::sec1::ToEncodedPoint as _;
use num_bigint_dig::BigUint;
use rand::{Rng as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;
use sha2::Digest as _;

fn check_sign_verify(privkey: &mut kagi::Privkey, algo: &kagi::PubkeyAlgo) {
    let pubkey = privkey.pubkey();
    let message = b"the quick brown fox jumps over the lazy dog";
    let signature = privkey.sign(message, algo).expect("could not sign message");

    pubkey.verify(message, signature.clone()).expect("signature does not verify");
    assert!(pubkey.verify(b"a different message", signature.clone()).is_err());

    // corrupting the last byte must invalidate the signature
    let mut forged = signature.to_vec();
    let last = forged.len() - 1;
    forged[last] ^= 0x01;
    assert!(pubkey.verify(message, Bytes::from(forged)).is_err());
}

#[test] fn test_sign_ed25519() {
    let mut rng = ChaCha8Rng::seed_from_u64(30);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::SSH_ED25519);
}

#[test] fn test_sign_rsa() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Rsa, 1024, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::RSA_SHA2_256);
    check_sign_verify(&mut privkey, &kagi::pubkey::RSA_SHA2_512);
    check_sign_verify(&mut privkey, &kagi::pubkey::SSH_RSA_SHA1);
}

#[test] fn test_rsa_signature_format_is_checked() {
    let mut rng = ChaCha8Rng::seed_from_u64(32);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Rsa, 1024, &mut rng).unwrap();
    let pubkey = privkey.pubkey();
    let message = b"message";
    let signature = privkey.sign(message, &kagi::pubkey::RSA_SHA2_256).unwrap();
    pubkey.verify(message, signature.clone()).expect("signature does not verify");

    // relabeling the signature as rsa-sha2-512 must not verify, the hashes differ
    let mut decode = kagi::PacketDecode::new(signature);
    decode.get_string().unwrap();
    let raw_signature = decode.get_bytes().unwrap();
    let mut relabeled = kagi::PacketEncode::new();
    relabeled.put_str("rsa-sha2-512");
    relabeled.put_bytes(&raw_signature);
    assert!(pubkey.verify(message, relabeled.finish()).is_err());
}

#[test] fn test_sign_dsa() {
    let mut rng = ChaCha8Rng::seed_from_u64(33);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Dsa, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::SSH_DSS);
}

#[test] fn test_sign_ecdsa_p256() {
    let mut rng = ChaCha8Rng::seed_from_u64(34);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::EcdsaP256, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::ECDSA_SHA2_NISTP256);
}
#[test] fn test_sign_ecdsa_p384() {
    let mut rng = ChaCha8Rng::seed_from_u64(35);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::EcdsaP384, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::ECDSA_SHA2_NISTP384);
}
#[test] fn test_sign_ecdsa_p521() {
    let mut rng = ChaCha8Rng::seed_from_u64(36);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::EcdsaP521, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::ECDSA_SHA2_NISTP521);
}

#[test] fn test_sign_with_mismatched_algo() {
    let mut rng = ChaCha8Rng::seed_from_u64(37);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng).unwrap();
    let err = privkey.sign(b"message", &kagi::pubkey::ECDSA_SHA2_NISTP256).unwrap_err();
    assert!(matches!(err, kagi::Error::PrivkeyFormat), "unexpected error: {:?}", err);
}

#[test] fn test_verify_with_mismatched_algo() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut ed25519 = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng).unwrap();
    let ecdsa = kagi::Privkey::generate(kagi::KeyType::EcdsaP256, 0, &mut rng).unwrap();

    // the signature blob names ssh-ed25519, which does not apply to an ecdsa key
    let signature = ed25519.sign(b"message", &kagi::pubkey::SSH_ED25519).unwrap();
    let err = ecdsa.pubkey().verify(b"message", signature).unwrap_err();
    assert!(matches!(err, kagi::Error::PubkeyFormat), "unexpected error: {:?}", err);
}

#[test] fn test_verify_with_wrong_key() {
    let mut rng = ChaCha8Rng::seed_from_u64(38);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng).unwrap();
    let other = kagi::Privkey::generate(kagi::KeyType::Ed25519, 0, &mut rng).unwrap();

    let signature = privkey.sign(b"message", &kagi::pubkey::SSH_ED25519).unwrap();
    let err = other.pubkey().verify(b"message", signature).unwrap_err();
    assert!(matches!(err, kagi::Error::Signature), "unexpected error: {:?}", err);
}

#[test] fn test_sign_xmss() {
    let mut rng = ChaCha8Rng::seed_from_u64(39);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Xmss, 0, &mut rng).unwrap();
    check_sign_verify(&mut privkey, &kagi::pubkey::SSH_XMSS);
}

#[test] fn test_xmss_state_advances() {
    let mut rng = ChaCha8Rng::seed_from_u64(40);
    let kagi::Privkey::Xmss(mut privkey) =
        kagi::Privkey::generate(kagi::KeyType::Xmss, 0, &mut rng).unwrap()
    else { panic!("expected an xmss key") };
    let pubkey = kagi::Pubkey::Xmss(privkey.pubkey());

    let total = privkey.signatures_remaining();
    assert_eq!(total, 1 << privkey.params().height);

    let mut wrapped = kagi::Privkey::Xmss(privkey);
    let first = wrapped.sign(b"message", &kagi::pubkey::SSH_XMSS).unwrap();
    let second = wrapped.sign(b"message", &kagi::pubkey::SSH_XMSS).unwrap();

    // each signature spends a different one-time leaf
    assert_ne!(first, second);
    pubkey.verify(b"message", first).expect("first signature does not verify");
    pubkey.verify(b"message", second).expect("second signature does not verify");

    let kagi::Privkey::Xmss(privkey) = wrapped else { panic!("expected an xmss key") };
    assert_eq!(privkey.signatures_remaining(), total - 2);
}

#[test] fn test_xmss_sign_committed() {
    let mut rng = ChaCha8Rng::seed_from_u64(41);
    let kagi::Privkey::Xmss(mut privkey) =
        kagi::Privkey::generate(kagi::KeyType::Xmss, 0, &mut rng).unwrap()
    else { panic!("expected an xmss key") };
    let pubkey = kagi::Pubkey::Xmss(privkey.pubkey());
    let total = privkey.signatures_remaining();

    let mut persisted_remaining = None;
    let signature = privkey.sign_committed(b"message", |privkey| {
        persisted_remaining = Some(privkey.signatures_remaining());
        Ok::<(), ()>(())
    }).expect("could not sign message");
    // the persist callback must see the state with the leaf already spent
    assert_eq!(persisted_remaining, Some(total - 1));
    pubkey.verify(b"message", signature).expect("signature does not verify");

    // when persisting fails, the signature must not be released, but the leaf stays spent
    let err = privkey.sign_committed(b"message", |_| Err::<(), &str>("disk full")).unwrap_err();
    assert!(matches!(err, kagi::Error::Crypto(_)), "unexpected error: {:?}", err);
    assert_eq!(privkey.signatures_remaining(), total - 2);
}

#[test] fn test_xmss_pubkey_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut privkey = kagi::Privkey::generate(kagi::KeyType::Xmss, 0, &mut rng).unwrap();
    let pubkey = privkey.pubkey();

    let decoded = kagi::Pubkey::decode(pubkey.encode()).expect("could not decode pubkey");
    assert_eq!(decoded, pubkey);

    let signature = privkey.sign(b"message", &kagi::pubkey::SSH_XMSS).unwrap();
    decoded.verify(b"message", signature).expect("signature does not verify");
}

// A software stand-in for the authenticator device: it holds the raw ed25519 key and signs the
// derived blob that a FIDO authenticator would sign.
fn sk_ed25519_fixture(rng: &mut ChaCha8Rng) -> (kagi::Pubkey, ed25519_dalek::SigningKey) {
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&rng.gen());

    let mut blob = kagi::PacketEncode::new();
    blob.put_str("sk-ssh-ed25519@openssh.com");
    blob.put_bytes(signing_key.verifying_key().as_bytes());
    blob.put_str("ssh:");
    let pubkey = kagi::Pubkey::decode(blob.finish()).expect("could not decode sk pubkey");
    (pubkey, signing_key)
}

fn sk_preimage(application: &str, flags: u8, counter: u32, message_hash: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&sha2::Sha256::digest(application.as_bytes()));
    preimage.push(flags);
    preimage.extend_from_slice(&counter.to_be_bytes());
    preimage.extend_from_slice(message_hash);
    preimage
}

#[test] fn test_verify_sk_ed25519() {
    let mut rng = ChaCha8Rng::seed_from_u64(43);
    let (pubkey, signing_key) = sk_ed25519_fixture(&mut rng);
    let message = b"authenticate me";

    let flags = kagi::pubkey::SK_FLAG_USER_PRESENCE_REQD;
    let counter = 5;
    let preimage = sk_preimage("ssh:", flags, counter, &sha2::Sha256::digest(message));
    let raw_signature = signing_key.sign(&preimage);

    let mut signature = kagi::PacketEncode::new();
    signature.put_str("sk-ssh-ed25519@openssh.com");
    signature.put_bytes(&raw_signature.to_bytes());
    signature.put_u8(flags);
    signature.put_u32(counter);
    let signature = signature.finish();

    pubkey.verify(message, signature.clone()).expect("signature does not verify");
    assert!(pubkey.verify(b"another message", signature.clone()).is_err());

    // the flags byte is covered by the signature
    let mut tampered = kagi::PacketEncode::new();
    tampered.put_str("sk-ssh-ed25519@openssh.com");
    tampered.put_bytes(&raw_signature.to_bytes());
    tampered.put_u8(flags ^ 0x04);
    tampered.put_u32(counter);
    assert!(pubkey.verify(message, tampered.finish()).is_err());
}

fn sk_ecdsa_fixture(rng: &mut ChaCha8Rng) -> (kagi::Pubkey, kagi::p256::ecdsa::SigningKey) {
    let signing_key = kagi::p256::ecdsa::SigningKey::random(rng);
    let point = signing_key.verifying_key().to_encoded_point(false);

    let mut blob = kagi::PacketEncode::new();
    blob.put_str("sk-ecdsa-sha2-nistp256@openssh.com");
    blob.put_str("nistp256");
    blob.put_bytes(point.as_bytes());
    blob.put_str("ssh:");
    let pubkey = kagi::Pubkey::decode(blob.finish()).expect("could not decode sk pubkey");
    (pubkey, signing_key)
}

fn encode_ecdsa_raw_signature(signature: &kagi::p256::ecdsa::Signature) -> Bytes {
    let (r, s) = signature.split_bytes();
    let mut raw = kagi::PacketEncode::new();
    raw.put_biguint(&BigUint::from_bytes_be(&r));
    raw.put_biguint(&BigUint::from_bytes_be(&s));
    raw.finish()
}

#[test] fn test_verify_sk_ecdsa_p256() {
    let mut rng = ChaCha8Rng::seed_from_u64(44);
    let (pubkey, signing_key) = sk_ecdsa_fixture(&mut rng);
    let message = b"authenticate me";

    let flags = kagi::pubkey::SK_FLAG_USER_PRESENCE_REQD;
    let counter = 17;
    let preimage = sk_preimage("ssh:", flags, counter, &sha2::Sha256::digest(message));
    let digest = sha2::Sha256::new_with_prefix(&preimage);
    let raw_signature: kagi::p256::ecdsa::Signature = signing_key.sign_digest(digest);

    let mut signature = kagi::PacketEncode::new();
    signature.put_str("sk-ecdsa-sha2-nistp256@openssh.com");
    signature.put_bytes(&encode_ecdsa_raw_signature(&raw_signature));
    signature.put_u8(flags);
    signature.put_u32(counter);
    let signature = signature.finish();

    pubkey.verify(message, signature.clone()).expect("signature does not verify");
    assert!(pubkey.verify(b"another message", signature).is_err());
}

#[test] fn test_verify_webauthn_sk_ecdsa_p256() {
    use base64::Engine as _;
    let mut rng = ChaCha8Rng::seed_from_u64(45);
    let (pubkey, signing_key) = sk_ecdsa_fixture(&mut rng);
    let message = b"authenticate me";

    let challenge = base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(message);
    let client_data = format!(
        "{{\"type\":\"webauthn.get\",\"challenge\":\"{}\",\"origin\":\"https://example.com\"}}",
        challenge);

    let flags = kagi::pubkey::SK_FLAG_USER_PRESENCE_REQD;
    let counter = 1;
    let preimage = sk_preimage("ssh:", flags, counter,
        &sha2::Sha256::digest(client_data.as_bytes()));
    let digest = sha2::Sha256::new_with_prefix(&preimage);
    let raw_signature: kagi::p256::ecdsa::Signature = signing_key.sign_digest(digest);

    let mut signature = kagi::PacketEncode::new();
    signature.put_str("webauthn-sk-ecdsa-sha2-nistp256@openssh.com");
    signature.put_bytes(&encode_ecdsa_raw_signature(&raw_signature));
    signature.put_u8(flags);
    signature.put_u32(counter);
    signature.put_str("https://example.com");
    signature.put_bytes(client_data.as_bytes());
    signature.put_bytes(b"");
    let signature = signature.finish();

    pubkey.verify(message, signature.clone()).expect("signature does not verify");
    // the challenge in the clientData wrapper must match the message
    assert!(pubkey.verify(b"another message", signature).is_err());
}

#[test] fn test_sk_keys_cannot_sign() {
    let mut rng = ChaCha8Rng::seed_from_u64(46);
    match kagi::Privkey::generate(kagi::KeyType::SkEd25519, 0, &mut rng) {
        Err(kagi::Error::Unsupported(_)) => {},
        Err(err) => panic!("unexpected error: {:?}", err),
        Ok(_) => panic!("generating a security key in software should fail"),
    }
}
