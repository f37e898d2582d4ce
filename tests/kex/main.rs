use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

fn check_exchange(algo: &kagi::KexAlgo) {
    let mut rng = ChaCha8Rng::seed_from_u64(50);
    let keypair = algo.keypair(&mut rng).expect("could not generate keypair");
    let encapsulated = algo.encapsulate(&mut rng, &keypair.public_blob())
        .expect("could not encapsulate");
    let secret = keypair.decapsulate(&encapsulated.ciphertext)
        .expect("could not decapsulate");
    assert_eq!(*secret, *encapsulated.secret);
    assert!(!secret.is_empty());
}

#[test] fn test_curve25519_exchange() {
    check_exchange(&kagi::kex::CURVE25519_SHA256);
}
#[test] fn test_curve25519_libssh_exchange() {
    check_exchange(&kagi::kex::CURVE25519_SHA256_LIBSSH);
}
#[test] fn test_sntrup761x25519_exchange() {
    check_exchange(&kagi::kex::SNTRUP761X25519_SHA512);
}

#[test] fn test_exchanges_are_ephemeral() {
    let mut rng = ChaCha8Rng::seed_from_u64(51);
    let algo = &kagi::kex::CURVE25519_SHA256;
    let keypair_a = algo.keypair(&mut rng).unwrap();
    let keypair_b = algo.keypair(&mut rng).unwrap();
    assert_ne!(keypair_a.public_blob(), keypair_b.public_blob());

    let to_a = algo.encapsulate(&mut rng, &keypair_a.public_blob()).unwrap();
    let to_b = algo.encapsulate(&mut rng, &keypair_b.public_blob()).unwrap();
    assert_ne!(*to_a.secret, *to_b.secret);
}

#[test] fn test_curve25519_rejects_zero_public_key() {
    let mut rng = ChaCha8Rng::seed_from_u64(52);
    let algo = &kagi::kex::CURVE25519_SHA256;

    // an all-zero public key forces a zero shared secret
    let err = algo.encapsulate(&mut rng, &[0; 32]).unwrap_err();
    assert!(matches!(err, kagi::Error::InvalidEcValue(_)), "unexpected error: {:?}", err);

    let keypair = algo.keypair(&mut rng).unwrap();
    let err = keypair.decapsulate(&[0; 32]).unwrap_err();
    assert!(matches!(err, kagi::Error::InvalidEcValue(_)), "unexpected error: {:?}", err);
}

#[test] fn test_curve25519_rejects_bad_length() {
    let mut rng = ChaCha8Rng::seed_from_u64(53);
    let algo = &kagi::kex::CURVE25519_SHA256;
    assert!(algo.encapsulate(&mut rng, &[1; 31]).is_err());
    assert!(algo.encapsulate(&mut rng, &[1; 33]).is_err());
}

#[test] fn test_sntrup761x25519_rejects_bad_length() {
    let mut rng = ChaCha8Rng::seed_from_u64(54);
    let algo = &kagi::kex::SNTRUP761X25519_SHA512;
    assert!(algo.encapsulate(&mut rng, &[1; 32]).is_err());

    let keypair = algo.keypair(&mut rng).unwrap();
    assert!(keypair.decapsulate(&[1; 32]).is_err());
}

#[test] fn test_sntrup761x25519_blob_sizes() {
    let mut rng = ChaCha8Rng::seed_from_u64(55);
    let algo = &kagi::kex::SNTRUP761X25519_SHA512;
    let keypair = algo.keypair(&mut rng).unwrap();
    // sntrup761 public key (1158 bytes) followed by the x25519 public key
    assert_eq!(keypair.public_blob().len(), 1158 + 32);

    let encapsulated = algo.encapsulate(&mut rng, &keypair.public_blob()).unwrap();
    // sntrup761 ciphertext (1039 bytes) followed by the x25519 public key
    assert_eq!(encapsulated.ciphertext.len(), 1039 + 32);
    // the combined secret is a sha512 digest framed as an SSH string
    assert_eq!(encapsulated.secret.len(), 4 + 64);
}

#[test] fn test_algo_by_name() {
    assert_eq!(kagi::kex::algo_by_name("curve25519-sha256").map(|algo| algo.name),
        Some("curve25519-sha256"));
    assert_eq!(kagi::kex::algo_by_name("curve25519-sha256@libssh.org").map(|algo| algo.name),
        Some("curve25519-sha256@libssh.org"));
    assert_eq!(kagi::kex::algo_by_name("sntrup761x25519-sha512@openssh.com").map(|algo| algo.name),
        Some("sntrup761x25519-sha512@openssh.com"));
    assert!(kagi::kex::algo_by_name("diffie-hellman-group14-sha1").is_none());
}
