use bytes::Bytes;
use pqcrypto_ntruprime::sntrup761;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SharedSecret as _};
use sha2::Digest as _;
use subtle::ConstantTimeEq as _;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroizing;
use crate::codec::PacketEncode;
use crate::error::{Result, Error};
use crate::util::{CryptoRngCore, DynRng};
use super::{KexAlgo, KexKeypair, KexEncapsulated};

/// "sntrup761x25519-sha512@openssh.com" key exchange.
///
/// A hybrid of the Streamlined NTRU Prime post-quantum KEM and curve25519: the shared secret
/// stays safe unless both schemes are broken. Public blobs and ciphertexts are the concatenation
/// of the sntrup761 part and the curve25519 part.
pub static SNTRUP761X25519_SHA512: KexAlgo = KexAlgo {
    name: "sntrup761x25519-sha512@openssh.com",
    make_keypair,
    encapsulate,
};

struct HybridKeypair {
    pq_public: sntrup761::PublicKey,
    pq_secret: sntrup761::SecretKey,
    ec_secret: EphemeralSecret,
    ec_public: PublicKey,
}

fn make_keypair(rng: &mut dyn CryptoRngCore) -> Result<Box<dyn KexKeypair + Send>> {
    // the sntrup761 implementation draws its own system randomness
    let (pq_public, pq_secret) = sntrup761::keypair();
    let ec_secret = EphemeralSecret::random_from_rng(DynRng(rng));
    let ec_public = PublicKey::from(&ec_secret);
    Ok(Box::new(HybridKeypair { pq_public, pq_secret, ec_secret, ec_public }))
}

fn encapsulate(rng: &mut dyn CryptoRngCore, peer_public: &[u8]) -> Result<KexEncapsulated> {
    let pq_len = sntrup761::public_key_bytes();
    if peer_public.len() != pq_len + 32 {
        return Err(Error::Decode("unexpected length of sntrup761x25519 public key"))
    }
    let pq_public = sntrup761::PublicKey::from_bytes(&peer_public[..pq_len])
        .map_err(|_| Error::Decode("sntrup761 public key is invalid"))?;
    let ec_public = decode_ec_public(&peer_public[pq_len..])?;

    let (pq_shared, pq_ciphertext) = sntrup761::encapsulate(&pq_public);

    let ec_secret = EphemeralSecret::random_from_rng(DynRng(rng));
    let ec_own_public = PublicKey::from(&ec_secret);
    let ec_shared = ec_shared_secret(ec_secret, &ec_public)?;

    let mut ciphertext = Vec::with_capacity(sntrup761::ciphertext_bytes() + 32);
    ciphertext.extend_from_slice(pq_ciphertext.as_bytes());
    ciphertext.extend_from_slice(ec_own_public.as_bytes());

    Ok(KexEncapsulated {
        ciphertext: ciphertext.into(),
        secret: combine(pq_shared.as_bytes(), &ec_shared),
    })
}

impl KexKeypair for HybridKeypair {
    fn public_blob(&self) -> Bytes {
        let mut blob = Vec::with_capacity(sntrup761::public_key_bytes() + 32);
        blob.extend_from_slice(self.pq_public.as_bytes());
        blob.extend_from_slice(self.ec_public.as_bytes());
        blob.into()
    }

    fn decapsulate(self: Box<Self>, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let pq_len = sntrup761::ciphertext_bytes();
        if ciphertext.len() != pq_len + 32 {
            return Err(Error::Decode("unexpected length of sntrup761x25519 ciphertext"))
        }
        let pq_ciphertext = sntrup761::Ciphertext::from_bytes(&ciphertext[..pq_len])
            .map_err(|_| Error::Decode("sntrup761 ciphertext is invalid"))?;
        let ec_public = decode_ec_public(&ciphertext[pq_len..])?;

        let pq_shared = sntrup761::decapsulate(&pq_ciphertext, &self.pq_secret);
        let ec_shared = ec_shared_secret(self.ec_secret, &ec_public)?;
        Ok(combine(pq_shared.as_bytes(), &ec_shared))
    }
}

fn decode_ec_public(blob: &[u8]) -> Result<PublicKey> {
    let blob: [u8; 32] = blob.try_into()
        .map_err(|_| Error::Decode("unexpected length of curve25519 public key"))?;
    Ok(PublicKey::from(blob))
}

fn ec_shared_secret(secret: EphemeralSecret, peer_public: &PublicKey) -> Result<Zeroizing<[u8; 32]>> {
    let shared = secret.diffie_hellman(peer_public);
    if shared.as_bytes().ct_eq(&[0; 32]).unwrap_u8() == 1 {
        return Err(Error::InvalidEcValue("curve25519 shared secret is zero"))
    }
    Ok(Zeroizing::new(*shared.as_bytes()))
}

// Both secrets are hashed together, and the digest enters the exchange hash as a string rather
// than as an mpint.
fn combine(pq_shared: &[u8], ec_shared: &[u8; 32]) -> Zeroizing<Vec<u8>> {
    let mut hasher = sha2::Sha512::new();
    hasher.update(pq_shared);
    hasher.update(ec_shared);
    let digest = hasher.finalize();

    let mut secret = PacketEncode::new();
    secret.put_bytes(&digest);
    Zeroizing::new(secret.finish().to_vec())
}
