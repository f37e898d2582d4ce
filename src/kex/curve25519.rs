use bytes::Bytes;
use num_bigint_dig::BigUint;
use subtle::ConstantTimeEq as _;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroizing;
use crate::codec::PacketEncode;
use crate::error::{Result, Error};
use crate::util::{CryptoRngCore, DynRng};
use super::{KexAlgo, KexKeypair, KexEncapsulated};

/// "curve25519-sha256" key exchange from RFC 8731.
pub static CURVE25519_SHA256: KexAlgo = KexAlgo {
    name: "curve25519-sha256",
    make_keypair,
    encapsulate,
};

/// "curve25519-sha256@libssh.org" key exchange.
///
/// The same as [`CURVE25519_SHA256`] under the name it had before RFC 8731.
pub static CURVE25519_SHA256_LIBSSH: KexAlgo = KexAlgo {
    name: "curve25519-sha256@libssh.org",
    make_keypair,
    encapsulate,
};

struct Curve25519Keypair {
    secret: EphemeralSecret,
    public: PublicKey,
}

fn make_keypair(rng: &mut dyn CryptoRngCore) -> Result<Box<dyn KexKeypair + Send>> {
    let secret = EphemeralSecret::random_from_rng(DynRng(rng));
    let public = PublicKey::from(&secret);
    Ok(Box::new(Curve25519Keypair { secret, public }))
}

fn encapsulate(rng: &mut dyn CryptoRngCore, peer_public: &[u8]) -> Result<KexEncapsulated> {
    let peer_public = decode_public(peer_public)?;
    let secret = EphemeralSecret::random_from_rng(DynRng(rng));
    let public = PublicKey::from(&secret);
    let shared = shared_secret(secret, &peer_public)?;
    Ok(KexEncapsulated {
        ciphertext: Bytes::copy_from_slice(public.as_bytes()),
        secret: shared,
    })
}

impl KexKeypair for Curve25519Keypair {
    fn public_blob(&self) -> Bytes {
        Bytes::copy_from_slice(self.public.as_bytes())
    }

    fn decapsulate(self: Box<Self>, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let peer_public = decode_public(ciphertext)?;
        shared_secret(self.secret, &peer_public)
    }
}

fn decode_public(blob: &[u8]) -> Result<PublicKey> {
    let blob: [u8; 32] = blob.try_into()
        .map_err(|_| Error::Decode("unexpected length of curve25519 public key"))?;
    Ok(PublicKey::from(blob))
}

// The shared secret enters the exchange hash as an mpint, even though it is a curve point.
fn shared_secret(secret: EphemeralSecret, peer_public: &PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    // SharedSecret zeroes itself on drop
    let shared = secret.diffie_hellman(peer_public);
    if shared.as_bytes().ct_eq(&[0; 32]).unwrap_u8() == 1 {
        return Err(Error::InvalidEcValue("curve25519 shared secret is zero"))
    }
    let mut secret = PacketEncode::new();
    secret.put_biguint(&BigUint::from_bytes_be(shared.as_bytes()));
    Ok(Zeroizing::new(secret.finish().to_vec()))
}
