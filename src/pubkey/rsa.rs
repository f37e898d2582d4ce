use bytes::Bytes;
use num_bigint_dig::{BigUint, ModInverse as _, Sign};
use rand::{CryptoRng, RngCore};
use rsa::Pkcs1v15Sign;
use rsa::traits::{PrivateKeyParts as _, PublicKeyParts as _};
use sha2::Digest as _;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey, Privkey, SignatureVerified};

/// Minimal size of an RSA modulus in bits, for both generated and decoded keys.
pub const SSH_RSA_MINIMUM_MODULUS_SIZE: usize = 1024;

/// "ssh-rsa" public key algorithm from RFC 4253.
///
/// This algorithm uses SHA-1, which is broken. Nevertheless, it is still widely used.
pub static SSH_RSA_SHA1: PubkeyAlgo = PubkeyAlgo {
    name: "ssh-rsa",
    verify: |pubkey, message, signature| verify(pubkey, message, signature, Hash::Sha1, "ssh-rsa"),
    sign: |privkey, message| sign(privkey, message, Hash::Sha1, "ssh-rsa"),
};

/// "rsa-sha2-256" public key algorithm from RFC 8332.
pub static RSA_SHA2_256: PubkeyAlgo = PubkeyAlgo {
    name: "rsa-sha2-256",
    verify: |pubkey, message, signature| verify(pubkey, message, signature, Hash::Sha256, "rsa-sha2-256"),
    sign: |privkey, message| sign(privkey, message, Hash::Sha256, "rsa-sha2-256"),
};

/// "rsa-sha2-512" public key algorithm from RFC 8332.
pub static RSA_SHA2_512: PubkeyAlgo = PubkeyAlgo {
    name: "rsa-sha2-512",
    verify: |pubkey, message, signature| verify(pubkey, message, signature, Hash::Sha512, "rsa-sha2-512"),
    sign: |privkey, message| sign(privkey, message, Hash::Sha512, "rsa-sha2-512"),
};

/// RSA public key.
///
/// You can convert it to and from [`rsa::RsaPublicKey`] using `from()`/`into()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPubkey {
    pub(crate) pubkey: rsa::RsaPublicKey,
}

/// RSA keypair.
///
/// You can convert it to and from [`rsa::RsaPrivateKey`] using `from()`/`into()`.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "debug_less_secure", derive(Debug))]
pub struct RsaPrivkey {
    pub(crate) privkey: rsa::RsaPrivateKey,
}

impl RsaPrivkey {
    /// Get the public key associated with this private key.
    pub fn pubkey(&self) -> RsaPubkey {
        RsaPubkey { pubkey: self.privkey.to_public_key() }
    }
}

#[derive(Debug, Clone, Copy)]
enum Hash {
    Sha1,
    Sha256,
    Sha512,
}

impl Hash {
    fn digest(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Hash::Sha1 => sha1::Sha1::digest(message).to_vec(),
            Hash::Sha256 => sha2::Sha256::digest(message).to_vec(),
            Hash::Sha512 => sha2::Sha512::digest(message).to_vec(),
        }
    }

    fn scheme(&self) -> Pkcs1v15Sign {
        match self {
            Hash::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
            Hash::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
            Hash::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        }
    }
}

fn verify(pubkey: &Pubkey, message: &[u8], signature: Bytes, hash: Hash, name: &'static str)
    -> Result<SignatureVerified>
{
    let Pubkey::Rsa(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };

    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != name {
        return Err(Error::Decode("unexpected signature format"))
    }
    let signature_data = signature.get_bytes()?;

    let hashed = hash.digest(message);
    match pubkey.pubkey.verify(hash.scheme(), &hashed, &signature_data) {
        Ok(_) => Ok(SignatureVerified::assertion()),
        Err(_) => Err(Error::Signature),
    }
}

fn sign(privkey: &mut Privkey, message: &[u8], hash: Hash, name: &'static str) -> Result<Bytes> {
    let Privkey::Rsa(privkey) = privkey else { return Err(Error::PrivkeyFormat) };

    let hashed = hash.digest(message);
    let signature_data = privkey.privkey.sign(hash.scheme(), &hashed)
        .map_err(|_| Error::Crypto("could not sign with rsa"))?;

    let mut signature = PacketEncode::new();
    signature.put_str(name);
    signature.put_bytes(&signature_data);
    Ok(signature.finish())
}

pub(super) fn generate(rng: &mut (impl CryptoRng + RngCore), bits: usize) -> Result<RsaPrivkey> {
    let bits = if bits == 0 { 3072 } else { bits };
    if bits < SSH_RSA_MINIMUM_MODULUS_SIZE || bits > 16384 {
        return Err(Error::KeyLength(bits))
    }
    let privkey = rsa::RsaPrivateKey::new(rng, bits)
        .map_err(|_| Error::Crypto("could not generate rsa key"))?;
    Ok(RsaPrivkey { privkey })
}

pub(super) fn encode_pubkey_parts(blob: &mut PacketEncode, pubkey: &RsaPubkey) {
    blob.put_biguint(pubkey.pubkey.e());
    blob.put_biguint(pubkey.pubkey.n());
}

pub(super) fn decode_pubkey_parts(blob: &mut PacketDecode) -> Result<RsaPubkey> {
    let e = blob.get_biguint()?;
    let n = blob.get_biguint()?;
    if n.bits() < SSH_RSA_MINIMUM_MODULUS_SIZE {
        return Err(Error::KeyLength(n.bits()))
    }
    let pubkey = rsa::RsaPublicKey::new(n, e)
        .map_err(|_| Error::Decode("decoded ssh-rsa pubkey is invalid"))?;
    Ok(RsaPubkey { pubkey })
}

pub(super) fn encode_privkey_parts(blob: &mut PacketEncode, privkey: &RsaPrivkey, certified: bool) {
    let key = &privkey.privkey;
    if !certified {
        blob.put_biguint(key.n());
        blob.put_biguint(key.e());
    }
    blob.put_biguint(key.d());
    blob.put_biguint(&crt_coefficient(key));
    blob.put_biguint(&key.primes()[0]);
    blob.put_biguint(&key.primes()[1]);
}

pub(super) fn decode_privkey_parts(blob: &mut PacketDecode) -> Result<RsaPrivkey> {
    let n = blob.get_biguint()?;
    let e = blob.get_biguint()?;
    decode_privkey_fields(blob, n, e)
}

pub(super) fn decode_privkey_cert_parts(blob: &mut PacketDecode, pubkey: &RsaPubkey) -> Result<RsaPrivkey> {
    decode_privkey_fields(blob, pubkey.pubkey.n().clone(), pubkey.pubkey.e().clone())
}

fn decode_privkey_fields(blob: &mut PacketDecode, n: BigUint, e: BigUint) -> Result<RsaPrivkey> {
    let d = blob.get_biguint()?;
    let _iqmp = blob.get_biguint()?;
    let p = blob.get_biguint()?;
    let q = blob.get_biguint()?;
    let privkey = rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|_| Error::Decode("decoded rsa privkey is invalid"))?;
    Ok(RsaPrivkey { privkey })
}

// iqmp = q^-1 mod p, as stored in the OpenSSH private key encoding
fn crt_coefficient(key: &rsa::RsaPrivateKey) -> BigUint {
    let p = &key.primes()[0];
    let q = &key.primes()[1];
    let qinv = q.mod_inverse(p).expect("rsa primes are not coprime");
    let qinv = if qinv.sign() == Sign::Minus {
        qinv + num_bigint_dig::BigInt::from_biguint(Sign::Plus, p.clone())
    } else {
        qinv
    };
    qinv.to_biguint().expect("crt coefficient is negative")
}


impl From<rsa::RsaPublicKey> for RsaPubkey {
    fn from(pubkey: rsa::RsaPublicKey) -> Self { Self { pubkey } }
}

impl From<RsaPubkey> for rsa::RsaPublicKey {
    fn from(pubkey: RsaPubkey) -> Self { pubkey.pubkey }
}

impl From<rsa::RsaPrivateKey> for RsaPrivkey {
    fn from(privkey: rsa::RsaPrivateKey) -> Self { Self { privkey } }
}

impl From<RsaPrivkey> for rsa::RsaPrivateKey {
    fn from(privkey: RsaPrivkey) -> Self { privkey.privkey }
}

impl fmt::Display for RsaPubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rsa {} bits, e {}", self.pubkey.n().bits(), self.pubkey.e())
    }
}
