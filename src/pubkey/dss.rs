use bytes::Bytes;
use ecdsa::signature::{DigestSigner as _, DigestVerifier as _};
use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use sha1::Digest as _;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey, Privkey, SignatureVerified};

/// "ssh-dss" public key algorithm from RFC 4253.
///
/// DSA with 1024-bit keys and SHA-1 is considered insecure and the algorithm is disabled in
/// OpenSSH since version 7.0. We implement it for compatibility with old keys.
pub static SSH_DSS: PubkeyAlgo = PubkeyAlgo {
    name: "ssh-dss",
    verify,
    sign,
};

/// DSA public key.
#[derive(Debug, Clone)]
pub struct DsaPubkey {
    pub(crate) pubkey: dsa::VerifyingKey,
}

/// DSA keypair.
#[derive(Clone)]
#[cfg_attr(feature = "debug_less_secure", derive(Debug))]
pub struct DsaPrivkey {
    pub(crate) privkey: dsa::SigningKey,
}

impl PartialEq for DsaPubkey {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.pubkey.components(), other.pubkey.components());
        a.p() == b.p() && a.q() == b.q() && a.g() == b.g() && self.pubkey.y() == other.pubkey.y()
    }
}
impl Eq for DsaPubkey {}

impl PartialEq for DsaPrivkey {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey() == other.pubkey() && self.privkey.x() == other.privkey.x()
    }
}
impl Eq for DsaPrivkey {}

impl DsaPrivkey {
    /// Get the public key associated with this private key.
    pub fn pubkey(&self) -> DsaPubkey {
        DsaPubkey { pubkey: self.privkey.verifying_key().clone() }
    }
}

// r and s are reduced modulo the 160-bit q, the wire format stores them as two fixed 20-byte
// scalars concatenated into a single string
const SCALAR_LEN: usize = 20;

fn verify(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<SignatureVerified> {
    let Pubkey::Dsa(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };

    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != "ssh-dss" {
        return Err(Error::Decode("unexpected signature format"))
    }

    let signature_data = signature.get_bytes()?;
    if signature_data.len() != 2 * SCALAR_LEN {
        return Err(Error::Decode("unexpected length of ssh-dss signature"))
    }
    let r = BigUint::from_bytes_be(&signature_data[..SCALAR_LEN]);
    let s = BigUint::from_bytes_be(&signature_data[SCALAR_LEN..]);
    let dsa_signature = dsa::Signature::from_components(r, s)
        .map_err(|_| Error::Decode("decoded ssh-dss signature is invalid"))?;

    let digest = sha1::Sha1::new().chain_update(message);
    match pubkey.pubkey.verify_digest(digest, &dsa_signature) {
        Ok(_) => Ok(SignatureVerified::assertion()),
        Err(_) => Err(Error::Signature),
    }
}

fn sign(privkey: &mut Privkey, message: &[u8]) -> Result<Bytes> {
    let Privkey::Dsa(privkey) = privkey else { return Err(Error::PrivkeyFormat) };

    let digest = sha1::Sha1::new().chain_update(message);
    let dsa_signature: dsa::Signature = privkey.privkey.try_sign_digest(digest)
        .map_err(|_| Error::Crypto("could not sign with ssh-dss"))?;

    let mut signature_data = Vec::with_capacity(2 * SCALAR_LEN);
    put_fixed_scalar(&mut signature_data, dsa_signature.r())?;
    put_fixed_scalar(&mut signature_data, dsa_signature.s())?;

    let mut signature = PacketEncode::new();
    signature.put_str("ssh-dss");
    signature.put_bytes(&signature_data);
    Ok(signature.finish())
}

fn put_fixed_scalar(out: &mut Vec<u8>, value: &BigUint) -> Result<()> {
    let digits = value.to_bytes_be();
    if digits.len() > SCALAR_LEN {
        return Err(Error::Crypto("ssh-dss signature scalar does not fit 20 bytes"))
    }
    out.resize(out.len() + SCALAR_LEN - digits.len(), 0);
    out.extend_from_slice(&digits);
    Ok(())
}

pub(super) fn generate(rng: &mut (impl CryptoRng + RngCore)) -> Result<DsaPrivkey> {
    let components = dsa::Components::generate(rng, dsa::KeySize::DSA_1024_160);
    let privkey = dsa::SigningKey::generate(rng, components);
    Ok(DsaPrivkey { privkey })
}

pub(super) fn encode_pubkey_parts(blob: &mut PacketEncode, pubkey: &DsaPubkey) {
    let components = pubkey.pubkey.components();
    blob.put_biguint(components.p());
    blob.put_biguint(components.q());
    blob.put_biguint(components.g());
    blob.put_biguint(pubkey.pubkey.y());
}

pub(super) fn decode_pubkey_parts(blob: &mut PacketDecode) -> Result<DsaPubkey> {
    let p = blob.get_biguint()?;
    let q = blob.get_biguint()?;
    let g = blob.get_biguint()?;
    let y = blob.get_biguint()?;
    decode_pubkey_fields(p, q, g, y)
}

fn decode_pubkey_fields(p: BigUint, q: BigUint, g: BigUint, y: BigUint) -> Result<DsaPubkey> {
    let components = dsa::Components::from_components(p, q, g)
        .map_err(|_| Error::Decode("decoded ssh-dss parameters are invalid"))?;
    let pubkey = dsa::VerifyingKey::from_components(components, y)
        .map_err(|_| Error::Decode("decoded ssh-dss pubkey is invalid"))?;
    Ok(DsaPubkey { pubkey })
}

pub(super) fn encode_privkey_parts(blob: &mut PacketEncode, privkey: &DsaPrivkey, certified: bool) {
    if !certified {
        encode_pubkey_parts(blob, &privkey.pubkey());
    }
    blob.put_biguint(privkey.privkey.x());
}

pub(super) fn decode_privkey_parts(blob: &mut PacketDecode) -> Result<DsaPrivkey> {
    let p = blob.get_biguint()?;
    let q = blob.get_biguint()?;
    let g = blob.get_biguint()?;
    let y = blob.get_biguint()?;
    let pubkey = decode_pubkey_fields(p, q, g, y)?;
    decode_privkey_cert_parts(blob, &pubkey)
}

pub(super) fn decode_privkey_cert_parts(blob: &mut PacketDecode, pubkey: &DsaPubkey) -> Result<DsaPrivkey> {
    let x = blob.get_biguint()?;
    let privkey = dsa::SigningKey::from_components(pubkey.pubkey.clone(), x)
        .map_err(|_| Error::Decode("decoded ssh-dss privkey is invalid"))?;
    Ok(DsaPrivkey { privkey })
}

impl fmt::Display for DsaPubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let components = self.pubkey.components();
        write!(f, "dsa p {} bits, q {} bits", components.p().bits(), components.q().bits())
    }
}
