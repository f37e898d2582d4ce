//! Keys held on FIDO security keys.
//!
//! The private key never leaves the authenticator device, so the "private key" here is just a key
//! handle that only the device which generated it can use. Software can verify signatures made by
//! the device, but [signing][super::Privkey::sign] always fails.
use bytes::Bytes;
use ecdsa::signature::DigestVerifier as _;
use num_bigint_dig::BigUint;
use sha2::Digest as _;
use std::fmt;
use subtle::ConstantTimeEq as _;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey, Privkey, SignatureVerified, Cert};

/// "sk-ssh-ed25519@openssh.com" public key algorithm.
///
/// This algorithm is compatible with [`SkEd25519Pubkey`] and [`SkEd25519Privkey`].
pub static SK_SSH_ED25519: PubkeyAlgo = PubkeyAlgo {
    name: "sk-ssh-ed25519@openssh.com",
    verify: verify_ed25519,
    sign: sign_unsupported,
};

/// "sk-ecdsa-sha2-nistp256@openssh.com" public key algorithm.
///
/// This algorithm is compatible with [`SkEcdsaP256Pubkey`] and [`SkEcdsaP256Privkey`].
pub static SK_ECDSA_SHA2_NISTP256: PubkeyAlgo = PubkeyAlgo {
    name: "sk-ecdsa-sha2-nistp256@openssh.com",
    verify: |pubkey, message, signature| verify_ecdsa(pubkey, message, signature, false),
    sign: sign_unsupported,
};

/// "webauthn-sk-ecdsa-sha2-nistp256@openssh.com" signature format.
///
/// A verification-only variant of [`SK_ECDSA_SHA2_NISTP256`] for signatures made by a WebAuthn
/// browser API instead of direct FIDO access. The signature carries the clientData wrapper that
/// the browser actually signed, which we reconstruct and check byte for byte.
pub static WEBAUTHN_SK_ECDSA_SHA2_NISTP256: PubkeyAlgo = PubkeyAlgo {
    name: "webauthn-sk-ecdsa-sha2-nistp256@openssh.com",
    verify: |pubkey, message, signature| verify_ecdsa(pubkey, message, signature, true),
    sign: sign_unsupported,
};

/// Flag bit set when the authenticator asserted user presence.
pub const SK_FLAG_USER_PRESENCE_REQD: u8 = 0x01;

/// Ed25519 public key held on a security key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkEd25519Pubkey {
    pub(crate) pubkey: ed25519_dalek::VerifyingKey,
    /// Application string that the key is bound to, typically `"ssh:"`.
    pub application: String,
}

/// ECDSA P-256 public key held on a security key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkEcdsaP256Pubkey {
    pub(crate) verifying: p256::ecdsa::VerifyingKey,
    /// Application string that the key is bound to, typically `"ssh:"`.
    pub application: String,
}

/// Reference to an Ed25519 key on a security key.
///
/// Holds the key handle and flags that the authenticator needs to use the key, not any secret
/// material usable in software.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkEd25519Privkey {
    pub(crate) pubkey: SkEd25519Pubkey,
    /// Flags that the authenticator applies when signing.
    pub flags: u8,
    pub(crate) key_handle: Bytes,
    pub(crate) reserved: Bytes,
}

/// Reference to an ECDSA P-256 key on a security key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkEcdsaP256Privkey {
    pub(crate) pubkey: SkEcdsaP256Pubkey,
    /// Flags that the authenticator applies when signing.
    pub flags: u8,
    pub(crate) key_handle: Bytes,
    pub(crate) reserved: Bytes,
}

impl SkEd25519Privkey {
    /// Get the public key associated with this key handle.
    pub fn pubkey(&self) -> SkEd25519Pubkey { self.pubkey.clone() }
}

impl SkEcdsaP256Privkey {
    /// Get the public key associated with this key handle.
    pub fn pubkey(&self) -> SkEcdsaP256Pubkey { self.pubkey.clone() }
}

struct SkSignature {
    raw_signature: Bytes,
    flags: u8,
    counter: u32,
}

struct WebauthnParts {
    origin: String,
    client_data: Bytes,
    extensions: Bytes,
}

fn decode_signature(signature: Bytes, expected_name: &str, webauthn: bool)
    -> Result<(SkSignature, Option<WebauthnParts>)>
{
    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != expected_name {
        return Err(Error::Decode("unexpected signature format"))
    }
    let raw_signature = signature.get_bytes()?;
    let flags = signature.get_u8()?;
    let counter = signature.get_u32()?;

    let webauthn = if webauthn {
        Some(WebauthnParts {
            origin: signature.get_string()?,
            client_data: signature.get_bytes()?,
            extensions: signature.get_bytes()?,
        })
    } else {
        None
    };
    Ok((SkSignature { raw_signature, flags, counter }, webauthn))
}

// The authenticator does not sign the message itself, it signs this derived blob.
fn signed_preimage(application: &str, message_hash: &[u8], sk_signature: &SkSignature,
    extensions: &[u8]) -> Vec<u8>
{
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&sha2::Sha256::digest(application.as_bytes()));
    preimage.push(sk_signature.flags);
    preimage.extend_from_slice(&sk_signature.counter.to_be_bytes());
    preimage.extend_from_slice(extensions);
    preimage.extend_from_slice(message_hash);
    preimage
}

// The clientData wrapper is not parsed as JSON: we rebuild the preamble that a well behaved
// browser must have produced and require the wrapper to start with exactly those bytes.
fn check_client_data(message: &[u8], webauthn: &WebauthnParts) -> Result<()> {
    use base64::Engine as _;
    let challenge = base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(message);
    let preamble = format!(
        "{{\"type\":\"webauthn.get\",\"challenge\":\"{}\",\"origin\":\"{}\"",
        challenge, webauthn.origin,
    );
    let preamble = preamble.as_bytes();
    if webauthn.client_data.len() < preamble.len() {
        return Err(Error::Signature)
    }
    if webauthn.client_data[..preamble.len()].ct_eq(preamble).unwrap_u8() != 1 {
        return Err(Error::Signature)
    }
    Ok(())
}

fn verify_ed25519(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<SignatureVerified> {
    let Pubkey::SkEd25519(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };

    let (sk_signature, _) = decode_signature(signature, "sk-ssh-ed25519@openssh.com", false)?;
    if sk_signature.raw_signature.len() != 64 {
        return Err(Error::Decode("unexpected length of ed25519 signature"))
    }
    let mut signature_data = [0; 64];
    signature_data.copy_from_slice(&sk_signature.raw_signature);
    let ed_signature = ed25519_dalek::Signature::from_bytes(&signature_data);

    let message_hash = sha2::Sha256::digest(message);
    let preimage = signed_preimage(&pubkey.application, &message_hash, &sk_signature, &[]);

    match pubkey.pubkey.verify_strict(&preimage, &ed_signature) {
        Ok(_) => Ok(SignatureVerified::assertion()),
        Err(_) => Err(Error::Signature),
    }
}

fn verify_ecdsa(pubkey: &Pubkey, message: &[u8], signature: Bytes, webauthn: bool)
    -> Result<SignatureVerified>
{
    let Pubkey::SkEcdsaP256(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };

    let name = if webauthn {
        "webauthn-sk-ecdsa-sha2-nistp256@openssh.com"
    } else {
        "sk-ecdsa-sha2-nistp256@openssh.com"
    };
    let (sk_signature, webauthn) = decode_signature(signature, name, webauthn)?;

    let mut raw = PacketDecode::new(sk_signature.raw_signature.clone());
    let r = scalar_bytes(raw.get_biguint()?)?;
    let s = scalar_bytes(raw.get_biguint()?)?;
    let ecdsa_signature = p256::ecdsa::Signature::from_scalars(r, s)
        .map_err(|_| Error::Signature)?;

    let (message_hash, extensions) = match &webauthn {
        Some(parts) => {
            check_client_data(message, parts)?;
            (sha2::Sha256::digest(&parts.client_data), parts.extensions.as_ref())
        },
        None => (sha2::Sha256::digest(message), &[][..]),
    };
    let preimage = signed_preimage(&pubkey.application, &message_hash, &sk_signature, extensions);

    let digest = sha2::Sha256::new_with_prefix(&preimage);
    match pubkey.verifying.verify_digest(digest, &ecdsa_signature) {
        Ok(_) => Ok(SignatureVerified::assertion()),
        Err(_) => Err(Error::Signature),
    }
}

fn scalar_bytes(scalar: BigUint) -> Result<p256::FieldBytes> {
    let scalar = scalar.to_bytes_be();
    if scalar.len() > 32 {
        return Err(Error::Signature)
    }
    let mut bytes = p256::FieldBytes::default();
    let copy_idx = bytes.len() - scalar.len();
    bytes[copy_idx..].copy_from_slice(&scalar);
    Ok(bytes)
}

fn sign_unsupported(_privkey: &mut Privkey, _message: &[u8]) -> Result<Bytes> {
    Err(Error::Unsupported("security key signatures are produced by the authenticator device"))
}

pub(super) fn decode_ed25519_pubkey_parts(blob: &mut PacketDecode) -> Result<SkEd25519Pubkey> {
    let pubkey = blob.get_byte_array::<32>()?;
    let pubkey = ed25519_dalek::VerifyingKey::from_bytes(&pubkey)
        .map_err(|_| Error::Decode("decoded sk-ssh-ed25519 pubkey is invalid"))?;
    let application = blob.get_string()?;
    Ok(SkEd25519Pubkey { pubkey, application })
}

pub(super) fn encode_ed25519_pubkey_parts(blob: &mut PacketEncode, pubkey: &SkEd25519Pubkey) {
    blob.put_bytes(pubkey.pubkey.as_bytes());
    blob.put_str(&pubkey.application);
}

pub(super) fn decode_ecdsa_pubkey_parts(blob: &mut PacketDecode) -> Result<SkEcdsaP256Pubkey> {
    if blob.get_string()? != "nistp256" {
        return Err(Error::Decode("bad decoded format of sk-ecdsa public key"))
    }
    let encoded_point = blob.get_bytes()?;
    if encoded_point.first() != Some(&0x04) {
        return Err(Error::InvalidEcValue("ecdsa public point is not in uncompressed form"))
    }
    let verifying = p256::ecdsa::VerifyingKey::from_sec1_bytes(&encoded_point)
        .map_err(|_| Error::InvalidEcValue("ecdsa public point is not on the curve"))?;
    let application = blob.get_string()?;
    Ok(SkEcdsaP256Pubkey { verifying, application })
}

pub(super) fn encode_ecdsa_pubkey_parts(blob: &mut PacketEncode, pubkey: &SkEcdsaP256Pubkey) {
    let encoded_point = pubkey.verifying.to_encoded_point(false);
    blob.put_str("nistp256");
    blob.put_bytes(encoded_point.as_bytes());
    blob.put_str(&pubkey.application);
}

// The private encoding of a certified security key omits the public components that the
// certificate already carries, but repeats the application string.
pub(super) fn decode_ed25519_privkey_parts(blob: &mut PacketDecode, cert: Option<&Cert>)
    -> Result<SkEd25519Privkey>
{
    let pubkey = match cert {
        None => decode_ed25519_pubkey_parts(blob)?,
        Some(cert) => match &cert.pubkey {
            Pubkey::SkEd25519(pubkey) => {
                let application = blob.get_string()?;
                SkEd25519Pubkey { pubkey: pubkey.pubkey, application }
            },
            _ => return Err(Error::PrivkeyFormat),
        },
    };
    let flags = blob.get_u8()?;
    let key_handle = blob.get_bytes()?;
    let reserved = blob.get_bytes()?;
    Ok(SkEd25519Privkey { pubkey, flags, key_handle, reserved })
}

pub(super) fn encode_ed25519_privkey_parts(blob: &mut PacketEncode, privkey: &SkEd25519Privkey,
    certified: bool)
{
    if certified {
        blob.put_str(&privkey.pubkey.application);
    } else {
        encode_ed25519_pubkey_parts(blob, &privkey.pubkey);
    }
    blob.put_u8(privkey.flags);
    blob.put_bytes(&privkey.key_handle);
    blob.put_bytes(&privkey.reserved);
}

pub(super) fn decode_ecdsa_privkey_parts(blob: &mut PacketDecode, cert: Option<&Cert>)
    -> Result<SkEcdsaP256Privkey>
{
    let pubkey = match cert {
        None => decode_ecdsa_pubkey_parts(blob)?,
        Some(cert) => match &cert.pubkey {
            Pubkey::SkEcdsaP256(pubkey) => {
                let application = blob.get_string()?;
                SkEcdsaP256Pubkey { verifying: pubkey.verifying, application }
            },
            _ => return Err(Error::PrivkeyFormat),
        },
    };
    let flags = blob.get_u8()?;
    let key_handle = blob.get_bytes()?;
    let reserved = blob.get_bytes()?;
    Ok(SkEcdsaP256Privkey { pubkey, flags, key_handle, reserved })
}

pub(super) fn encode_ecdsa_privkey_parts(blob: &mut PacketEncode, privkey: &SkEcdsaP256Privkey,
    certified: bool)
{
    if certified {
        blob.put_str(&privkey.pubkey.application);
    } else {
        encode_ecdsa_pubkey_parts(blob, &privkey.pubkey);
    }
    blob.put_u8(privkey.flags);
    blob.put_bytes(&privkey.key_handle);
    blob.put_bytes(&privkey.reserved);
}

impl fmt::Display for SkEd25519Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = Bytes::copy_from_slice(self.pubkey.as_bytes());
        write!(f, "sk-ed25519 {:x} application {:?}", bytes, self.application)
    }
}

impl fmt::Display for SkEcdsaP256Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = Bytes::copy_from_slice(&self.verifying.to_encoded_point(true).to_bytes());
        write!(f, "sk-ecdsa-nistp256 {:x} application {:?}", bytes, self.application)
    }
}
