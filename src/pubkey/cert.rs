//! OpenSSH certificates.
//!
//! A certificate wraps a plain public key with an identity (key id and principals), a validity
//! window and options, all signed by a certification authority. See
//! [PROTOCOL.certkeys](https://github.com/openssh/openssh-portable/blob/master/PROTOCOL.certkeys)
//! for the format.
use bytes::Bytes;
use rand::{CryptoRng, RngCore};
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{Pubkey, Privkey, PubkeyAlgo, KeyType};

/// Maximum number of principals in a certificate that we accept.
pub const CERT_MAX_PRINCIPALS: usize = 256;

/// Certificate type: what the certified key is allowed to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertType {
    /// The key authenticates a user to a host.
    User,
    /// The key authenticates a host to users.
    Host,
}

impl CertType {
    fn from_u32(value: u32) -> Result<CertType> {
        match value {
            1 => Ok(CertType::User),
            2 => Ok(CertType::Host),
            _ => Err(Error::CertUnknownType(value)),
        }
    }

    fn to_u32(self) -> u32 {
        match self {
            CertType::User => 1,
            CertType::Host => 2,
        }
    }
}

/// OpenSSH certificate, a public key signed by a certification authority.
///
/// Obtained by decoding a `...-cert-v01@openssh.com` blob with [`Pubkey::decode()`] or by signing
/// a key with [`certify()`]. Decoding verifies the CA signature, so a `Cert` value always carries
/// a valid signature; use [`check_authority()`][Cert::check_authority] to check the validity
/// window and principals.
///
/// Two certificates compare equal iff their signed blobs are byte-identical.
#[derive(Debug, Clone)]
pub struct Cert {
    /// The exact bytes that the CA signature covers (plus the signature itself). Reencoding the
    /// certificate reproduces these bytes.
    pub blob: Bytes,
    /// CA-provided nonce that makes every certificate unique.
    pub nonce: Bytes,
    /// The certified public key, always a plain key.
    pub pubkey: Pubkey,
    /// Serial number chosen by the CA, 0 if unused.
    pub serial: u64,
    /// Whether this is a user or a host certificate.
    pub cert_type: CertType,
    /// Free-form key identity, logged by servers on authentication.
    pub key_id: String,
    /// User or host names the certificate is valid for. Empty means valid for all.
    pub valid_principals: Vec<String>,
    /// Start of the validity window (seconds since epoch, inclusive).
    pub valid_after: u64,
    /// End of the validity window (seconds since epoch, exclusive).
    pub valid_before: u64,
    critical_options: Vec<(String, Bytes)>,
    extensions: Vec<(String, Bytes)>,
    reserved: Bytes,
    /// The CA public key, always a plain key.
    pub signature_key: Pubkey,
    /// The CA signature over `blob` up to and excluding this signature.
    pub signature: Bytes,
}

/// Identity and constraints for a certificate to be signed, used by [`certify()`].
#[derive(Debug, Clone)]
pub struct CertParams {
    /// Serial number, 0 if unused.
    pub serial: u64,
    /// User or host certificate.
    pub cert_type: CertType,
    /// Free-form key identity.
    pub key_id: String,
    /// Principals the certificate will be valid for, at most [`CERT_MAX_PRINCIPALS`]. Empty means
    /// valid for all.
    pub valid_principals: Vec<String>,
    /// Start of the validity window (inclusive).
    pub valid_after: u64,
    /// End of the validity window (exclusive).
    pub valid_before: u64,
    /// Critical options as (name, encoded data) pairs. An implementation that does not understand
    /// a critical option must reject the certificate.
    pub critical_options: Vec<(String, Bytes)>,
    /// Extensions as (name, encoded data) pairs. Unknown extensions are ignored.
    pub extensions: Vec<(String, Bytes)>,
}

impl Default for CertParams {
    fn default() -> Self {
        CertParams {
            serial: 0,
            cert_type: CertType::User,
            key_id: String::new(),
            valid_principals: Vec::new(),
            valid_after: 0,
            valid_before: u64::MAX,
            critical_options: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Cert {
    /// Critical options as (name, encoded data) pairs.
    ///
    /// We validate the structure of the option list but do not interpret the options; that is up
    /// to the caller that enforces them (typically a server).
    pub fn critical_options(&self) -> &[(String, Bytes)] {
        &self.critical_options
    }

    /// Extensions as (name, encoded data) pairs, not interpreted.
    pub fn extensions(&self) -> &[(String, Bytes)] {
        &self.extensions
    }

    /// Wrap this certificate as a certified [`Pubkey`].
    ///
    /// The inverse of [`Pubkey::without_cert()`]: the certified key keeps the subject key
    /// material and carries the certificate with it.
    pub fn into_pubkey(self) -> Pubkey {
        Pubkey::Cert(Box::new(self))
    }

    /// Check that this certificate authorizes `principal` at the given time.
    ///
    /// `time_now` is in seconds since epoch. `principal` is the user or host name being
    /// authenticated; pass `None` to skip the principal check. The CA signature was already
    /// verified when the certificate was decoded.
    pub fn check_authority(&self, principal: Option<&str>, time_now: u64, cert_type: CertType)
        -> Result<()>
    {
        if self.cert_type != cert_type {
            return Err(Error::CertInvalid("certificate is of a different type"))
        }
        if time_now < self.valid_after {
            return Err(Error::CertInvalid("certificate is not yet valid"))
        }
        if time_now >= self.valid_before {
            return Err(Error::CertInvalid("certificate has expired"))
        }
        if let Some(principal) = principal {
            if !self.valid_principals.is_empty()
                && !self.valid_principals.iter().any(|valid| valid == principal)
            {
                return Err(Error::CertInvalid("certificate is not valid for this principal"))
            }
        }
        Ok(())
    }
}

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.blob == other.blob
    }
}
impl Eq for Cert {}

/// Sign `pubkey` with the CA key `ca_privkey`, producing a certificate.
///
/// `algo` selects the CA signature algorithm and must be compatible with the CA key. The CA key
/// must be a plain RSA, DSA, ECDSA or Ed25519 key; certificates cannot sign other certificates.
/// `rng` provides the certificate nonce.
pub fn certify(
    pubkey: &Pubkey,
    params: CertParams,
    ca_privkey: &mut Privkey,
    algo: &PubkeyAlgo,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<Cert> {
    if pubkey.is_cert() {
        return Err(Error::CertInvalid("cannot certify a certificate"))
    }
    if params.valid_principals.len() > CERT_MAX_PRINCIPALS {
        return Err(Error::CertInvalid("too many principals"))
    }
    let ca_pubkey = ca_privkey.pubkey();
    check_signature_key(&ca_pubkey)?;

    let mut nonce = [0; 32];
    rng.fill_bytes(&mut nonce);

    let mut blob = PacketEncode::new();
    blob.put_str(pubkey.key_type().cert_name());
    blob.put_bytes(&nonce);
    super::encode_pubkey_parts(&mut blob, pubkey);
    blob.put_u64(params.serial);
    blob.put_u32(params.cert_type.to_u32());
    blob.put_str(&params.key_id);
    blob.put_bytes(&encode_string_list(&params.valid_principals));
    blob.put_u64(params.valid_after);
    blob.put_u64(params.valid_before);
    blob.put_bytes(&encode_pair_list(&params.critical_options));
    blob.put_bytes(&encode_pair_list(&params.extensions));
    blob.put_bytes(b"");
    blob.put_bytes(&ca_pubkey.encode());

    let signed = blob.finish();
    let signature = ca_privkey.sign(&signed, algo)?;

    let mut blob = PacketEncode::new();
    blob.put_raw(&signed);
    blob.put_bytes(&signature);

    Ok(Cert {
        blob: blob.finish(),
        nonce: Bytes::copy_from_slice(&nonce),
        pubkey: pubkey.clone(),
        serial: params.serial,
        cert_type: params.cert_type,
        key_id: params.key_id,
        valid_principals: params.valid_principals,
        valid_after: params.valid_after,
        valid_before: params.valid_before,
        critical_options: params.critical_options,
        extensions: params.extensions,
        reserved: Bytes::new(),
        signature_key: ca_pubkey,
        signature,
    })
}

pub(super) fn decode_cert(blob: Bytes, key_type: KeyType) -> Result<Cert> {
    let mut dec = PacketDecode::new(blob.clone());

    let name = dec.get_string()?;
    if name != key_type.cert_name() {
        return Err(Error::CertInvalid("certificate name does not match its key type"))
    }

    let nonce = dec.get_bytes()?;
    let pubkey = super::decode_pubkey_parts(key_type, &mut dec)?;
    let serial = dec.get_u64()?;
    let cert_type = CertType::from_u32(dec.get_u32()?)?;
    let key_id = dec.get_string()?;
    let valid_principals = decode_string_list(dec.get_bytes()?)?;
    if valid_principals.len() > CERT_MAX_PRINCIPALS {
        return Err(Error::CertInvalid("too many principals"))
    }
    let valid_after = dec.get_u64()?;
    let valid_before = dec.get_u64()?;
    let critical_options = decode_pair_list(dec.get_bytes()?)
        .map_err(|_| Error::CertInvalid("malformed critical options"))?;
    let extensions = decode_pair_list(dec.get_bytes()?)
        .map_err(|_| Error::CertInvalid("malformed extensions"))?;
    let reserved = dec.get_bytes()?;

    let signature_key = Pubkey::decode(dec.get_bytes()?)
        .map_err(|_| Error::CertSignKey)?;
    check_signature_key(&signature_key)?;

    // the CA signature covers everything up to this point
    let signed_len = dec.position();
    let signature = dec.get_bytes()?;
    if dec.remaining_len() != 0 {
        return Err(Error::TrailingData)
    }

    signature_key.verify(&blob[..signed_len], signature.clone())?;

    Ok(Cert {
        blob, nonce, pubkey, serial, cert_type, key_id,
        valid_principals, valid_after, valid_before,
        critical_options, extensions, reserved,
        signature_key, signature,
    })
}

// Only plain keys of the basic families can act as a CA: no certificate chains, and the special
// key types (security keys, XMSS) are not accepted either.
fn check_signature_key(pubkey: &Pubkey) -> Result<()> {
    match pubkey {
        Pubkey::Ed25519(_) | Pubkey::Rsa(_) | Pubkey::Dsa(_)
            | Pubkey::EcdsaP256(_) | Pubkey::EcdsaP384(_) | Pubkey::EcdsaP521(_) => Ok(()),
        _ => Err(Error::CertSignKey),
    }
}

fn decode_string_list(blob: Bytes) -> Result<Vec<String>> {
    let mut dec = PacketDecode::new(blob);
    let mut list = Vec::new();
    while dec.remaining_len() > 0 {
        list.push(dec.get_string()?);
    }
    Ok(list)
}

fn encode_string_list(list: &[String]) -> Bytes {
    let mut blob = PacketEncode::new();
    for item in list {
        blob.put_str(item);
    }
    blob.finish()
}

fn decode_pair_list(blob: Bytes) -> Result<Vec<(String, Bytes)>> {
    let mut dec = PacketDecode::new(blob);
    let mut list = Vec::new();
    while dec.remaining_len() > 0 {
        let name = dec.get_string()?;
        let data = dec.get_bytes()?;
        list.push((name, data));
    }
    Ok(list)
}

fn encode_pair_list(list: &[(String, Bytes)]) -> Bytes {
    let mut blob = PacketEncode::new();
    for (name, data) in list {
        blob.put_str(name);
        blob.put_bytes(data);
    }
    blob.finish()
}
