//! Public key algorithms.
//!
//! SSH supports several public key algorithms, used to authenticate peers and to sign
//! certificates. Plain keys can be wrapped in an [OpenSSH certificate][Cert], which binds the key
//! to an identity with a CA signature.
//!
//! # Supported algorithms
//!
//! - "ssh-ed25519" ([`SSH_ED25519`], uses [`Ed25519Pubkey`] and [`Ed25519Privkey`])
//! - "ssh-rsa" / "rsa-sha2-256" / "rsa-sha2-512" ([`SSH_RSA_SHA1`], [`RSA_SHA2_256`],
//!   [`RSA_SHA2_512`], use [`RsaPubkey`] and [`RsaPrivkey`])
//! - "ssh-dss" ([`SSH_DSS`], uses [`DsaPubkey`] and [`DsaPrivkey`])
//! - "ecdsa-sha2-nistp256" / "-nistp384" / "-nistp521" ([`ECDSA_SHA2_NISTP256`],
//!   [`ECDSA_SHA2_NISTP384`], [`ECDSA_SHA2_NISTP521`])
//! - "sk-ssh-ed25519@openssh.com" ([`SK_SSH_ED25519`], security key)
//! - "sk-ecdsa-sha2-nistp256@openssh.com" ([`SK_ECDSA_SHA2_NISTP256`], security key), plus the
//!   "webauthn-sk-ecdsa-sha2-nistp256@openssh.com" verification variant
//! - "ssh-xmss@openssh.com" ([`SSH_XMSS`], stateful hash-based signatures)
use bytes::Bytes;
use derivative::Derivative;
use rand::{CryptoRng, RngCore};
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
pub use self::cert::{Cert, CertType, CertParams, CERT_MAX_PRINCIPALS, certify};
pub use self::dss::{SSH_DSS, DsaPubkey, DsaPrivkey};
pub use self::ecdsa::{
    ECDSA_SHA2_NISTP256, ECDSA_SHA2_NISTP384, ECDSA_SHA2_NISTP521,
    EcdsaP256Pubkey, EcdsaP256Privkey, EcdsaP384Pubkey, EcdsaP384Privkey,
    EcdsaP521Pubkey, EcdsaP521Privkey,
};
pub use self::ed25519::{SSH_ED25519, Ed25519Pubkey, Ed25519Privkey};
pub use self::rsa::{
    SSH_RSA_SHA1, RSA_SHA2_256, RSA_SHA2_512, RsaPubkey, RsaPrivkey,
    SSH_RSA_MINIMUM_MODULUS_SIZE,
};
pub use self::sk::{
    SK_SSH_ED25519, SK_ECDSA_SHA2_NISTP256, WEBAUTHN_SK_ECDSA_SHA2_NISTP256,
    SkEd25519Pubkey, SkEd25519Privkey, SkEcdsaP256Pubkey, SkEcdsaP256Privkey,
    SK_FLAG_USER_PRESENCE_REQD,
};
pub use self::xmss::{SSH_XMSS, XmssPubkey, XmssPrivkey, XmssParams};

pub mod cert;
mod dss;
mod ecdsa;
mod ed25519;
mod rsa;
mod sk;
mod xmss;

/// Algorithm for public key cryptography.
///
/// See the [module documentation][self] for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PubkeyAlgo {
    /// Name of the algorithm.
    pub name: &'static str,
    #[derivative(Debug = "ignore")]
    pub(crate) verify: fn(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<SignatureVerified>,
    #[derivative(Debug = "ignore")]
    pub(crate) sign: fn(privkey: &mut Privkey, message: &[u8]) -> Result<Bytes>,
}

/// All supported public key algorithms.
pub static ALGOS: &[&PubkeyAlgo] = &[
    &SSH_ED25519,
    &RSA_SHA2_256, &RSA_SHA2_512, &SSH_RSA_SHA1,
    &SSH_DSS,
    &ECDSA_SHA2_NISTP256, &ECDSA_SHA2_NISTP384, &ECDSA_SHA2_NISTP521,
    &SK_SSH_ED25519, &SK_ECDSA_SHA2_NISTP256, &WEBAUTHN_SK_ECDSA_SHA2_NISTP256,
    &SSH_XMSS,
];

/// Find a public key algorithm by its signature format name.
pub fn algo_by_name(name: &str) -> Option<&'static PubkeyAlgo> {
    ALGOS.iter().copied().find(|algo| algo.name == name)
}

/// Type of an SSH key, one variant per plain algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyType {
    /// Ed25519 (RFC 8709).
    Ed25519,
    /// RSA (RFC 4253).
    Rsa,
    /// DSA (RFC 4253), legacy.
    Dsa,
    /// ECDSA on NIST P-256 (RFC 5656).
    EcdsaP256,
    /// ECDSA on NIST P-384 (RFC 5656).
    EcdsaP384,
    /// ECDSA on NIST P-521 (RFC 5656).
    EcdsaP521,
    /// Ed25519 on a FIDO security key.
    SkEd25519,
    /// ECDSA P-256 on a FIDO security key.
    SkEcdsaP256,
    /// XMSS stateful hash-based signatures.
    Xmss,
}

impl KeyType {
    /// Wire name of the plain (non-certificate) key type.
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ssh-ed25519",
            KeyType::Rsa => "ssh-rsa",
            KeyType::Dsa => "ssh-dss",
            KeyType::EcdsaP256 => "ecdsa-sha2-nistp256",
            KeyType::EcdsaP384 => "ecdsa-sha2-nistp384",
            KeyType::EcdsaP521 => "ecdsa-sha2-nistp521",
            KeyType::SkEd25519 => "sk-ssh-ed25519@openssh.com",
            KeyType::SkEcdsaP256 => "sk-ecdsa-sha2-nistp256@openssh.com",
            KeyType::Xmss => "ssh-xmss@openssh.com",
        }
    }

    /// Wire name of the certified variant of the key type.
    pub fn cert_name(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ssh-ed25519-cert-v01@openssh.com",
            KeyType::Rsa => "ssh-rsa-cert-v01@openssh.com",
            KeyType::Dsa => "ssh-dss-cert-v01@openssh.com",
            KeyType::EcdsaP256 => "ecdsa-sha2-nistp256-cert-v01@openssh.com",
            KeyType::EcdsaP384 => "ecdsa-sha2-nistp384-cert-v01@openssh.com",
            KeyType::EcdsaP521 => "ecdsa-sha2-nistp521-cert-v01@openssh.com",
            KeyType::SkEd25519 => "sk-ssh-ed25519-cert-v01@openssh.com",
            KeyType::SkEcdsaP256 => "sk-ecdsa-sha2-nistp256-cert-v01@openssh.com",
            KeyType::Xmss => "ssh-xmss-cert-v01@openssh.com",
        }
    }

    /// Resolve a plain wire name to a key type.
    pub fn from_name(name: &str) -> Option<KeyType> {
        ALL_TYPES.iter().copied().find(|kt| kt.name() == name)
    }

    /// Resolve a certificate wire name to the underlying plain key type.
    pub fn from_cert_name(name: &str) -> Option<KeyType> {
        ALL_TYPES.iter().copied().find(|kt| kt.cert_name() == name)
    }
}

static ALL_TYPES: &[KeyType] = &[
    KeyType::Ed25519, KeyType::Rsa, KeyType::Dsa,
    KeyType::EcdsaP256, KeyType::EcdsaP384, KeyType::EcdsaP521,
    KeyType::SkEd25519, KeyType::SkEcdsaP256, KeyType::Xmss,
];



/// Public key in one of supported formats.
///
/// This enum is marked as `#[non_exhaustive]`, so we might add new variants without breaking
/// backwards compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Pubkey {
    /// Ed25519 public key.
    Ed25519(Ed25519Pubkey),
    /// RSA public key.
    Rsa(RsaPubkey),
    /// DSA public key.
    Dsa(DsaPubkey),
    /// ECDSA public key on NIST P-256 curve.
    EcdsaP256(EcdsaP256Pubkey),
    /// ECDSA public key on NIST P-384 curve.
    EcdsaP384(EcdsaP384Pubkey),
    /// ECDSA public key on NIST P-521 curve.
    EcdsaP521(EcdsaP521Pubkey),
    /// Ed25519 public key held on a security key.
    SkEd25519(SkEd25519Pubkey),
    /// ECDSA P-256 public key held on a security key.
    SkEcdsaP256(SkEcdsaP256Pubkey),
    /// XMSS public key.
    Xmss(XmssPubkey),
    /// A certified public key.
    Cert(Box<Cert>),
}

impl Pubkey {
    /// Get best public key algorithms that work with this key.
    ///
    /// Most key types work with just a single public key algorithm, but with RSA keys
    /// ([`Pubkey::Rsa`]), there are multiple algorithms that differ in the hash function. This
    /// method returns only highly secure algorithms, but older servers may not support them.
    pub fn algos_secure(&self) -> &'static [&'static PubkeyAlgo] {
        static ED25519: &[&PubkeyAlgo] = &[&SSH_ED25519];
        static RSA: &[&PubkeyAlgo] = &[&RSA_SHA2_256, &RSA_SHA2_512];
        static DSA: &[&PubkeyAlgo] = &[];
        static ECDSA_P256: &[&PubkeyAlgo] = &[&ECDSA_SHA2_NISTP256];
        static ECDSA_P384: &[&PubkeyAlgo] = &[&ECDSA_SHA2_NISTP384];
        static ECDSA_P521: &[&PubkeyAlgo] = &[&ECDSA_SHA2_NISTP521];
        static SK_ED25519: &[&PubkeyAlgo] = &[&SK_SSH_ED25519];
        static SK_ECDSA: &[&PubkeyAlgo] = &[&SK_ECDSA_SHA2_NISTP256];
        static XMSS: &[&PubkeyAlgo] = &[&SSH_XMSS];
        match self {
            Pubkey::Ed25519(_) => ED25519,
            Pubkey::Rsa(_) => RSA,
            Pubkey::Dsa(_) => DSA,
            Pubkey::EcdsaP256(_) => ECDSA_P256,
            Pubkey::EcdsaP384(_) => ECDSA_P384,
            Pubkey::EcdsaP521(_) => ECDSA_P521,
            Pubkey::SkEd25519(_) => SK_ED25519,
            Pubkey::SkEcdsaP256(_) => SK_ECDSA,
            Pubkey::Xmss(_) => XMSS,
            Pubkey::Cert(cert) => cert.pubkey.algos_secure(),
        }
    }

    /// Get all public key algorithms that work with this key.
    ///
    /// This method returns all supported algorithms for maximum compatibility, including the
    /// legacy SHA-1 algorithms.
    pub fn algos_compatible_less_secure(&self) -> &'static [&'static PubkeyAlgo] {
        static RSA: &[&PubkeyAlgo] = &[&RSA_SHA2_256, &RSA_SHA2_512, &SSH_RSA_SHA1];
        static DSA: &[&PubkeyAlgo] = &[&SSH_DSS];
        match self.plain() {
            Pubkey::Rsa(_) => RSA,
            Pubkey::Dsa(_) => DSA,
            _ => self.algos_secure(),
        }
    }

    /// Decode a public key from SSH wire encoding.
    ///
    /// This is the encoding initially defined by RFC 4253. For keys other than RSA, the encoding
    /// is defined in the RFC that introduces the key type. Certificates are decoded (and their CA
    /// signature verified) when the blob carries a `-cert-v01@openssh.com` name.
    pub fn decode(blob: Bytes) -> Result<Self> {
        decode_pubkey(blob)
    }

    /// Encode a public key into SSH encoding.
    ///
    /// For certificates, this returns the exact blob bytes that were presented or produced when
    /// the certificate was signed, because the CA signature covers those bytes.
    pub fn encode(&self) -> Bytes {
        encode_pubkey(self)
    }

    /// Key type of this key; for certificates, the type of the certified key.
    pub fn key_type(&self) -> KeyType {
        match self {
            Pubkey::Ed25519(_) => KeyType::Ed25519,
            Pubkey::Rsa(_) => KeyType::Rsa,
            Pubkey::Dsa(_) => KeyType::Dsa,
            Pubkey::EcdsaP256(_) => KeyType::EcdsaP256,
            Pubkey::EcdsaP384(_) => KeyType::EcdsaP384,
            Pubkey::EcdsaP521(_) => KeyType::EcdsaP521,
            Pubkey::SkEd25519(_) => KeyType::SkEd25519,
            Pubkey::SkEcdsaP256(_) => KeyType::SkEcdsaP256,
            Pubkey::Xmss(_) => KeyType::Xmss,
            Pubkey::Cert(cert) => cert.pubkey.key_type(),
        }
    }

    /// Wire name of this key (certificate name for certified keys).
    pub fn type_name(&self) -> &'static str {
        match self {
            Pubkey::Cert(cert) => cert.pubkey.key_type().cert_name(),
            _ => self.key_type().name(),
        }
    }

    /// True if this is a certified key.
    pub fn is_cert(&self) -> bool {
        matches!(self, Pubkey::Cert(_))
    }

    /// The plain key: for a certificate this is the certified key, otherwise the key itself.
    pub fn plain(&self) -> &Pubkey {
        match self {
            Pubkey::Cert(cert) => &cert.pubkey,
            _ => self,
        }
    }

    /// Compare the public key material of two keys, ignoring any certificate.
    ///
    /// Keys of different algorithm families always compare unequal. Unlike `==`, which also
    /// requires byte-identical certificate blobs, this only looks at the keys themselves.
    pub fn equals_plain(&self, other: &Pubkey) -> bool {
        self.plain() == other.plain()
    }

    /// Strip the certificate, if any, leaving the plain key.
    pub fn without_cert(&self) -> Pubkey {
        self.plain().clone()
    }

    /// The certificate of this key, if it is certified.
    pub fn cert(&self) -> Option<&Cert> {
        match self {
            Pubkey::Cert(cert) => Some(cert),
            _ => None,
        }
    }

    /// Verify a signature blob over `message` made with this key.
    ///
    /// The signature format name inside the blob selects the algorithm; the algorithm must be
    /// compatible with this key. A certified key verifies with its plain key (the certificate
    /// plays no role when the subject key signs session data).
    pub fn verify(&self, message: &[u8], signature: Bytes) -> Result<()> {
        let mut peek = PacketDecode::new(signature.clone());
        let format = peek.get_string()?;
        let algo = algo_by_name(&format)
            .ok_or(Error::Decode("unknown signature format"))?;
        (algo.verify)(self.plain(), message, signature).map(|_| ())
    }

    /// Compute a fingerprint of the public key.
    ///
    /// The fingerprint is the SHA-256 digest of the public key encoded with base64 (not padded
    /// with `=` characters) and prefixed with `SHA256:`. See the [`fingerprint`][crate::fingerprint]
    /// module for other derived views (bubblebabble, randomart).
    pub fn fingerprint(&self) -> String {
        use base64::Engine as _;
        use sha2::Digest as _;
        let digest = sha2::Sha256::digest(self.encode());
        format!("SHA256:{}", base64::prelude::BASE64_STANDARD_NO_PAD.encode(digest))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Pubkey::Ed25519(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Rsa(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Dsa(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::EcdsaP256(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::EcdsaP384(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::EcdsaP521(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::SkEd25519(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::SkEcdsaP256(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Xmss(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Cert(cert) => write!(f, "cert {}", cert.pubkey),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SignatureVerified(());

impl SignatureVerified {
    pub(crate) fn assertion() -> Self { Self(()) }
}



/// Private key (keypair) in one of supported formats.
///
/// This enum is marked as `#[non_exhaustive]`, so we might add new variants without breaking
/// backwards compatibility.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
#[cfg_attr(feature = "debug_less_secure", derive(Debug))]
pub enum Privkey {
    /// Ed25519 private key.
    Ed25519(Ed25519Privkey),
    /// RSA private key.
    Rsa(RsaPrivkey),
    /// DSA private key.
    Dsa(DsaPrivkey),
    /// ECDSA private key on NIST P-256 curve.
    EcdsaP256(EcdsaP256Privkey),
    /// ECDSA private key on NIST P-384 curve.
    EcdsaP384(EcdsaP384Privkey),
    /// ECDSA private key on NIST P-521 curve.
    EcdsaP521(EcdsaP521Privkey),
    /// Reference to an Ed25519 key on a security key (key handle, no private scalar).
    SkEd25519(SkEd25519Privkey),
    /// Reference to an ECDSA P-256 key on a security key (key handle, no private scalar).
    SkEcdsaP256(SkEcdsaP256Privkey),
    /// XMSS private key with its one-time-signature state.
    Xmss(XmssPrivkey),
}

impl Privkey {
    /// Return the public key associated with this private key.
    pub fn pubkey(&self) -> Pubkey {
        match self {
            Privkey::Ed25519(privkey) => Pubkey::Ed25519(privkey.pubkey()),
            Privkey::Rsa(privkey) => Pubkey::Rsa(privkey.pubkey()),
            Privkey::Dsa(privkey) => Pubkey::Dsa(privkey.pubkey()),
            Privkey::EcdsaP256(privkey) => Pubkey::EcdsaP256(privkey.pubkey()),
            Privkey::EcdsaP384(privkey) => Pubkey::EcdsaP384(privkey.pubkey()),
            Privkey::EcdsaP521(privkey) => Pubkey::EcdsaP521(privkey.pubkey()),
            Privkey::SkEd25519(privkey) => Pubkey::SkEd25519(privkey.pubkey()),
            Privkey::SkEcdsaP256(privkey) => Pubkey::SkEcdsaP256(privkey.pubkey()),
            Privkey::Xmss(privkey) => Pubkey::Xmss(privkey.pubkey()),
        }
    }

    /// Key type of this private key.
    pub fn key_type(&self) -> KeyType {
        self.pubkey().key_type()
    }

    /// Sign `message` with this key using the given algorithm.
    ///
    /// The algorithm must be compatible with the key (see [`Pubkey::algos_secure()`]). Signing
    /// takes `&mut self` because XMSS signing advances the one-time-signature state; for the
    /// other algorithms the key is not modified. For XMSS keys, consider
    /// [`XmssPrivkey::sign_committed()`], which releases the signature only after the new state
    /// has been durably persisted.
    pub fn sign(&mut self, message: &[u8], algo: &PubkeyAlgo) -> Result<Bytes> {
        (algo.sign)(self, message)
    }

    /// Generate a fresh private key.
    ///
    /// `bits` selects the key size for RSA (at least [`SSH_RSA_MINIMUM_MODULUS_SIZE`], 0 selects
    /// 3072) and must match the fixed sizes of the other families (DSA: 1024, ECDSA: the curve
    /// size; Ed25519 and XMSS ignore 0). Security key types cannot be generated in software.
    pub fn generate(key_type: KeyType, bits: usize, rng: &mut (impl CryptoRng + RngCore)) -> Result<Privkey> {
        log::debug!("generating {} key ({} bits)", key_type.name(), bits);
        match key_type {
            KeyType::Ed25519 => match bits {
                0 | 256 => Ok(Privkey::Ed25519(ed25519::generate(rng))),
                _ => Err(Error::KeyLength(bits)),
            },
            KeyType::Rsa => rsa::generate(rng, bits).map(Privkey::Rsa),
            KeyType::Dsa => match bits {
                0 | 1024 => dss::generate(rng).map(Privkey::Dsa),
                _ => Err(Error::KeyLength(bits)),
            },
            KeyType::EcdsaP256 => match bits {
                0 | 256 => Ok(Privkey::EcdsaP256(ecdsa::generate_p256(rng))),
                _ => Err(Error::KeyLength(bits)),
            },
            KeyType::EcdsaP384 => match bits {
                0 | 384 => Ok(Privkey::EcdsaP384(ecdsa::generate_p384(rng))),
                _ => Err(Error::KeyLength(bits)),
            },
            KeyType::EcdsaP521 => match bits {
                0 | 521 => Ok(Privkey::EcdsaP521(ecdsa::generate_p521(rng))),
                _ => Err(Error::KeyLength(bits)),
            },
            KeyType::SkEd25519 | KeyType::SkEcdsaP256 =>
                Err(Error::Unsupported("security keys are generated on the authenticator device")),
            KeyType::Xmss => match bits {
                0 | 256 => Ok(Privkey::Xmss(xmss::generate(rng, &xmss::XMSS_SHA2_10_256))),
                _ => Err(Error::KeyLength(bits)),
            },
        }
    }

    pub(crate) fn decode(blob: &mut PacketDecode) -> Result<Privkey> {
        decode_privkey(blob)
    }

    pub(crate) fn encode(&self, blob: &mut PacketEncode, cert: Option<&Cert>) {
        encode_privkey(blob, self, cert)
    }
}



fn decode_pubkey(blob: Bytes) -> Result<Pubkey> {
    let mut dec = PacketDecode::new(blob.clone());
    let format = dec.get_string()?;
    if let Some(key_type) = KeyType::from_cert_name(&format) {
        return cert::decode_cert(blob, key_type).map(|cert| Pubkey::Cert(Box::new(cert)));
    }
    let Some(key_type) = KeyType::from_name(&format) else {
        log::debug!("unknown pubkey format {:?}", format);
        return Err(Error::UnknownKeyType(format));
    };
    decode_pubkey_parts(key_type, &mut dec)
}

pub(crate) fn decode_pubkey_parts(key_type: KeyType, blob: &mut PacketDecode) -> Result<Pubkey> {
    match key_type {
        KeyType::Ed25519 => ed25519::decode_pubkey_parts(blob).map(Pubkey::Ed25519),
        KeyType::Rsa => rsa::decode_pubkey_parts(blob).map(Pubkey::Rsa),
        KeyType::Dsa => dss::decode_pubkey_parts(blob).map(Pubkey::Dsa),
        KeyType::EcdsaP256 => ecdsa::decode_p256_pubkey_parts(blob).map(Pubkey::EcdsaP256),
        KeyType::EcdsaP384 => ecdsa::decode_p384_pubkey_parts(blob).map(Pubkey::EcdsaP384),
        KeyType::EcdsaP521 => ecdsa::decode_p521_pubkey_parts(blob).map(Pubkey::EcdsaP521),
        KeyType::SkEd25519 => sk::decode_ed25519_pubkey_parts(blob).map(Pubkey::SkEd25519),
        KeyType::SkEcdsaP256 => sk::decode_ecdsa_pubkey_parts(blob).map(Pubkey::SkEcdsaP256),
        KeyType::Xmss => xmss::decode_pubkey_parts(blob).map(Pubkey::Xmss),
    }
}

pub(crate) fn encode_pubkey_parts(blob: &mut PacketEncode, pubkey: &Pubkey) {
    match pubkey {
        Pubkey::Ed25519(pubkey) => ed25519::encode_pubkey_parts(blob, pubkey),
        Pubkey::Rsa(pubkey) => rsa::encode_pubkey_parts(blob, pubkey),
        Pubkey::Dsa(pubkey) => dss::encode_pubkey_parts(blob, pubkey),
        Pubkey::EcdsaP256(pubkey) => ecdsa::encode_pubkey_parts_p256(blob, pubkey),
        Pubkey::EcdsaP384(pubkey) => ecdsa::encode_pubkey_parts_p384(blob, pubkey),
        Pubkey::EcdsaP521(pubkey) => ecdsa::encode_pubkey_parts_p521(blob, pubkey),
        Pubkey::SkEd25519(pubkey) => sk::encode_ed25519_pubkey_parts(blob, pubkey),
        Pubkey::SkEcdsaP256(pubkey) => sk::encode_ecdsa_pubkey_parts(blob, pubkey),
        Pubkey::Xmss(pubkey) => xmss::encode_pubkey_parts(blob, pubkey),
        Pubkey::Cert(_) => unreachable!("certificates are never nested inside key parts"),
    }
}

fn encode_pubkey(pubkey: &Pubkey) -> Bytes {
    if let Pubkey::Cert(cert) = pubkey {
        return cert.blob.clone();
    }
    let mut blob = PacketEncode::new();
    blob.put_str(pubkey.key_type().name());
    encode_pubkey_parts(&mut blob, pubkey);
    blob.finish()
}

fn decode_privkey(blob: &mut PacketDecode) -> Result<Privkey> {
    let format = blob.get_string()?;

    if let Some(key_type) = KeyType::from_cert_name(&format) {
        let cert_blob = blob.get_bytes()?;
        let cert = cert::decode_cert(cert_blob, key_type)?;
        return decode_privkey_rest(key_type, blob, Some(&cert));
    }

    let Some(key_type) = KeyType::from_name(&format) else {
        log::debug!("unknown privkey format {:?}", format);
        return Err(Error::UnknownKeyType(format));
    };
    decode_privkey_rest(key_type, blob, None)
}

// Decode the fields that follow the name (and, for certified keys, the certificate blob). The
// private encoding of a certified key omits the public components that the certificate already
// carries, so those are taken from `cert`.
fn decode_privkey_rest(key_type: KeyType, blob: &mut PacketDecode, cert: Option<&Cert>) -> Result<Privkey> {
    match key_type {
        KeyType::Ed25519 => ed25519::decode_privkey_parts(blob).map(Privkey::Ed25519),
        KeyType::Rsa => match cert {
            None => rsa::decode_privkey_parts(blob).map(Privkey::Rsa),
            Some(cert) => match &cert.pubkey {
                Pubkey::Rsa(pubkey) => rsa::decode_privkey_cert_parts(blob, pubkey).map(Privkey::Rsa),
                _ => Err(Error::PrivkeyFormat),
            },
        },
        KeyType::Dsa => match cert {
            None => dss::decode_privkey_parts(blob).map(Privkey::Dsa),
            Some(cert) => match &cert.pubkey {
                Pubkey::Dsa(pubkey) => dss::decode_privkey_cert_parts(blob, pubkey).map(Privkey::Dsa),
                _ => Err(Error::PrivkeyFormat),
            },
        },
        KeyType::EcdsaP256 => {
            if cert.is_none() { ecdsa::decode_p256_pubkey_parts(blob)?; }
            ecdsa::decode_p256_privkey_scalar(blob).map(Privkey::EcdsaP256)
        },
        KeyType::EcdsaP384 => {
            if cert.is_none() { ecdsa::decode_p384_pubkey_parts(blob)?; }
            ecdsa::decode_p384_privkey_scalar(blob).map(Privkey::EcdsaP384)
        },
        KeyType::EcdsaP521 => {
            if cert.is_none() { ecdsa::decode_p521_pubkey_parts(blob)?; }
            ecdsa::decode_p521_privkey_scalar(blob).map(Privkey::EcdsaP521)
        },
        KeyType::SkEd25519 => sk::decode_ed25519_privkey_parts(blob, cert).map(Privkey::SkEd25519),
        KeyType::SkEcdsaP256 => sk::decode_ecdsa_privkey_parts(blob, cert).map(Privkey::SkEcdsaP256),
        KeyType::Xmss => match cert {
            None => xmss::decode_privkey_parts(blob).map(Privkey::Xmss),
            Some(_) => Err(Error::Unsupported("certified XMSS private keys")),
        },
    }
}

fn encode_privkey(blob: &mut PacketEncode, privkey: &Privkey, cert: Option<&Cert>) {
    if let Some(cert) = cert {
        blob.put_str(privkey.key_type().cert_name());
        blob.put_bytes(&cert.blob);
    } else {
        blob.put_str(privkey.key_type().name());
    }
    match privkey {
        Privkey::Ed25519(privkey) => ed25519::encode_privkey_parts(blob, privkey),
        Privkey::Rsa(privkey) => rsa::encode_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::Dsa(privkey) => dss::encode_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::EcdsaP256(privkey) => ecdsa::encode_p256_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::EcdsaP384(privkey) => ecdsa::encode_p384_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::EcdsaP521(privkey) => ecdsa::encode_p521_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::SkEd25519(privkey) => sk::encode_ed25519_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::SkEcdsaP256(privkey) => sk::encode_ecdsa_privkey_parts(blob, privkey, cert.is_some()),
        Privkey::Xmss(privkey) => xmss::encode_privkey_parts(blob, privkey),
    }
}
