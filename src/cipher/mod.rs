//! Encryption and decryption algorithms.
//!
//! The `openssh-key-v1` private key container encrypts the private key section with one of a
//! small set of symmetric ciphers, keyed from the passphrase via `bcrypt-pbkdf`.
//!
//! # Supported algorithms
//!
//! - "aes256-cbc" ([`AES256_CBC`]), the container default
//! - "aes128-ctr" ([`AES128_CTR`])
//! - "aes256-ctr" ([`AES256_CTR`])
//! - "none" ([`NONE`])
use derivative::Derivative;
use crate::Result;
pub use self::aes::{AES128_CTR, AES256_CTR, AES256_CBC};

mod aes;

/// Algorithm for encrypting and decrypting the private key section.
///
/// See the [module documentation][self] for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CipherAlgo {
    /// Name of the algorithm.
    pub name: &'static str,
    pub(crate) block_len: usize,
    pub(crate) key_len: usize,
    pub(crate) iv_len: usize,
    #[derivative(Debug = "ignore")]
    pub(crate) make_encrypt: fn(key: &[u8], iv: &[u8]) -> Box<dyn Encrypt + Send>,
    #[derivative(Debug = "ignore")]
    pub(crate) make_decrypt: fn(key: &[u8], iv: &[u8]) -> Box<dyn Decrypt + Send>,
}

impl CipherAlgo {
    /// Length of the cipher block in bytes.
    pub fn block_len(&self) -> usize { self.block_len }

    /// Length of the cipher key in bytes.
    pub fn key_len(&self) -> usize { self.key_len }

    /// Length of the initialization vector in bytes.
    pub fn iv_len(&self) -> usize { self.iv_len }
}

pub(crate) trait Encrypt {
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()>;
}

pub(crate) trait Decrypt {
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()>;
}

/// "none" cipher (no encryption), used for key files stored without a passphrase.
pub static NONE: CipherAlgo = CipherAlgo {
    name: "none",
    block_len: 8,
    key_len: 0,
    iv_len: 0,
    make_encrypt: |_key, _iv| Box::new(Identity),
    make_decrypt: |_key, _iv| Box::new(Identity),
};

struct Identity;

impl Encrypt for Identity {
    fn encrypt(&mut self, _data: &mut [u8]) -> Result<()> {
        Ok(())
    }
}

impl Decrypt for Identity {
    fn decrypt(&mut self, _data: &mut [u8]) -> Result<()> {
        Ok(())
    }
}

/// All supported cipher algorithms.
pub static ALGOS: &[&CipherAlgo] = &[&NONE, &AES128_CTR, &AES256_CTR, &AES256_CBC];

/// Find a cipher algorithm by name.
pub fn algo_by_name(name: &str) -> Option<&'static CipherAlgo> {
    ALGOS.iter().copied().find(|algo| algo.name == name)
}
