/// Result type for our [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error that occured while working with SSH keys.
///
/// This enum is `#[non_exhaustive]`, so we reserve the right to add more variants and don't
/// consider this to break backwards compatibility.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    #[error("cryptography error: {0}")]
    Crypto(&'static str),
    #[error("randomness error: {0}")]
    Random(&'static str),
    #[error("signature verification failed")]
    Signature,
    #[error("could not decode bytes: {0}")]
    Decode(&'static str),
    #[error("unexpected trailing data")]
    TrailingData,
    #[error("unknown key type {0:?}")]
    UnknownKeyType(String),
    #[error("public key is in a wrong format")]
    PubkeyFormat,
    #[error("private key is in a wrong format")]
    PrivkeyFormat,
    #[error("invalid key length {0} bits")]
    KeyLength(usize),
    #[error("invalid elliptic curve value: {0}")]
    InvalidEcValue(&'static str),
    #[error("certificate is invalid: {0}")]
    CertInvalid(&'static str),
    #[error("certificate is not signed with a valid CA key")]
    CertSignKey,
    #[error("certificate has unknown type {0}")]
    CertUnknownType(u32),
    #[error("invalid passphrase, could not decrypt the key")]
    BadKeyPassphrase,
    #[error("failed to parse PEM: {0}")]
    Pem(#[source] pem::PemError),
    #[error("bad PEM tag {0:?}, expected {1:?}")]
    BadPemTag(String, String),
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}
