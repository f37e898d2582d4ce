//! Key exchange methods.
//!
//! These are the ephemeral key encapsulation mechanisms that SSH key exchange builds on: one side
//! generates a keypair, the other encapsulates a secret to its public part, and the keypair owner
//! decapsulates it. Both sides end up with the same secret, already framed the way it enters the
//! SSH exchange hash.
//!
//! # Supported algorithms
//!
//! - "curve25519-sha256" ([`CURVE25519_SHA256`], also under its older name
//!   "curve25519-sha256@libssh.org" as [`CURVE25519_SHA256_LIBSSH`])
//! - "sntrup761x25519-sha512@openssh.com" ([`SNTRUP761X25519_SHA512`]), a post-quantum hybrid
use bytes::Bytes;
use derivative::Derivative;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;
use crate::error::Result;
use crate::util::CryptoRngCore;
pub use self::curve25519::{CURVE25519_SHA256, CURVE25519_SHA256_LIBSSH};
pub use self::sntrup761x25519::SNTRUP761X25519_SHA512;

mod curve25519;
mod sntrup761x25519;

/// Algorithm for key exchange.
///
/// See the [module documentation][self] for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct KexAlgo {
    /// Name of the algorithm.
    pub name: &'static str,
    #[derivative(Debug = "ignore")]
    pub(crate) make_keypair: fn(rng: &mut dyn CryptoRngCore) -> Result<Box<dyn KexKeypair + Send>>,
    #[derivative(Debug = "ignore")]
    pub(crate) encapsulate: fn(rng: &mut dyn CryptoRngCore, peer_public: &[u8]) -> Result<KexEncapsulated>,
}

impl KexAlgo {
    /// Generate an ephemeral keypair for one key exchange.
    pub fn keypair(&self, rng: &mut (impl CryptoRng + RngCore)) -> Result<Box<dyn KexKeypair + Send>> {
        (self.make_keypair)(rng)
    }

    /// Encapsulate a fresh shared secret to the peer's public blob.
    pub fn encapsulate(&self, rng: &mut (impl CryptoRng + RngCore), peer_public: &[u8])
        -> Result<KexEncapsulated>
    {
        (self.encapsulate)(rng, peer_public)
    }
}

/// Our side of an ephemeral key exchange.
pub trait KexKeypair {
    /// The public blob to send to the peer, in the format the algorithm puts on the wire.
    fn public_blob(&self) -> Bytes;

    /// Recover the shared secret from the peer's ciphertext.
    ///
    /// Consumes the keypair: the ephemeral secret is good for a single exchange. The returned
    /// secret is framed (as mpint or string) exactly as it enters the SSH exchange hash.
    fn decapsulate(self: Box<Self>, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Shared secret encapsulated to a peer's public blob.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct KexEncapsulated {
    /// Ciphertext to send back to the keypair owner.
    pub ciphertext: Bytes,
    /// The shared secret, framed exactly as it enters the SSH exchange hash.
    #[derivative(Debug = "ignore")]
    pub secret: Zeroizing<Vec<u8>>,
}

/// All supported key exchange algorithms.
pub static ALGOS: &[&KexAlgo] = &[&CURVE25519_SHA256, &CURVE25519_SHA256_LIBSSH, &SNTRUP761X25519_SHA512];

/// Find a key exchange algorithm by name.
pub fn algo_by_name(name: &str) -> Option<&'static KexAlgo> {
    ALGOS.iter().copied().find(|algo| algo.name == name)
}
