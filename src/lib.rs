//! SSH key management in pure Rust.
//!
//! This library implements the key material side of SSH: public and private keys, OpenSSH
//! certificates, the `openssh-key-v1` private key file format, key fingerprints and the
//! ephemeral key exchange mechanisms.
//!
//! - Keys live in the [`pubkey`] module ([`Pubkey`], [`Privkey`]), certificates in
//!   [`pubkey::cert`].
//! - Functions for decoding and encoding key files are in the [`keys`] module.
//! - Fingerprint views (bubblebabble, randomart) are in the [`fingerprint`] module.
//! - Key exchange mechanisms are in the [`kex`] module.
//!
#![allow(clippy::box_default)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::module_inception)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

pub use crate::codec::{PacketEncode, PacketDecode};
pub use crate::error::{Result, Error};
pub use crate::keys::{OpensshKeypair, OpensshKeypairNopass};

pub use self::cipher::CipherAlgo;
pub use self::kex::KexAlgo;
pub use self::pubkey::{PubkeyAlgo, Pubkey, Privkey, KeyType};
pub use self::pubkey::{Cert, CertType, CertParams};

pub use bytes;
pub use ecdsa;
pub use ecdsa::elliptic_curve;
pub use ed25519_dalek;
pub use p256;
pub use p384;
pub use p521;
pub use pem;
pub use rsa;

pub mod cipher;
mod codec;
mod error;
pub mod fingerprint;
pub mod kex;
pub mod keys;
pub mod pubkey;
mod util;
