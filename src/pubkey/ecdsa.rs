use bytes::Bytes;
use ecdsa::signature::hazmat::{PrehashSigner as _, PrehashVerifier as _};
use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use sha2::Digest as _;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey, Privkey, SignatureVerified};

/// "ecdsa-sha2-nistp256" public key algorithm from RFC 5656.
///
/// This algorithm is compatible with [`EcdsaP256Pubkey`] and [`EcdsaP256Privkey`].
pub static ECDSA_SHA2_NISTP256: PubkeyAlgo = PubkeyAlgo {
    name: "ecdsa-sha2-nistp256",
    verify: p256_impl::verify,
    sign: p256_impl::sign,
};

/// "ecdsa-sha2-nistp384" public key algorithm from RFC 5656.
///
/// This algorithm is compatible with [`EcdsaP384Pubkey`] and [`EcdsaP384Privkey`].
pub static ECDSA_SHA2_NISTP384: PubkeyAlgo = PubkeyAlgo {
    name: "ecdsa-sha2-nistp384",
    verify: p384_impl::verify,
    sign: p384_impl::sign,
};

/// "ecdsa-sha2-nistp521" public key algorithm from RFC 5656.
///
/// This algorithm is compatible with [`EcdsaP521Pubkey`] and [`EcdsaP521Privkey`].
pub static ECDSA_SHA2_NISTP521: PubkeyAlgo = PubkeyAlgo {
    name: "ecdsa-sha2-nistp521",
    verify: p521_impl::verify,
    sign: p521_impl::sign,
};

macro_rules! ecdsa_curve {
    (
        $impl_mod:ident, $curve_crate:ident, $digest:ty, $variant:ident,
        $pubkey:ident, $privkey:ident, $algo_name:literal, $format_name:literal, $scalar_len:literal,
        $decode_pubkey_parts:ident, $encode_pubkey_parts:ident,
        $decode_privkey_scalar:ident, $encode_privkey_parts:ident, $generate:ident
    ) => {
        /// ECDSA public key on the curve named in the type.
        ///
        /// You can convert it to and from the verifying key of the curve crate using
        /// `from()`/`into()`.
        #[derive(Clone)]
        pub struct $pubkey {
            pub(crate) verifying: $curve_crate::ecdsa::VerifyingKey,
        }

        // the verifying key of some curve crates comes without Debug and PartialEq
        impl fmt::Debug for $pubkey {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.debug_struct(stringify!($pubkey))
                    .field("verifying", &self.verifying.to_encoded_point(false))
                    .finish()
            }
        }

        impl PartialEq for $pubkey {
            fn eq(&self, other: &Self) -> bool {
                self.verifying.to_encoded_point(false) == other.verifying.to_encoded_point(false)
            }
        }
        impl Eq for $pubkey {}

        /// ECDSA keypair on the curve named in the type.
        ///
        /// You can convert it to and from the signing key of the curve crate using
        /// `from()`/`into()`.
        #[derive(Clone)]
        #[cfg_attr(feature = "debug_less_secure", derive(Debug))]
        pub struct $privkey {
            pub(crate) signing: $curve_crate::ecdsa::SigningKey,
        }

        impl $privkey {
            /// Get the public key associated with this private key.
            pub fn pubkey(&self) -> $pubkey {
                $pubkey { verifying: $curve_crate::ecdsa::VerifyingKey::from(&self.signing) }
            }
        }

        impl PartialEq for $privkey {
            fn eq(&self, other: &Self) -> bool {
                self.signing.to_bytes() == other.signing.to_bytes()
            }
        }
        impl Eq for $privkey {}

        impl From<$curve_crate::ecdsa::VerifyingKey> for $pubkey {
            fn from(verifying: $curve_crate::ecdsa::VerifyingKey) -> Self { Self { verifying } }
        }
        impl From<$pubkey> for $curve_crate::ecdsa::VerifyingKey {
            fn from(pubkey: $pubkey) -> Self { pubkey.verifying }
        }
        impl From<$curve_crate::ecdsa::SigningKey> for $privkey {
            fn from(signing: $curve_crate::ecdsa::SigningKey) -> Self { Self { signing } }
        }
        impl From<$privkey> for $curve_crate::ecdsa::SigningKey {
            fn from(privkey: $privkey) -> Self { privkey.signing }
        }

        impl fmt::Display for $pubkey {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let bytes = Bytes::copy_from_slice(&self.verifying.to_encoded_point(true).to_bytes());
                write!(f, "ecdsa-{} {:x}", $format_name, bytes)
            }
        }

        mod $impl_mod {
            use super::*;

            pub(super) fn verify(pubkey: &Pubkey, message: &[u8], signature: Bytes)
                -> Result<SignatureVerified>
            {
                let Pubkey::$variant(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };

                let mut signature = PacketDecode::new(signature);
                if signature.get_string()? != $algo_name {
                    return Err(Error::Decode("unexpected signature format"))
                }

                let mut signature_blob = PacketDecode::new(signature.get_bytes()?);
                let r = scalar_bytes(signature_blob.get_biguint()?)?;
                let s = scalar_bytes(signature_blob.get_biguint()?)?;
                let ecdsa_signature = $curve_crate::ecdsa::Signature::from_scalars(r, s)
                    .map_err(|_| Error::Signature)?;

                let digest = <$digest>::digest(message);
                match pubkey.verifying.verify_prehash(&digest, &ecdsa_signature) {
                    Ok(_) => Ok(SignatureVerified::assertion()),
                    Err(_) => Err(Error::Signature),
                }
            }

            pub(super) fn sign(privkey: &mut Privkey, message: &[u8]) -> Result<Bytes> {
                let Privkey::$variant(privkey) = privkey else { return Err(Error::PrivkeyFormat) };

                let digest = <$digest>::digest(message);
                let ecdsa_signature: $curve_crate::ecdsa::Signature =
                    privkey.signing.sign_prehash(&digest)
                        .map_err(|_| Error::Crypto("could not sign with ecdsa"))?;
                let (r, s) = ecdsa_signature.split_bytes();

                let mut signature_blob = PacketEncode::new();
                signature_blob.put_biguint(&BigUint::from_bytes_be(&r));
                signature_blob.put_biguint(&BigUint::from_bytes_be(&s));

                let mut signature = PacketEncode::new();
                signature.put_str($algo_name);
                signature.put_bytes(&signature_blob.finish());
                Ok(signature.finish())
            }

            fn scalar_bytes(scalar: BigUint) -> Result<$curve_crate::FieldBytes> {
                let scalar = scalar.to_bytes_be();
                if scalar.len() > $scalar_len {
                    return Err(Error::Signature)
                }
                let mut bytes = $curve_crate::FieldBytes::default();
                let copy_idx = bytes.len() - scalar.len();
                bytes[copy_idx..].copy_from_slice(&scalar);
                Ok(bytes)
            }
        }

        pub(super) fn $decode_pubkey_parts(blob: &mut PacketDecode) -> Result<$pubkey> {
            if blob.get_string()? != $format_name {
                return Err(Error::Decode("bad decoded format of ecdsa public key"))
            }

            let encoded_point = blob.get_bytes()?;
            // only the uncompressed SEC1 encoding is allowed on the wire
            if encoded_point.first() != Some(&0x04) {
                return Err(Error::InvalidEcValue("ecdsa public point is not in uncompressed form"))
            }
            let verifying = $curve_crate::ecdsa::VerifyingKey::from_sec1_bytes(&encoded_point)
                .map_err(|_| Error::InvalidEcValue("ecdsa public point is not on the curve"))?;
            Ok($pubkey { verifying })
        }

        pub(super) fn $encode_pubkey_parts(blob: &mut PacketEncode, pubkey: &$pubkey) {
            let encoded_point = pubkey.verifying.to_encoded_point(false);
            blob.put_str($format_name);
            blob.put_bytes(encoded_point.as_bytes());
        }

        pub(super) fn $decode_privkey_scalar(blob: &mut PacketDecode) -> Result<$privkey> {
            let scalar = blob.get_biguint()?.to_bytes_be();
            if scalar.len() > $scalar_len {
                return Err(Error::Decode("ecdsa private scalar is too long"))
            }
            let mut bytes = $curve_crate::FieldBytes::default();
            let copy_idx = bytes.len() - scalar.len();
            bytes[copy_idx..].copy_from_slice(&scalar);
            let signing = $curve_crate::ecdsa::SigningKey::from_bytes(&bytes)
                .map_err(|_| Error::Decode("ecdsa private scalar is invalid"))?;
            Ok($privkey { signing })
        }

        pub(super) fn $encode_privkey_parts(blob: &mut PacketEncode, privkey: &$privkey, certified: bool) {
            if !certified {
                $encode_pubkey_parts(blob, &privkey.pubkey());
            }
            blob.put_biguint(&BigUint::from_bytes_be(&privkey.signing.to_bytes()));
        }

        pub(super) fn $generate(rng: &mut (impl CryptoRng + RngCore)) -> $privkey {
            $privkey { signing: $curve_crate::ecdsa::SigningKey::random(rng) }
        }
    };
}

ecdsa_curve! {
    p256_impl, p256, sha2::Sha256, EcdsaP256,
    EcdsaP256Pubkey, EcdsaP256Privkey, "ecdsa-sha2-nistp256", "nistp256", 32,
    decode_p256_pubkey_parts, encode_pubkey_parts_p256,
    decode_p256_privkey_scalar, encode_p256_privkey_parts, generate_p256
}

ecdsa_curve! {
    p384_impl, p384, sha2::Sha384, EcdsaP384,
    EcdsaP384Pubkey, EcdsaP384Privkey, "ecdsa-sha2-nistp384", "nistp384", 48,
    decode_p384_pubkey_parts, encode_pubkey_parts_p384,
    decode_p384_privkey_scalar, encode_p384_privkey_parts, generate_p384
}

ecdsa_curve! {
    p521_impl, p521, sha2::Sha512, EcdsaP521,
    EcdsaP521Pubkey, EcdsaP521Privkey, "ecdsa-sha2-nistp521", "nistp521", 66,
    decode_p521_pubkey_parts, encode_pubkey_parts_p521,
    decode_p521_privkey_scalar, encode_p521_privkey_parts, generate_p521
}
