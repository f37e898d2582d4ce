use bytes::{Buf as _, Bytes};
use num_bigint_dig::BigUint;
use std::str;
use crate::{Error, Result};

/// Decoding of SSH payloads (low level API).
///
/// The format of SSH payloads is described in RFC 4251, section 5. This struct just wraps a
/// [`Bytes`] instance, so sub-buffers share storage with the buffer they were cut from.
#[derive(Debug)]
pub struct PacketDecode {
    orig_buf: Bytes,
    buf: Bytes,
}

impl PacketDecode {
    /// Wraps the bytes into [`PacketDecode`].
    pub fn new(buf: Bytes) -> PacketDecode {
        PacketDecode { orig_buf: buf.clone(), buf }
    }

    /// Decode a `byte`.
    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    /// Decode a `boolean`.
    pub fn get_bool(&mut self) -> Result<bool> {
        self.get_u8().map(|x| x != 0)
    }

    /// Decode a big endian 16-bit integer.
    pub fn get_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    /// Decode a `uint32`.
    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    /// Decode a `uint64`.
    pub fn get_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    /// Decode a `string`.
    pub fn get_bytes(&mut self) -> Result<Bytes> {
        let len = self.get_u32()? as usize;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Decode a `string` with fixed length.
    pub fn get_byte_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.get_bytes()?;
        if bytes.len() != N {
            return Err(Error::Decode("wrong size of `string`"))
        }

        let mut array = [0; N];
        array.copy_from_slice(&bytes);
        Ok(array)
    }

    /// Decode a `string` in UTF-8.
    pub fn get_string(&mut self) -> Result<String> {
        self.get_bytes().and_then(|x| decode_string(&x))
    }

    /// Decode a `string` in UTF-8 that must not contain a NUL byte.
    pub fn get_cstring(&mut self) -> Result<String> {
        let bytes = self.get_bytes()?;
        if bytes.contains(&0) {
            return Err(Error::Decode("string contains an embedded NUL byte"))
        }
        decode_string(&bytes)
    }

    /// Decode a `string` as a new decoder that shares storage with this buffer.
    pub fn get_decoder(&mut self) -> Result<PacketDecode> {
        self.get_bytes().map(PacketDecode::new)
    }

    /// Decode a `mpint` as [`BigUint`].
    ///
    /// Only the canonical SSH encoding is accepted: the value must be non-negative and must not
    /// carry a superfluous leading zero byte beyond the one mandated by the sign-bit rule.
    pub fn get_biguint(&mut self) -> Result<BigUint> {
        let bytes = self.get_bytes()?;
        if !bytes.is_empty() && bytes[0] & 0x80 != 0 {
            return Err(Error::Decode("negative `mpint` is not supported"))
        }
        if bytes.len() > 1 && bytes[0] == 0 && bytes[1] & 0x80 == 0 {
            return Err(Error::Decode("`mpint` is not in canonical form"))
        }
        Ok(BigUint::from_bytes_be(&bytes))
    }

    /// Decode a `mpint` as a scalar in unsigned big endian with given length.
    pub fn get_scalar(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = self.get_bytes()?;
        while bytes.first() == Some(&0) {
            bytes.advance(1);
        }

        if bytes.len() > len {
            return Err(Error::Decode("decoded number is too long"));
        }

        let mut digits_be = vec![0; len];
        digits_be[len - bytes.len()..].copy_from_slice(&bytes);
        Ok(digits_be)
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        Ok(self.buf.advance(len))
    }

    /// Read `len` bytes directly from the buffer.
    pub fn get_raw(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    fn ensure(&self, min_remaining: usize) -> Result<()> {
        if min_remaining <= self.buf.remaining() {
            Ok(())
        } else {
            Err(Error::Decode("unexpected end of packet"))
        }
    }

    /// Return a slice of the original bytes given to [`PacketDecode::new()`].
    pub fn as_original_bytes(&self) -> &[u8] {
        &self.orig_buf
    }

    /// Return the number of bytes decoded so far.
    pub fn position(&self) -> usize {
        self.orig_buf.len() - self.buf.len()
    }

    /// Return the remaining undecoded bytes.
    pub fn remaining(&self) -> Bytes {
        self.buf.clone()
    }

    /// Return the number of remaining undecoded bytes.
    pub fn remaining_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_string(bytes: &[u8]) -> Result<String> {
    match str::from_utf8(bytes) {
        Ok(string) => Ok(string.into()),
        Err(_) => Err(Error::Decode("string is not valid utf-8")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<D: AsRef<[u8]> + ?Sized>(data: &D) -> PacketDecode {
        PacketDecode::new(b(data))
    }

    fn b<D: AsRef<[u8]> + ?Sized>(data: &D) -> Bytes {
        Bytes::copy_from_slice(data.as_ref())
    }

    #[test]
    fn test_get_uint32() {
        let mut d = decode(&[0,0,0,42, 0xde,0xad,0xbe,0xef]);
        assert_eq!(d.get_u32().unwrap(), 42);
        assert_eq!(d.get_u32().unwrap(), 0xdeadbeef);

        let mut d = decode(&[0xde,0xad]);
        assert!(d.get_u32().is_err());
    }

    #[test]
    fn test_get_uint64() {
        let mut d = decode(&[0,0,0,0,0,0,0,42]);
        assert_eq!(d.get_u64().unwrap(), 42);

        let mut d = decode(&[0,0,0,0,0,0,42]);
        assert!(d.get_u64().is_err());
    }

    #[test]
    fn test_get_bytes() {
        let mut d = decode(&[0,0,0,2, 10,20]);
        assert_eq!(d.get_bytes().unwrap().as_ref(), &[10,20]);

        let mut d = decode(&[0,0,2]);
        assert!(d.get_bytes().is_err());

        let mut d = decode(&[0,0,0,8, 10,20,30]);
        assert!(d.get_bytes().is_err());
    }

    #[test]
    fn test_get_cstring() {
        let mut d = decode(&b"\x00\x00\x00\x03foo"[..]);
        assert_eq!(d.get_cstring().unwrap(), "foo");

        let mut d = decode(&b"\x00\x00\x00\x04fo\x00o"[..]);
        assert!(d.get_cstring().is_err());
    }

    #[test]
    fn test_get_biguint_canonical() {
        let mut d = decode(&[0,0,0,0]);
        assert_eq!(d.get_biguint().unwrap(), BigUint::from(0u8));

        let mut d = decode(&[0,0,0,2, 0,0x80]);
        assert_eq!(d.get_biguint().unwrap(), BigUint::from(0x80u8));

        // negative value
        let mut d = decode(&[0,0,0,1, 0x80]);
        assert!(d.get_biguint().is_err());

        // superfluous leading zero
        let mut d = decode(&[0,0,0,2, 0,0x7f]);
        assert!(d.get_biguint().is_err());
    }

    #[test]
    fn test_get_decoder() {
        let mut d = decode(&[0,0,0,6, 0,0,0,2, 10,20, 0xff]);
        let mut sub = d.get_decoder().unwrap();
        assert_eq!(sub.get_bytes().unwrap().as_ref(), &[10,20]);
        assert_eq!(sub.remaining_len(), 0);
        assert_eq!(d.get_u8().unwrap(), 0xff);
    }

    #[test]
    fn test_position() {
        let mut d = decode(&[0,0,0,1, 7, 3]);
        assert_eq!(d.position(), 0);
        d.get_bytes().unwrap();
        assert_eq!(d.position(), 5);
        d.get_u8().unwrap();
        assert_eq!(d.position(), 6);
    }
}
