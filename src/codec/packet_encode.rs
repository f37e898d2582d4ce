use bytes::{BufMut as _, Bytes, BytesMut};
use num_bigint_dig::BigUint;

/// Encoding of SSH payloads (low level API).
///
/// The format is described in RFC 4251, section 5. This struct just wraps a [`BytesMut`] instance.
#[derive(Debug, Clone)]
pub struct PacketEncode {
    buf: BytesMut,
}

impl PacketEncode {
    /// Creates an empty [`PacketEncode`].
    pub fn new() -> PacketEncode {
        PacketEncode { buf: BytesMut::new() }
    }

    /// Encode a `byte`.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Encode a `boolean`.
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    /// Encode a big endian 16-bit integer.
    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    /// Encode a `uint32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Encode a `uint64`.
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    /// Encode a `string`.
    pub fn put_bytes(&mut self, value: &[u8]) {
        self.buf.reserve(4 + value.len());
        self.buf.put_u32(value.len().try_into().expect("string too long"));
        self.buf.put_slice(value);
    }

    /// Encode a `string` in UTF-8.
    pub fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes())
    }

    /// Encode a `string` in UTF-8 that must not contain a NUL byte.
    pub fn put_cstring(&mut self, value: &str) {
        assert!(!value.as_bytes().contains(&0), "string contains an embedded NUL byte");
        self.put_bytes(value.as_bytes())
    }

    /// Encode a `mpint` from a [`BigUint`].
    ///
    /// The value is encoded in the minimal two's-complement big endian form: leading zero bytes
    /// are stripped and a single zero byte is prepended if the most significant bit of the first
    /// byte would otherwise be set.
    pub fn put_biguint(&mut self, value: &BigUint) {
        let bytes_vec = value.to_bytes_be();
        let mut bytes = bytes_vec.as_slice();

        while !bytes.is_empty() && bytes[0] == 0 {
            bytes = &bytes[1..];
        }

        if !bytes.is_empty() && bytes[0] >= 0x80 {
            self.buf.put_u32(bytes.len() as u32 + 1);
            self.buf.put_u8(0);
            self.buf.put_slice(bytes);
        } else {
            self.buf.put_u32(bytes.len() as u32);
            self.buf.put_slice(bytes);
        }
    }

    /// Encode a `mpint` from an unsigned big endian scalar.
    pub fn put_scalar(&mut self, digits_be: &[u8]) {
        self.put_biguint(&BigUint::from_bytes_be(digits_be))
    }

    /// Append raw bytes to the buffer.
    pub fn put_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Return the number of encoded bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Return true if nothing was encoded yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Unwraps the internal bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    /// Unwraps and freezes the internal bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for PacketEncode {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let e = PacketEncode::new();
        assert!(e.finish().is_empty());
    }

    #[test]
    fn test_put_uint32() {
        let mut e = PacketEncode::new();
        e.put_u32(10);
        e.put_u32(0xdeadbeef);
        assert_eq!(e.finish().as_ref(), &[0,0,0,10, 0xde,0xad,0xbe,0xef]);
    }

    #[test]
    fn test_put_uint64() {
        let mut e = PacketEncode::new();
        e.put_u64(0xdeadbeef00c0ffee);
        assert_eq!(e.finish().as_ref(), &[0xde,0xad,0xbe,0xef,0x00,0xc0,0xff,0xee]);
    }

    #[test]
    fn test_put_string() {
        let mut e = PacketEncode::new();
        e.put_bytes(&[]);
        e.put_bytes(&[10, 20, 30]);
        assert_eq!(e.finish().as_ref(), &[0,0,0,0, 0,0,0,3,10,20,30]);
    }

    #[test]
    fn test_put_biguint() {
        fn check(value_be: &[u8], expected_bytes: &[u8]) {
            let mut e = PacketEncode::new();
            e.put_biguint(&BigUint::from_bytes_be(value_be));
            assert_eq!(e.finish().as_ref(), expected_bytes);
        }

        check(&[], &[0,0,0,0]);
        check(&[42], &[0,0,0,1, 42]);
        check(&[10, 20, 30], &[0,0,0,3, 10, 20, 30]);

        check(&[127, 20, 30], &[0,0,0,3, 127, 20, 30]);
        check(&[128, 20, 30], &[0,0,0,4, 0, 128, 20, 30]);

        check(&[0], &[0,0,0,0]);
        check(&[0, 20, 30], &[0,0,0,2, 20, 30]);
        check(&[0, 0, 0, 20, 30], &[0,0,0,2, 20, 30]);
        check(&[0, 200, 30], &[0,0,0,3, 0, 200, 30]);
        check(&[0, 0, 0, 200, 30], &[0,0,0,3, 0, 200, 30]);
    }

    #[test]
    fn test_biguint_roundtrip() {
        // the sign-bit rule boundary values plus a 2048-bit value with the high bit set
        let mut wide = vec![0x80u8];
        wide.extend(std::iter::repeat(0xa5).take(255));
        for value_be in [&[][..], &[1], &[127], &[128], &[255], &wide] {
            let value = BigUint::from_bytes_be(value_be);
            let mut e = PacketEncode::new();
            e.put_biguint(&value);
            let encoded = e.finish();
            let mut d = crate::codec::PacketDecode::new(encoded.clone());
            assert_eq!(d.get_biguint().unwrap(), value);

            // no superfluous leading zero beyond the sign-bit rule
            let body = &encoded[4..];
            if body.len() > 1 {
                assert!(body[0] != 0 || body[1] & 0x80 != 0);
            }
        }
    }
}
