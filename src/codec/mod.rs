//! Encoding and decoding of SSH wire primitives (low level API).
//!
//! The SSH wire format is described in RFC 4251, section 5. [`PacketEncode`] builds payloads,
//! [`PacketDecode`] consumes untrusted payloads with bounds checks on every read. Both wrap the
//! reference-counted buffers from the [`bytes`] crate, so sub-buffers obtained with
//! [`PacketDecode::get_decoder()`] share storage with their parent without copying.
pub use self::packet_decode::PacketDecode;
pub use self::packet_encode::PacketEncode;

mod packet_decode;
mod packet_encode;
