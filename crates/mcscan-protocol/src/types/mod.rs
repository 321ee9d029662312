//! Primitive wire types shared by the handshake, status, and legacy ping
//! codecs.

mod primitives;
mod strings;
mod var_numbers;

pub use primitives::UnsignedShort;
pub use strings::VarString;
pub use var_numbers::VarInt;

use bytes::BytesMut;
use std::io::{self, Read, Write};

/// Decodes a value from a synchronous byte source, returning the value and
/// how many bytes it consumed. Implementors read exactly as many bytes as
/// their encoding needs and never look ahead.
pub trait ProtocolRead: Sized {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<(Self, usize)>;
}

/// Encodes a value onto a synchronous byte sink, returning how many bytes
/// were written.
pub trait ProtocolWrite {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize>;
}

/// Encodes a value directly into a growable buffer. Kept distinct from
/// `ProtocolWrite` because packet assembly favors `BytesMut::put_*` over the
/// `Write` trait's extra indirection on the hot path.
pub trait WriteToBytes {
    fn write_to_bytes(&self, bytes: &mut BytesMut) -> io::Result<usize>;
}
