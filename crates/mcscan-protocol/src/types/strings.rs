use crate::types::{ProtocolRead, ProtocolWrite, VarInt, WriteToBytes};
use bytes::BytesMut;
use std::io::{self, Read, Write};

/// A UTF-8 string prefixed by a `VarInt` byte length, as used by the
/// handshake's server-address field and every legacy string field. Capped at
/// 32767 UTF-16 code units worth of UTF-8 (4 bytes/char, matching vanilla's
/// own defensive bound) so a hostile peer can't walk us into an unbounded
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarString(pub String);

const MAX_STRING_CHARS: usize = 32767;
const MAX_STRING_BYTES: usize = MAX_STRING_CHARS * 4;

impl VarString {
    pub fn new(value: impl Into<String>) -> Self {
        VarString(value.into())
    }
}

impl ProtocolWrite for VarString {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let bytes = self.0.as_bytes();
        if bytes.len() > MAX_STRING_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "VarString exceeds maximum byte length",
            ));
        }
        let prefix = VarInt(bytes.len() as i32);
        let mut written = prefix.write_to(writer)?;
        writer.write_all(bytes)?;
        written += bytes.len();
        Ok(written)
    }
}

impl ProtocolRead for VarString {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<(Self, usize)> {
        let (len, prefix_len) = VarInt::read_from(reader)?;
        if len.0 < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "negative string length"));
        }
        let len = len.0 as usize;
        if len > MAX_STRING_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("string length {len} exceeds safety cap"),
            ));
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let value = String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok((VarString(value), prefix_len + len))
    }
}

impl WriteToBytes for VarString {
    fn write_to_bytes(&self, bytes: &mut BytesMut) -> io::Result<usize> {
        let payload = self.0.as_bytes();
        if payload.len() > MAX_STRING_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "VarString exceeds maximum byte length",
            ));
        }
        let prefix = VarInt(payload.len() as i32);
        let mut written = prefix.write_to_bytes(bytes)?;
        bytes.extend_from_slice(payload);
        written += payload.len();
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let s = VarString::new("play.example.net");
        let mut buf = Vec::new();
        let written = s.write_to(&mut buf).unwrap();
        let (read, read_len) = VarString::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(written, read_len);
        assert_eq!(s, read);
    }

    #[test]
    fn rejects_oversized_length_prefix() {
        let mut buf = Vec::new();
        VarInt(MAX_STRING_BYTES as i32 + 1).write_to(&mut buf).unwrap();
        assert!(VarString::read_from(&mut Cursor::new(buf)).is_err());
    }
}
