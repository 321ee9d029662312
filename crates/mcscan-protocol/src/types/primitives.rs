use crate::types::{ProtocolRead, ProtocolWrite};
use std::io::{self, Read, Write};

// UnsignedShort type, used by the legacy (pre-netty) ping/kick framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsignedShort(pub u16);

impl ProtocolWrite for UnsignedShort {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        writer.write_all(&self.0.to_be_bytes())?;
        Ok(2)
    }
}

impl ProtocolRead for UnsignedShort {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<(Self, usize)> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok((UnsignedShort(u16::from_be_bytes(buf)), 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_unsigned_short() {
        let value = UnsignedShort(25565);
        let mut buffer = Vec::new();
        value.write_to(&mut buffer).unwrap();
        let (read_value, read) = UnsignedShort::read_from(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(read, 2);
        assert_eq!(value.0, read_value.0);
    }
}
