//! Primitive field codecs shared by the message layouts.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use super::{IpcError, IpcResult, IFNAMSIZ};

/// Appends a NUL-padded fixed-width interface name.
pub(super) fn write_name(buf: &mut Vec<u8>, name: &str) -> IpcResult<()> {
    let bytes = name.as_bytes();
    if bytes.len() > IFNAMSIZ {
        return Err(IpcError::NameTooLong {
            name: name.to_string(),
            len: bytes.len(),
            max: IFNAMSIZ,
        });
    }
    buf.write_all(bytes)?;
    buf.write_all(&[0u8; IFNAMSIZ][..IFNAMSIZ - bytes.len()])?;
    Ok(())
}

pub(super) fn write_bool(buf: &mut Vec<u8>, value: bool) -> IpcResult<()> {
    buf.write_u8(u8::from(value))?;
    Ok(())
}

pub(super) fn write_i32(buf: &mut Vec<u8>, value: i32) -> IpcResult<()> {
    buf.write_i32::<LittleEndian>(value)?;
    Ok(())
}

/// Bounds-checked reader over a payload.
pub(super) struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub(super) fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub(super) fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(usize::try_from(self.cursor.position()).unwrap_or(len))
    }

    pub(super) fn consumed(&self) -> usize {
        self.cursor.get_ref().len() - self.remaining()
    }

    fn need(&self, needed: usize) -> IpcResult<()> {
        let available = self.remaining();
        if available < needed {
            return Err(IpcError::Truncated { needed, available });
        }
        Ok(())
    }

    pub(super) fn u8(&mut self) -> IpcResult<u8> {
        self.need(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub(super) fn i8(&mut self) -> IpcResult<i8> {
        self.need(1)?;
        Ok(self.cursor.read_i8()?)
    }

    pub(super) fn bool(&mut self) -> IpcResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub(super) fn u16(&mut self) -> IpcResult<u16> {
        self.need(2)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub(super) fn i32(&mut self) -> IpcResult<i32> {
        self.need(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub(super) fn u32(&mut self) -> IpcResult<u32> {
        self.need(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub(super) fn bytes<const N: usize>(&mut self) -> IpcResult<[u8; N]> {
        self.need(N)?;
        let mut out = [0u8; N];
        std::io::Read::read_exact(&mut self.cursor, &mut out)?;
        Ok(out)
    }

    /// Reads a NUL-padded interface name.
    pub(super) fn name(&mut self) -> IpcResult<String> {
        let raw = self.bytes::<IFNAMSIZ>()?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(IFNAMSIZ);
        String::from_utf8(raw[..end].to_vec()).map_err(|_| IpcError::InvalidName)
    }

    /// Reads an element count and checks that `elem_len * count` bytes follow.
    pub(super) fn count(&mut self, elem_len: usize) -> IpcResult<usize> {
        let raw = self.i32()?;
        let count = usize::try_from(raw).map_err(|_| IpcError::InvalidCount(raw))?;
        self.need(count.saturating_mul(elem_len))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_nul_padded() {
        let mut buf = Vec::new();
        write_name(&mut buf, "Ethernet0").unwrap();
        assert_eq!(buf.len(), IFNAMSIZ);
        assert_eq!(&buf[..9], b"Ethernet0");
        assert!(buf[9..].iter().all(|&b| b == 0));

        let mut reader = Reader::new(&buf);
        assert_eq!(reader.name().unwrap(), "Ethernet0");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_name_of_exact_width() {
        let name = "PortChannel12345";
        assert_eq!(name.len(), IFNAMSIZ);
        let mut buf = Vec::new();
        write_name(&mut buf, name).unwrap();
        assert_eq!(Reader::new(&buf).name().unwrap(), name);
    }

    #[test]
    fn test_name_too_long() {
        let mut buf = Vec::new();
        let err = write_name(&mut buf, "PortChannel123456").unwrap_err();
        assert!(matches!(err, IpcError::NameTooLong { len: 17, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_reader_truncation() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert_eq!(reader.u16().unwrap(), 0x0201);
        assert!(matches!(
            reader.i32(),
            Err(IpcError::Truncated {
                needed: 4,
                available: 1
            })
        ));
        assert_eq!(reader.consumed(), 2);
    }

    #[test]
    fn test_count_rejects_negative_and_oversized() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -1).unwrap();
        assert!(matches!(
            Reader::new(&buf).count(1),
            Err(IpcError::InvalidCount(-1))
        ));

        let mut buf = Vec::new();
        write_i32(&mut buf, 2).unwrap();
        buf.push(0);
        assert!(matches!(
            Reader::new(&buf).count(1),
            Err(IpcError::Truncated { .. })
        ));
    }
}
