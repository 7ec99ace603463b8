//! Bounds-checked reader over the input buffer.

use crate::error::OutOfBounds;

/// Read/advance cursor over an immutable byte buffer.
///
/// Every read in the decoder goes through this type, so no stage can read
/// past the end of the input. Multi-byte values are little-endian.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to `pos`, clamped to the buffer length.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The whole underlying buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.bytes
    }

    fn out_of_bounds(&self, needed: usize) -> OutOfBounds {
        OutOfBounds {
            offset: self.pos,
            needed,
            available: self.remaining(),
        }
    }

    /// Returns the byte at the current position without consuming it.
    pub fn peek(&self) -> Result<u8, OutOfBounds> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.out_of_bounds(1))
    }

    /// Consumes `n` bytes and returns them.
    pub fn advance(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
        if self.remaining() < n {
            return Err(self.out_of_bounds(n));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], OutOfBounds> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.advance(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_i8(&mut self) -> Result<i8, OutOfBounds> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, OutOfBounds> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, OutOfBounds> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, OutOfBounds> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, OutOfBounds> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let cursor = ByteCursor::new(&[0xAB, 0xCD]);
        assert_eq!(cursor.peek(), Ok(0xAB));
        assert_eq!(cursor.peek(), Ok(0xAB));
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn test_little_endian_reads() {
        let mut cursor = ByteCursor::new(&[0x1e, 0x00, 0x00, 0x00, 0xf8, 0xff]);
        assert_eq!(cursor.read_i32(), Ok(0x1e));
        assert_eq!(cursor.read_u16(), Ok(0xfff8));
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_advance_past_end_fails_without_moving() {
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        cursor.advance(2).unwrap();
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            OutOfBounds {
                offset: 2,
                needed: 4,
                available: 1
            }
        );
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.read_u8(), Ok(3));
        assert!(cursor.peek().is_err());
    }

    #[test]
    fn test_set_position_clamps() {
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        cursor.set_position(10);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.remaining(), 0);
    }
}
