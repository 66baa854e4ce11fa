use crate::LayoutError;

/// Bounds-checked little-endian reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Starts reading `buf` at `pos` (clamped to the buffer end).
    #[must_use]
    pub const fn at(buf: &'a [u8], pos: usize) -> Self {
        let pos = if pos > buf.len() { buf.len() } else { pos };
        Self { buf, pos }
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// The whole underlying buffer.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Moves to an absolute position; the end of the buffer is allowed.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when `pos` lies beyond the buffer.
    pub const fn seek(&mut self, pos: usize) -> Result<(), LayoutError> {
        if pos > self.buf.len() {
            return Err(LayoutError::OutOfBounds {
                offset: pos,
                needed: 0,
                available: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips `n` bytes.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than `n` bytes remain.
    pub fn skip(&mut self, n: usize) -> Result<(), LayoutError> {
        self.bytes(n).map(|_| ())
    }

    /// Borrows the next `n` bytes and advances past them.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than `n` bytes remain.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        let out = self.peek_bytes(n)?;
        self.pos += n;
        Ok(out)
    }

    /// Borrows the next `n` bytes without advancing.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than `n` bytes remain.
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8], LayoutError> {
        let oob = || LayoutError::OutOfBounds {
            offset: self.pos,
            needed: n,
            available: self.remaining(),
        };
        let end = self.pos.checked_add(n).ok_or_else(oob)?;
        self.buf.get(self.pos..end).ok_or_else(oob)
    }

    /// Everything from the current position to the end; the cursor ends up exhausted.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = self.buf.get(self.pos..).unwrap_or_default();
        self.pos = self.buf.len();
        out
    }

    /// Splits off the next `n` bytes as an independent cursor.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than `n` bytes remain.
    pub fn sub(&mut self, n: usize) -> Result<Self, LayoutError> {
        self.bytes(n).map(Cursor::new)
    }

    /// Reads a fixed-size byte array.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than `N` bytes remain.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], LayoutError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// # Errors
    /// [`LayoutError::OutOfBounds`] at the end of the buffer.
    pub fn u8(&mut self) -> Result<u8, LayoutError> {
        self.array::<1>().map(|b| b[0])
    }

    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than 2 bytes remain.
    pub fn u16(&mut self) -> Result<u16, LayoutError> {
        self.array().map(u16::from_le_bytes)
    }

    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than 4 bytes remain.
    pub fn u32(&mut self) -> Result<u32, LayoutError> {
        self.array().map(u32::from_le_bytes)
    }

    /// # Errors
    /// [`LayoutError::OutOfBounds`] when fewer than 8 bytes remain.
    pub fn u64(&mut self) -> Result<u64, LayoutError> {
        self.array().map(u64::from_le_bytes)
    }

    /// Next byte without advancing, `None` at the end.
    #[must_use]
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }
}

/// # Errors
/// [`LayoutError::OutOfBounds`] when `off` is past the end.
pub fn read_u8(buf: &[u8], off: usize) -> Result<u8, LayoutError> {
    Cursor::at(buf, off).checked_from(off)?.u8()
}

/// # Errors
/// [`LayoutError::OutOfBounds`] when the two bytes at `off` are not all inside `buf`.
pub fn read_u16(buf: &[u8], off: usize) -> Result<u16, LayoutError> {
    Cursor::at(buf, off).checked_from(off)?.u16()
}

/// # Errors
/// [`LayoutError::OutOfBounds`] when the four bytes at `off` are not all inside `buf`.
pub fn read_u32(buf: &[u8], off: usize) -> Result<u32, LayoutError> {
    Cursor::at(buf, off).checked_from(off)?.u32()
}

/// # Errors
/// [`LayoutError::OutOfBounds`] when the eight bytes at `off` are not all inside `buf`.
pub fn read_u64(buf: &[u8], off: usize) -> Result<u64, LayoutError> {
    Cursor::at(buf, off).checked_from(off)?.u64()
}

impl Cursor<'_> {
    /// Rejects cursors whose requested start was clamped by [`Cursor::at`].
    const fn checked_from(self, off: usize) -> Result<Self, LayoutError> {
        if off > self.buf.len() {
            return Err(LayoutError::OutOfBounds {
                offset: off,
                needed: 1,
                available: 0,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let mut c = Cursor::new(&buf);
        assert_eq!(c.u8().unwrap(), 0x01);
        assert_eq!(c.u16().unwrap(), 0x0302);
        assert_eq!(c.u32().unwrap(), 0x0706_0504);
        assert_eq!(c.remaining(), 2);
        assert!(c.u32().is_err());
        // failed reads do not advance
        assert_eq!(c.position(), 7);
    }

    #[test]
    fn out_of_bounds_reports_offset() {
        let buf = [0u8; 3];
        let err = read_u32(&buf, 1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::OutOfBounds {
                offset: 1,
                needed: 4,
                available: 2
            }
        );
        assert!(read_u8(&buf, 7).is_err());
    }

    #[test]
    fn sub_cursor_is_bounded() {
        let buf = [1u8, 2, 3, 4, 5];
        let mut c = Cursor::new(&buf);
        let mut s = c.sub(2).unwrap();
        assert_eq!(s.u16().unwrap(), 0x0201);
        assert!(s.u8().is_err());
        assert_eq!(c.u8().unwrap(), 3);
        assert_eq!(c.rest(), &[4, 5]);
        assert_eq!(c.remaining(), 0);
    }
}
