//! A cursor over the AML bodies of one or more definition blocks.
//!
//! The stream holds every loaded table. One of them is active at a time; the
//! read position is an offset into the whole table (header included) so that
//! diagnostics match what a hex dump of the file shows.
//!
//! Productions that may fail take a [`Mark`] first and [`AmlStream::reset`] to
//! it on failure. Length-bounded productions push a limit with
//! [`AmlStream::push_limit`]; reads never cross the innermost limit.

use inspector_acpi::{HEADER_LEN, table_bytes};
use inspector_layout::Cursor;
use log::error;

use crate::name::NameString;
use crate::opcode::EXT_PREFIX;
use crate::pkglength::PkgLength;
use crate::AmlError;

/// Bytes shown on each side of the position in a context dump.
const DUMP_WINDOW: usize = 16;

#[derive(Debug, Clone)]
struct StreamTable {
    name: String,
    bytes: Vec<u8>,
}

/// A saved stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    table: usize,
    pos: usize,
    depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AmlStream {
    tables: Vec<StreamTable>,
    current: usize,
    pos: usize,
    limits: Vec<usize>,
}

impl AmlStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition block under `name` and returns its table index.
    ///
    /// The bytes are cut to the length declared in the header.
    ///
    /// # Errors
    /// * [`AmlError::Acpi`] if the header is missing or its length is invalid.
    /// * [`AmlError::Malformed`] if a table of that name is already loaded.
    pub fn add_table(&mut self, name: &str, bytes: &[u8]) -> Result<usize, AmlError> {
        if self.table_index(name).is_some() {
            return Err(AmlError::Malformed(format!("table {name} loaded twice")));
        }
        let (_, body) = table_bytes(bytes)?;
        self.tables.push(StreamTable {
            name: name.to_owned(),
            bytes: body.to_vec(),
        });
        Ok(self.tables.len() - 1)
    }

    #[must_use]
    pub fn table_index(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Makes `name` the active table and moves to the start of its AML body.
    ///
    /// # Errors
    /// [`AmlError::Malformed`] if no such table was added.
    pub fn switch_stream(&mut self, name: &str) -> Result<(), AmlError> {
        let index = self
            .table_index(name)
            .ok_or_else(|| AmlError::Malformed(format!("no table named {name}")))?;
        let end = self.tables[index].bytes.len();
        self.select(index, HEADER_LEN, end)
    }

    /// Makes table `index` active with the window `start..end`.
    ///
    /// # Errors
    /// [`AmlError::ScopeMismatch`] if the window does not fit the table.
    pub fn select(&mut self, index: usize, start: usize, end: usize) -> Result<(), AmlError> {
        let len = self
            .tables
            .get(index)
            .map(|t| t.bytes.len())
            .ok_or_else(|| AmlError::Malformed(format!("no table with index {index}")))?;
        if start > end || end > len {
            return Err(AmlError::ScopeMismatch {
                offset: start,
                reason: format!("window {start:#x}..{end:#x} outside a {len:#x}-byte table"),
            });
        }
        self.current = index;
        self.pos = start;
        self.limits = vec![end];
        Ok(())
    }

    /// Name of the active table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.tables.get(self.current).map_or("", |t| t.name.as_str())
    }

    #[must_use]
    pub const fn current_table(&self) -> usize {
        self.current
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// The innermost limit; reads stop here.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limits.last().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.pos >= self.limit()
    }

    fn window(&self) -> &[u8] {
        let bytes = self.tables.get(self.current).map_or(&[][..], |t| t.bytes.as_slice());
        &bytes[..self.limit().min(bytes.len())]
    }

    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark {
            table: self.current,
            pos: self.pos,
            depth: self.limits.len(),
        }
    }

    /// Returns to a saved position, dropping limits pushed since.
    pub fn reset(&mut self, mark: Mark) {
        self.current = mark.table;
        self.pos = mark.pos;
        self.limits.truncate(mark.depth.max(1));
    }

    /// Bounds reads to `end` until the matching [`AmlStream::pop_limit`].
    ///
    /// # Errors
    /// [`AmlError::ScopeMismatch`] if `end` lies beyond the current limit.
    pub fn push_limit(&mut self, end: usize) -> Result<(), AmlError> {
        let outer = self.limit();
        if end > outer || end < self.pos {
            return Err(AmlError::ScopeMismatch {
                offset: self.pos,
                reason: format!("package end {end:#x} outside enclosing scope ending at {outer:#x}"),
            });
        }
        self.limits.push(end);
        Ok(())
    }

    /// Leaves the innermost limit and continues right after it.
    pub fn pop_limit(&mut self) {
        if self.limits.len() > 1
            && let Some(end) = self.limits.pop()
        {
            self.pos = end;
        }
    }

    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.window().get(self.pos).copied()
    }

    /// Peeks the opcode at the position, combining the extended prefix.
    #[must_use]
    pub fn peek_opcode(&self) -> Option<u16> {
        let w = self.window();
        match *w.get(self.pos)? {
            EXT_PREFIX => w.get(self.pos + 1).map(|&b| 0x5B00 | u16::from(b)),
            b => Some(u16::from(b)),
        }
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor::at(self.window(), self.pos)
    }

    /// # Errors
    /// [`AmlError::Layout`] at the end of the current limit.
    pub fn read_u8(&mut self) -> Result<u8, AmlError> {
        let mut c = self.cursor();
        let v = c.u8()?;
        self.pos = c.position();
        Ok(v)
    }

    /// # Errors
    /// [`AmlError::Layout`] at the end of the current limit.
    pub fn read_u16(&mut self) -> Result<u16, AmlError> {
        let mut c = self.cursor();
        let v = c.u16()?;
        self.pos = c.position();
        Ok(v)
    }

    /// # Errors
    /// [`AmlError::Layout`] at the end of the current limit.
    pub fn read_u32(&mut self) -> Result<u32, AmlError> {
        let mut c = self.cursor();
        let v = c.u32()?;
        self.pos = c.position();
        Ok(v)
    }

    /// # Errors
    /// [`AmlError::Layout`] at the end of the current limit.
    pub fn read_u64(&mut self) -> Result<u64, AmlError> {
        let mut c = self.cursor();
        let v = c.u64()?;
        self.pos = c.position();
        Ok(v)
    }

    /// # Errors
    /// [`AmlError::Layout`] if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, AmlError> {
        let mut c = self.cursor();
        let v = c.bytes(n)?.to_vec();
        self.pos = c.position();
        Ok(v)
    }

    /// Everything up to the current limit.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let mut c = self.cursor();
        let v = c.rest().to_vec();
        self.pos = c.position();
        v
    }

    /// Reads an opcode, consuming the extended prefix if present.
    ///
    /// # Errors
    /// [`AmlError::Layout`] at the end of the current limit.
    pub fn read_opcode(&mut self) -> Result<u16, AmlError> {
        match self.read_u8()? {
            EXT_PREFIX => Ok(0x5B00 | u16::from(self.read_u8()?)),
            b => Ok(u16::from(b)),
        }
    }

    /// Reads a NUL-terminated ASCII string.
    ///
    /// # Errors
    /// [`AmlError::Decode`] if no terminator appears before the limit.
    pub fn read_string(&mut self) -> Result<String, AmlError> {
        let w = self.window().get(self.pos..).unwrap_or_default();
        let len = w.iter().position(|&b| b == 0).ok_or(AmlError::Decode {
            opcode: crate::opcode::STRING_PREFIX,
            offset: self.pos,
            production: "String",
        })?;
        let s = String::from_utf8_lossy(&w[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// # Errors
    /// [`AmlError::Decode`] if the bytes do not form a name string.
    pub fn read_name_string(&mut self) -> Result<NameString, AmlError> {
        let base = self.pos;
        let w = self.window().get(base..).unwrap_or_default();
        let (name, len) = NameString::decode(w).map_err(|e| relocate(e, base))?;
        self.pos += len;
        Ok(name)
    }

    /// Reads a package length and returns the absolute end of the package.
    ///
    /// # Errors
    /// * [`AmlError::Decode`] for a truncated encoding.
    /// * [`AmlError::ScopeMismatch`] if the package overruns the current limit.
    pub fn read_pkg_length(&mut self) -> Result<usize, AmlError> {
        let start = self.pos;
        let w = self.window().get(start..).unwrap_or_default();
        let pkg = PkgLength::decode(w).map_err(|e| relocate(e, start))?;
        let end = start + pkg.value as usize;
        if end > self.limit() || (pkg.value as usize) < pkg.encoded_len {
            return Err(AmlError::ScopeMismatch {
                offset: start,
                reason: format!(
                    "package of {:#x} byte(s) does not fit the scope ending at {:#x}",
                    pkg.value,
                    self.limit()
                ),
            });
        }
        self.pos += pkg.encoded_len;
        Ok(end)
    }

    /// Reads a value in package length encoding without treating it as a
    /// package, as `FieldLength` does.
    ///
    /// # Errors
    /// [`AmlError::Decode`] for a truncated encoding.
    pub fn read_encoded_length(&mut self) -> Result<u32, AmlError> {
        let start = self.pos;
        let w = self.window().get(start..).unwrap_or_default();
        let pkg = PkgLength::decode(w).map_err(|e| relocate(e, start))?;
        self.pos += pkg.encoded_len;
        Ok(pkg.value)
    }

    /// Moves within the current limit.
    ///
    /// # Errors
    /// [`AmlError::ScopeMismatch`] if `pos` lies beyond the limit.
    pub fn seek(&mut self, pos: usize) -> Result<(), AmlError> {
        if pos > self.limit() {
            return Err(AmlError::ScopeMismatch {
                offset: self.pos,
                reason: format!("seek to {pos:#x} beyond the scope ending at {:#x}", self.limit()),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Table name, offset and the bytes around the position.
    #[must_use]
    pub fn context(&self) -> String {
        let bytes = self.tables.get(self.current).map_or(&[][..], |t| t.bytes.as_slice());
        let from = self.pos.saturating_sub(DUMP_WINDOW);
        let to = (self.pos + DUMP_WINDOW).min(bytes.len());
        let mut hex = String::new();
        for (i, b) in bytes.get(from..to).unwrap_or_default().iter().enumerate() {
            if from + i == self.pos {
                hex.push('[');
            }
            hex.push_str(&format!("{b:02x}"));
            if from + i == self.pos {
                hex.push(']');
            }
            hex.push(' ');
        }
        format!("{} at {:#x}: {}", self.table_name(), self.pos, hex.trim_end())
    }

    /// Logs [`AmlStream::context`] at error level.
    pub fn dump_context(&self) {
        error!("AML stream state: {}", self.context());
    }
}

fn relocate(e: AmlError, base: usize) -> AmlError {
    match e {
        AmlError::Decode {
            opcode,
            offset,
            production,
        } => AmlError::Decode {
            opcode,
            offset: base + offset,
            production,
        },
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use inspector_acpi::HEADER_LEN;

    /// Wraps an AML body in a definition block header with a valid checksum.
    pub fn definition_block(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let len = u32::try_from(HEADER_LEN + body.len()).unwrap();
        let mut t = Vec::with_capacity(HEADER_LEN + body.len());
        t.extend_from_slice(signature);
        t.extend_from_slice(&len.to_le_bytes());
        t.push(2);
        t.push(0);
        t.extend_from_slice(b"BOARD ");
        t.extend_from_slice(b"TESTTBL ");
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(b"INTL");
        t.extend_from_slice(&0x2021_0930u32.to_le_bytes());
        t.extend_from_slice(body);
        let sum = t.iter().fold(0u8, |a, &b| a.wrapping_add(b));
        t[9] = sum.wrapping_neg();
        t
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::definition_block;
    use super::*;

    fn stream(body: &[u8]) -> AmlStream {
        let mut s = AmlStream::new();
        s.add_table("DSDT", &definition_block(b"DSDT", body)).unwrap();
        s.switch_stream("DSDT").unwrap();
        s
    }

    #[test]
    fn starts_after_the_header() {
        let s = stream(&[0x10, 0x05]);
        assert_eq!(s.position(), HEADER_LEN);
        assert_eq!(s.peek(), Some(0x10));
        assert_eq!(s.table_name(), "DSDT");
    }

    #[test]
    fn mark_and_reset_nest() {
        let mut s = stream(&[1, 2, 3, 4]);
        let outer = s.mark();
        s.read_u8().unwrap();
        let inner = s.mark();
        s.read_u16().unwrap();
        s.reset(inner);
        assert_eq!(s.read_u8().unwrap(), 2);
        s.reset(outer);
        assert_eq!(s.read_u8().unwrap(), 1);
    }

    #[test]
    fn limits_bound_reads() {
        let mut s = stream(&[0x03, 0xAA, 0xBB, 0xCC]);
        let end = s.read_pkg_length().unwrap();
        assert_eq!(end, HEADER_LEN + 3);
        s.push_limit(end).unwrap();
        assert_eq!(s.read_rest(), vec![0xAA, 0xBB]);
        assert!(s.read_u8().is_err());
        s.pop_limit();
        assert_eq!(s.read_u8().unwrap(), 0xCC);
    }

    #[test]
    fn package_overrunning_the_scope_is_rejected() {
        let mut s = stream(&[0x10, 0x00]);
        assert!(matches!(s.read_pkg_length(), Err(AmlError::ScopeMismatch { .. })));
    }

    #[test]
    fn extended_opcodes_combine() {
        let mut s = stream(&[0x5B, 0x82, 0x70]);
        assert_eq!(s.peek_opcode(), Some(0x5B82));
        assert_eq!(s.read_opcode().unwrap(), 0x5B82);
        assert_eq!(s.read_opcode().unwrap(), 0x70);
    }

    #[test]
    fn context_marks_the_position() {
        let mut s = stream(&[0xAB, 0xCD]);
        s.read_u8().unwrap();
        let ctx = s.context();
        assert!(ctx.starts_with("DSDT at 0x25:"), "{ctx}");
        assert!(ctx.contains("ab [cd]"), "{ctx}");
    }

    #[test]
    fn name_string_errors_use_table_offsets() {
        let mut s = stream(&[b'1', b'A', b'B', b'C']);
        let Err(AmlError::Decode { offset, .. }) = s.read_name_string() else {
            panic!("expected a decode error");
        };
        assert_eq!(offset, HEADER_LEN);
    }
}
