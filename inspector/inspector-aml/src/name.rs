//! AML names: four-character segments and prefixed, dotted name strings.

use core::fmt;
use core::str::FromStr;

use crate::AmlError;
use crate::opcode::{DUAL_NAME_PREFIX, MULTI_NAME_PREFIX, NULL_NAME, PARENT_PREFIX, ROOT_CHAR};

/// A four-byte name segment such as `_SB_` or `PCI0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Builds a segment from up to four characters, padding with `_`.
    ///
    /// # Errors
    /// [`AmlError::Malformed`] for empty, overlong or non-name characters.
    pub fn parse(s: &str) -> Result<Self, AmlError> {
        let b = s.as_bytes();
        if b.is_empty() || b.len() > 4 || !is_lead_char(b[0]) || !b.iter().all(|&c| is_name_char(c)) {
            return Err(AmlError::Malformed(format!("invalid name segment {s:?}")));
        }
        let mut seg = *b"____";
        seg[..b.len()].copy_from_slice(b);
        Ok(Self(seg))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub const fn is_lead_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'_'
}

#[must_use]
pub const fn is_name_char(c: u8) -> bool {
    is_lead_char(c) || c.is_ascii_digit()
}

/// Whether `c` can start a `NameString`.
#[must_use]
pub const fn starts_name_string(c: u8) -> bool {
    is_lead_char(c) || matches!(c, ROOT_CHAR | PARENT_PREFIX | DUAL_NAME_PREFIX | MULTI_NAME_PREFIX)
}

/// A `NameString`: an optional root or parent prefix followed by zero or
/// more segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NameString {
    /// Starts with `\`.
    pub root: bool,
    /// Number of leading `^` prefixes.
    pub parents: u8,
    pub segments: Vec<NameSeg>,
}

impl NameString {
    #[must_use]
    pub const fn null() -> Self {
        Self {
            root: false,
            parents: 0,
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn single(seg: NameSeg) -> Self {
        Self {
            root: false,
            parents: 0,
            segments: vec![seg],
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        !self.root && self.parents == 0 && self.segments.is_empty()
    }

    /// A bare single segment, which is subject to the upward search rules.
    #[must_use]
    pub const fn is_search_candidate(&self) -> bool {
        !self.root && self.parents == 0 && self.segments.len() == 1
    }

    /// The final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<NameSeg> {
        self.segments.last().copied()
    }

    /// Everything but the final segment: the scope a definition lands in.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut p = self.clone();
        p.segments.pop();
        p
    }

    /// Decodes a `NameString` at the start of `bytes`, returning the name and
    /// the number of bytes it occupies.
    ///
    /// # Errors
    /// [`AmlError::Decode`] if the bytes do not form a name string.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), AmlError> {
        let fail = |offset: usize| AmlError::Decode {
            opcode: bytes.get(offset).copied().map_or(0, u16::from),
            offset,
            production: "NameString",
        };

        let mut name = Self::null();
        let mut pos = 0;
        match bytes.first() {
            Some(&ROOT_CHAR) => {
                name.root = true;
                pos = 1;
            }
            Some(&PARENT_PREFIX) => {
                while bytes.get(pos) == Some(&PARENT_PREFIX) {
                    name.parents = name.parents.saturating_add(1);
                    pos += 1;
                }
            }
            _ => {}
        }

        let count = match bytes.get(pos) {
            Some(&NULL_NAME) => {
                pos += 1;
                0
            }
            Some(&DUAL_NAME_PREFIX) => {
                pos += 1;
                2
            }
            Some(&MULTI_NAME_PREFIX) => {
                let &n = bytes.get(pos + 1).ok_or_else(|| fail(pos))?;
                pos += 2;
                usize::from(n)
            }
            Some(&c) if is_lead_char(c) => 1,
            _ => return Err(fail(pos)),
        };

        for _ in 0..count {
            let seg = bytes.get(pos..pos + 4).ok_or_else(|| fail(pos))?;
            if !is_lead_char(seg[0]) || !seg.iter().all(|&c| is_name_char(c)) {
                return Err(fail(pos));
            }
            name.segments.push(NameSeg([seg[0], seg[1], seg[2], seg[3]]));
            pos += 4;
        }
        Ok((name, pos))
    }
}

impl fmt::Display for NameString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root {
            f.write_str("\\")?;
        }
        for _ in 0..self.parents {
            f.write_str("^")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for NameString {
    type Err = AmlError;

    /// Parses the ASL spelling, e.g. `\_SB.PCI0`, `^^FOO` or `_STA`.
    /// Segments shorter than four characters are padded with `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name = Self::null();
        let mut rest = s;
        if let Some(r) = rest.strip_prefix('\\') {
            name.root = true;
            rest = r;
        } else {
            while let Some(r) = rest.strip_prefix('^') {
                name.parents = name.parents.saturating_add(1);
                rest = r;
            }
        }
        if !rest.is_empty() {
            for seg in rest.split('.') {
                name.segments.push(NameSeg::parse(seg)?);
            }
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_form() {
        let (n, len) = NameString::decode(b"_STA").unwrap();
        assert_eq!((n.to_string(), len), ("_STA".to_owned(), 4));

        let (n, len) = NameString::decode(b"\\\x2E_SB_PCI0").unwrap();
        assert!(n.root);
        assert_eq!((n.to_string(), len), ("\\_SB_.PCI0".to_owned(), 10));

        let (n, len) = NameString::decode(b"^^\x2F\x03ABCDEFGHIJKL").unwrap();
        assert_eq!(n.parents, 2);
        assert_eq!((n.to_string(), len), ("^^ABCD.EFGH.IJKL".to_owned(), 16));

        let (n, len) = NameString::decode(b"\\\x00").unwrap();
        assert!(n.root && n.segments.is_empty());
        assert_eq!(len, 2);
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(NameString::decode(b"1ABC").is_err());
        assert!(NameString::decode(b"AB").is_err());
        assert!(NameString::decode(b"\x2EABCD").is_err());
    }

    #[test]
    fn parses_asl_spelling() {
        let n: NameString = "\\_SB.PCI0".parse().unwrap();
        assert_eq!(n.to_string(), "\\_SB_.PCI0");
        let n: NameString = "^DEV".parse().unwrap();
        assert_eq!((n.parents, n.to_string()), (1, "^DEV_".to_owned()));
        assert!("\\".parse::<NameString>().unwrap().root);
        assert!("pci0".parse::<NameString>().is_err());
    }
}
