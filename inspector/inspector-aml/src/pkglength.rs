//! AML package length encoding.
//!
//! ```text
//! PkgLeadByte  bit 7-6: count of following bytes (0..=3)
//!              bit 5-4: length bits 5-4 when no bytes follow, zero otherwise
//!              bit 3-0: length bits 3-0
//! ByteData[n]: length bits (8n+11)..(8n+4)
//! ```
//!
//! The encoded length covers the package length bytes themselves, so the
//! package ends at `start + value` where `start` is the offset of the lead
//! byte.

use crate::AmlError;

/// A decoded package length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkgLength {
    /// Length of the package including the encoding bytes.
    pub value: u32,
    /// Number of bytes the encoding occupies (1..=4).
    pub encoded_len: usize,
}

impl PkgLength {
    /// Decodes a package length from the start of `bytes`.
    ///
    /// # Errors
    /// [`AmlError::Decode`] if `bytes` is empty or shorter than the lead byte
    /// announces.
    pub fn decode(bytes: &[u8]) -> Result<Self, AmlError> {
        let truncated = || AmlError::Decode {
            opcode: 0,
            offset: 0,
            production: "PkgLength",
        };
        let &lead = bytes.first().ok_or_else(truncated)?;
        let follow = usize::from(lead >> 6);
        if follow == 0 {
            return Ok(Self {
                value: u32::from(lead & 0x3F),
                encoded_len: 1,
            });
        }

        let tail = bytes.get(1..=follow).ok_or_else(truncated)?;
        let value = tail
            .iter()
            .enumerate()
            .fold(u32::from(lead & 0x0F), |acc, (i, &b)| {
                acc | (u32::from(b) << (4 + 8 * i))
            });
        Ok(Self {
            value,
            encoded_len: follow + 1,
        })
    }

    /// Bytes remaining in the package after the encoding.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        (self.value as usize).saturating_sub(self.encoded_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_byte() {
        let p = PkgLength::decode(&[0x3F, 0xAA]).unwrap();
        assert_eq!(p, PkgLength { value: 0x3F, encoded_len: 1 });
        assert_eq!(p.remaining(), 0x3E);
    }

    #[test]
    fn two_bytes() {
        let p = PkgLength::decode(&[0x4A, 0x12]).unwrap();
        assert_eq!(p, PkgLength { value: 0x12A, encoded_len: 2 });
    }

    #[test]
    fn three_bytes() {
        let p = PkgLength::decode(&[0x85, 0x34, 0x12]).unwrap();
        assert_eq!(p, PkgLength { value: 0x12345, encoded_len: 3 });
    }

    #[test]
    fn four_bytes() {
        let p = PkgLength::decode(&[0xC1, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(p, PkgLength { value: 0x10_0001, encoded_len: 4 });
    }

    #[test]
    fn truncated_encoding_is_an_error() {
        assert!(PkgLength::decode(&[]).is_err());
        assert!(PkgLength::decode(&[0x81, 0x00]).is_err());
    }

    fn encode(value: u32) -> Vec<u8> {
        if value < 0x40 {
            return vec![value as u8];
        }
        let follow = if value < 0x1000 {
            1
        } else if value < 0x10_0000 {
            2
        } else {
            3
        };
        let mut out = vec![((follow as u8) << 6) | (value & 0x0F) as u8];
        for i in 0..follow {
            out.push((value >> (4 + 8 * i)) as u8);
        }
        out
    }

    proptest! {
        #[test]
        fn reassembles_every_encodable_length(value in 0u32..0x1000_0000) {
            let bytes = encode(value);
            let p = PkgLength::decode(&bytes).unwrap();
            prop_assert_eq!(p.value, value);
            prop_assert_eq!(p.encoded_len, bytes.len());
        }
    }
}
