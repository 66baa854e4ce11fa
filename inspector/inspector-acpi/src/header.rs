use crate::AcpiError;
use inspector_layout::{Cursor, LayoutError, checksum};

/// Size of the common description header.
pub const HEADER_LEN: usize = 36;

/// The System Description Table Header shared by every ACPI table except
/// RSDP and FACS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub signature: [u8; 4],
    /// Length of the whole table including this header.
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

impl TableHeader {
    /// Reads the 36 header bytes at the cursor.
    ///
    /// # Errors
    /// [`LayoutError::OutOfBounds`] if fewer than 36 bytes remain.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            signature: cur.array()?,
            length: cur.u32()?,
            revision: cur.u8()?,
            checksum: cur.u8()?,
            oem_id: cur.array()?,
            oem_table_id: cur.array()?,
            oem_revision: cur.u32()?,
            creator_id: cur.array()?,
            creator_revision: cur.u32()?,
        })
    }

    #[must_use]
    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }

    #[must_use]
    pub fn oem_id_str(&self) -> String {
        ascii_trimmed(&self.oem_id)
    }

    #[must_use]
    pub fn oem_table_id_str(&self) -> String {
        ascii_trimmed(&self.oem_table_id)
    }

    /// Validates the byte-sum of the table described by this header.
    ///
    /// `bytes` must start with the header; only `length` bytes are summed.
    #[must_use]
    pub fn checksum_ok(&self, bytes: &[u8]) -> bool {
        let len = usize::try_from(self.length).unwrap_or(usize::MAX);
        bytes.get(..len).is_some_and(|t| checksum(t) == 0)
    }
}

fn ascii_trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_owned()
}

/// Decodes the header and returns it together with the `length` bytes it declares.
///
/// # Errors
/// * [`AcpiError::Layout`] if the buffer cannot hold a header.
/// * [`AcpiError::LengthBelowHeader`] if `length` is smaller than the header.
/// * [`AcpiError::LengthExceedsBuffer`] if `length` runs past the buffer.
pub fn table_bytes(bytes: &[u8]) -> Result<(TableHeader, &[u8]), AcpiError> {
    let header = TableHeader::decode(&mut Cursor::new(bytes))?;
    let declared = usize::try_from(header.length).unwrap_or(usize::MAX);
    if declared < HEADER_LEN {
        return Err(AcpiError::LengthBelowHeader {
            declared: header.length,
        });
    }
    let table = bytes.get(..declared).ok_or(AcpiError::LengthExceedsBuffer {
        declared: header.length,
        available: bytes.len(),
    })?;
    Ok((header, table))
}

/// [`table_bytes`] plus a signature check; returns a cursor positioned after the header.
pub(crate) fn open<'a>(
    bytes: &'a [u8],
    expected: &[u8; 4],
) -> Result<(TableHeader, Cursor<'a>), AcpiError> {
    let (header, table) = table_bytes(bytes)?;
    if &header.signature != expected {
        return Err(AcpiError::Signature {
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: header.signature_str(),
        });
    }
    Ok((header, Cursor::at(table, HEADER_LEN)))
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::HEADER_LEN;

    /// Builds a table with a valid header and checksum around `body`.
    pub fn table(signature: &[u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
        let length = u32::try_from(HEADER_LEN + body.len()).unwrap();
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(signature);
        out.extend_from_slice(&length.to_le_bytes());
        out.push(revision);
        out.push(0);
        out.extend_from_slice(b"INTEL ");
        out.extend_from_slice(b"TESTTBL ");
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(b"INTL");
        out.extend_from_slice(&0x2021_0105u32.to_le_bytes());
        out.extend_from_slice(body);
        let sum = inspector_layout::checksum(&out);
        out[9] = 0u8.wrapping_sub(sum);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields() {
        let t = test_util::table(b"APIC", 4, &[0u8; 8]);
        let (h, body) = table_bytes(&t).unwrap();
        assert_eq!(&h.signature, b"APIC");
        assert_eq!(h.length, 44);
        assert_eq!(h.revision, 4);
        assert_eq!(h.oem_id_str(), "INTEL");
        assert_eq!(h.oem_table_id_str(), "TESTTBL");
        assert_eq!(body.len(), 44);
        assert!(h.checksum_ok(&t));
    }

    #[test]
    fn declared_length_beyond_buffer() {
        let mut t = test_util::table(b"FACP", 1, &[]);
        t[4..8].copy_from_slice(&100u32.to_le_bytes());
        assert_eq!(
            table_bytes(&t).unwrap_err(),
            AcpiError::LengthExceedsBuffer {
                declared: 100,
                available: 36
            }
        );
    }

    #[test]
    fn declared_length_below_header() {
        let mut t = test_util::table(b"FACP", 1, &[]);
        t[4..8].copy_from_slice(&20u32.to_le_bytes());
        assert!(matches!(
            table_bytes(&t),
            Err(AcpiError::LengthBelowHeader { declared: 20 })
        ));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut t = test_util::table(b"SSDT", 2, &[1, 2, 3]);
        t.extend_from_slice(&[0xFF; 16]);
        let (_, body) = table_bytes(&t).unwrap();
        assert_eq!(body.len(), 39);
    }

    #[test]
    fn signature_mismatch() {
        let t = test_util::table(b"DMAR", 1, &[]);
        assert!(matches!(open(&t, b"APIC"), Err(AcpiError::Signature { .. })));
    }
}
