//! Real Time Configuration Table (`RTCT`, `PTCT` on older firmware).
//!
//! A flat run of entries, each starting with `{size: u16, format: u16,
//! type: u32}` where `size` covers the entry header. Entry type numbering
//! changed between format versions; a version 2 table announces itself with a
//! compatibility entry (type 0) carrying the major version.

use crate::entries::{decode_entries, word_len_at_0};
use crate::header::open;
use crate::{AcpiError, TableHeader};
use inspector_layout::{Count, Cursor, LayoutError, decode_array};

pub const SIGNATURE: &[u8; 4] = b"RTCT";
pub const LEGACY_SIGNATURE: &[u8; 4] = b"PTCT";

const ENTRY_HEADER_LEN: usize = 8;

pub const V2_COMPATIBILITY: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rtct {
    pub header: TableHeader,
    pub version: u32,
    pub entries: Vec<RtctEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtctEntry {
    pub format: u16,
    pub kind: u32,
    pub data: RtctData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtctData {
    Compatibility {
        rtct_major: u32,
        rtct_minor: u32,
        rtcd_major: u32,
        rtcd_minor: u32,
    },
    /// Location of the RTCM (v1) or CRL (v2) binary.
    CrlBinary {
        address: u64,
        size: u32,
    },
    /// v1 software SRAM region, with the APIC IDs sharing it.
    SoftwareSram {
        cache_level: u32,
        base: u64,
        ways: u32,
        size: u32,
        apic_ids: Vec<u32>,
    },
    /// v2 software SRAM region.
    SoftwareSramV2 {
        cache_level: u32,
        cache_id: u32,
        base: u64,
        size: u32,
        shared: u32,
    },
    MemoryHierarchyLatency {
        hierarchy: u32,
        clock_cycles: u32,
        apic_ids: Vec<u32>,
    },
    Other(Vec<u8>),
}

impl Rtct {
    /// Software SRAM regions as `(cache_level, base, size)`.
    #[must_use]
    pub fn software_sram_regions(&self) -> Vec<(u32, u64, u32)> {
        self.entries
            .iter()
            .filter_map(|e| match e.data {
                RtctData::SoftwareSram {
                    cache_level,
                    base,
                    size,
                    ..
                }
                | RtctData::SoftwareSramV2 {
                    cache_level,
                    base,
                    size,
                    ..
                } => Some((cache_level, base, size)),
                _ => None,
            })
            .collect()
    }
}

mod v1 {
    pub const RTCM_BINARY: u32 = 2;
    pub const SOFTWARE_SRAM: u32 = 5;
    pub const MEMORY_HIERARCHY_LATENCY: u32 = 9;
}

mod v2 {
    pub const CRL_BINARY: u32 = 2;
    pub const SSRAM: u32 = 7;
    pub const MEMORY_HIERARCHY_LATENCY: u32 = 8;
}

/// Decodes an `RTCT` or `PTCT` table.
///
/// # Errors
/// Header errors; truncated entries are logged instead.
pub fn decode(bytes: &[u8]) -> Result<Rtct, AcpiError> {
    let signature = match bytes.get(..4) {
        Some(s) if s == LEGACY_SIGNATURE => LEGACY_SIGNATURE,
        _ => SIGNATURE,
    };
    let (header, c) = open(bytes, signature)?;

    let raw = decode_entries(c.clone(), "RTCT", ENTRY_HEADER_LEN, word_len_at_0, |mut e| {
        e.skip(2)?;
        let format = e.u16()?;
        let kind = e.u32()?;
        Ok((format, kind, e))
    });
    let version = raw
        .iter()
        .find(|(_, kind, _)| *kind == V2_COMPATIBILITY)
        .and_then(|(_, _, e)| e.clone().u32().ok())
        .unwrap_or(1);

    let entries = decode_entries(c, "RTCT", ENTRY_HEADER_LEN, word_len_at_0, |mut e| {
        e.skip(2)?;
        let format = e.u16()?;
        let kind = e.u32()?;
        let data = if version >= 2 {
            decode_v2(kind, &mut e)?
        } else {
            decode_v1(kind, &mut e)?
        };
        Ok(RtctEntry { format, kind, data })
    });

    Ok(Rtct {
        header,
        version,
        entries,
    })
}

fn decode_v1(kind: u32, e: &mut Cursor<'_>) -> Result<RtctData, LayoutError> {
    Ok(match kind {
        v1::RTCM_BINARY => RtctData::CrlBinary {
            address: e.u64()?,
            size: e.u32()?,
        },
        v1::SOFTWARE_SRAM => RtctData::SoftwareSram {
            cache_level: e.u32()?,
            base: e.u64()?,
            ways: e.u32()?,
            size: e.u32()?,
            apic_ids: decode_array(e, Count::FillRemaining)?,
        },
        v1::MEMORY_HIERARCHY_LATENCY => RtctData::MemoryHierarchyLatency {
            hierarchy: e.u32()?,
            clock_cycles: e.u32()?,
            apic_ids: decode_array(e, Count::FillRemaining)?,
        },
        _ => RtctData::Other(e.rest().to_vec()),
    })
}

fn decode_v2(kind: u32, e: &mut Cursor<'_>) -> Result<RtctData, LayoutError> {
    Ok(match kind {
        V2_COMPATIBILITY => RtctData::Compatibility {
            rtct_major: e.u32()?,
            rtct_minor: e.u32()?,
            rtcd_major: e.u32()?,
            rtcd_minor: e.u32()?,
        },
        v2::CRL_BINARY => RtctData::CrlBinary {
            address: e.u64()?,
            size: e.u32()?,
        },
        v2::SSRAM => RtctData::SoftwareSramV2 {
            cache_level: e.u32()?,
            cache_id: e.u32()?,
            base: e.u64()?,
            size: e.u32()?,
            shared: e.u32()?,
        },
        v2::MEMORY_HIERARCHY_LATENCY => RtctData::MemoryHierarchyLatency {
            hierarchy: e.u32()?,
            clock_cycles: e.u32()?,
            apic_ids: decode_array(e, Count::FillRemaining)?,
        },
        _ => RtctData::Other(e.rest().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::test_util::table;

    fn entry(kind: u32, payload: &[u32]) -> Vec<u8> {
        let size = u16::try_from(8 + payload.len() * 4).unwrap();
        let mut e = Vec::new();
        e.extend_from_slice(&size.to_le_bytes());
        e.extend_from_slice(&1u16.to_le_bytes());
        e.extend_from_slice(&kind.to_le_bytes());
        for p in payload {
            e.extend_from_slice(&p.to_le_bytes());
        }
        e
    }

    #[test]
    fn version_one_sram() {
        // cache level 3, base 0x4000_0000 (split into two dwords), 4 ways, 2 MiB, APIC 0 and 2
        let body = [
            entry(v1::RTCM_BINARY, &[0x1000, 0, 0x2000]),
            entry(v1::SOFTWARE_SRAM, &[3, 0x4000_0000, 0, 4, 0x20_0000, 0, 2]),
        ]
        .concat();
        let t = decode(&table(SIGNATURE, 1, &body)).unwrap();
        assert_eq!(t.version, 1);
        assert_eq!(
            t.entries[0].data,
            RtctData::CrlBinary {
                address: 0x1000,
                size: 0x2000
            }
        );
        assert_eq!(
            t.entries[1].data,
            RtctData::SoftwareSram {
                cache_level: 3,
                base: 0x4000_0000,
                ways: 4,
                size: 0x20_0000,
                apic_ids: vec![0, 2]
            }
        );
        assert_eq!(t.software_sram_regions(), vec![(3, 0x4000_0000, 0x20_0000)]);
    }

    #[test]
    fn version_two_detected_from_compatibility_entry() {
        let body = [
            entry(V2_COMPATIBILITY, &[2, 0, 2, 0]),
            entry(v2::SSRAM, &[2, 1, 0x8000_0000, 0, 0x4_0000, 1]),
        ]
        .concat();
        let t = decode(&table(LEGACY_SIGNATURE, 1, &body)).unwrap();
        assert_eq!(t.version, 2);
        assert_eq!(
            t.software_sram_regions(),
            vec![(2, 0x8000_0000, 0x4_0000)]
        );
    }

    #[test]
    fn undersized_entry_stops_walk() {
        let mut body = entry(v1::RTCM_BINARY, &[0x1000, 0, 0x2000]);
        body.extend_from_slice(&[4, 0, 1, 0, 0, 0, 0, 0]);
        let t = decode(&table(SIGNATURE, 1, &body)).unwrap();
        assert_eq!(t.entries.len(), 1);
    }
}
