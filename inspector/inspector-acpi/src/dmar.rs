//! DMA Remapping Reporting table (`DMAR`).

use crate::entries::{byte_len, decode_entries, word_len_at_2};
use crate::header::open;
use crate::{AcpiError, TableHeader};
use bitfield_struct::bitfield;
use inspector_layout::{Count, Cursor, Decode, LayoutError, decode_array};

pub const SIGNATURE: &[u8; 4] = b"DMAR";

pub const TYPE_DRHD: u16 = 0;
pub const TYPE_RMRR: u16 = 1;
pub const TYPE_ATSR: u16 = 2;
pub const TYPE_RHSA: u16 = 3;
pub const TYPE_ANDD: u16 = 4;

const DEVICE_SCOPE_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dmar {
    pub header: TableHeader,
    /// Maximum DMA physical address width, minus one.
    pub host_address_width: u8,
    pub flags: DmarFlags,
    pub structures: Vec<RemappingStructure>,
}

impl Dmar {
    /// DMA physical address width in bits.
    #[must_use]
    pub const fn address_width(&self) -> u16 {
        self.host_address_width as u16 + 1
    }
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct DmarFlags {
    pub intr_remap: bool,
    pub x2apic_opt_out: bool,
    pub dma_ctrl_platform_opt_in: bool,
    #[bits(5)]
    _reserved1: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemappingStructure {
    /// DMA Remapping Hardware Unit Definition.
    Drhd {
        include_pci_all: bool,
        segment: u16,
        base_address: u64,
        scopes: Vec<DeviceScope>,
    },
    /// Reserved Memory Region Reporting.
    Rmrr {
        segment: u16,
        base_address: u64,
        limit_address: u64,
        scopes: Vec<DeviceScope>,
    },
    /// Root Port ATS Capability Reporting.
    Atsr {
        all_ports: bool,
        segment: u16,
        scopes: Vec<DeviceScope>,
    },
    /// Remapping Hardware Static Affinity.
    Rhsa {
        base_address: u64,
        proximity_domain: u32,
    },
    /// ACPI Name-space Device Declaration.
    Andd {
        device_number: u8,
        object_name: String,
    },
    Unknown {
        kind: u16,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceScopeType {
    PciEndpoint,
    PciSubHierarchy,
    IoApic,
    HpetMsi,
    AcpiNamespaceDevice,
    Reserved(u8),
}

impl From<u8> for DeviceScopeType {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::PciEndpoint,
            2 => Self::PciSubHierarchy,
            3 => Self::IoApic,
            4 => Self::HpetMsi,
            5 => Self::AcpiNamespaceDevice,
            _ => Self::Reserved(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceScope {
    pub kind: DeviceScopeType,
    pub enumeration_id: u8,
    pub start_bus: u8,
    /// Hops from `start_bus` down to the device.
    pub path: Vec<PciPath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciPath {
    pub device: u8,
    pub function: u8,
}

impl Decode for PciPath {
    const SIZE: usize = 2;

    fn decode(cur: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            device: cur.u8()?,
            function: cur.u8()?,
        })
    }
}

/// Decodes a `DMAR` table.
///
/// # Errors
/// Header or fixed-field errors; truncated remapping structures are logged instead.
pub fn decode(bytes: &[u8]) -> Result<Dmar, AcpiError> {
    let (header, mut c) = open(bytes, SIGNATURE)?;
    let host_address_width = c.u8()?;
    let flags = DmarFlags::from_bits(c.u8()?);
    c.skip(10)?;
    let structures = decode_entries(c, "DMAR", 4, word_len_at_2, decode_structure);
    Ok(Dmar {
        header,
        host_address_width,
        flags,
        structures,
    })
}

fn decode_structure(mut c: Cursor<'_>) -> Result<RemappingStructure, LayoutError> {
    let kind = c.u16()?;
    let _length = c.u16()?;
    Ok(match kind {
        TYPE_DRHD => {
            let flags = c.u8()?;
            c.skip(1)?;
            RemappingStructure::Drhd {
                include_pci_all: flags & 1 != 0,
                segment: c.u16()?,
                base_address: c.u64()?,
                scopes: device_scopes(c),
            }
        }
        TYPE_RMRR => {
            c.skip(2)?;
            RemappingStructure::Rmrr {
                segment: c.u16()?,
                base_address: c.u64()?,
                limit_address: c.u64()?,
                scopes: device_scopes(c),
            }
        }
        TYPE_ATSR => {
            let flags = c.u8()?;
            c.skip(1)?;
            RemappingStructure::Atsr {
                all_ports: flags & 1 != 0,
                segment: c.u16()?,
                scopes: device_scopes(c),
            }
        }
        TYPE_RHSA => {
            c.skip(4)?;
            RemappingStructure::Rhsa {
                base_address: c.u64()?,
                proximity_domain: c.u32()?,
            }
        }
        TYPE_ANDD => {
            c.skip(3)?;
            let device_number = c.u8()?;
            let name = c.rest();
            let name = name.split(|&b| b == 0).next().unwrap_or_default();
            RemappingStructure::Andd {
                device_number,
                object_name: String::from_utf8_lossy(name).into_owned(),
            }
        }
        _ => RemappingStructure::Unknown {
            kind,
            data: c.rest().to_vec(),
        },
    })
}

fn device_scopes(c: Cursor<'_>) -> Vec<DeviceScope> {
    decode_entries(
        c,
        "DMAR device scope",
        DEVICE_SCOPE_HEADER_LEN,
        byte_len,
        |mut s| {
            let kind = DeviceScopeType::from(s.u8()?);
            s.skip(3)?;
            Ok(DeviceScope {
                kind,
                enumeration_id: s.u8()?,
                start_bus: s.u8()?,
                path: decode_array(&mut s, Count::FillRemaining)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::test_util::table;

    fn drhd(scopes: &[&[u8]]) -> Vec<u8> {
        let len: usize = 16 + scopes.iter().map(|s| s.len()).sum::<usize>();
        let mut d = Vec::new();
        d.extend_from_slice(&TYPE_DRHD.to_le_bytes());
        d.extend_from_slice(&u16::try_from(len).unwrap().to_le_bytes());
        d.extend_from_slice(&[1, 0, 0, 0]);
        d.extend_from_slice(&0xFED9_0000u64.to_le_bytes());
        for s in scopes {
            d.extend_from_slice(s);
        }
        d
    }

    fn dmar(structures: &[Vec<u8>]) -> Vec<u8> {
        let mut b = vec![38, 0b11];
        b.extend_from_slice(&[0; 10]);
        for s in structures {
            b.extend_from_slice(s);
        }
        table(SIGNATURE, 1, &b)
    }

    #[test]
    fn drhd_with_scopes() {
        // endpoint 00:02.0 and an I/O APIC behind 00:1e.7 -> 00:00.0
        let endpoint = [1u8, 8, 0, 0, 0, 0, 2, 0];
        let ioapic = [3u8, 10, 0, 0, 2, 0xF0, 0x1E, 7, 0, 0];
        let t = dmar(&[drhd(&[&endpoint, &ioapic])]);
        let d = decode(&t).unwrap();
        assert_eq!(d.address_width(), 39);
        assert!(d.flags.intr_remap() && d.flags.x2apic_opt_out());
        let RemappingStructure::Drhd {
            include_pci_all,
            base_address,
            scopes,
            ..
        } = &d.structures[0]
        else {
            panic!("expected DRHD");
        };
        assert!(include_pci_all);
        assert_eq!(*base_address, 0xFED9_0000);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].kind, DeviceScopeType::PciEndpoint);
        assert_eq!(
            scopes[0].path,
            vec![PciPath {
                device: 2,
                function: 0
            }]
        );
        assert_eq!(scopes[1].kind, DeviceScopeType::IoApic);
        assert_eq!(scopes[1].start_bus, 0xF0);
        assert_eq!(scopes[1].path.len(), 2);
    }

    #[test]
    fn andd_name() {
        let mut andd = vec![4u8, 0, 0, 0, 0, 0, 0, 1];
        andd.extend_from_slice(b"\\_SB.PCI0.I2C0\0");
        let len = u16::try_from(andd.len()).unwrap();
        andd[2..4].copy_from_slice(&len.to_le_bytes());
        let d = decode(&dmar(&[andd])).unwrap();
        assert_eq!(
            d.structures,
            vec![RemappingStructure::Andd {
                device_number: 1,
                object_name: "\\_SB.PCI0.I2C0".into()
            }]
        );
    }

    #[test]
    fn decode_is_idempotent() {
        let t = dmar(&[drhd(&[&[1u8, 8, 0, 0, 0, 0, 2, 0]])]);
        assert_eq!(decode(&t).unwrap(), decode(&t).unwrap());
    }
}
