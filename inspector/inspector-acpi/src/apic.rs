//! Multiple APIC Description Table (`APIC`, a.k.a. MADT).

use crate::entries::{byte_len, decode_entries};
use crate::header::open;
use crate::{AcpiError, TableHeader};
use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};
use std::collections::BTreeMap;

pub const SIGNATURE: &[u8; 4] = b"APIC";

pub const TYPE_LOCAL_APIC: u8 = 0x0;
pub const TYPE_IO_APIC: u8 = 0x1;
pub const TYPE_INT_SRC_OVERRIDE: u8 = 0x2;
pub const TYPE_NMI_INT_SRC: u8 = 0x3;
pub const TYPE_LOCAL_APIC_NMI: u8 = 0x4;
pub const TYPE_LOCAL_X2APIC: u8 = 0x9;
pub const TYPE_LOCAL_X2APIC_NMI: u8 = 0xA;
pub const TYPE_LOCAL_GIC: u8 = 0xB;
pub const TYPE_LOCAL_GIC_DISTRIBUTOR: u8 = 0xC;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Madt {
    pub header: TableHeader,
    pub local_apic_address: u32,
    pub flags: MadtFlags,
    pub entries: Vec<MadtEntry>,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MadtFlags {
    /// The system also has a PC-AT compatible dual-8259 setup.
    pub pcat_compat: bool,
    #[bits(31)]
    _reserved1: u32,
}

/// Flags of Local APIC and Local x2APIC structures.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct LocalApicFlags {
    pub enabled: bool,
    pub online_capable: bool,
    #[bits(30)]
    _reserved2: u32,
}

/// MPS INTI flags (bits 1:0 polarity, bits 3:2 trigger mode).
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct MpsIntiFlags {
    #[bits(2)]
    pub polarity: u8,
    #[bits(2)]
    pub trigger_mode: u8,
    #[bits(12)]
    _reserved3: u16,
}

impl MpsIntiFlags {
    #[must_use]
    pub const fn polarity_name(self) -> &'static str {
        match self.polarity() {
            0b00 => "Conforms to bus specifications",
            0b01 => "Active high",
            0b11 => "Active low",
            _ => "Reserved",
        }
    }

    #[must_use]
    pub const fn trigger_mode_name(self) -> &'static str {
        match self.trigger_mode() {
            0b00 => "Conforms to bus specifications",
            0b01 => "Edge-triggered",
            0b11 => "Level-triggered",
            _ => "Reserved",
        }
    }
}

/// Interrupt controller structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MadtEntry {
    LocalApic {
        processor_id: u8,
        apic_id: u8,
        flags: LocalApicFlags,
    },
    IoApic {
        io_apic_id: u8,
        address: u32,
        gsi_base: u32,
    },
    InterruptSourceOverride {
        bus: u8,
        source: u8,
        gsi: u32,
        flags: MpsIntiFlags,
    },
    NmiSource {
        flags: MpsIntiFlags,
        gsi: u32,
    },
    LocalApicNmi {
        processor_id: u8,
        flags: MpsIntiFlags,
        lint: u8,
    },
    LocalX2Apic {
        x2apic_id: u32,
        flags: LocalApicFlags,
        uid: u32,
    },
    LocalX2ApicNmi {
        flags: MpsIntiFlags,
        uid: u32,
        lint: u8,
    },
    Gicc {
        gic_id: u32,
        uid: u32,
        flags: u32,
        parking_protocol_version: u32,
        performance_interrupt_gsiv: u32,
        parked_address: u64,
        base_address: u64,
    },
    Gicd {
        gic_id: u32,
        base_address: u64,
        system_vector_base: u32,
    },
    Unknown {
        kind: u8,
        data: Vec<u8>,
    },
}

impl Madt {
    /// ACPI processor ID to APIC ID, for enabled Local APIC entries.
    #[must_use]
    pub fn processor_apic_ids(&self) -> BTreeMap<u8, u8> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                MadtEntry::LocalApic {
                    processor_id,
                    apic_id,
                    flags,
                } if flags.enabled() => Some((*processor_id, *apic_id)),
                _ => None,
            })
            .collect()
    }

    /// Processor UID to x2APIC ID, for enabled Local x2APIC entries.
    #[must_use]
    pub fn uid_x2apic_ids(&self) -> BTreeMap<u32, u32> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                MadtEntry::LocalX2Apic {
                    x2apic_id,
                    flags,
                    uid,
                } if flags.enabled() => Some((*uid, *x2apic_id)),
                _ => None,
            })
            .collect()
    }
}

/// Decodes an `APIC` table.
///
/// # Errors
/// Header or fixed-field errors; a truncated entry tail is logged instead.
pub fn decode(bytes: &[u8]) -> Result<Madt, AcpiError> {
    let (header, mut cur) = open(bytes, SIGNATURE)?;
    let local_apic_address = cur.u32()?;
    let flags = MadtFlags::from_bits(cur.u32()?);
    let entries = decode_entries(cur, "APIC", 2, byte_len, decode_entry);
    Ok(Madt {
        header,
        local_apic_address,
        flags,
        entries,
    })
}

fn decode_entry(mut c: Cursor<'_>) -> Result<MadtEntry, LayoutError> {
    let kind = c.u8()?;
    let _length = c.u8()?;
    Ok(match kind {
        TYPE_LOCAL_APIC => MadtEntry::LocalApic {
            processor_id: c.u8()?,
            apic_id: c.u8()?,
            flags: LocalApicFlags::from_bits(c.u32()?),
        },
        TYPE_IO_APIC => {
            let io_apic_id = c.u8()?;
            c.skip(1)?;
            MadtEntry::IoApic {
                io_apic_id,
                address: c.u32()?,
                gsi_base: c.u32()?,
            }
        }
        TYPE_INT_SRC_OVERRIDE => MadtEntry::InterruptSourceOverride {
            bus: c.u8()?,
            source: c.u8()?,
            gsi: c.u32()?,
            flags: MpsIntiFlags::from_bits(c.u16()?),
        },
        TYPE_NMI_INT_SRC => MadtEntry::NmiSource {
            flags: MpsIntiFlags::from_bits(c.u16()?),
            gsi: c.u32()?,
        },
        TYPE_LOCAL_APIC_NMI => MadtEntry::LocalApicNmi {
            processor_id: c.u8()?,
            flags: MpsIntiFlags::from_bits(c.u16()?),
            lint: c.u8()?,
        },
        TYPE_LOCAL_X2APIC => {
            c.skip(2)?;
            MadtEntry::LocalX2Apic {
                x2apic_id: c.u32()?,
                flags: LocalApicFlags::from_bits(c.u32()?),
                uid: c.u32()?,
            }
        }
        TYPE_LOCAL_X2APIC_NMI => MadtEntry::LocalX2ApicNmi {
            flags: MpsIntiFlags::from_bits(c.u16()?),
            uid: c.u32()?,
            lint: c.u8()?,
        },
        TYPE_LOCAL_GIC => {
            c.skip(2)?;
            MadtEntry::Gicc {
                gic_id: c.u32()?,
                uid: c.u32()?,
                flags: c.u32()?,
                parking_protocol_version: c.u32()?,
                performance_interrupt_gsiv: c.u32()?,
                parked_address: c.u64()?,
                base_address: c.u64()?,
            }
        }
        TYPE_LOCAL_GIC_DISTRIBUTOR => {
            c.skip(2)?;
            MadtEntry::Gicd {
                gic_id: c.u32()?,
                base_address: c.u64()?,
                system_vector_base: c.u32()?,
            }
        }
        _ => MadtEntry::Unknown {
            kind,
            data: c.rest().to_vec(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::test_util::table;

    fn body(entries: &[&[u8]]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0xFEE0_0000u32.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        for e in entries {
            b.extend_from_slice(e);
        }
        b
    }

    const LAPIC0: [u8; 8] = [0, 8, 0, 0, 1, 0, 0, 0];
    const LAPIC1_DISABLED: [u8; 8] = [0, 8, 1, 2, 0, 0, 0, 0];
    const LAPIC2: [u8; 8] = [0, 8, 2, 4, 1, 0, 0, 0];
    const IOAPIC: [u8; 12] = [1, 12, 2, 0, 0x00, 0x00, 0xC0, 0xFE, 0, 0, 0, 0];
    const X2APIC: [u8; 16] = [9, 16, 0, 0, 0x10, 1, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0];

    #[test]
    fn decodes_entries_and_maps() {
        let t = table(
            SIGNATURE,
            4,
            &body(&[&LAPIC0, &LAPIC1_DISABLED, &LAPIC2, &IOAPIC, &X2APIC]),
        );
        let madt = decode(&t).unwrap();
        assert_eq!(madt.local_apic_address, 0xFEE0_0000);
        assert!(madt.flags.pcat_compat());
        assert_eq!(madt.entries.len(), 5);
        assert_eq!(
            madt.entries[3],
            MadtEntry::IoApic {
                io_apic_id: 2,
                address: 0xFEC0_0000,
                gsi_base: 0
            }
        );
        let ids = madt.processor_apic_ids();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![(0, 0), (2, 4)]);
        assert_eq!(madt.uid_x2apic_ids().get(&7), Some(&0x110));
    }

    #[test]
    fn overrun_entry_stops_walk() {
        // second entry claims 12 bytes but only 4 remain
        let t = table(SIGNATURE, 4, &body(&[&LAPIC0, &[1, 12, 0, 0]]));
        let madt = decode(&t).unwrap();
        assert_eq!(madt.entries.len(), 1);
    }

    #[test]
    fn zero_length_entry_stops_walk() {
        let t = table(SIGNATURE, 4, &body(&[&LAPIC0, &[0x7F, 0]]));
        assert_eq!(decode(&t).unwrap().entries.len(), 1);
    }

    #[test]
    fn unknown_entry_kept_raw() {
        let t = table(SIGNATURE, 4, &body(&[&[0x42, 5, 9, 8, 7]]));
        let madt = decode(&t).unwrap();
        assert_eq!(
            madt.entries,
            vec![MadtEntry::Unknown {
                kind: 0x42,
                data: vec![9, 8, 7]
            }]
        );
    }

    #[test]
    fn decode_is_idempotent() {
        let t = table(SIGNATURE, 4, &body(&[&LAPIC0, &IOAPIC, &X2APIC]));
        assert_eq!(decode(&t).unwrap(), decode(&t).unwrap());
    }

    #[test]
    fn inti_flag_names() {
        let f = MpsIntiFlags::from_bits(0b1111);
        assert_eq!(f.polarity_name(), "Active low");
        assert_eq!(f.trigger_mode_name(), "Level-triggered");
    }
}
