use crate::PciError;
use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};

pub const HEADER_LEN: usize = 0x40;

/// Status register bit 4: the capability pointer is valid.
const STATUS_CAPABILITIES_LIST: u16 = 1 << 4;

/// First 16 bytes, shared by all header types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub vendor_id: u16,
    pub device_id: u16,
    pub command: u16,
    pub status: u16,
    pub revision_id: u8,
    /// Base class, sub-class and programming interface (`0xBBSSPP`).
    pub class_code: u32,
    pub cacheline_size: u8,
    pub latency_timer: u8,
    pub header_type: HeaderType,
    pub bist: u8,
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct HeaderType {
    #[bits(7)]
    pub layout: u8,
    pub multi_function: bool,
}

/// Base address register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bar {
    Io { base: u32 },
    Memory32 { base: u32, prefetchable: bool },
    /// A 64-bit BAR; it occupies two BAR slots.
    Memory64 { base: u64, prefetchable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointHeader {
    pub bars: Vec<Bar>,
    pub cardbus_cis_pointer: u32,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
    pub expansion_rom_base: u32,
    pub capability_pointer: u8,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub min_gnt: u8,
    pub max_lat: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeHeader {
    pub bars: Vec<Bar>,
    pub primary_bus: u8,
    pub secondary_bus: u8,
    pub subordinate_bus: u8,
    pub secondary_latency_timer: u8,
    pub io_base: u32,
    pub io_limit: u32,
    pub secondary_status: u16,
    pub memory_base: u32,
    pub memory_limit: u32,
    pub prefetchable_base: u64,
    pub prefetchable_limit: u64,
    pub capability_pointer: u8,
    pub expansion_rom_base: u32,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderKind {
    Endpoint(EndpointHeader),
    Bridge(BridgeHeader),
    /// CardBus and reserved layouts, kept raw.
    Other(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub common: CommonHeader,
    pub kind: HeaderKind,
}

impl Header {
    /// Decodes the 64-byte header.
    ///
    /// # Errors
    /// [`PciError::TooShort`] when `config` holds less than 64 bytes.
    pub fn parse(config: &[u8]) -> Result<Self, PciError> {
        if config.len() < HEADER_LEN {
            return Err(PciError::TooShort { len: config.len() });
        }
        let mut c = Cursor::new(config);
        let common = CommonHeader::decode(&mut c)?;
        let kind = match common.header_type.layout() {
            0 => HeaderKind::Endpoint(decode_endpoint(&mut c)?),
            1 => HeaderKind::Bridge(decode_bridge(&mut c)?),
            _ => HeaderKind::Other(c.bytes(HEADER_LEN - 16)?.to_vec()),
        };
        Ok(Self { common, kind })
    }

    /// Offset of the first capability, when the status register announces a list.
    #[must_use]
    pub fn capability_pointer(&self) -> Option<u8> {
        if self.common.status & STATUS_CAPABILITIES_LIST == 0 {
            return None;
        }
        let ptr = match &self.kind {
            HeaderKind::Endpoint(h) => h.capability_pointer,
            HeaderKind::Bridge(h) => h.capability_pointer,
            HeaderKind::Other(raw) => raw.get(0x34 - 16).copied().unwrap_or(0),
        };
        Some(ptr)
    }

    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        match &self.kind {
            HeaderKind::Endpoint(h) => &h.bars,
            HeaderKind::Bridge(h) => &h.bars,
            HeaderKind::Other(_) => &[],
        }
    }
}

impl CommonHeader {
    fn decode(c: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        let vendor_id = c.u16()?;
        let device_id = c.u16()?;
        let command = c.u16()?;
        let status = c.u16()?;
        let class_rev = c.u32()?;
        Ok(Self {
            vendor_id,
            device_id,
            command,
            status,
            revision_id: class_rev.to_le_bytes()[0],
            class_code: class_rev >> 8,
            cacheline_size: c.u8()?,
            latency_timer: c.u8()?,
            header_type: HeaderType::from_bits(c.u8()?),
            bist: c.u8()?,
        })
    }
}

/// Decodes `slots` consecutive BAR registers.
fn decode_bars(c: &mut Cursor<'_>, slots: usize) -> Result<Vec<Bar>, LayoutError> {
    let mut bars = Vec::new();
    let mut slot = 0;
    while slot < slots {
        let raw = c.u32()?;
        slot += 1;
        let bar = if raw & 1 == 1 {
            Bar::Io { base: raw & !0b11 }
        } else {
            let prefetchable = raw & 0b1000 != 0;
            if (raw >> 1) & 0b11 == 0b10 && slot < slots {
                let high = c.u32()?;
                slot += 1;
                Bar::Memory64 {
                    base: (u64::from(high) << 32) | u64::from(raw & !0xF),
                    prefetchable,
                }
            } else {
                Bar::Memory32 {
                    base: raw & !0xF,
                    prefetchable,
                }
            }
        };
        bars.push(bar);
    }
    Ok(bars)
}

fn decode_endpoint(c: &mut Cursor<'_>) -> Result<EndpointHeader, LayoutError> {
    let bars = decode_bars(c, 6)?;
    let cardbus_cis_pointer = c.u32()?;
    let subsystem_vendor_id = c.u16()?;
    let subsystem_id = c.u16()?;
    let expansion_rom_base = c.u32()?;
    let capability_pointer = c.u8()? & 0xFC;
    c.skip(7)?;
    Ok(EndpointHeader {
        bars,
        cardbus_cis_pointer,
        subsystem_vendor_id,
        subsystem_id,
        expansion_rom_base,
        capability_pointer,
        interrupt_line: c.u8()?,
        interrupt_pin: c.u8()?,
        min_gnt: c.u8()?,
        max_lat: c.u8()?,
    })
}

fn decode_bridge(c: &mut Cursor<'_>) -> Result<BridgeHeader, LayoutError> {
    let bars = decode_bars(c, 2)?;
    let primary_bus = c.u8()?;
    let secondary_bus = c.u8()?;
    let subordinate_bus = c.u8()?;
    let secondary_latency_timer = c.u8()?;
    let io_base = c.u8()?;
    let io_limit = c.u8()?;
    let secondary_status = c.u16()?;
    let memory_base = c.u16()?;
    let memory_limit = c.u16()?;
    let pref_base = c.u16()?;
    let pref_limit = c.u16()?;
    let pref_base_upper = c.u32()?;
    let pref_limit_upper = c.u32()?;
    let io_base_upper = c.u16()?;
    let io_limit_upper = c.u16()?;
    let capability_pointer = c.u8()? & 0xFC;
    c.skip(3)?;
    let expansion_rom_base = c.u32()?;
    Ok(BridgeHeader {
        bars,
        primary_bus,
        secondary_bus,
        subordinate_bus,
        secondary_latency_timer,
        io_base: (u32::from(io_base_upper) << 16) | (u32::from(io_base & 0xF0) << 8),
        io_limit: (u32::from(io_limit_upper) << 16) | (u32::from(io_limit & 0xF0) << 8) | 0xFFF,
        secondary_status,
        memory_base: u32::from(memory_base & 0xFFF0) << 16,
        memory_limit: (u32::from(memory_limit & 0xFFF0) << 16) | 0xF_FFFF,
        prefetchable_base: (u64::from(pref_base_upper) << 32)
            | (u64::from(pref_base & 0xFFF0) << 16),
        prefetchable_limit: (u64::from(pref_limit_upper) << 32)
            | (u64::from(pref_limit & 0xFFF0) << 16)
            | 0xF_FFFF,
        capability_pointer,
        expansion_rom_base,
        interrupt_line: c.u8()?,
        interrupt_pin: c.u8()?,
        bridge_control: c.u16()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Vec<u8> {
        let mut cfg = vec![0u8; 256];
        cfg[0..2].copy_from_slice(&0x8086u16.to_le_bytes());
        cfg[2..4].copy_from_slice(&0x9A49u16.to_le_bytes());
        cfg[6..8].copy_from_slice(&STATUS_CAPABILITIES_LIST.to_le_bytes());
        cfg[8..12].copy_from_slice(&0x0300_0001u32.to_le_bytes());
        // BAR0: 64-bit prefetchable memory at 0x6000_0000_0000
        cfg[0x10..0x14].copy_from_slice(&0x0000_000Cu32.to_le_bytes());
        cfg[0x14..0x18].copy_from_slice(&0x0000_6000u32.to_le_bytes());
        // BAR2: I/O at 0x3000
        cfg[0x18..0x1C].copy_from_slice(&0x3001u32.to_le_bytes());
        cfg[0x34] = 0x41;
        cfg[0x3D] = 1;
        cfg
    }

    #[test]
    fn endpoint_header() {
        let h = Header::parse(&endpoint()).unwrap();
        assert_eq!(h.common.vendor_id, 0x8086);
        assert_eq!(h.common.class_code, 0x03_0000);
        assert_eq!(h.common.revision_id, 1);
        assert_eq!(
            h.bars()[..2],
            [
                Bar::Memory64 {
                    base: 0x6000_0000_0000,
                    prefetchable: true
                },
                Bar::Io { base: 0x3000 }
            ]
        );
        assert_eq!(h.bars().len(), 5);
        // low bits of the pointer are reserved
        assert_eq!(h.capability_pointer(), Some(0x40));
    }

    #[test]
    fn no_capability_list_without_status_bit() {
        let mut cfg = endpoint();
        cfg[6] = 0;
        assert_eq!(Header::parse(&cfg).unwrap().capability_pointer(), None);
    }

    #[test]
    fn bridge_windows() {
        let mut cfg = vec![0u8; 64];
        cfg[0x0E] = 0x81;
        cfg[0x18] = 0;
        cfg[0x19] = 1;
        cfg[0x1A] = 3;
        cfg[0x20..0x22].copy_from_slice(&0xA000u16.to_le_bytes());
        cfg[0x22..0x24].copy_from_slice(&0xA010u16.to_le_bytes());
        let h = Header::parse(&cfg).unwrap();
        assert!(h.common.header_type.multi_function());
        let HeaderKind::Bridge(b) = h.kind else {
            panic!("expected a bridge");
        };
        assert_eq!((b.secondary_bus, b.subordinate_bus), (1, 3));
        assert_eq!(b.memory_base, 0xA000_0000);
        assert_eq!(b.memory_limit, 0xA01F_FFFF);
    }

    #[test]
    fn short_blob() {
        assert_eq!(
            Header::parse(&[0u8; 32]),
            Err(PciError::TooShort { len: 32 })
        );
    }
}
