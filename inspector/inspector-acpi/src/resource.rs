//! Resource data templates (`_CRS`, `_PRS`, `_SRS` buffers).
//!
//! Items come in two encodings. Small items carry their name and length in a
//! single tag byte (`0b0nnnnlll`); large items use a tag byte `0b1nnnnnnn`
//! followed by a 16-bit length. Decoding stops at the end tag.

use crate::GenericAddress;
use bitfield_struct::bitfield;
use inspector_layout::{Count, Cursor, Decode, LayoutError, decode_array};
use log::warn;

pub const SMALL_IRQ: u8 = 0x04;
pub const SMALL_DMA: u8 = 0x05;
pub const SMALL_START_DEPENDENT: u8 = 0x06;
pub const SMALL_END_DEPENDENT: u8 = 0x07;
pub const SMALL_IO: u8 = 0x08;
pub const SMALL_FIXED_IO: u8 = 0x09;
pub const SMALL_FIXED_DMA: u8 = 0x0A;
pub const SMALL_VENDOR: u8 = 0x0E;
pub const SMALL_END_TAG: u8 = 0x0F;

pub const LARGE_MEMORY24: u8 = 0x01;
pub const LARGE_GENERIC_REGISTER: u8 = 0x02;
pub const LARGE_VENDOR: u8 = 0x04;
pub const LARGE_MEMORY32: u8 = 0x05;
pub const LARGE_FIXED_MEMORY32: u8 = 0x06;
pub const LARGE_DWORD_ADDRESS: u8 = 0x07;
pub const LARGE_WORD_ADDRESS: u8 = 0x08;
pub const LARGE_EXTENDED_INTERRUPT: u8 = 0x09;
pub const LARGE_QWORD_ADDRESS: u8 = 0x0A;
pub const LARGE_EXTENDED_ADDRESS: u8 = 0x0B;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceItem {
    Irq {
        mask: u16,
        flags: Option<IrqFlags>,
    },
    Dma {
        channels: u8,
        flags: u8,
    },
    StartDependentFunctions {
        priority: Option<u8>,
    },
    EndDependentFunctions,
    Io {
        decodes_16bit: bool,
        min: u16,
        max: u16,
        alignment: u8,
        length: u8,
    },
    FixedIo {
        base: u16,
        length: u8,
    },
    FixedDma {
        request_line: u16,
        channel: u16,
        transfer_width: u8,
    },
    VendorShort(Vec<u8>),
    EndTag {
        checksum: u8,
    },
    Memory24 {
        writable: bool,
        min: u16,
        max: u16,
        alignment: u16,
        length: u16,
    },
    GenericRegister(GenericAddress),
    VendorLong {
        subtype: u8,
        uuid: [u8; 16],
        data: Vec<u8>,
    },
    Memory32 {
        writable: bool,
        min: u32,
        max: u32,
        alignment: u32,
        length: u32,
    },
    FixedMemory32 {
        writable: bool,
        base: u32,
        length: u32,
    },
    AddressSpace(AddressSpaceDescriptor),
    ExtendedInterrupt {
        flags: ExtendedInterruptFlags,
        interrupts: Vec<u32>,
        source: Option<ResourceSource>,
    },
    Unknown {
        large: bool,
        name: u8,
        data: Vec<u8>,
    },
}

impl ResourceItem {
    /// IRQ numbers selected by a legacy IRQ descriptor's mask.
    #[must_use]
    pub fn irqs(&self) -> Vec<u32> {
        match self {
            Self::Irq { mask, .. } => (0..16).filter(|i| mask & (1 << i) != 0).collect(),
            Self::ExtendedInterrupt { interrupts, .. } => interrupts.clone(),
            _ => Vec::new(),
        }
    }

    /// The device named as the provider of this resource, if any.
    #[must_use]
    pub const fn resource_source(&self) -> Option<&ResourceSource> {
        match self {
            Self::AddressSpace(AddressSpaceDescriptor { source, .. })
            | Self::ExtendedInterrupt { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

/// Flags byte of a 3-byte IRQ descriptor.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct IrqFlags {
    /// Edge-triggered (`_HE`).
    pub edge: bool,
    #[bits(2)]
    _reserved1: u8,
    /// Active low (`_LL`).
    pub active_low: bool,
    /// Shareable (`_SHR`).
    pub shared: bool,
    /// Wake capable (`_WKC`).
    pub wake_capable: bool,
    #[bits(2)]
    _reserved2: u8,
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ExtendedInterruptFlags {
    /// Consumer (`_CP`).
    pub consumer: bool,
    pub edge: bool,
    pub active_low: bool,
    pub shared: bool,
    pub wake_capable: bool,
    #[bits(3)]
    _reserved3: u8,
}

/// Optional trailing reference to the device providing a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSource {
    pub index: u8,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    Word,
    DWord,
    QWord,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Memory,
    Io,
    BusNumber,
    Other(u8),
}

impl From<u8> for ResourceType {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Memory,
            1 => Self::Io,
            2 => Self::BusNumber,
            _ => Self::Other(v),
        }
    }
}

/// Word, DWord, QWord and Extended Address Space descriptors share this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpaceDescriptor {
    pub width: AddressWidth,
    pub resource_type: ResourceType,
    /// Bit 1 subtractive decode, bit 2 min fixed, bit 3 max fixed.
    pub general_flags: u8,
    pub type_flags: u8,
    pub granularity: u64,
    pub min: u64,
    pub max: u64,
    pub translation: u64,
    pub length: u64,
    pub source: Option<ResourceSource>,
}

impl AddressSpaceDescriptor {
    #[must_use]
    pub const fn min_fixed(&self) -> bool {
        self.general_flags & 0b0100 != 0
    }

    #[must_use]
    pub const fn max_fixed(&self) -> bool {
        self.general_flags & 0b1000 != 0
    }
}

/// Decodes a resource template.
///
/// Items that do not fit end the walk with a warning; everything decoded
/// before is returned.
#[must_use]
pub fn decode(bytes: &[u8]) -> Vec<ResourceItem> {
    let mut c = Cursor::new(bytes);
    let mut items = Vec::new();
    while let Some(tag) = c.peek_u8() {
        let offset = c.position();
        match decode_item(&mut c, tag) {
            Ok(item) => {
                let end = matches!(item, ResourceItem::EndTag { .. });
                items.push(item);
                if end {
                    break;
                }
            }
            Err(e) => {
                warn!("resource template: item at {offset:#x} is truncated: {e}");
                break;
            }
        }
    }
    items
}

fn decode_item(c: &mut Cursor<'_>, tag: u8) -> Result<ResourceItem, LayoutError> {
    if tag & 0x80 == 0 {
        c.skip(1)?;
        let name = (tag >> 3) & 0x0F;
        let len = usize::from(tag & 0x07);
        let mut body = c.sub(len)?;
        decode_small(name, len, &mut body)
    } else {
        c.skip(1)?;
        let name = tag & 0x7F;
        let len = usize::from(c.u16()?);
        let mut body = c.sub(len)?;
        decode_large(name, &mut body)
    }
}

fn decode_small(name: u8, len: usize, b: &mut Cursor<'_>) -> Result<ResourceItem, LayoutError> {
    Ok(match name {
        SMALL_IRQ => ResourceItem::Irq {
            mask: b.u16()?,
            flags: if len > 2 {
                Some(IrqFlags::from_bits(b.u8()?))
            } else {
                None
            },
        },
        SMALL_DMA => ResourceItem::Dma {
            channels: b.u8()?,
            flags: b.u8()?,
        },
        SMALL_START_DEPENDENT => ResourceItem::StartDependentFunctions {
            priority: if len > 0 { Some(b.u8()?) } else { None },
        },
        SMALL_END_DEPENDENT => ResourceItem::EndDependentFunctions,
        SMALL_IO => ResourceItem::Io {
            decodes_16bit: b.u8()? & 1 != 0,
            min: b.u16()?,
            max: b.u16()?,
            alignment: b.u8()?,
            length: b.u8()?,
        },
        SMALL_FIXED_IO => ResourceItem::FixedIo {
            base: b.u16()?,
            length: b.u8()?,
        },
        SMALL_FIXED_DMA => ResourceItem::FixedDma {
            request_line: b.u16()?,
            channel: b.u16()?,
            transfer_width: b.u8()?,
        },
        SMALL_VENDOR => ResourceItem::VendorShort(b.rest().to_vec()),
        SMALL_END_TAG => ResourceItem::EndTag {
            checksum: b.u8().unwrap_or(0),
        },
        _ => ResourceItem::Unknown {
            large: false,
            name,
            data: b.rest().to_vec(),
        },
    })
}

fn decode_large(name: u8, b: &mut Cursor<'_>) -> Result<ResourceItem, LayoutError> {
    Ok(match name {
        LARGE_MEMORY24 => ResourceItem::Memory24 {
            writable: b.u8()? & 1 != 0,
            min: b.u16()?,
            max: b.u16()?,
            alignment: b.u16()?,
            length: b.u16()?,
        },
        LARGE_GENERIC_REGISTER => ResourceItem::GenericRegister(GenericAddress::decode(b)?),
        LARGE_VENDOR => ResourceItem::VendorLong {
            subtype: b.u8()?,
            uuid: b.array()?,
            data: b.rest().to_vec(),
        },
        LARGE_MEMORY32 => ResourceItem::Memory32 {
            writable: b.u8()? & 1 != 0,
            min: b.u32()?,
            max: b.u32()?,
            alignment: b.u32()?,
            length: b.u32()?,
        },
        LARGE_FIXED_MEMORY32 => ResourceItem::FixedMemory32 {
            writable: b.u8()? & 1 != 0,
            base: b.u32()?,
            length: b.u32()?,
        },
        LARGE_WORD_ADDRESS => address_space(AddressWidth::Word, b)?,
        LARGE_DWORD_ADDRESS => address_space(AddressWidth::DWord, b)?,
        LARGE_QWORD_ADDRESS => address_space(AddressWidth::QWord, b)?,
        LARGE_EXTENDED_ADDRESS => address_space(AddressWidth::Extended, b)?,
        LARGE_EXTENDED_INTERRUPT => {
            let flags = ExtendedInterruptFlags::from_bits(b.u8()?);
            let count = usize::from(b.u8()?);
            ResourceItem::ExtendedInterrupt {
                flags,
                interrupts: decode_array(b, Count::Fixed(count))?,
                source: resource_source(b),
            }
        }
        _ => ResourceItem::Unknown {
            large: true,
            name,
            data: b.rest().to_vec(),
        },
    })
}

fn address_space(width: AddressWidth, b: &mut Cursor<'_>) -> Result<ResourceItem, LayoutError> {
    let resource_type = ResourceType::from(b.u8()?);
    let general_flags = b.u8()?;
    let type_flags = b.u8()?;
    let read = |b: &mut Cursor<'_>| -> Result<u64, LayoutError> {
        match width {
            AddressWidth::Word => b.u16().map(u64::from),
            AddressWidth::DWord => b.u32().map(u64::from),
            AddressWidth::QWord | AddressWidth::Extended => b.u64(),
        }
    };
    if width == AddressWidth::Extended {
        // revision id, reserved
        b.skip(2)?;
    }
    let descriptor = AddressSpaceDescriptor {
        width,
        resource_type,
        general_flags,
        type_flags,
        granularity: read(b)?,
        min: read(b)?,
        max: read(b)?,
        translation: read(b)?,
        length: read(b)?,
        source: if width == AddressWidth::Extended {
            None
        } else {
            resource_source(b)
        },
    };
    Ok(ResourceItem::AddressSpace(descriptor))
}

fn resource_source(b: &mut Cursor<'_>) -> Option<ResourceSource> {
    let index = b.u8().ok()?;
    let name = b.rest();
    let name = name.split(|&c| c == 0).next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    Some(ResourceSource {
        index,
        name: String::from_utf8_lossy(name).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pci_root_bridge_template() {
        let mut t = Vec::new();
        // WordBusNumber 0x00..0xFF
        t.extend_from_slice(&[0x88, 0x0D, 0x00, 0x02, 0x0C, 0x00]);
        t.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0, 0, 0, 0, 1]);
        // IO 16-bit 0xCF8, len 8
        t.extend_from_slice(&[0x47, 0x01, 0xF8, 0x0C, 0xF8, 0x0C, 0x01, 0x08]);
        // DWordMemory with a resource source
        t.extend_from_slice(&[0x87, 0x1D, 0x00, 0x00, 0x0C, 0x03]);
        for v in [0u32, 0xA_0000, 0xB_FFFF, 0, 0x2_0000] {
            t.extend_from_slice(&v.to_le_bytes());
        }
        t.extend_from_slice(&[0x00, b'P', b'C', b'I', b'0', 0x00]);
        // IRQNoFlags {4}
        t.extend_from_slice(&[0x22, 0x10, 0x00]);
        t.extend_from_slice(&[0x79, 0x00]);

        let items = decode(&t);
        assert_eq!(items.len(), 5);
        let ResourceItem::AddressSpace(bus) = &items[0] else {
            panic!("expected bus number range");
        };
        assert_eq!(bus.width, AddressWidth::Word);
        assert_eq!(bus.resource_type, ResourceType::BusNumber);
        assert!(bus.min_fixed() && bus.max_fixed());
        assert_eq!((bus.min, bus.max, bus.length), (0, 0xFF, 0x100));
        assert!(bus.source.is_none());
        assert_eq!(
            items[1],
            ResourceItem::Io {
                decodes_16bit: true,
                min: 0xCF8,
                max: 0xCF8,
                alignment: 1,
                length: 8
            }
        );
        let ResourceItem::AddressSpace(mem) = &items[2] else {
            panic!("expected memory range");
        };
        assert_eq!(mem.resource_type, ResourceType::Memory);
        assert_eq!(mem.length, 0x2_0000);
        assert_eq!(mem.source.as_ref().map(|s| s.name.as_str()), Some("PCI0"));
        assert_eq!(items[3].irqs(), vec![4]);
        assert_eq!(items[4], ResourceItem::EndTag { checksum: 0 });
    }

    #[test]
    fn extended_interrupt() {
        let t = [
            0x89, 0x06, 0x00, 0b0_1011, 0x01, 0x10, 0, 0, 0, 0x79, 0x00,
        ];
        let items = decode(&t);
        let ResourceItem::ExtendedInterrupt { flags, .. } = &items[0] else {
            panic!("expected extended interrupt");
        };
        assert!(flags.consumer() && flags.edge() && flags.shared());
        assert!(!flags.active_low());
        assert_eq!(items[0].irqs(), vec![0x10]);
    }

    #[test]
    fn truncated_item_keeps_prefix() {
        // fixed I/O, then a Memory32 claiming 17 bytes with only 4 present
        let t = [0x4B, 0x60, 0x00, 0x01, 0x85, 0x11, 0x00, 1, 2, 3, 4];
        let items = decode(&t);
        assert_eq!(
            items,
            vec![ResourceItem::FixedIo {
                base: 0x60,
                length: 1
            }]
        );
    }

    #[test]
    fn unknown_items_are_kept() {
        let t = [0x8F, 0x02, 0x00, 0xAA, 0xBB, 0x79, 0x00];
        let items = decode(&t);
        assert_eq!(
            items[0],
            ResourceItem::Unknown {
                large: true,
                name: 0x0F,
                data: vec![0xAA, 0xBB]
            }
        );
    }
}
