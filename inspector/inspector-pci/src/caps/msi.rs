use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};

/// MSI capability (id 0x05).
///
/// The layout after the message control word depends on two of its bits:
/// `address_64bit` widens the message address, `per_vector_masking` appends
/// the mask and pending registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msi {
    pub control: MsiControl,
    pub address: MsiAddress,
    pub data: u16,
    pub masking: Option<MsiMasking>,
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct MsiControl {
    pub enable: bool,
    #[bits(3)]
    pub multiple_message_capable: u8,
    #[bits(3)]
    pub multiple_message_enable: u8,
    pub address_64bit: bool,
    pub per_vector_masking: bool,
    #[bits(7)]
    _reserved1: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsiAddress {
    Bits32(u32),
    Bits64(u64),
}

impl MsiAddress {
    #[must_use]
    pub fn value(self) -> u64 {
        match self {
            Self::Bits32(a) => u64::from(a),
            Self::Bits64(a) => a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsiMasking {
    pub mask_bits: u32,
    pub pending_bits: u32,
}

impl Msi {
    pub(crate) fn decode(c: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        let control = MsiControl::from_bits(c.u16()?);
        let address = if control.address_64bit() {
            MsiAddress::Bits64(c.u64()?)
        } else {
            MsiAddress::Bits32(c.u32()?)
        };
        let data = c.u16()?;
        let masking = if control.per_vector_masking() {
            c.skip(2)?;
            Some(MsiMasking {
                mask_bits: c.u32()?,
                pending_bits: c.u32()?,
            })
        } else {
            None
        };
        Ok(Self {
            control,
            address,
            data,
            masking,
        })
    }

    /// Size of the structure in configuration space, list header included.
    #[must_use]
    pub const fn len(&self) -> usize {
        let address = match self.address {
            MsiAddress::Bits32(_) => 4,
            MsiAddress::Bits64(_) => 8,
        };
        let masking = if self.masking.is_some() { 10 } else { 0 };
        4 + address + 2 + masking
    }

    /// Vectors the function can request (`2^multiple_message_capable`).
    #[must_use]
    pub const fn vectors_capable(&self) -> u32 {
        1 << self.control.multiple_message_capable()
    }
}
