use core::fmt;
use inspector_layout::{Cursor, Decode, LayoutError};

/// Address space of a [`GenericAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedController,
    SmBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    PlatformCommunicationsChannel,
    FunctionalFixedHardware,
    Oem(u8),
    Reserved(u8),
}

impl From<u8> for AddressSpace {
    fn from(id: u8) -> Self {
        match id {
            0x00 => Self::SystemMemory,
            0x01 => Self::SystemIo,
            0x02 => Self::PciConfig,
            0x03 => Self::EmbeddedController,
            0x04 => Self::SmBus,
            0x05 => Self::SystemCmos,
            0x06 => Self::PciBarTarget,
            0x07 => Self::Ipmi,
            0x08 => Self::GeneralPurposeIo,
            0x09 => Self::GenericSerialBus,
            0x0A => Self::PlatformCommunicationsChannel,
            0x7F => Self::FunctionalFixedHardware,
            0xC0..=0xFF => Self::Oem(id),
            _ => Self::Reserved(id),
        }
    }
}

impl AddressSpace {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::SystemMemory => 0x00,
            Self::SystemIo => 0x01,
            Self::PciConfig => 0x02,
            Self::EmbeddedController => 0x03,
            Self::SmBus => 0x04,
            Self::SystemCmos => 0x05,
            Self::PciBarTarget => 0x06,
            Self::Ipmi => 0x07,
            Self::GeneralPurposeIo => 0x08,
            Self::GenericSerialBus => 0x09,
            Self::PlatformCommunicationsChannel => 0x0A,
            Self::FunctionalFixedHardware => 0x7F,
            Self::Oem(id) | Self::Reserved(id) => id,
        }
    }
}

/// Access width of a [`GenericAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessSize {
    Undefined,
    Byte,
    Word,
    Dword,
    Qword,
    Reserved(u8),
}

impl From<u8> for AccessSize {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Undefined,
            1 => Self::Byte,
            2 => Self::Word,
            3 => Self::Dword,
            4 => Self::Qword,
            _ => Self::Reserved(v),
        }
    }
}

/// Generic Address Structure (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericAddress {
    pub space: AddressSpace,
    pub bit_width: u8,
    pub bit_offset: u8,
    pub access_size: AccessSize,
    pub address: u64,
}

impl GenericAddress {
    /// An all-zero GAS marks an unimplemented register block.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.address == 0 && self.bit_width == 0
    }
}

impl Decode for GenericAddress {
    const SIZE: usize = 12;

    fn decode(cur: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            space: cur.u8()?.into(),
            bit_width: cur.u8()?,
            bit_offset: cur.u8()?,
            access_size: cur.u8()?.into(),
            address: cur.u64()?,
        })
    }
}

impl fmt::Display for GenericAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}@{:#x} [{}+{}]",
            self.space, self.address, self.bit_offset, self.bit_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_io_port() {
        let raw = [0x01, 0x08, 0x00, 0x01, 0xF9, 0x0C, 0, 0, 0, 0, 0, 0];
        let gas = GenericAddress::decode(&mut Cursor::new(&raw)).unwrap();
        assert_eq!(gas.space, AddressSpace::SystemIo);
        assert_eq!(gas.access_size, AccessSize::Byte);
        assert_eq!(gas.address, 0xCF9);
        assert!(!gas.is_null());
    }

    #[test]
    fn unknown_spaces_are_explicit() {
        assert_eq!(AddressSpace::from(0x42), AddressSpace::Reserved(0x42));
        assert_eq!(AddressSpace::from(0xC5), AddressSpace::Oem(0xC5));
        assert_eq!(AddressSpace::from(0xC5).id(), 0xC5);
        assert_eq!(AccessSize::from(9), AccessSize::Reserved(9));
    }
}
