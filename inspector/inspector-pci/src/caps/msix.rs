use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};

/// MSI-X capability (id 0x11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsiX {
    pub control: MsiXControl,
    pub table: MsiXLocation,
    pub pba: MsiXLocation,
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct MsiXControl {
    /// Table size minus one.
    #[bits(11)]
    pub table_size_z: u16,
    #[bits(3)]
    _reserved1: u8,
    pub function_mask: bool,
    pub enable: bool,
}

/// BAR indicator plus a QWORD-aligned offset into that BAR.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MsiXLocation {
    #[bits(3)]
    pub bir: u8,
    #[bits(29)]
    pub offset_z: u32,
}

impl MsiXLocation {
    /// Byte offset into the BAR.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset_z() << 3
    }
}

impl MsiX {
    pub(crate) fn decode(c: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            control: MsiXControl::from_bits(c.u16()?),
            table: MsiXLocation::from_bits(c.u32()?),
            pba: MsiXLocation::from_bits(c.u32()?),
        })
    }

    #[must_use]
    pub const fn table_size(&self) -> u16 {
        self.control.table_size_z() + 1
    }
}
