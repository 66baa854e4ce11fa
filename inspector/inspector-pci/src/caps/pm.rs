use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};

/// Power Management capability (id 0x01).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerManagement {
    pub capabilities: PmCapabilities,
    pub control_status: PmControlStatus,
    /// PMCSR bridge support extensions.
    pub bridge_extensions: u8,
    pub data: u8,
}

/// Power Management Capabilities (PMC).
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct PmCapabilities {
    #[bits(3)]
    pub version: u8,
    pub pme_clock: bool,
    pub immediate_readiness_on_return_to_d0: bool,
    pub device_specific_initialization: bool,
    #[bits(3)]
    pub aux_current: u8,
    pub d1_support: bool,
    pub d2_support: bool,
    /// Power states from which PME# can be asserted (D0, D1, D2, D3hot, D3cold).
    #[bits(5)]
    pub pme_support: u8,
}

/// Power Management Control/Status (PMCSR).
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct PmControlStatus {
    #[bits(2)]
    pub power_state: u8,
    #[bits(1)]
    _reserved1: u8,
    pub no_soft_reset: bool,
    #[bits(4)]
    _reserved2: u8,
    pub pme_en: bool,
    #[bits(4)]
    pub data_select: u8,
    #[bits(2)]
    pub data_scale: u8,
    pub pme_status: bool,
}

impl PowerManagement {
    pub(crate) fn decode(c: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            capabilities: PmCapabilities::from_bits(c.u16()?),
            control_status: PmControlStatus::from_bits(c.u16()?),
            bridge_extensions: c.u8()?,
            data: c.u8()?,
        })
    }
}
