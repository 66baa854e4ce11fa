use crate::msr::{Msr, MsrRegister};
use bitfield_struct::bitfield;

/// `IA32_PM_ENABLE` (MSR `0x770`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ia32PmEnable {
    /// Bit 0: Hardware-controlled performance states enabled.
    pub hwp_enable: bool,
    #[bits(63)]
    _rsv1_63: u64,
}

impl Ia32PmEnable {
    pub const IA32_PM_ENABLE: u32 = 0x770;
}

impl MsrRegister for Ia32PmEnable {
    const MSR: Msr = Msr::new(Self::IA32_PM_ENABLE);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

/// `IA32_HWP_CAPABILITIES` (MSR `0x771`), performance levels in ratio units.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ia32HwpCapabilities {
    #[bits(8)]
    pub highest_performance: u8,
    #[bits(8)]
    pub guaranteed_performance: u8,
    #[bits(8)]
    pub most_efficient_performance: u8,
    #[bits(8)]
    pub lowest_performance: u8,
    #[bits(32)]
    _rsv32_63: u32,
}

impl Ia32HwpCapabilities {
    pub const IA32_HWP_CAPABILITIES: u32 = 0x771;
}

impl MsrRegister for Ia32HwpCapabilities {
    const MSR: Msr = Msr::new(Self::IA32_HWP_CAPABILITIES);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}
