use crate::msr::{Msr, MsrRegister};
use bitfield_struct::bitfield;

/// `MSR_TURBO_RATIO_LIMIT` (MSR `0x1AD`): maximum ratio by active core count.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct TurboRatioLimit {
    #[bits(8)]
    pub max_ratio_1core: u8,
    #[bits(8)]
    pub max_ratio_2core: u8,
    #[bits(8)]
    pub max_ratio_3core: u8,
    #[bits(8)]
    pub max_ratio_4core: u8,
    #[bits(32)]
    _rsv32_63: u32,
}

impl TurboRatioLimit {
    pub const MSR_TURBO_RATIO_LIMIT: u32 = 0x1AD;
}

impl MsrRegister for TurboRatioLimit {
    const MSR: Msr = Msr::new(Self::MSR_TURBO_RATIO_LIMIT);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

/// `MSR_TURBO_ACTIVATION_RATIO` (MSR `0x64C`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct TurboActivationRatio {
    /// Highest non-turbo ratio (bits 7:0).
    #[bits(8)]
    pub max_non_turbo_ratio: u8,
    #[bits(56)]
    _rsv8_63: u64,
}

impl TurboActivationRatio {
    pub const MSR_TURBO_ACTIVATION_RATIO: u32 = 0x64C;
}

impl MsrRegister for TurboActivationRatio {
    const MSR: Msr = Msr::new(Self::MSR_TURBO_ACTIVATION_RATIO);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}
