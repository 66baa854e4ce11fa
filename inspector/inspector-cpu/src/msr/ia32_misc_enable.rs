use crate::msr::{Msr, MsrRegister};
use bitfield_struct::bitfield;

/// `IA32_MISC_ENABLE` (MSR `0x1A0`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ia32MiscEnable {
    /// Bit 0: Fast-strings enable.
    pub fast_string: bool,
    #[bits(2)]
    _rsv1_2: u8,
    /// Bit 3: Automatic thermal control circuit enable.
    pub automatic_thermal_control: bool,
    #[bits(3)]
    _rsv4_6: u8,
    /// Bit 7: Performance monitoring available (read-only).
    pub performance_monitoring: bool,
    #[bits(3)]
    _rsv8_10: u8,
    pub bts_unavailable: bool,
    pub pebs_unavailable: bool,
    #[bits(3)]
    _rsv13_15: u8,
    /// Bit 16: Enhanced Intel SpeedStep enable.
    pub eist: bool,
    _rsv17: bool,
    /// Bit 18: ENABLE MONITOR FSM.
    pub monitor_fsm: bool,
    #[bits(3)]
    _rsv19_21: u8,
    /// Bit 22: Limit CPUID maxval to 2.
    pub limit_cpuid_maxval: bool,
    pub xtpr_message_disable: bool,
    #[bits(10)]
    _rsv24_33: u16,
    /// Bit 34: XD bit disable.
    pub xd_disable: bool,
    #[bits(29)]
    _rsv35_63: u32,
}

impl Ia32MiscEnable {
    /// MSR index for `IA32_MISC_ENABLE`.
    pub const IA32_MISC_ENABLE: u32 = 0x1A0;
}

impl MsrRegister for Ia32MiscEnable {
    const MSR: Msr = Msr::new(Self::IA32_MISC_ENABLE);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}
