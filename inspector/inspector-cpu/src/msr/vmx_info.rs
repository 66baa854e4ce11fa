use crate::msr::{Msr, MsrRegister};
use bitfield_struct::bitfield;

/// `IA32_VMX_BASIC` (MSR `0x480`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct VmxBasic {
    /// VMCS revision identifier (bits 30:0).
    #[bits(31)]
    pub revision_id: u32,
    _rsv31: bool,
    /// VMXON / VMCS region size in bytes (bits 44:32).
    #[bits(13)]
    pub region_size: u16,
    #[bits(3)]
    _rsv45_47: u8,
    /// Bit 48: VMXON, VMCS and referenced structures are limited to 32-bit addresses.
    pub physical_address_32bit: bool,
    pub dual_monitor_smm: bool,
    /// Memory type for the VMCS and referenced structures (bits 53:50).
    #[bits(4)]
    pub memory_type: u8,
    pub ins_outs_reporting: bool,
    /// Bit 55: the `IA32_VMX_TRUE_*` control MSRs exist.
    pub true_controls: bool,
    #[bits(8)]
    _rsv56_63: u8,
}

impl VmxBasic {
    pub const IA32_VMX_BASIC: u32 = 0x480;
}

impl MsrRegister for VmxBasic {
    const MSR: Msr = Msr::new(Self::IA32_VMX_BASIC);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

/// `IA32_VMX_MISC` (MSR `0x485`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct VmxMisc {
    /// TSC bits compared by the preemption timer (bits 4:0).
    #[bits(5)]
    pub preemption_timer_rate: u8,
    /// Bit 5: VM exits store `IA32_EFER.LMA` into the "IA-32e mode guest" control.
    pub stores_lma_on_exit: bool,
    #[bits(58)]
    _rsv6_63: u64,
}

impl VmxMisc {
    pub const IA32_VMX_MISC: u32 = 0x485;
}

impl MsrRegister for VmxMisc {
    const MSR: Msr = Msr::new(Self::IA32_VMX_MISC);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

/// `IA32_VMX_EPT_VPID_CAP` (MSR `0x48C`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct VmxEptVpidCap {
    pub execute_only: bool, // 0
    #[bits(5)]
    _rsv1_5: u8,
    pub page_walk_4: bool, // 6
    _rsv7: bool,
    pub uncacheable: bool, // 8
    #[bits(5)]
    _rsv9_13: u8,
    pub write_back: bool, // 14
    _rsv15: bool,
    pub ept_2mb_page: bool, // 16
    pub ept_1gb_page: bool, // 17
    #[bits(2)]
    _rsv18_19: u8,
    pub invept: bool,          // 20
    pub accessed_dirty: bool,  // 21
    #[bits(3)]
    _rsv22_24: u8,
    pub invept_single_context: bool, // 25
    pub invept_all_context: bool,    // 26
    #[bits(5)]
    _rsv27_31: u8,
    pub invvpid_instruction: bool, // 32
    #[bits(7)]
    _rsv33_39: u8,
    pub invvpid_individual_address: bool, // 40
    pub invvpid_single_context: bool,     // 41
    pub invvpid_all_context: bool,        // 42
    pub invvpid_single_context_retaining_globals: bool, // 43
    #[bits(20)]
    _rsv44_63: u32,
}

impl VmxEptVpidCap {
    pub const IA32_VMX_EPT_VPID_CAP: u32 = 0x48C;

    /// INVVPID with both the single-context and all-context types.
    #[inline]
    #[must_use]
    pub const fn invvpid(&self) -> bool {
        self.invvpid_instruction() && self.invvpid_single_context() && self.invvpid_all_context()
    }
}

impl MsrRegister for VmxEptVpidCap {
    const MSR: Msr = Msr::new(Self::IA32_VMX_EPT_VPID_CAP);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invvpid_needs_all_three_bits() {
        let full = (1u64 << 32) | (1 << 41) | (1 << 42);
        assert!(VmxEptVpidCap::from_bits(full).invvpid());
        assert!(!VmxEptVpidCap::from_bits(full & !(1 << 41)).invvpid());
        assert!(!VmxEptVpidCap::from_bits(full & !(1 << 32)).invvpid());
    }

    #[test]
    fn basic_address_width() {
        let basic = VmxBasic::from_bits((1 << 48) | (0x1000 << 32) | 4);
        assert!(basic.physical_address_32bit());
        assert_eq!(basic.region_size(), 0x1000);
        assert_eq!(basic.revision_id(), 4);
    }
}
