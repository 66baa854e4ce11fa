//! VMX control capability MSRs.
//!
//! Each of these reports, for one 32-bit VMX control field, which bits may
//! be cleared (bits 31:0, a zero bit means the control may be 0) and which
//! may be set (bits 63:32, a one bit means the control may be 1).

use crate::msr::{Msr, MsrRegister};

/// Queries on an allowed-0 / allowed-1 capability register.
pub trait VmxCapability {
    fn raw(&self) -> u64;

    /// The control at `bit` may be 0. Bits past 31 never qualify.
    fn allows_0_setting(&self, bit: u32) -> bool {
        bit < 32 && self.raw() & (1 << bit) == 0
    }

    /// The control at `bit` may be 1. Bits past 31 never qualify.
    fn allows_1_setting(&self, bit: u32) -> bool {
        bit < 32 && (self.raw() >> 32) & (1 << bit) != 0
    }

    /// The control may be either 0 or 1.
    fn allows_flexible_setting(&self, bit: u32) -> bool {
        self.allows_0_setting(bit) && self.allows_1_setting(bit)
    }
}

macro_rules! vmx_controls {
    (
        $(#[$meta:meta])*
        $name:ident, $index_name:ident = $index:expr;
        $( $(#[$cmeta:meta])* $control:ident = $bit:expr, $label:literal; )*
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub u64);

        impl $name {
            /// MSR index.
            pub const $index_name: u32 = $index;

            $( $(#[$cmeta])* pub const $control: u32 = $bit; )*

            /// Controls reported as flexible, with their report labels.
            pub const REPORTED: &'static [(&'static str, u32)] = &[$(($label, $bit)),*];
        }

        impl MsrRegister for $name {
            const MSR: Msr = Msr::new(Self::$index_name);

            fn from_raw(value: u64) -> Self {
                Self(value)
            }
        }

        impl VmxCapability for $name {
            fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

vmx_controls! {
    /// `IA32_VMX_PINBASED_CTLS` (MSR `0x481`).
    VmxPinbasedCtls, IA32_VMX_PINBASED_CTLS = 0x481;
    EXTERNAL_INTERRUPT_EXITING = 0, "vmx_pinbased_ctls_irq_exit";
}

vmx_controls! {
    /// `IA32_VMX_PROCBASED_CTLS` (MSR `0x482`), primary processor-based controls.
    VmxProcbasedCtls, IA32_VMX_PROCBASED_CTLS = 0x482;
    USE_TSC_OFFSETTING = 3, "vmx_procbased_ctls_tsc_off";
    HLT_EXITING = 7, "vmx_procbased_ctls_hlt";
    USE_TPR_SHADOW = 21, "vmx_procbased_ctls_tpr_shadow";
    USE_IO_BITMAPS = 25, "vmx_procbased_ctls_io_bitmap";
    USE_MSR_BITMAPS = 28, "vmx_procbased_ctls_msr_bitmap";
    /// Gates every control in [`VmxProcbasedCtls2`].
    ACTIVATE_SECONDARY_CONTROLS = 31, "vmx_procbased_ctls_secondary";
}

vmx_controls! {
    /// `IA32_VMX_PROCBASED_CTLS2` (MSR `0x48B`), secondary processor-based controls.
    VmxProcbasedCtls2, IA32_VMX_PROCBASED_CTLS2 = 0x48B;
    VIRTUALIZE_APIC_ACCESSES = 0, "vmx_procbased_ctls2_vapic";
    ENABLE_EPT = 1, "vmx_procbased_ctls2_ept";
    ENABLE_RDTSCP = 3, "vmx_procbased_ctls2_rdtscp";
    VIRTUALIZE_X2APIC_MODE = 4, "vmx_procbased_ctls2_vx2apic";
    ENABLE_VPID = 5, "vmx_procbased_ctls2_vpid";
    UNRESTRICTED_GUEST = 7, "vmx_procbased_ctls2_unrestrict";
    APIC_REGISTER_VIRTUALIZATION = 8, "vmx_procbased_ctls2_apic_reg_virt";
}

vmx_controls! {
    /// `IA32_VMX_EXIT_CTLS` (MSR `0x483`).
    VmxExitCtls, IA32_VMX_EXIT_CTLS = 0x483;
    HOST_ADDRESS_SPACE_SIZE = 9, "vmx_exit_ctls_host_addr64";
    ACK_INTERRUPT_ON_EXIT = 15, "vmx_exit_ctls_ack_irq";
    SAVE_PAT = 18, "vmx_exit_ctls_save_pat";
    LOAD_PAT = 19, "vmx_exit_ctls_load_pat";
}

vmx_controls! {
    /// `IA32_VMX_ENTRY_CTLS` (MSR `0x484`).
    VmxEntryCtls, IA32_VMX_ENTRY_CTLS = 0x484;
    IA32E_MODE_GUEST = 9, "vmx_entry_ctls_ia32e_mode";
    LOAD_PAT = 14, "vmx_entry_ctls_load_pat";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_settings_split_across_halves() {
        // Bit 1 must be 1 (set in both halves), bit 2 is flexible, bit 3 must be 0.
        let ctls = VmxProcbasedCtls2((0b0110 << 32) | 0b0010);
        assert!(!ctls.allows_0_setting(1));
        assert!(ctls.allows_1_setting(1));
        assert!(!ctls.allows_flexible_setting(1));
        assert!(ctls.allows_flexible_setting(2));
        assert!(ctls.allows_0_setting(3));
        assert!(!ctls.allows_1_setting(3));
    }

    #[test]
    fn bits_past_31_never_allowed() {
        let ctls = VmxEntryCtls(u64::MAX);
        assert!(!ctls.allows_1_setting(32));
        assert!(!ctls.allows_0_setting(40));
    }
}
