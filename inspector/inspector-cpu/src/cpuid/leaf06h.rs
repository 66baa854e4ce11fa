use super::CpuidResult;
use bitfield_struct::bitfield;

pub const LEAF_06H: u32 = 0x06;

/// CPUID.06H: thermal and power management.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf06h {
    pub eax: Leaf6Eax,
    /// Number of interrupt thresholds in the digital thermal sensor.
    pub interrupt_thresholds: u8,
    pub ecx: Leaf6Ecx,
    pub edx: Leaf6Edx,
}

impl Leaf06h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            eax: Leaf6Eax::from_bits(r.eax),
            interrupt_thresholds: r.ebx.to_le_bytes()[0] & 0x0F,
            ecx: Leaf6Ecx::from_bits(r.ecx),
            edx: Leaf6Edx::from_bits(r.edx),
        }
    }

    /// HWP base MSRs (`IA32_PM_ENABLE`, `IA32_HWP_CAPABILITIES`) exist.
    #[inline]
    #[must_use]
    pub const fn has_hwp(&self) -> bool {
        self.eax.hwp()
    }
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf6Eax {
    pub digital_temperature_sensor: bool, // 0
    pub turbo_boost: bool,                // 1
    /// APIC timer always running.
    pub arat: bool, // 2
    _rsv3: bool,                          // 3
    pub power_limit_notification: bool,   // 4
    pub clock_modulation_extension: bool, // 5
    pub package_thermal_management: bool, // 6
    pub hwp: bool,                        // 7
    pub hwp_notification: bool,           // 8
    pub hwp_activity_window: bool,        // 9
    pub hwp_energy_performance_preference: bool, // 10
    pub hwp_package_level_request: bool,  // 11
    _rsv12: bool,                         // 12
    pub hdc: bool,                        // 13
    pub turbo_boost_max_3: bool,          // 14
    pub hwp_capabilities: bool,           // 15
    pub hwp_peci_override: bool,          // 16
    pub flexible_hwp: bool,               // 17
    pub fast_hwp_request: bool,           // 18
    pub hw_feedback: bool,                // 19
    pub ignore_idle_hwp_request: bool,    // 20
    #[bits(2)]
    _rsv21_22: u8,
    pub thread_director: bool, // 23
    #[bits(8)]
    _rsv24_31: u8,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf6Ecx {
    pub hardware_coordination_feedback: bool,
    #[bits(2)]
    _rsv1_2: u8,
    pub performance_energy_bias: bool,
    #[bits(4)]
    _rsv4_7: u8,
    /// Number of Thread Director classes (bits 15:8).
    #[bits(8)]
    pub thread_director_classes: u8,
    #[bits(16)]
    _rsv16_31: u16,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf6Edx {
    /// Supported hardware feedback interface capabilities (bits 7:0).
    #[bits(8)]
    pub feedback_bitmap: u8,
    /// Feedback structure size in 4 KiB pages, zero-based (bits 11:8).
    #[bits(4)]
    pub feedback_structure_size_z: u8,
    #[bits(4)]
    _rsv12_15: u8,
    /// This processor's row in the feedback structure (bits 31:16).
    #[bits(16)]
    pub feedback_index: u16,
}
