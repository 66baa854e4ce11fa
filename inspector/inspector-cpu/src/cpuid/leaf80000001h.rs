use super::CpuidResult;
use bitfield_struct::bitfield;

/// Highest extended leaf in EAX.
pub const LEAF_8000_0000H: u32 = 0x8000_0000;
pub const LEAF_8000_0001H: u32 = 0x8000_0001;

/// CPUID.8000_0001H: extended signature and feature bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf80000001h {
    pub signature: u32,
    pub ecx: Ext1Ecx,
    pub edx: Ext1Edx,
}

impl Leaf80000001h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            signature: r.eax,
            ecx: Ext1Ecx::from_bits(r.ecx),
            edx: Ext1Edx::from_bits(r.edx),
        }
    }
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Ext1Ecx {
    /// LAHF/SAHF in 64-bit mode.
    pub lahf_sahf_64: bool, // 0
    #[bits(4)]
    _rsv1_4: u8,
    pub lzcnt: bool, // 5
    #[bits(2)]
    _rsv6_7: u8,
    pub prefetchw: bool, // 8
    #[bits(23)]
    _rsv9_31: u32,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Ext1Edx {
    #[bits(11)]
    _rsv0_10: u16,
    /// SYSCALL/SYSRET in 64-bit mode.
    pub syscall_sysret_64: bool, // 11
    #[bits(8)]
    _rsv12_19: u8,
    pub execute_disable: bool, // 20
    #[bits(5)]
    _rsv21_25: u8,
    pub gbyte_pages: bool, // 26
    pub rdtscp: bool,      // 27
    _rsv28: bool,
    pub intel_64: bool, // 29
    #[bits(2)]
    _rsv30_31: u8,
}
