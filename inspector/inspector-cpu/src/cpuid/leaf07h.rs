use super::CpuidResult;
use bitfield_struct::bitfield;

pub const LEAF_07H: u32 = 0x07;

/// CPUID.(EAX=07H, ECX=0): structured extended feature flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf07h {
    /// Highest supported subleaf of leaf 7.
    pub max_subleaf: u32,
    pub ebx: Leaf7Ebx,
    pub ecx: Leaf7Ecx,
    pub edx: Leaf7Edx,
}

impl Leaf07h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            max_subleaf: r.eax,
            ebx: Leaf7Ebx::from_bits(r.ebx),
            ecx: Leaf7Ecx::from_bits(r.ecx),
            edx: Leaf7Edx::from_bits(r.edx),
        }
    }

    /// Resource Director Technology allocation (leaf 0x10 is meaningful).
    #[inline]
    #[must_use]
    pub const fn has_rdt_allocation(&self) -> bool {
        self.ebx.rdt_a()
    }

    #[inline]
    #[must_use]
    pub const fn is_hybrid(&self) -> bool {
        self.edx.hybrid()
    }
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf7Ebx {
    pub fsgsbase: bool,         // 0
    pub tsc_adjust_msr: bool,   // 1
    pub sgx: bool,              // 2
    pub bmi1: bool,             // 3
    pub hle: bool,              // 4
    pub avx2: bool,             // 5
    pub fdp_excptn_only: bool,  // 6
    pub smep: bool,             // 7
    pub bmi2: bool,             // 8
    pub erms: bool,             // 9
    pub invpcid: bool,          // 10
    pub rtm: bool,              // 11
    /// Quality of Service monitoring (leaf 0x0F).
    pub rdt_m: bool, // 12
    pub deprecate_fpu_cs_ds: bool, // 13
    pub mpx: bool,              // 14
    /// Resource Director Technology allocation (leaf 0x10).
    pub rdt_a: bool, // 15
    pub avx512f: bool,          // 16
    pub avx512dq: bool,         // 17
    pub rdseed: bool,           // 18
    pub adx: bool,              // 19
    pub smap: bool,             // 20
    pub avx512_ifma: bool,      // 21
    _rsv22: bool,               // 22
    pub clflushopt: bool,       // 23
    pub clwb: bool,             // 24
    pub intel_pt: bool,         // 25
    pub avx512pf: bool,         // 26
    pub avx512er: bool,         // 27
    pub avx512cd: bool,         // 28
    pub sha: bool,              // 29
    pub avx512bw: bool,         // 30
    pub avx512vl: bool,         // 31
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf7Ecx {
    pub prefetchwt1: bool,      // 0
    pub avx512_vbmi: bool,      // 1
    pub umip: bool,             // 2
    pub pku: bool,              // 3
    pub ospke: bool,            // 4
    pub waitpkg: bool,          // 5
    pub avx512_vbmi2: bool,     // 6
    pub cet_ss: bool,           // 7
    pub gfni: bool,             // 8
    pub vaes: bool,             // 9
    pub vpclmulqdq: bool,       // 10
    pub avx512_vnni: bool,      // 11
    pub avx512_bitalg: bool,    // 12
    pub tme_en: bool,           // 13
    pub avx512_vpopcntdq: bool, // 14
    _rsv15: bool,               // 15
    /// Five-level paging.
    pub la57: bool, // 16
    /// MAWAU value used by BNDLDX/BNDSTX in 64-bit mode (bits 21:17).
    #[bits(5)]
    pub mawau: u8,
    pub rdpid: bool,            // 22
    pub key_locker: bool,       // 23
    _rsv24: bool,               // 24
    pub cldemote: bool,         // 25
    _rsv26: bool,               // 26
    pub movdiri: bool,          // 27
    pub movdir64b: bool,        // 28
    _rsv29: bool,               // 29
    pub sgx_lc: bool,           // 30
    pub pks: bool,              // 31
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf7Edx {
    #[bits(2)]
    _rsv0_1: u8,
    pub avx512_4vnniw: bool,    // 2
    pub avx512_4fmaps: bool,    // 3
    pub fast_short_rep_mov: bool, // 4
    #[bits(3)]
    _rsv5_7: u8,
    pub avx512_vp2intersect: bool, // 8
    _rsv9: bool,                // 9
    pub md_clear: bool,         // 10
    #[bits(4)]
    _rsv11_14: u8,
    pub hybrid: bool,           // 15
    #[bits(2)]
    _rsv16_17: u8,
    pub pconfig: bool,          // 18
    _rsv19: bool,               // 19
    pub cet_ibt: bool,          // 20
    #[bits(5)]
    _rsv21_25: u8,
    pub ibrs_ibpb: bool,        // 26
    pub stibp: bool,            // 27
    pub l1d_flush: bool,        // 28
    pub arch_capabilities: bool, // 29
    pub core_capabilities: bool, // 30
    pub ssbd: bool,             // 31
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_bits() {
        let leaf = Leaf07h::from(CpuidResult::new(0, 1 << 15, 1 << 16, 1 << 15));
        assert!(leaf.has_rdt_allocation());
        assert!(leaf.ecx.la57());
        assert!(leaf.is_hybrid());
        assert!(!leaf.ebx.avx2());
    }

    #[test]
    fn mawau_is_five_bits() {
        let ecx = Leaf7Ecx::from_bits(0b11111 << 17);
        assert_eq!(ecx.mawau(), 31);
        assert!(!ecx.la57());
        assert!(!ecx.rdpid());
    }
}
