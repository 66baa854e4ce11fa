use super::CpuidResult;
use bitfield_struct::bitfield;

pub const LEAF_01H: u32 = 0x01;

/// CPUID.01H: version information, APIC ID and the classic feature flags.
///
/// Reference: Intel SDM Vol. 2A, "CPUID-CPU Identification", leaf 01H.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf01h {
    pub eax: Leaf1Eax,
    pub ebx: Leaf1Ebx,
    pub ecx: Leaf1Ecx,
    pub edx: Leaf1Edx,
}

impl Leaf01h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            eax: Leaf1Eax::from_bits(r.eax),
            ebx: Leaf1Ebx::from_bits(r.ebx),
            ecx: Leaf1Ecx::from_bits(r.ecx),
            edx: Leaf1Edx::from_bits(r.edx),
        }
    }

    #[inline]
    #[must_use]
    pub const fn has_vmx(&self) -> bool {
        self.ecx.vmx()
    }

    #[inline]
    #[must_use]
    pub const fn has_x2apic(&self) -> bool {
        self.ecx.x2apic()
    }

    #[inline]
    #[must_use]
    pub const fn initial_apic_id(&self) -> u8 {
        self.ebx.initial_apic_id()
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> u16 {
        self.eax.effective_family()
    }

    #[inline]
    #[must_use]
    pub const fn model(&self) -> u8 {
        self.eax.effective_model()
    }

    #[inline]
    #[must_use]
    pub const fn stepping(&self) -> u8 {
        self.eax.stepping()
    }
}

/// CPUID.01H:EAX, version information.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf1Eax {
    /// Stepping ID (bits 3:0).
    #[bits(4)]
    pub stepping: u8,
    /// Base model (bits 7:4).
    #[bits(4)]
    pub model: u8,
    /// Base family (bits 11:8).
    #[bits(4)]
    pub family: u8,
    /// Processor type (bits 13:12).
    #[bits(2)]
    pub processor_type: u8,
    #[bits(2)]
    _rsv14_15: u8,
    /// Extended model (bits 19:16).
    #[bits(4)]
    pub ext_model: u8,
    /// Extended family (bits 27:20).
    #[bits(8)]
    pub ext_family: u16,
    #[bits(4)]
    _rsv28_31: u8,
}

impl Leaf1Eax {
    /// Family 0x0F adds the extended family.
    #[inline]
    #[must_use]
    pub fn effective_family(self) -> u16 {
        let fam = u16::from(self.family());
        if fam == 0x0F {
            fam + self.ext_family()
        } else {
            fam
        }
    }

    /// Families 0x06 and 0x0F prepend the extended model.
    #[inline]
    #[must_use]
    pub const fn effective_model(self) -> u8 {
        let fam = self.family();
        let base = self.model();
        if fam == 0x06 || fam == 0x0F {
            base | (self.ext_model() << 4)
        } else {
            base
        }
    }
}

/// CPUID.01H:EBX.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf1Ebx {
    #[bits(8)]
    pub brand_index: u8,
    /// CLFLUSH line size in 8-byte units.
    #[bits(8)]
    pub clflush_line_size_8b: u8,
    /// Maximum number of addressable logical processor IDs in the package.
    #[bits(8)]
    pub max_logical_processor_ids: u8,
    #[bits(8)]
    pub initial_apic_id: u8,
}

impl Leaf1Ebx {
    #[inline]
    #[must_use]
    pub fn clflush_line_bytes(self) -> u16 {
        u16::from(self.clflush_line_size_8b()) * 8
    }
}

/// CPUID.01H:ECX feature flags.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf1Ecx {
    pub sse3: bool,      // 0
    pub pclmulqdq: bool, // 1
    pub dtes64: bool,    // 2
    pub monitor: bool,   // 3
    pub ds_cpl: bool,    // 4
    /// Virtual Machine Extensions.
    pub vmx: bool, // 5
    /// Safer Mode Extensions.
    pub smx: bool, // 6
    pub est: bool,       // 7
    pub tm2: bool,       // 8
    pub ssse3: bool,     // 9
    pub cnxt_id: bool,   // 10
    pub sdbg: bool,      // 11
    pub fma: bool,       // 12
    pub cmpxchg16b: bool, // 13
    pub xtpr: bool,      // 14
    pub pdcm: bool,      // 15
    _rsv16: bool,        // 16
    pub pcid: bool,      // 17
    pub dca: bool,       // 18
    pub sse4_1: bool,    // 19
    pub sse4_2: bool,    // 20
    pub x2apic: bool,    // 21
    pub movbe: bool,     // 22
    pub popcnt: bool,    // 23
    pub tsc_deadline: bool, // 24
    pub aes: bool,       // 25
    pub xsave: bool,     // 26
    /// OS has set CR4.OSXSAVE.
    pub osxsave: bool, // 27
    pub avx: bool,       // 28
    pub f16c: bool,      // 29
    pub rdrand: bool,    // 30
    /// Running under a hypervisor.
    pub hypervisor: bool, // 31
}

/// CPUID.01H:EDX feature flags.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf1Edx {
    pub fpu: bool,   // 0
    pub vme: bool,   // 1
    pub de: bool,    // 2
    pub pse: bool,   // 3
    pub tsc: bool,   // 4
    pub msr: bool,   // 5
    pub pae: bool,   // 6
    pub mce: bool,   // 7
    pub cx8: bool,   // 8
    pub apic: bool,  // 9
    _rsv10: bool,    // 10
    pub sep: bool,   // 11
    pub mtrr: bool,  // 12
    pub pge: bool,   // 13
    pub mca: bool,   // 14
    pub cmov: bool,  // 15
    pub pat: bool,   // 16
    pub pse36: bool, // 17
    pub psn: bool,   // 18
    pub clfsh: bool, // 19
    _rsv20: bool,    // 20
    pub ds: bool,    // 21
    pub acpi: bool,  // 22
    pub mmx: bool,   // 23
    pub fxsr: bool,  // 24
    pub sse: bool,   // 25
    pub sse2: bool,  // 26
    pub ss: bool,    // 27
    pub htt: bool,   // 28
    pub tm: bool,    // 29
    _rsv30: bool,    // 30
    pub pbe: bool,   // 31
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_family_and_model() {
        // Family 6, model 0x9E, stepping 10.
        let leaf = Leaf01h::from(CpuidResult::new(0x0009_06EA, 0x0210_0800, 0x7FFA_FBBF, 0xBFEB_FBFF));
        assert_eq!(leaf.family(), 6);
        assert_eq!(leaf.model(), 0x9E);
        assert_eq!(leaf.stepping(), 0x0A);
        assert_eq!(leaf.initial_apic_id(), 2);
        assert_eq!(leaf.ebx.clflush_line_bytes(), 64);
        assert!(leaf.has_vmx());
        assert!(leaf.edx.apic());
    }

    #[test]
    fn extended_family_only_for_0f() {
        let eax = Leaf1Eax::new().with_family(0x0F).with_ext_family(0x08);
        assert_eq!(eax.effective_family(), 0x17);
        let eax = Leaf1Eax::new().with_family(0x05).with_ext_family(0x08);
        assert_eq!(eax.effective_family(), 0x05);
    }
}
