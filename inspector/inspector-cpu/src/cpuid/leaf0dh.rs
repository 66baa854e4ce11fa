use super::CpuidResult;
use bitfield_struct::bitfield;

pub const LEAF_0DH: u32 = 0x0D;

/// CPUID.0DH: processor extended state enumeration.
///
/// Subleaf 0 reports the XCR0 bits and area sizes, subleaf 1 the XSAVE
/// extensions, and every later subleaf the size and offset of one state
/// component.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Leaf0Dh {
    Main(XSaveMain),
    Extensions(XSaveExtensions),
    Component { index: u32, size: u32, offset: u32 },
}

impl Leaf0Dh {
    #[must_use]
    pub const fn from_subleaf(subleaf: u32, r: CpuidResult) -> Self {
        match subleaf {
            0 => Self::Main(XSaveMain {
                xcr0_valid: ((r.edx as u64) << 32) | r.eax as u64,
                max_size_enabled: r.ebx,
                max_size_supported: r.ecx,
            }),
            1 => Self::Extensions(XSaveExtensions::from_bits(r.eax)),
            index => Self::Component {
                index,
                size: r.eax,
                offset: r.ebx,
            },
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct XSaveMain {
    /// Valid XCR0 bits (EDX:EAX).
    pub xcr0_valid: u64,
    /// Save area size required by the features enabled in XCR0.
    pub max_size_enabled: u32,
    /// Save area size required by all supported features.
    pub max_size_supported: u32,
}

impl XSaveMain {
    #[must_use]
    pub const fn legacy_x87(&self) -> bool {
        self.xcr0_valid & 1 != 0
    }

    #[must_use]
    pub const fn sse(&self) -> bool {
        self.xcr0_valid & (1 << 1) != 0
    }

    #[must_use]
    pub const fn avx(&self) -> bool {
        self.xcr0_valid & (1 << 2) != 0
    }
}

/// CPUID.(EAX=0DH, ECX=1):EAX.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct XSaveExtensions {
    pub xsaveopt: bool,
    pub xsavec: bool,
    pub xgetbv_ecx1: bool,
    pub xsaves: bool,
    #[bits(28)]
    _rsv4_31: u32,
}
