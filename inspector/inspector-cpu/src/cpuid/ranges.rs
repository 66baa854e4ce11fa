use super::{CpuidSource, LEAF_00H, LEAF_8000_0000H, Leaf00h};

/// Highest basic and extended leaves plus the vendor, read once per CPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CpuidRanges {
    pub max_basic: u32,
    pub max_extended: u32,
    pub vendor: CpuVendor,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CpuVendor {
    Intel,
    Amd,
    Other,
}

impl CpuidRanges {
    /// Reads leaves 0x0 and 0x8000_0000. Returns `None` if the source knows
    /// nothing about leaf 0 for this CPU.
    pub fn read(source: &dyn CpuidSource, cpu: u32) -> Option<Self> {
        let basic = Leaf00h::from(source.cpuid(cpu, LEAF_00H, 0)?);
        let vendor = match basic.vendor_str().as_str() {
            "GenuineIntel" => CpuVendor::Intel,
            "AuthenticAMD" => CpuVendor::Amd,
            _ => CpuVendor::Other,
        };
        let max_extended = source
            .cpuid(cpu, LEAF_8000_0000H, 0)
            .map_or(0, |r| r.eax);
        Some(Self {
            max_basic: basic.max_leaf,
            max_extended,
            vendor,
        })
    }

    #[inline]
    #[must_use]
    pub const fn has_basic(&self, leaf: u32) -> bool {
        leaf <= self.max_basic
    }

    #[inline]
    #[must_use]
    pub const fn has_ext(&self, leaf: u32) -> bool {
        leaf >= 0x8000_0000 && leaf <= self.max_extended
    }

    /// Whether `leaf` lies in either supported range.
    #[must_use]
    pub const fn has(&self, leaf: u32) -> bool {
        if leaf >= 0x8000_0000 {
            self.has_ext(leaf)
        } else {
            self.has_basic(leaf)
        }
    }
}

impl CpuVendor {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CpuVendor::Intel => "Intel",
            CpuVendor::Amd => "AMD",
            CpuVendor::Other => "Other",
        }
    }
}
