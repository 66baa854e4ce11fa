use super::CpuidResult;

pub const LEAF_8000_0007H: u32 = 0x8000_0007;

/// CPUID.8000_0007H: invariant TSC.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf80000007h {
    pub invariant_tsc: bool,
}

impl Leaf80000007h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            invariant_tsc: r.edx & (1 << 8) != 0,
        }
    }
}
