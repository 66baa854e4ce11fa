use super::{CpuidResult, CpuidSource};

pub const LEAF_BRAND_FIRST: u32 = 0x8000_0002;
pub const LEAF_BRAND_LAST: u32 = 0x8000_0004;

/// Sixteen bytes of the processor brand string, from one of
/// CPUID.8000_0002H through 8000_0004H.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BrandFragment(pub [u8; 16]);

impl BrandFragment {
    #[must_use]
    pub fn from(r: CpuidResult) -> Self {
        Self(r.to_le_bytes())
    }
}

/// Assembles the brand string from its three fragments.
///
/// Trailing NULs and surrounding spaces are removed. Returns `None` if any
/// fragment is missing.
pub fn brand_string(source: &dyn CpuidSource, cpu: u32) -> Option<String> {
    let mut bytes = Vec::with_capacity(48);
    for leaf in LEAF_BRAND_FIRST..=LEAF_BRAND_LAST {
        bytes.extend_from_slice(&BrandFragment::from(source.cpuid(cpu, leaf, 0)?).0);
    }
    let text = String::from_utf8_lossy(&bytes);
    Some(text.trim_end_matches('\0').trim().to_string())
}
