//! Typed CPUID leaves.
//!
//! [`decode_leaf`] is the single dispatch point: it maps a `(leaf, subleaf)`
//! pair plus the raw registers onto one of the record types below. Leaves
//! 0x0D, 0x0F and 0x10 change their layout with the subleaf, so the dispatch
//! looks at both numbers. Anything not listed decodes to `None`.

mod brand;
mod dump;
mod leaf00h;
mod leaf01h;
mod leaf04h;
mod leaf06h;
mod leaf07h;
mod leaf0bh;
mod leaf0dh;
mod leaf0fh;
mod leaf10h;
mod leaf1ah;
mod leaf80000001h;
mod leaf80000007h;
mod leaf80000008h;
mod ranges;

pub use brand::{BrandFragment, LEAF_BRAND_FIRST, LEAF_BRAND_LAST, brand_string};
pub use dump::CpuidDump;
pub use leaf00h::{LEAF_00H, Leaf00h};
pub use leaf01h::{LEAF_01H, Leaf01h, Leaf1Eax, Leaf1Ebx, Leaf1Ecx, Leaf1Edx};
pub use leaf04h::{CacheType, LEAF_04H, Leaf04h, Leaf4Eax, Leaf4Ebx, Leaf4Edx};
pub use leaf06h::{LEAF_06H, Leaf06h, Leaf6Eax, Leaf6Ecx, Leaf6Edx};
pub use leaf07h::{LEAF_07H, Leaf07h, Leaf7Ebx, Leaf7Ecx, Leaf7Edx};
pub use leaf0bh::{LEAF_0BH, LEAF_1FH, Leaf0Bh, LevelType};
pub use leaf0dh::{LEAF_0DH, Leaf0Dh, XSaveExtensions, XSaveMain};
pub use leaf0fh::{LEAF_0FH, L3Monitoring, Leaf0Fh, MonitoringEnumeration};
pub use leaf10h::{
    CacheAllocationEnumeration, LEAF_10H, Leaf10h, MemoryBandwidthEnumeration, RdtEnumeration,
    SUBLEAF_L2_CAT, SUBLEAF_L3_CAT, SUBLEAF_MBA,
};
pub use leaf1ah::{CoreType, LEAF_1AH, Leaf1Ah};
pub use leaf80000001h::{Ext1Ecx, Ext1Edx, LEAF_8000_0000H, LEAF_8000_0001H, Leaf80000001h};
pub use leaf80000007h::{LEAF_8000_0007H, Leaf80000007h};
pub use leaf80000008h::{LEAF_8000_0008H, Leaf80000008h};
pub use ranges::{CpuVendor, CpuidRanges};

/// The four registers returned by one CPUID invocation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidResult {
    #[must_use]
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    /// The registers in `eax, ebx, ecx, edx` order as little-endian bytes.
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, reg) in out
            .chunks_exact_mut(4)
            .zip([self.eax, self.ebx, self.ecx, self.edx])
        {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        out
    }
}

/// Something that can answer CPUID queries for a given logical CPU.
pub trait CpuidSource {
    /// Returns the raw registers, or `None` if the source has no data for
    /// this `(cpu, leaf, subleaf)` triple.
    fn cpuid(&self, cpu: u32, leaf: u32, subleaf: u32) -> Option<CpuidResult>;
}

/// A decoded leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuidLeaf {
    Basic(Leaf00h),
    Version(Leaf01h),
    CacheParameters(Leaf04h),
    ThermalPower(Leaf06h),
    ExtendedFeatures(Leaf07h),
    Topology(Leaf0Bh),
    XSave(Leaf0Dh),
    Monitoring(Leaf0Fh),
    Allocation(Leaf10h),
    Hybrid(Leaf1Ah),
    MaxExtended(u32),
    ExtendedSignature(Leaf80000001h),
    Brand(BrandFragment),
    PowerManagement(Leaf80000007h),
    AddressSizes(Leaf80000008h),
}

/// Decodes the registers of `(leaf, subleaf)`.
///
/// Leaves without subleaves ignore `subleaf`. Returns `None` for pairs that
/// have no record type.
#[must_use]
pub fn decode_leaf(leaf: u32, subleaf: u32, r: CpuidResult) -> Option<CpuidLeaf> {
    let decoded = match leaf {
        LEAF_00H => CpuidLeaf::Basic(Leaf00h::from(r)),
        LEAF_01H => CpuidLeaf::Version(Leaf01h::from(r)),
        LEAF_04H => CpuidLeaf::CacheParameters(Leaf04h::from(r)),
        LEAF_06H => CpuidLeaf::ThermalPower(Leaf06h::from(r)),
        LEAF_07H if subleaf == 0 => CpuidLeaf::ExtendedFeatures(Leaf07h::from(r)),
        LEAF_0BH | LEAF_1FH => CpuidLeaf::Topology(Leaf0Bh::from(r)),
        LEAF_0DH => CpuidLeaf::XSave(Leaf0Dh::from_subleaf(subleaf, r)),
        LEAF_0FH => CpuidLeaf::Monitoring(Leaf0Fh::from_subleaf(subleaf, r)),
        LEAF_10H => CpuidLeaf::Allocation(Leaf10h::from_subleaf(subleaf, r)?),
        LEAF_1AH => CpuidLeaf::Hybrid(Leaf1Ah::from(r)),
        LEAF_8000_0000H => CpuidLeaf::MaxExtended(r.eax),
        LEAF_8000_0001H => CpuidLeaf::ExtendedSignature(Leaf80000001h::from(r)),
        LEAF_BRAND_FIRST..=LEAF_BRAND_LAST => CpuidLeaf::Brand(BrandFragment::from(r)),
        LEAF_8000_0007H => CpuidLeaf::PowerManagement(Leaf80000007h::from(r)),
        LEAF_8000_0008H => CpuidLeaf::AddressSizes(Leaf80000008h::from(r)),
        _ => return None,
    };
    Some(decoded)
}

/// Queries `source` and decodes the result.
pub fn read_leaf(
    source: &dyn CpuidSource,
    cpu: u32,
    leaf: u32,
    subleaf: u32,
) -> Option<CpuidLeaf> {
    let r = source.cpuid(cpu, leaf, subleaf)?;
    decode_leaf(leaf, subleaf, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_leaves_have_no_record() {
        let r = CpuidResult::new(1, 2, 3, 4);
        assert_eq!(decode_leaf(0x05, 0, r), None);
        assert_eq!(decode_leaf(0x4000_0000, 0, r), None);
        assert_eq!(decode_leaf(LEAF_07H, 1, r), None);
        assert_eq!(decode_leaf(LEAF_10H, 4, r), None);
    }

    #[test]
    fn subleaf_selects_layout() {
        let r = CpuidResult::new(0x0000_0007, 0x0000_0240, 0x0000_0340, 0);
        assert!(matches!(
            decode_leaf(LEAF_0DH, 0, r),
            Some(CpuidLeaf::XSave(Leaf0Dh::Main(_)))
        ));
        assert!(matches!(
            decode_leaf(LEAF_0DH, 1, r),
            Some(CpuidLeaf::XSave(Leaf0Dh::Extensions(_)))
        ));
        assert!(matches!(
            decode_leaf(LEAF_0DH, 2, r),
            Some(CpuidLeaf::XSave(Leaf0Dh::Component { index: 2, size: 7, offset: 0x240 }))
        ));
    }

    #[test]
    fn topology_leaves_share_layout() {
        let r = CpuidResult::new(1, 2, 0x0000_0100, 5);
        assert_eq!(decode_leaf(LEAF_0BH, 0, r), decode_leaf(LEAF_1FH, 0, r));
    }

    #[test]
    fn register_bytes_are_little_endian() {
        let r = CpuidResult::new(0x6C65_746E, 0, 0, 0);
        assert_eq!(&r.to_le_bytes()[..4], b"ntel");
    }
}
