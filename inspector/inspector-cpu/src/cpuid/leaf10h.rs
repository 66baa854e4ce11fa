use super::CpuidResult;

pub const LEAF_10H: u32 = 0x10;

/// CPUID.10H: RDT allocation enumeration.
///
/// | subleaf | record                                  |
/// |---------|-----------------------------------------|
/// | 0       | [`RdtEnumeration`]                      |
/// | 1, 2    | [`CacheAllocationEnumeration`] (L3, L2) |
/// | 3       | [`MemoryBandwidthEnumeration`]          |
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Leaf10h {
    Enumeration(RdtEnumeration),
    L3CacheAllocation(CacheAllocationEnumeration),
    L2CacheAllocation(CacheAllocationEnumeration),
    MemoryBandwidth(MemoryBandwidthEnumeration),
}

pub const SUBLEAF_L3_CAT: u32 = 1;
pub const SUBLEAF_L2_CAT: u32 = 2;
pub const SUBLEAF_MBA: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RdtEnumeration {
    pub l3_cache_allocation: bool,
    pub l2_cache_allocation: bool,
    pub memory_bandwidth_allocation: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheAllocationEnumeration {
    /// Capacity bitmask length, zero-based (EAX 4:0).
    pub capacity_mask_length_z: u8,
    /// Allocation units shared with other entities.
    pub isolation_map: u32,
    /// Code and Data Prioritization.
    pub cdp: bool,
    /// Highest class of service, zero-based (EDX 15:0).
    pub clos_number_z: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryBandwidthEnumeration {
    /// Maximum throttling value, zero-based (EAX 11:0).
    pub max_throttling_z: u16,
    pub linear_response: bool,
    pub clos_number_z: u16,
}

const fn low_u16(v: u32) -> u16 {
    let [lo, hi, ..] = v.to_le_bytes();
    u16::from_le_bytes([lo, hi])
}

impl Leaf10h {
    /// Returns `None` for subleaves beyond 3.
    #[must_use]
    pub const fn from_subleaf(subleaf: u32, r: CpuidResult) -> Option<Self> {
        let cat = CacheAllocationEnumeration {
            capacity_mask_length_z: r.eax.to_le_bytes()[0] & 0x1F,
            isolation_map: r.ebx,
            cdp: r.ecx & (1 << 2) != 0,
            clos_number_z: low_u16(r.edx),
        };
        let leaf = match subleaf {
            0 => Self::Enumeration(RdtEnumeration {
                l3_cache_allocation: r.ebx & (1 << 1) != 0,
                l2_cache_allocation: r.ebx & (1 << 2) != 0,
                memory_bandwidth_allocation: r.ebx & (1 << 3) != 0,
            }),
            SUBLEAF_L3_CAT => Self::L3CacheAllocation(cat),
            SUBLEAF_L2_CAT => Self::L2CacheAllocation(cat),
            SUBLEAF_MBA => Self::MemoryBandwidth(MemoryBandwidthEnumeration {
                max_throttling_z: low_u16(r.eax) & 0x0FFF,
                linear_response: r.ecx & (1 << 2) != 0,
                clos_number_z: low_u16(r.edx),
            }),
            _ => return None,
        };
        Some(leaf)
    }
}

impl CacheAllocationEnumeration {
    #[must_use]
    pub const fn capacity_mask_length(&self) -> u32 {
        self.capacity_mask_length_z as u32 + 1
    }

    #[must_use]
    pub const fn clos_number(&self) -> u32 {
        self.clos_number_z as u32 + 1
    }
}

impl MemoryBandwidthEnumeration {
    #[must_use]
    pub const fn max_throttling(&self) -> u32 {
        self.max_throttling_z as u32 + 1
    }

    #[must_use]
    pub const fn clos_number(&self) -> u32 {
        self.clos_number_z as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l3_cat_counts_are_one_based() {
        let Some(Leaf10h::L3CacheAllocation(cat)) =
            Leaf10h::from_subleaf(1, CpuidResult::new(0x0A, 0x600, 0x04, 0x0F))
        else {
            panic!("expected L3 CAT");
        };
        assert_eq!(cat.capacity_mask_length(), 11);
        assert_eq!(cat.clos_number(), 16);
        assert!(cat.cdp);
        assert_eq!(cat.isolation_map, 0x600);
    }

    #[test]
    fn enumeration_flags() {
        let Some(Leaf10h::Enumeration(e)) =
            Leaf10h::from_subleaf(0, CpuidResult::new(0, 0b1010, 0, 0))
        else {
            panic!("expected enumeration");
        };
        assert!(e.l3_cache_allocation);
        assert!(!e.l2_cache_allocation);
        assert!(e.memory_bandwidth_allocation);
    }
}
