//! Class of Service (CLOS) capabilities from CPUID leaf 0x10.

use crate::cpuid::{
    CacheAllocationEnumeration, CpuidSource, LEAF_10H, Leaf10h, SUBLEAF_L2_CAT, SUBLEAF_L3_CAT,
    SUBLEAF_MBA,
};

/// Cache Allocation Technology parameters of one cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheAllocation {
    pub capacity_mask_length: u32,
    pub clos_number: u32,
    /// Code and Data Prioritization.
    pub cdp: bool,
}

/// Memory Bandwidth Allocation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBandwidthAllocation {
    pub max_throttling: u32,
    pub clos_number: u32,
    pub linear_response: bool,
}

/// The allocation features a CPU enumerates; absent features are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosCapabilities {
    pub l3: Option<CacheAllocation>,
    pub l2: Option<CacheAllocation>,
    pub mba: Option<MemoryBandwidthAllocation>,
}

impl From<CacheAllocationEnumeration> for CacheAllocation {
    fn from(e: CacheAllocationEnumeration) -> Self {
        Self {
            capacity_mask_length: e.capacity_mask_length(),
            clos_number: e.clos_number(),
            cdp: e.cdp,
        }
    }
}

impl ClosCapabilities {
    /// Reads subleaf 0 and then only the subleaves it advertises.
    pub fn read(source: &dyn CpuidSource, cpu: u32) -> Self {
        let query = |subleaf| {
            source
                .cpuid(cpu, LEAF_10H, subleaf)
                .and_then(|r| Leaf10h::from_subleaf(subleaf, r))
        };
        let Some(Leaf10h::Enumeration(features)) = query(0) else {
            return Self::default();
        };

        let mut caps = Self::default();
        if features.l3_cache_allocation
            && let Some(Leaf10h::L3CacheAllocation(e)) = query(SUBLEAF_L3_CAT)
        {
            caps.l3 = Some(e.into());
        }
        if features.l2_cache_allocation
            && let Some(Leaf10h::L2CacheAllocation(e)) = query(SUBLEAF_L2_CAT)
        {
            caps.l2 = Some(e.into());
        }
        if features.memory_bandwidth_allocation
            && let Some(Leaf10h::MemoryBandwidth(e)) = query(SUBLEAF_MBA)
        {
            caps.mba = Some(MemoryBandwidthAllocation {
                max_throttling: e.max_throttling(),
                clos_number: e.clos_number(),
                linear_response: e.linear_response,
            });
        }
        caps
    }

    /// Whether any allocation feature is present.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.l3.is_some() || self.l2.is_some() || self.mba.is_some()
    }

    /// Number of classes usable by every present feature.
    #[must_use]
    pub fn common_clos_number(&self) -> Option<u32> {
        [
            self.l3.map(|c| c.clos_number),
            self.l2.map(|c| c.clos_number),
            self.mba.map(|m| m.clos_number),
        ]
        .into_iter()
        .flatten()
        .min()
    }
}
