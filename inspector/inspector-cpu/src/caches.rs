//! Cache hierarchy enumeration through CPUID leaf 0x04.

use crate::cpuid::{
    CacheType, CpuidRanges, CpuidSource, LEAF_01H, LEAF_04H, LEAF_0BH, Leaf01h, Leaf04h, Leaf0Bh,
};

/// Upper bound on leaf 0x04 subleaves probed per CPU.
const MAX_CACHE_SUBLEAVES: u32 = 32;

/// One cache as seen from a logical processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub level: u8,
    pub cache_type: CacheType,
    /// APIC ID with the bits of the sharing processors shifted out; equal for
    /// all processors sharing this cache.
    pub id: u32,
    pub parameters: Leaf04h,
}

impl CacheInfo {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.parameters.cache_size()
    }
}

/// APIC ID of `cpu`: the x2APIC ID from leaf 0x0B when available, the
/// initial APIC ID from leaf 0x01 otherwise.
pub fn apic_id(source: &dyn CpuidSource, cpu: u32) -> Option<u32> {
    let ranges = CpuidRanges::read(source, cpu)?;
    if ranges.has_basic(LEAF_0BH)
        && let Some(r) = source.cpuid(cpu, LEAF_0BH, 0)
    {
        return Some(Leaf0Bh::from(r).x2apic_id);
    }
    let r = source.cpuid(cpu, LEAF_01H, 0)?;
    Some(u32::from(Leaf01h::from(r).initial_apic_id()))
}

/// Walks the leaf 0x04 subleaves of `cpu` until the null cache type.
#[must_use]
pub fn enumerate_caches(source: &dyn CpuidSource, cpu: u32, apic_id: u32) -> Vec<CacheInfo> {
    let mut caches = Vec::new();
    for subleaf in 0..MAX_CACHE_SUBLEAVES {
        let Some(r) = source.cpuid(cpu, LEAF_04H, subleaf) else {
            break;
        };
        let parameters = Leaf04h::from(r);
        let cache_type = parameters.cache_type();
        if cache_type == CacheType::Null {
            break;
        }
        let shift = parameters.max_logical_processors_sharing().ilog2();
        caches.push(CacheInfo {
            level: parameters.level(),
            cache_type,
            id: apic_id.checked_shr(shift).unwrap_or(0),
            parameters,
        });
    }
    caches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpuid::{CpuidDump, CpuidResult, Leaf4Eax};

    fn cache(kind: u8, level: u8, sharing_z: u16) -> CpuidResult {
        let eax = Leaf4Eax::new()
            .with_cache_type_id(kind)
            .with_cache_level(level)
            .with_max_sharing_z(sharing_z);
        CpuidResult::new(eax.into_bits(), 0x01C0_003F, 0x3F, 0)
    }

    #[test]
    fn stops_at_null_type_and_derives_ids() {
        let mut dump = CpuidDump::new();
        dump.insert(0, LEAF_04H, 0, cache(1, 1, 1));
        dump.insert(0, LEAF_04H, 1, cache(3, 2, 7));
        dump.insert(0, LEAF_04H, 2, CpuidResult::default());
        dump.insert(0, LEAF_04H, 3, cache(3, 3, 15));

        let caches = enumerate_caches(&dump, 0, 0x0B);
        assert_eq!(caches.len(), 2);
        assert_eq!(caches[0].cache_type, CacheType::Data);
        assert_eq!(caches[0].id, 0x05);
        assert_eq!(caches[1].level, 2);
        assert_eq!(caches[1].id, 0x01);
        assert_eq!(caches[1].size(), 8 * 64 * 64);
    }
}
