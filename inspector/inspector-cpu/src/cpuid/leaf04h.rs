use super::CpuidResult;
use bitfield_struct::bitfield;

pub const LEAF_04H: u32 = 0x04;

/// CPUID.04H: deterministic cache parameters, one subleaf per cache.
///
/// Most counts are stored zero-based; the accessor methods add one.
/// Enumeration ends at the first subleaf whose cache type is
/// [`CacheType::Null`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf04h {
    pub eax: Leaf4Eax,
    pub ebx: Leaf4Ebx,
    /// Number of sets, zero-based.
    pub sets_z: u32,
    pub edx: Leaf4Edx,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheType {
    Null,
    Data,
    Instruction,
    Unified,
    Reserved(u8),
}

impl From<u8> for CacheType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::Data,
            2 => Self::Instruction,
            3 => Self::Unified,
            other => Self::Reserved(other),
        }
    }
}

impl CacheType {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Data => 1,
            Self::Instruction => 2,
            Self::Unified => 3,
            Self::Reserved(v) => v,
        }
    }
}

impl Leaf04h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        Self {
            eax: Leaf4Eax::from_bits(r.eax),
            ebx: Leaf4Ebx::from_bits(r.ebx),
            sets_z: r.ecx,
            edx: Leaf4Edx::from_bits(r.edx),
        }
    }

    #[must_use]
    pub fn cache_type(&self) -> CacheType {
        CacheType::from(self.eax.cache_type_id())
    }

    #[must_use]
    pub const fn level(&self) -> u8 {
        self.eax.cache_level()
    }

    #[must_use]
    pub fn line_size(&self) -> u32 {
        u32::from(self.ebx.line_size_z()) + 1
    }

    #[must_use]
    pub fn partitions(&self) -> u32 {
        u32::from(self.ebx.partitions_z()) + 1
    }

    #[must_use]
    pub fn ways(&self) -> u32 {
        u32::from(self.ebx.ways_z()) + 1
    }

    #[must_use]
    pub fn sets(&self) -> u64 {
        u64::from(self.sets_z) + 1
    }

    /// Maximum number of addressable logical processor IDs sharing the cache.
    #[must_use]
    pub fn max_logical_processors_sharing(&self) -> u32 {
        u32::from(self.eax.max_sharing_z()) + 1
    }

    #[must_use]
    pub fn max_cores_sharing(&self) -> u32 {
        u32::from(self.eax.max_cores_z()) + 1
    }

    /// Size in bytes: ways x partitions x line size x sets.
    #[must_use]
    pub fn cache_size(&self) -> u64 {
        u64::from(self.ways()) * u64::from(self.partitions()) * u64::from(self.line_size()) * self.sets()
    }
}

/// CPUID.04H:EAX.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf4Eax {
    /// Cache type (bits 4:0).
    #[bits(5)]
    pub cache_type_id: u8,
    /// Cache level starting at 1 (bits 7:5).
    #[bits(3)]
    pub cache_level: u8,
    pub self_initializing: bool,
    pub fully_associative: bool,
    #[bits(4)]
    _rsv10_13: u8,
    /// Addressable logical processor IDs sharing this cache, zero-based (bits 25:14).
    #[bits(12)]
    pub max_sharing_z: u16,
    /// Addressable core IDs in the package, zero-based (bits 31:26).
    #[bits(6)]
    pub max_cores_z: u8,
}

/// CPUID.04H:EBX.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf4Ebx {
    #[bits(12)]
    pub line_size_z: u16,
    #[bits(10)]
    pub partitions_z: u16,
    #[bits(10)]
    pub ways_z: u16,
}

/// CPUID.04H:EDX.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Leaf4Edx {
    /// WBINVD/INVD does not act on lower-level caches of sharing threads.
    pub write_back_invalidate: bool,
    /// Cache is inclusive of lower levels.
    pub inclusive: bool,
    pub complex_indexing: bool,
    #[bits(29)]
    _rsv3_31: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_cache_geometry() {
        // Unified L2, 4 ways, 1 partition, 64-byte lines, 1024 sets.
        let eax = Leaf4Eax::new()
            .with_cache_type_id(3)
            .with_cache_level(2)
            .with_self_initializing(true)
            .with_max_sharing_z(1);
        let ebx = Leaf4Ebx::new().with_line_size_z(63).with_ways_z(3);
        let leaf = Leaf04h::from(CpuidResult::new(eax.into_bits(), ebx.into_bits(), 1023, 0));
        assert_eq!(leaf.cache_type(), CacheType::Unified);
        assert_eq!(leaf.level(), 2);
        assert_eq!(leaf.cache_size(), 4 * 64 * 1024);
        assert_eq!(leaf.max_logical_processors_sharing(), 2);
    }

    #[test]
    fn null_terminates() {
        assert_eq!(Leaf04h::from(CpuidResult::default()).cache_type(), CacheType::Null);
    }
}
