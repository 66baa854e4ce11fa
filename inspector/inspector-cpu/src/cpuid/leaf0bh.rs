use super::CpuidResult;

pub const LEAF_0BH: u32 = 0x0B;
/// V2 extended topology; same layout as 0x0B with more level types.
pub const LEAF_1FH: u32 = 0x1F;

/// CPUID.0BH / CPUID.1FH: extended topology enumeration, one subleaf per level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf0Bh {
    /// Right shift applied to the x2APIC ID to get the next level's ID.
    pub shift: u8,
    pub logical_processors: u16,
    pub level_number: u8,
    pub level_type: LevelType,
    pub x2apic_id: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LevelType {
    Invalid,
    Smt,
    Core,
    Module,
    Tile,
    Die,
    Reserved(u8),
}

impl From<u8> for LevelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Invalid,
            1 => Self::Smt,
            2 => Self::Core,
            3 => Self::Module,
            4 => Self::Tile,
            5 => Self::Die,
            other => Self::Reserved(other),
        }
    }
}

impl Leaf0Bh {
    #[must_use]
    pub fn from(r: CpuidResult) -> Self {
        let [shift, ..] = r.eax.to_le_bytes();
        let [lp_lo, lp_hi, ..] = r.ebx.to_le_bytes();
        let [level_number, level_type, ..] = r.ecx.to_le_bytes();
        Self {
            shift: shift & 0x1F,
            logical_processors: u16::from_le_bytes([lp_lo, lp_hi]),
            level_number,
            level_type: LevelType::from(level_type),
            x2apic_id: r.edx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_level() {
        let leaf = Leaf0Bh::from(CpuidResult::new(0x04, 0x0000_0010, 0x0000_0201, 0x13));
        assert_eq!(leaf.shift, 4);
        assert_eq!(leaf.logical_processors, 16);
        assert_eq!(leaf.level_number, 1);
        assert_eq!(leaf.level_type, LevelType::Core);
        assert_eq!(leaf.x2apic_id, 0x13);
    }
}
