use super::CpuidResult;

pub const LEAF_8000_0008H: u32 = 0x8000_0008;

/// CPUID.8000_0008H: physical and linear address widths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf80000008h {
    pub physical_address_bits: u8,
    pub linear_address_bits: u8,
}

impl Leaf80000008h {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        let [physical_address_bits, linear_address_bits, ..] = r.eax.to_le_bytes();
        Self {
            physical_address_bits,
            linear_address_bits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        let leaf = Leaf80000008h::from(CpuidResult::new(0x3027, 0, 0, 0));
        assert_eq!(leaf.physical_address_bits, 39);
        assert_eq!(leaf.linear_address_bits, 48);
    }
}
