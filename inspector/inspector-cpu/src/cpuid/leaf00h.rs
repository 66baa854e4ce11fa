use super::CpuidResult;

pub const LEAF_00H: u32 = 0x00;

/// CPUID.00H: highest basic leaf and the vendor identification string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf00h {
    pub max_leaf: u32,
    /// Vendor string as stored in EBX, EDX, ECX (e.g. `GenuineIntel`).
    pub vendor: [u8; 12],
}

impl Leaf00h {
    #[must_use]
    pub fn from(r: CpuidResult) -> Self {
        let mut vendor = [0u8; 12];
        for (chunk, reg) in vendor.chunks_exact_mut(4).zip([r.ebx, r.edx, r.ecx]) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        Self {
            max_leaf: r.eax,
            vendor,
        }
    }

    /// The vendor string with trailing NULs removed; non-ASCII bytes are
    /// replaced.
    #[must_use]
    pub fn vendor_str(&self) -> String {
        String::from_utf8_lossy(&self.vendor)
            .trim_end_matches('\0')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genuine_intel() {
        let leaf = Leaf00h::from(CpuidResult::new(0x1F, 0x756E_6547, 0x6C65_746E, 0x4965_6E69));
        assert_eq!(leaf.max_leaf, 0x1F);
        assert_eq!(leaf.vendor_str(), "GenuineIntel");
    }
}
