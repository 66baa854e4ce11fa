use crate::CpuError;
use crate::msr::{Msr, MsrReader, MsrRegister};
use bitfield_struct::bitfield;

/// `IA32_L3_QOS_CFG` (MSR `0xC81`).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ia32L3QosCfg {
    /// Bit 0: L3 Code and Data Prioritization enabled.
    pub cdp_enable: bool,
    #[bits(63)]
    _rsv1_63: u64,
}

impl Ia32L3QosCfg {
    pub const IA32_L3_QOS_CFG: u32 = 0xC81;
}

impl MsrRegister for Ia32L3QosCfg {
    const MSR: Msr = Msr::new(Self::IA32_L3_QOS_CFG);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

/// `IA32_L3_MASK_n` (MSR `0xC90 + n`), the capacity bitmask of class `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ia32L3Mask {
    pub class: u32,
    pub mask: u32,
}

impl Ia32L3Mask {
    pub const IA32_L3_MASK_0: u32 = 0xC90;
    /// Number of architecturally defined mask registers.
    pub const COUNT: u32 = 128;

    /// Index of the mask register for class `n`; out-of-range classes fall
    /// back to class 0.
    #[must_use]
    pub fn msr(n: u32) -> Msr {
        let n = if n >= Self::COUNT {
            log::debug!("IA32_L3_MASK_{n} is out of range; using IA32_L3_MASK_0");
            0
        } else {
            n
        };
        Msr::new(Self::IA32_L3_MASK_0 + n)
    }

    /// # Errors
    /// Whatever the reader reports.
    pub fn read(reader: &dyn MsrReader, cpu: u32, class: u32) -> Result<Self, CpuError> {
        let [a, b, c, d, ..] = reader.read_msr(cpu, Self::msr(class))?.to_le_bytes();
        Ok(Self {
            class,
            mask: u32::from_le_bytes([a, b, c, d]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msr::test_util::FakeMsrs;

    #[test]
    fn mask_index_and_fallback() {
        assert_eq!(Ia32L3Mask::msr(3), Msr::new(0xC93));
        assert_eq!(Ia32L3Mask::msr(128), Msr::new(0xC90));
    }

    #[test]
    fn mask_reads_low_dword() {
        let msrs = FakeMsrs::default().with(0, 0xC91, 0xFFFF_0000_0000_07FF);
        let mask = Ia32L3Mask::read(&msrs, 0, 1).expect("present");
        assert_eq!(mask.mask, 0x7FF);
        assert_eq!(mask.class, 1);
    }
}
