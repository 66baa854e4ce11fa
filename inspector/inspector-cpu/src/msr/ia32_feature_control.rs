use crate::msr::{Msr, MsrRegister};
use bitfield_struct::bitfield;

/// `IA32_FEATURE_CONTROL` (MSR `0x3A`).
///
/// Once `lock` is set the register is read-only until reset, so firmware
/// that locks it without enabling VMX outside SMX disables VMX for good.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ia32FeatureControl {
    /// Bit 0: Lock.
    pub lock: bool,
    /// Bit 1: Enable VMX inside SMX operation.
    pub vmx_inside_smx: bool,
    /// Bit 2: Enable VMX outside SMX operation.
    pub vmx_outside_smx: bool,
    #[bits(61)]
    _rsv3_63: u64,
}

impl Ia32FeatureControl {
    /// MSR index for `IA32_FEATURE_CONTROL`.
    pub const IA32_FEATURE_CONTROL: u32 = 0x3A;

    /// Locked with VMX outside SMX left disabled.
    #[inline]
    #[must_use]
    pub const fn disable_vmx(&self) -> bool {
        self.lock() && !self.vmx_outside_smx()
    }
}

impl MsrRegister for Ia32FeatureControl {
    const MSR: Msr = Msr::new(Self::IA32_FEATURE_CONTROL);

    fn from_raw(value: u64) -> Self {
        Self::from_bits(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_without_vmx_disables() {
        assert!(Ia32FeatureControl::from_bits(0b001).disable_vmx());
        assert!(!Ia32FeatureControl::from_bits(0b101).disable_vmx());
        assert!(!Ia32FeatureControl::from_bits(0b000).disable_vmx());
    }
}
