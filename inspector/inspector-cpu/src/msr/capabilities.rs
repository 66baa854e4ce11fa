//! Capability predicates derived from several MSRs.
//!
//! None of these are cached: each call reads every register it depends on.

use crate::CpuError;
use crate::msr::{
    Ia32FeatureControl, MsrReader, MsrRegister, VmxCapability, VmxEntryCtls, VmxEptVpidCap,
    VmxExitCtls, VmxPinbasedCtls, VmxProcbasedCtls, VmxProcbasedCtls2,
};

/// EPT can be enabled: secondary controls may be activated and the
/// secondary "enable EPT" control may be 1.
///
/// # Errors
/// Whatever the reader reports.
pub fn ept_supported(reader: &dyn MsrReader, cpu: u32) -> Result<bool, CpuError> {
    let primary = VmxProcbasedCtls::read(reader, cpu)?;
    if !primary.allows_1_setting(VmxProcbasedCtls::ACTIVATE_SECONDARY_CONTROLS) {
        return Ok(false);
    }
    let secondary = VmxProcbasedCtls2::read(reader, cpu)?;
    Ok(secondary.allows_1_setting(VmxProcbasedCtls2::ENABLE_EPT))
}

/// APIC virtualization: TPR shadow plus virtualized APIC accesses and
/// x2APIC mode.
///
/// # Errors
/// Whatever the reader reports.
pub fn apicv_supported(reader: &dyn MsrReader, cpu: u32) -> Result<bool, CpuError> {
    let primary = VmxProcbasedCtls::read(reader, cpu)?;
    if !primary.allows_1_setting(VmxProcbasedCtls::USE_TPR_SHADOW) {
        return Ok(false);
    }
    let secondary = VmxProcbasedCtls2::read(reader, cpu)?;
    Ok(secondary.allows_1_setting(VmxProcbasedCtls2::VIRTUALIZE_APIC_ACCESSES)
        && secondary.allows_1_setting(VmxProcbasedCtls2::VIRTUALIZE_X2APIC_MODE))
}

/// # Errors
/// Whatever the reader reports.
pub fn invvpid_supported(reader: &dyn MsrReader, cpu: u32) -> Result<bool, CpuError> {
    Ok(VmxEptVpidCap::read(reader, cpu)?.invvpid())
}

/// Firmware locked `IA32_FEATURE_CONTROL` without enabling VMX.
///
/// # Errors
/// Whatever the reader reports.
pub fn vmx_disabled(reader: &dyn MsrReader, cpu: u32) -> Result<bool, CpuError> {
    Ok(Ia32FeatureControl::read(reader, cpu)?.disable_vmx())
}

/// Named VMX capabilities of one CPU, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmxFeatures {
    pub entries: Vec<(&'static str, bool)>,
}

impl VmxFeatures {
    /// Reads every VMX capability MSR and evaluates the flexible-setting
    /// queries followed by the derived predicates.
    ///
    /// # Errors
    /// The first reader error.
    pub fn read(reader: &dyn MsrReader, cpu: u32) -> Result<Self, CpuError> {
        let mut entries = Vec::new();
        flexible(&mut entries, &VmxPinbasedCtls::read(reader, cpu)?, VmxPinbasedCtls::REPORTED);
        flexible(&mut entries, &VmxProcbasedCtls::read(reader, cpu)?, VmxProcbasedCtls::REPORTED);
        flexible(&mut entries, &VmxProcbasedCtls2::read(reader, cpu)?, VmxProcbasedCtls2::REPORTED);
        flexible(&mut entries, &VmxExitCtls::read(reader, cpu)?, VmxExitCtls::REPORTED);
        flexible(&mut entries, &VmxEntryCtls::read(reader, cpu)?, VmxEntryCtls::REPORTED);

        let cap = VmxEptVpidCap::read(reader, cpu)?;
        entries.push(("ept_2mb_page", cap.ept_2mb_page()));
        entries.push(("ept_1gb_page", cap.ept_1gb_page()));
        entries.push(("invept", cap.invept()));
        entries.push(("invvpid", cap.invvpid()));
        entries.push(("ept", ept_supported(reader, cpu)?));
        entries.push(("apicv", apicv_supported(reader, cpu)?));
        entries.push(("vmx_disabled", vmx_disabled(reader, cpu)?));
        Ok(Self { entries })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }
}

fn flexible(out: &mut Vec<(&'static str, bool)>, msr: &dyn VmxCapability, controls: &[(&'static str, u32)]) {
    out.extend(
        controls
            .iter()
            .map(|&(name, bit)| (name, msr.allows_flexible_setting(bit))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msr::test_util::FakeMsrs;

    const SECONDARY: u64 = 1 << (32 + 31);
    const TPR_SHADOW: u64 = 1 << (32 + 21);

    #[test]
    fn ept_requires_secondary_controls() {
        let ctls2 = 1u64 << (32 + 1);
        let msrs = FakeMsrs::default().with(0, 0x482, SECONDARY).with(0, 0x48B, ctls2);
        assert!(ept_supported(&msrs, 0).expect("readable"));

        // Without the secondary-controls bit the secondary MSR is never consulted.
        let msrs = FakeMsrs::default().with(0, 0x482, 0);
        assert!(!ept_supported(&msrs, 0).expect("readable"));
    }

    #[test]
    fn apicv_reads_both_processor_based_msrs() {
        let ctls2 = (1u64 << 32) | (1 << (32 + 4));
        let msrs = FakeMsrs::default().with(0, 0x482, TPR_SHADOW).with(0, 0x48B, ctls2);
        assert!(apicv_supported(&msrs, 0).expect("readable"));

        let only_vapic = FakeMsrs::default().with(0, 0x482, TPR_SHADOW).with(0, 0x48B, 1 << 32);
        assert!(!apicv_supported(&only_vapic, 0).expect("readable"));
    }

    #[test]
    fn predicates_follow_sibling_changes() {
        let mut msrs = FakeMsrs::default().with(0, 0x482, SECONDARY).with(0, 0x48B, 0);
        assert!(!ept_supported(&msrs, 0).expect("readable"));
        msrs.0.insert((0, 0x48B), 1 << 33);
        assert!(ept_supported(&msrs, 0).expect("readable"));
    }

    #[test]
    fn missing_sibling_is_an_error() {
        let msrs = FakeMsrs::default().with(0, 0x482, SECONDARY);
        assert!(matches!(
            ept_supported(&msrs, 0),
            Err(CpuError::MsrUnavailable { cpu: 0, msr: 0x48B })
        ));
    }

    #[test]
    fn feature_report_lists_flexible_controls() {
        let flexible_ept = 1u64 << 33;
        let msrs = FakeMsrs::default()
            .with(0, 0x481, 0)
            .with(0, 0x482, SECONDARY)
            .with(0, 0x48B, flexible_ept)
            .with(0, 0x483, 0)
            .with(0, 0x484, 0)
            .with(0, 0x48C, (1 << 32) | (1 << 41) | (1 << 42))
            .with(0, 0x3A, 0b101);
        let features = VmxFeatures::read(&msrs, 0).expect("all present");
        assert_eq!(features.get("vmx_procbased_ctls2_ept"), Some(true));
        assert_eq!(features.get("vmx_procbased_ctls_secondary"), Some(true));
        assert_eq!(features.get("vmx_pinbased_ctls_irq_exit"), Some(false));
        assert_eq!(features.get("invvpid"), Some(true));
        assert_eq!(features.get("ept"), Some(true));
        assert_eq!(features.get("vmx_disabled"), Some(false));
        assert_eq!(features.get("nonexistent"), None);
    }
}
