//! Processor capabilities from CPUID and MSRs.

use anyhow::{Context as _, Result, bail};
use inspector_cpu::cpuid::brand_string;
use inspector_cpu::msr::VmxFeatures;
use inspector_cpu::{
    ClosCapabilities, CpuidDump, CpuidSource, DevCpuMsr, MsrReader, apic_id, enumerate_caches,
};
use log::{info, warn};
use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;

/// Register dump of every logical CPU, from a file or the `cpuid` tool.
///
/// # Errors
/// If the tool cannot be run or its output does not parse.
pub fn read_dump(file: Option<&Path>) -> Result<CpuidDump> {
    let text = if let Some(file) = file {
        std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?
    } else {
        let output = Command::new("cpuid")
            .arg("-r")
            .output()
            .context("cannot run `cpuid -r`; is the cpuid tool installed?")?;
        if !output.status.success() {
            bail!("`cpuid -r` failed with {}", output.status);
        }
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    let dump = CpuidDump::parse(&text).context("cannot parse CPUID register dump")?;
    info!("CPUID data for {} CPUs", dump.cpus().len());
    Ok(dump)
}

pub fn render(out: &mut String, source: &dyn CpuidSource, msrs: &dyn MsrReader, cpu: u32) -> Result<()> {
    writeln!(out, "CPU {cpu}")?;
    if let Some(brand) = brand_string(source, cpu) {
        writeln!(out, "  brand {brand}")?;
    }
    let Some(apic) = apic_id(source, cpu) else {
        warn!("no CPUID data for CPU {cpu}");
        return Ok(());
    };
    writeln!(out, "  APIC ID {apic}")?;

    for cache in enumerate_caches(source, cpu, apic) {
        writeln!(
            out,
            "  L{} {:?} cache {} KiB, id {}",
            cache.level,
            cache.cache_type,
            cache.size() / 1024,
            cache.id
        )?;
    }

    let clos = ClosCapabilities::read(source, cpu);
    if let Some(l3) = clos.l3 {
        writeln!(
            out,
            "  L3 CAT: {} CLOS, {}-bit mask{}",
            l3.clos_number,
            l3.capacity_mask_length,
            if l3.cdp { ", CDP" } else { "" }
        )?;
    }
    if let Some(l2) = clos.l2 {
        writeln!(
            out,
            "  L2 CAT: {} CLOS, {}-bit mask{}",
            l2.clos_number,
            l2.capacity_mask_length,
            if l2.cdp { ", CDP" } else { "" }
        )?;
    }
    if let Some(mba) = clos.mba {
        writeln!(
            out,
            "  MBA: {} CLOS, max throttling {}{}",
            mba.clos_number,
            mba.max_throttling,
            if mba.linear_response { ", linear" } else { "" }
        )?;
    }
    if let Some(n) = clos.common_clos_number() {
        writeln!(out, "  common CLOS {n}")?;
    }

    match VmxFeatures::read(msrs, cpu) {
        Ok(vmx) => {
            for name in ["vmx_disabled", "ept", "apicv", "invvpid"] {
                if let Some(value) = vmx.get(name) {
                    writeln!(out, "  {name}: {value}")?;
                }
            }
        }
        Err(e) => warn!("VMX capabilities unknown: {e}"),
    }
    Ok(())
}

/// MSR reader rooted at `/dev/cpu`.
pub fn msr_reader() -> DevCpuMsr {
    DevCpuMsr::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_cpu::{CpuError, CpuidResult, Msr};

    struct NoMsrs;

    impl MsrReader for NoMsrs {
        fn read_msr(&self, cpu: u32, msr: Msr) -> Result<u64, CpuError> {
            Err(CpuError::MsrUnavailable { cpu, msr: msr.raw() })
        }
    }

    #[test]
    fn reports_apic_id_without_msrs() {
        let mut dump = CpuidDump::new();
        dump.insert(0, 0, 0, CpuidResult::new(1, 0x756E_6547, 0x6C65_746E, 0x4965_6E69));
        dump.insert(0, 1, 0, CpuidResult::new(0x0009_06EA, 0x0500_0800, 0, 0));
        let mut out = String::new();
        render(&mut out, &dump, &NoMsrs, 0).unwrap();
        assert!(out.contains("APIC ID 5"), "{out}");
    }

    #[test]
    fn missing_cpu_is_not_an_error() {
        let mut out = String::new();
        render(&mut out, &CpuidDump::new(), &NoMsrs, 3).unwrap();
        assert_eq!(out, "CPU 3\n");
    }
}
