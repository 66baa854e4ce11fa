//! # Model-Specific Registers
//!
//! Typed views of the MSRs the board report needs. Every register type
//! carries its index as an associated constant (see [`MsrRegister`]) and
//! is read through an [`MsrReader`], which abstracts over the device file
//! `/dev/cpu/<n>/msr` (index = file offset, eight little-endian bytes).
//!
//! ## References
//! - Intel SDM Vol. 4, "Model-Specific Registers"
//! - Intel SDM Vol. 3D, Appendix A "VMX Capability Reporting Facility"

mod capabilities;
mod hwp;
mod ia32_feature_control;
mod ia32_misc_enable;
mod rdt;
mod turbo;
mod vmx;
mod vmx_info;

pub use capabilities::{VmxFeatures, apicv_supported, ept_supported, invvpid_supported, vmx_disabled};
pub use hwp::{Ia32HwpCapabilities, Ia32PmEnable};
pub use ia32_feature_control::Ia32FeatureControl;
pub use ia32_misc_enable::Ia32MiscEnable;
pub use rdt::{Ia32L3Mask, Ia32L3QosCfg};
pub use turbo::{TurboActivationRatio, TurboRatioLimit};
pub use vmx::{
    VmxCapability, VmxEntryCtls, VmxExitCtls, VmxPinbasedCtls, VmxProcbasedCtls,
    VmxProcbasedCtls2,
};
pub use vmx_info::{VmxBasic, VmxEptVpidCap, VmxMisc};

use crate::CpuError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Identifies a **Model-Specific Register (MSR)** by its architectural index.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msr(pub u32);

impl Msr {
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying raw MSR index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Reads raw 64-bit MSR values for a logical CPU.
pub trait MsrReader {
    /// # Errors
    /// Implementation specific; [`DevCpuMsr`] reports a missing device file as
    /// [`CpuError::Io`] and an unreadable index as [`CpuError::MsrUnavailable`].
    fn read_msr(&self, cpu: u32, msr: Msr) -> Result<u64, CpuError>;
}

/// A register type bound to a fixed MSR index.
pub trait MsrRegister: Sized {
    const MSR: Msr;

    fn from_raw(value: u64) -> Self;

    /// Reads and decodes the register on `cpu`.
    ///
    /// # Errors
    /// Whatever the reader reports.
    fn read(reader: &dyn MsrReader, cpu: u32) -> Result<Self, CpuError> {
        reader.read_msr(cpu, Self::MSR).map(Self::from_raw)
    }
}

/// MSR access through the Linux `msr` driver.
#[derive(Debug, Clone)]
pub struct DevCpuMsr {
    root: PathBuf,
}

impl Default for DevCpuMsr {
    fn default() -> Self {
        Self::new("/dev/cpu")
    }
}

impl DevCpuMsr {
    /// `root` is the directory holding the per-CPU `<n>/msr` files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn device(&self, cpu: u32) -> PathBuf {
        self.root.join(cpu.to_string()).join("msr")
    }
}

impl MsrReader for DevCpuMsr {
    fn read_msr(&self, cpu: u32, msr: Msr) -> Result<u64, CpuError> {
        let path = self.device(cpu);
        let mut file = File::open(&path).map_err(|source| {
            log::error!(
                "cannot open {}; is CONFIG_X86_MSR enabled and the msr module loaded?",
                path.display()
            );
            CpuError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let mut buf = [0u8; 8];
        file.seek(SeekFrom::Start(u64::from(msr.raw())))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|_| CpuError::MsrUnavailable {
                cpu,
                msr: msr.raw(),
            })?;
        Ok(u64::from_le_bytes(buf))
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::{Msr, MsrReader};
    use crate::CpuError;
    use std::collections::BTreeMap;

    /// In-memory MSR values for one or more CPUs.
    #[derive(Default)]
    pub struct FakeMsrs(pub BTreeMap<(u32, u32), u64>);

    impl FakeMsrs {
        pub fn with(mut self, cpu: u32, msr: u32, value: u64) -> Self {
            self.0.insert((cpu, msr), value);
            self
        }
    }

    impl MsrReader for FakeMsrs {
        fn read_msr(&self, cpu: u32, msr: Msr) -> Result<u64, CpuError> {
            self.0
                .get(&(cpu, msr.raw()))
                .copied()
                .ok_or(CpuError::MsrUnavailable { cpu, msr: msr.raw() })
        }
    }
}
