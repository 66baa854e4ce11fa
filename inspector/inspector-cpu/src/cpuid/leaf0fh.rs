use super::CpuidResult;

pub const LEAF_0FH: u32 = 0x0F;

/// CPUID.0FH: RDT monitoring enumeration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Leaf0Fh {
    /// Subleaf 0: resource types that support monitoring.
    Enumeration(MonitoringEnumeration),
    /// Subleaf 1: L3 cache monitoring.
    L3(L3Monitoring),
    /// Later subleaves carry no fields yet.
    Reserved { subleaf: u32, raw: CpuidResult },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MonitoringEnumeration {
    /// Highest RMID of any resource type, zero-based.
    pub max_rmid_z: u32,
    pub l3_monitoring: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct L3Monitoring {
    /// Converts an `IA32_QM_CTR` reading to bytes.
    pub conversion_factor: u32,
    pub max_rmid_z: u32,
    pub occupancy_monitoring: bool,
}

impl Leaf0Fh {
    #[must_use]
    pub const fn from_subleaf(subleaf: u32, r: CpuidResult) -> Self {
        match subleaf {
            0 => Self::Enumeration(MonitoringEnumeration {
                max_rmid_z: r.ebx,
                l3_monitoring: r.edx & (1 << 1) != 0,
            }),
            1 => Self::L3(L3Monitoring {
                conversion_factor: r.ebx,
                max_rmid_z: r.ecx,
                occupancy_monitoring: r.edx & 1 != 0,
            }),
            _ => Self::Reserved { subleaf, raw: r },
        }
    }
}

impl MonitoringEnumeration {
    #[must_use]
    pub const fn max_rmid(&self) -> u64 {
        self.max_rmid_z as u64 + 1
    }
}

impl L3Monitoring {
    #[must_use]
    pub const fn max_rmid(&self) -> u64 {
        self.max_rmid_z as u64 + 1
    }
}
