//! # CPUID and MSR decoding
//!
//! Maps `(leaf, subleaf)` pairs and MSR indices onto typed bitfield records.
//! Register values come from outside the process: CPUID results are parsed
//! from the output of the `cpuid -r` register-dump tool and MSRs are read
//! through `/dev/cpu/<n>/msr`. Both sources sit behind traits
//! ([`CpuidSource`], [`MsrReader`]) so offline dumps and tests can stand in.
//!
//! Capability predicates that span several MSRs (EPT, APIC virtualization)
//! take an [`MsrReader`] and re-read their sibling registers on every call.

pub mod caches;
pub mod clos;
pub mod cpuid;
mod error;
pub mod msr;

pub use caches::{CacheInfo, apic_id, enumerate_caches};
pub use clos::{CacheAllocation, ClosCapabilities, MemoryBandwidthAllocation};
pub use cpuid::{CpuidDump, CpuidLeaf, CpuidResult, CpuidSource, decode_leaf};
pub use error::CpuError;
pub use msr::{DevCpuMsr, Msr, MsrReader, MsrRegister};
