//! # PCI Configuration Space
//!
//! Decodes a raw configuration-space blob (256 bytes for conventional devices,
//! 4096 for PCI Express) as read from `/sys/bus/pci/devices/*/config`.
//!
//! ```text
//! 0x000 ┌──────────────────────┐
//!       │ header (type 0 / 1)  │── capability pointer ─┐
//! 0x040 ├──────────────────────┤                       │
//!       │ capability structures│◄──────────────────────┘  {id, next} chain
//! 0x100 ├──────────────────────┤
//!       │ extended capabilities│  {id:16, version:4, next:12} chain
//! 0x1000└──────────────────────┘
//! ```
//!
//! The extended chain is only walked when the legacy chain contains a PCI
//! Express capability and the blob reaches past offset 0x100 plus one header.
//! Both walks stop on a repeated pointer, so corrupted chains cannot loop.

pub mod caps;
mod error;
pub mod extended;
mod header;

pub use caps::{Capability, CapabilityBody};
pub use error::PciError;
pub use extended::ExtendedCapability;
pub use header::{Bar, BridgeHeader, CommonHeader, EndpointHeader, Header, HeaderKind};

/// Minimum blob size that covers the extended capability list head.
pub const EXTENDED_MIN_LEN: usize = extended::START + 4;

/// A decoded configuration space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSpace {
    pub header: Header,
    pub capabilities: Vec<Capability>,
    pub extended_capabilities: Vec<ExtendedCapability>,
}

impl ConfigSpace {
    /// Decodes the header and both capability chains.
    ///
    /// # Errors
    /// [`PciError::TooShort`] if the blob does not hold a full header.
    pub fn parse(config: &[u8]) -> Result<Self, PciError> {
        let header = Header::parse(config)?;
        let capabilities = header
            .capability_pointer()
            .map(|ptr| caps::walk(config, ptr))
            .unwrap_or_default();
        let is_express = capabilities
            .iter()
            .any(|c| c.id == caps::ID_PCI_EXPRESS);
        let extended_capabilities = if is_express && config.len() >= EXTENDED_MIN_LEN {
            extended::walk(config)
        } else {
            Vec::new()
        };
        Ok(Self {
            header,
            capabilities,
            extended_capabilities,
        })
    }

    #[must_use]
    pub fn capability(&self, id: u8) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }
}
