//! Capability list walk.
//!
//! Each node starts with `{id: u8, next: u8}`. Known ids get their payload
//! decoded; anything else is kept as a header-only node.

mod express;
mod msi;
mod msix;
mod pm;

pub use express::{PciExpress, PortType};
pub use msi::{Msi, MsiAddress, MsiControl, MsiMasking};
pub use msix::{MsiX, MsiXControl, MsiXLocation};
pub use pm::{PmCapabilities, PmControlStatus, PowerManagement};

use inspector_layout::{Cursor, LayoutError};
use log::warn;

pub const ID_POWER_MANAGEMENT: u8 = 0x01;
pub const ID_MSI: u8 = 0x05;
pub const ID_PCI_EXPRESS: u8 = 0x10;
pub const ID_MSIX: u8 = 0x11;

/// Upper bound on list length: 192 bytes of capability space, 4-byte aligned nodes.
const MAX_CAPABILITIES: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Offset of this node in configuration space.
    pub offset: u8,
    pub id: u8,
    pub next: u8,
    pub body: CapabilityBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityBody {
    PowerManagement(PowerManagement),
    Msi(Msi),
    MsiX(MsiX),
    PciExpress(PciExpress),
    /// Unknown id or a payload that did not fit; only the list header is kept.
    HeaderOnly,
}

impl Capability {
    #[must_use]
    pub fn name(&self) -> String {
        name(self.id).map_or_else(|| format!("Reserved ({:#x})", self.id), str::to_owned)
    }
}

/// Capability name per the PCI Local Bus and PCI Express specifications.
#[must_use]
pub const fn name(id: u8) -> Option<&'static str> {
    Some(match id {
        0x01 => "Power Management",
        0x02 => "AGP",
        0x03 => "VPD",
        0x04 => "Slot Identification",
        0x05 => "MSI",
        0x06 => "CompactPCI Hot Swap",
        0x07 => "PCI-X",
        0x08 => "Hyper Transport",
        0x09 => "Vendor-Specific",
        0x0A => "Debug port",
        0x0B => "CompactPCI Central Resource Control",
        0x0C => "Hot Plug",
        0x0D => "Subsystem ID and Subsystem Vendor ID",
        0x0E => "AGP 8x",
        0x0F => "Secure Device",
        0x10 => "PCI Express",
        0x11 => "MSI-X",
        0x13 => "Conventional PCI Advanced Features",
        0x14 => "Enhanced Allocation",
        0x15 => "FPB",
        _ => return None,
    })
}

/// Walks the capability list starting at `start`.
///
/// The walk ends at a null pointer, a pointer that leaves the buffer, or a
/// pointer that was already visited.
#[must_use]
pub fn walk(config: &[u8], start: u8) -> Vec<Capability> {
    let mut visited = [false; 256];
    let mut out = Vec::new();
    let mut ptr = start;
    while ptr != 0 {
        let offset = usize::from(ptr);
        if visited[offset] {
            warn!("capability list loops back to {ptr:#x}");
            break;
        }
        if out.len() >= MAX_CAPABILITIES {
            warn!("capability list exceeds {MAX_CAPABILITIES} entries");
            break;
        }
        visited[offset] = true;

        let mut c = Cursor::at(config, offset);
        let (Ok(id), Ok(next)) = (c.u8(), c.u8()) else {
            warn!("capability pointer {ptr:#x} lies outside the configuration space");
            break;
        };
        let body = decode_body(id, &mut c).unwrap_or_else(|e| {
            warn!("capability {id:#x} at {ptr:#x} is truncated: {e}");
            CapabilityBody::HeaderOnly
        });
        out.push(Capability {
            offset: ptr,
            id,
            next,
            body,
        });
        ptr = next & 0xFC;
    }
    out
}

fn decode_body(id: u8, c: &mut Cursor<'_>) -> Result<CapabilityBody, LayoutError> {
    Ok(match id {
        ID_POWER_MANAGEMENT => CapabilityBody::PowerManagement(PowerManagement::decode(c)?),
        ID_MSI => CapabilityBody::Msi(Msi::decode(c)?),
        ID_MSIX => CapabilityBody::MsiX(MsiX::decode(c)?),
        ID_PCI_EXPRESS => CapabilityBody::PciExpress(PciExpress::decode(c)?),
        _ => CapabilityBody::HeaderOnly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_keep_header() {
        let mut cfg = vec![0u8; 256];
        cfg[0x40] = 0x09;
        cfg[0x41] = 0x50;
        cfg[0x50] = 0x42;
        let caps = walk(&cfg, 0x40);
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0].name(), "Vendor-Specific");
        assert_eq!(caps[1].body, CapabilityBody::HeaderOnly);
        assert_eq!(caps[1].name(), "Reserved (0x42)");
    }

    #[test]
    fn self_loop_terminates() {
        let mut cfg = vec![0u8; 256];
        cfg[0x40] = 0x09;
        cfg[0x41] = 0x40;
        assert_eq!(walk(&cfg, 0x40).len(), 1);
    }

    #[test]
    fn pointer_past_end() {
        let mut cfg = vec![0u8; 64];
        cfg[0x3C] = 0x09;
        cfg[0x3D] = 0xF0;
        assert_eq!(walk(&cfg, 0x3C).len(), 1);
    }
}
