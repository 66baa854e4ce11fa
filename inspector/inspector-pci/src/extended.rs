//! PCI Express extended capability list (offset 0x100 onwards).

use inspector_layout::read_u32;
use log::warn;
use std::collections::BTreeSet;

pub const START: usize = 0x100;

pub const ID_DEVICE_SERIAL_NUMBER: u16 = 0x0003;

/// 4 KiB extended space, 4-byte aligned nodes.
const MAX_EXTENDED_CAPABILITIES: usize = 960;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedCapability {
    pub offset: u16,
    pub id: u16,
    pub version: u8,
    pub next: u16,
    /// Device Serial Number, when this is a DSN capability.
    pub serial_number: Option<u64>,
}

impl ExtendedCapability {
    #[must_use]
    pub fn name(&self) -> String {
        name(self.id).map_or_else(|| format!("Reserved ({:#x})", self.id), str::to_owned)
    }
}

#[must_use]
pub const fn name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0001 => "Advanced Error Reporting",
        0x0002 => "Virtual Channel",
        0x0003 => "Device Serial Number",
        0x0004 => "Power Budgeting",
        0x0005 => "Root Complex Link Declaration",
        0x0006 => "Root Complex Internal Link Control",
        0x0007 => "Root Complex Event Collector Endpoint Association",
        0x0008 => "Multi-Function Virtual Channel",
        0x0009 => "Virtual Channel (MFVC present)",
        0x000A => "Root Complex Register Block",
        0x000B => "Vendor-Specific",
        0x000D => "Access Control Services",
        0x000E => "Alternative Routing-ID Interpretation",
        0x000F => "Address Translation Services",
        0x0010 => "Single Root I/O Virtualization",
        0x0011 => "Multi-Root I/O Virtualization",
        0x0012 => "Multicast",
        0x0013 => "Page Request",
        0x0015 => "Resizable BAR",
        0x0016 => "Dynamic Power Allocation",
        0x0017 => "TPH Requester",
        0x0018 => "Latency Tolerance Reporting",
        0x0019 => "Secondary PCI Express",
        0x001A => "Protocol Multiplexing",
        0x001B => "Process Address Space ID",
        0x001D => "Downstream Port Containment",
        0x001E => "L1 PM Substates",
        0x001F => "Precision Time Measurement",
        0x0023 => "Designated Vendor-Specific",
        0x0025 => "Data Link Feature",
        0x0026 => "Physical Layer 16.0 GT/s",
        0x0027 => "Lane Margining at the Receiver",
        _ => return None,
    })
}

/// Walks the extended list from offset 0x100.
///
/// An all-zero head means the list is empty. The walk ends at a null pointer,
/// a pointer below 0x100 or outside the buffer, or a revisited pointer.
#[must_use]
pub fn walk(config: &[u8]) -> Vec<ExtendedCapability> {
    let mut visited = BTreeSet::new();
    let mut out = Vec::new();
    let mut offset = START;
    loop {
        if !visited.insert(offset) {
            warn!("extended capability list loops back to {offset:#x}");
            break;
        }
        if out.len() >= MAX_EXTENDED_CAPABILITIES {
            warn!("extended capability list exceeds {MAX_EXTENDED_CAPABILITIES} entries");
            break;
        }
        let Ok(head) = read_u32(config, offset) else {
            warn!("extended capability pointer {offset:#x} lies outside the configuration space");
            break;
        };
        if head == 0 || head == u32::MAX {
            break;
        }
        let id = (head & 0xFFFF) as u16;
        let next = ((head >> 20) & 0xFFC) as u16;
        let serial_number = if id == ID_DEVICE_SERIAL_NUMBER {
            let low = read_u32(config, offset + 4).ok();
            let high = read_u32(config, offset + 8).ok();
            low.zip(high)
                .map(|(l, h)| (u64::from(h) << 32) | u64::from(l))
        } else {
            None
        };
        out.push(ExtendedCapability {
            offset: u16::try_from(offset).unwrap_or(u16::MAX),
            id,
            version: ((head >> 16) & 0xF) as u8,
            next,
            serial_number,
        });
        if next == 0 {
            break;
        }
        if usize::from(next) < START {
            warn!("extended capability at {offset:#x} points back into legacy space ({next:#x})");
            break;
        }
        offset = usize::from(next);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(id: u16, version: u8, next: u16) -> [u8; 4] {
        (u32::from(id) | (u32::from(version) << 16) | (u32::from(next) << 20)).to_le_bytes()
    }

    #[test]
    fn walks_chain() {
        let mut cfg = vec![0u8; 4096];
        cfg[0x100..0x104].copy_from_slice(&head(0x0001, 2, 0x140));
        cfg[0x140..0x144].copy_from_slice(&head(0x0003, 1, 0x150));
        cfg[0x144..0x14C].copy_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
        cfg[0x150..0x154].copy_from_slice(&head(0x0042, 1, 0));
        let caps = walk(&cfg);
        assert_eq!(caps.len(), 3);
        assert_eq!(caps[0].name(), "Advanced Error Reporting");
        assert_eq!(caps[0].version, 2);
        assert_eq!(caps[1].serial_number, Some(0x1122_3344_5566_7788));
        assert_eq!(caps[2].name(), "Reserved (0x42)");
    }

    #[test]
    fn cycle_terminates() {
        let mut cfg = vec![0u8; 4096];
        cfg[0x100..0x104].copy_from_slice(&head(0x0001, 1, 0x200));
        cfg[0x200..0x204].copy_from_slice(&head(0x000B, 1, 0x100));
        assert_eq!(walk(&cfg).len(), 2);
    }

    #[test]
    fn empty_list() {
        assert!(walk(&[0u8; 4096]).is_empty());
    }
}
