//! PCI devices from sysfs.

use anyhow::{Context as _, Result};
use inspector_pci::{Bar, ConfigSpace, HeaderKind};
use log::{debug, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// A device directory such as `0000:00:02.0` and its configuration space.
pub struct PciDevice {
    pub address: String,
    pub config: ConfigSpace,
}

/// Decodes `<dir>/*/config`, sorted by address.
///
/// Devices whose configuration space does not decode are skipped.
///
/// # Errors
/// If `dir` or one of the `config` files cannot be read.
pub fn read_devices(dir: &Path) -> Result<Vec<PciDevice>> {
    let mut devices = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot list PCI devices in {}", dir.display()))? {
        let entry = entry?;
        let address = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path().join("config");
        if !path.is_file() {
            debug!("{address} has no configuration space");
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
        match ConfigSpace::parse(&bytes) {
            Ok(config) => devices.push(PciDevice { address, config }),
            Err(e) => warn!("skipping {address}: {e}"),
        }
    }
    devices.sort_by(|a, b| a.address.cmp(&b.address));
    Ok(devices)
}

pub fn render(out: &mut String, devices: &[PciDevice]) -> Result<()> {
    writeln!(out, "PCI devices")?;
    for d in devices {
        let common = &d.config.header.common;
        let kind = match &d.config.header.kind {
            HeaderKind::Endpoint(_) => "endpoint".to_owned(),
            HeaderKind::Bridge(b) => format!(
                "bridge {:02x}..{:02x}",
                b.secondary_bus, b.subordinate_bus
            ),
            HeaderKind::Other(_) => format!("header type {:#x}", common.header_type.layout()),
        };
        writeln!(
            out,
            "  {} {:04x}:{:04x} class {:06x} rev {:02x} {kind}",
            d.address, common.vendor_id, common.device_id, common.class_code, common.revision_id
        )?;
        for (i, bar) in d.config.header.bars().iter().enumerate() {
            match bar {
                Bar::Io { base } => writeln!(out, "    BAR{i} I/O {base:#x}")?,
                Bar::Memory32 { base, prefetchable } => {
                    writeln!(out, "    BAR{i} mem32 {base:#x}{}", prefetch(*prefetchable))?;
                }
                Bar::Memory64 { base, prefetchable } => {
                    writeln!(out, "    BAR{i} mem64 {base:#x}{}", prefetch(*prefetchable))?;
                }
            }
        }
        for cap in &d.config.capabilities {
            writeln!(out, "    cap {:#04x} {}", cap.offset, cap.name())?;
        }
        for cap in &d.config.extended_capabilities {
            writeln!(out, "    ecap {:#05x} {} v{}", cap.offset, cap.name(), cap.version)?;
        }
    }
    Ok(())
}

const fn prefetch(prefetchable: bool) -> &'static str {
    if prefetchable { " prefetchable" } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_line() {
        let mut config = vec![0u8; 256];
        config[0..2].copy_from_slice(&0x8086u16.to_le_bytes());
        config[2..4].copy_from_slice(&0x1234u16.to_le_bytes());
        config[8] = 0x01;
        config[9..12].copy_from_slice(&[0x00, 0x00, 0x03]);
        let devices = [PciDevice {
            address: "0000:00:02.0".into(),
            config: ConfigSpace::parse(&config).unwrap(),
        }];
        let mut out = String::new();
        render(&mut out, &devices).unwrap();
        assert!(out.contains("0000:00:02.0 8086:1234 class 030000 rev 01 endpoint"), "{out}");
    }
}
