//! Static ACPI tables and the AML namespace.

use anyhow::{Context as _, Result};
use inspector_acpi::{Table, decode_table};
use inspector_aml::{ConditionallyUnregister, Context, DeviceInfo, extract_devices};
use log::{debug, info, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// A table file as found in the firmware tables directory.
pub struct TableFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Reads every regular file directly below `dir`, sorted by name.
///
/// # Errors
/// If the directory or one of its files cannot be read.
pub fn read_tables(dir: &Path) -> Result<Vec<TableFile>> {
    let mut tables = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot list ACPI tables in {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = fs::read(entry.path()).with_context(|| format!("cannot read {}", entry.path().display()))?;
        tables.push(TableFile { name, bytes });
    }
    tables.sort_by(|a, b| natural_key(&a.name).cmp(&natural_key(&b.name)));
    Ok(tables)
}

/// Sorts `SSDT2` before `SSDT10`.
fn natural_key(name: &str) -> (String, u64) {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (stem, number) = name.split_at(name.len() - digits);
    (stem.to_owned(), number.parse().unwrap_or(0))
}

/// Tables the report cannot do without.
const CORE_TABLES: [&str; 3] = ["APIC", "DSDT", "FACP"];

/// One line per table plus the details of the tables that have a decoder.
///
/// # Errors
/// If a core table (MADT, DSDT, FADT) does not decode. Other tables that do
/// not decode are left out with a warning.
pub fn render_tables(out: &mut String, tables: &[TableFile]) -> Result<()> {
    writeln!(out, "ACPI tables")?;
    for t in tables {
        let table = match decode_table(&t.bytes) {
            Ok(table) => table,
            Err(e) if CORE_TABLES.iter().any(|core| t.name.starts_with(core)) => {
                return Err(e).with_context(|| format!("cannot decode ACPI table {}", t.name));
            }
            Err(e) => {
                warn!("skipping ACPI table {}: {e}", t.name);
                continue;
            }
        };
        let h = table.header();
        let checksum = if h.checksum_ok(&t.bytes) { "ok" } else { "BAD" };
        writeln!(
            out,
            "  {:<8} {} rev {} len {:#x} oem {} {} checksum {checksum}",
            t.name,
            h.signature_str(),
            h.revision,
            h.length,
            h.oem_id_str(),
            h.oem_table_id_str(),
        )?;
        match &table {
            Table::Apic(madt) => {
                for (processor, apic) in madt.processor_apic_ids() {
                    writeln!(out, "    processor {processor} -> APIC {apic}")?;
                }
                for (uid, x2apic) in madt.uid_x2apic_ids() {
                    writeln!(out, "    uid {uid} -> x2APIC {x2apic}")?;
                }
            }
            Table::Facp(fadt) => {
                writeln!(out, "    profile {:?}, SCI {}", fadt.preferred_pm_profile, fadt.sci_int)?;
            }
            Table::Dmar(dmar) => {
                writeln!(
                    out,
                    "    {}-bit DMA, {} remapping structures",
                    dmar.address_width(),
                    dmar.structures.len()
                )?;
            }
            Table::Tpm2(tpm) => {
                writeln!(out, "    start method {:?}", tpm.start_method)?;
            }
            Table::Rtct(rtct) => {
                writeln!(out, "    version {}, {} entries", rtct.version, rtct.entries.len())?;
            }
            Table::Other(_) => {}
        }
    }
    for optional in ["RTCT", "TPM2"] {
        if !tables.iter().any(|t| t.name.starts_with(optional)) {
            info!("no {optional} table on this board");
        }
    }
    Ok(())
}

/// Loads the DSDT and every SSDT into one namespace.
///
/// # Errors
/// If there is no DSDT or a table fails to parse at its top level.
pub fn load_namespace(tables: &[TableFile]) -> Result<Context> {
    let mut definition_blocks: Vec<&TableFile> = tables.iter().filter(|t| t.name.starts_with("SSDT")).collect();
    let dsdt = tables
        .iter()
        .find(|t| t.name == "DSDT")
        .context("the firmware exposes no DSDT")?;
    definition_blocks.insert(0, dsdt);

    let mut ctx = Context::new();
    let remaining = ctx
        .load_tables(definition_blocks.iter().map(|t| (t.name.as_str(), t.bytes.as_slice())))
        .context("cannot parse AML")?;
    if remaining > 0 {
        warn!("{remaining} packages still refer to undefined names");
    }
    let removed = ConditionallyUnregister::run(&mut ctx);
    debug!("removed {removed:?}");
    Ok(ctx)
}

pub fn render_devices(out: &mut String, devices: &[DeviceInfo]) -> Result<()> {
    writeln!(out, "ACPI devices")?;
    for d in devices {
        write!(out, "  {}", d.path)?;
        if let Some(hid) = &d.hid {
            write!(out, " {hid}")?;
        }
        if !d.cids.is_empty() {
            write!(out, " ({})", d.cids.join(", "))?;
        }
        if let Some(uid) = &d.uid {
            write!(out, " uid {uid}")?;
        }
        if let Some(adr) = d.adr {
            write!(out, " adr {adr:#x}")?;
        }
        if let Some(bbn) = d.bbn {
            write!(out, " bus {bbn:#x}")?;
        }
        if let Some(sta) = d.status {
            write!(
                out,
                " sta {sta:#x} [{}{}{}]",
                if d.present() { "P" } else { "-" },
                if d.enabled() { "E" } else { "-" },
                if d.functioning() { "F" } else { "-" },
            )?;
        }
        writeln!(out)?;
        if let Some(description) = &d.description {
            writeln!(out, "    \"{description}\"")?;
        }
        for r in &d.resources {
            writeln!(out, "    {r:?}")?;
        }
        for route in &d.routing {
            writeln!(out, "    {route}")?;
        }
    }
    Ok(())
}

/// Parses the AML and appends the device section.
///
/// # Errors
/// See [`load_namespace`].
pub fn render_namespace(out: &mut String, tables: &[TableFile], check_device_status: bool) -> Result<()> {
    let mut ctx = load_namespace(tables)?;
    let devices = extract_devices(&mut ctx, check_device_status);
    info!("{} ACPI devices", devices.len());
    render_devices(out, &devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let length = u32::try_from(36 + body.len()).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(signature);
        out.extend_from_slice(&length.to_le_bytes());
        out.push(2);
        out.push(0);
        out.extend_from_slice(b"OEMID TABLEID ");
        out.extend_from_slice(&[0; 12]);
        out.extend_from_slice(body);
        let sum = out.iter().fold(0u8, |a, &b| a.wrapping_add(b));
        out[9] = 0u8.wrapping_sub(sum);
        out
    }

    #[test]
    fn ssdts_sort_numerically() {
        let mut names = vec!["SSDT10", "DSDT", "SSDT2", "SSDT1"];
        names.sort_by_key(|n| natural_key(n));
        assert_eq!(names, ["DSDT", "SSDT1", "SSDT2", "SSDT10"]);
    }

    #[test]
    fn table_summary_reports_checksum() {
        let mut bad = table(b"SSDT", &[]);
        bad[9] = bad[9].wrapping_add(1);
        let tables = [
            TableFile {
                name: "DSDT".into(),
                bytes: table(b"DSDT", &[]),
            },
            TableFile {
                name: "SSDT1".into(),
                bytes: bad,
            },
        ];
        let mut out = String::new();
        render_tables(&mut out, &tables).unwrap();
        assert!(out.contains("DSDT     DSDT rev 2 len 0x24 oem OEMID TABLEID checksum ok"));
        assert!(out.contains("checksum BAD"));
    }

    #[test]
    fn only_core_tables_must_decode() {
        let mut tables = vec![
            TableFile {
                name: "DSDT".into(),
                bytes: table(b"DSDT", &[]),
            },
            TableFile {
                name: "SSDT3".into(),
                bytes: b"SSDT".to_vec(),
            },
        ];
        let mut out = String::new();
        render_tables(&mut out, &tables).unwrap();
        assert!(out.contains("DSDT     DSDT"), "{out}");
        assert!(!out.contains("SSDT3"), "{out}");

        tables.push(TableFile {
            name: "APIC".into(),
            bytes: b"APIC".to_vec(),
        });
        let err = render_tables(&mut String::new(), &tables).unwrap_err();
        assert!(err.to_string().contains("APIC"), "{err:#}");
    }

    #[test]
    fn namespace_needs_a_dsdt() {
        let tables = [TableFile {
            name: "SSDT1".into(),
            bytes: table(b"SSDT", &[]),
        }];
        assert!(load_namespace(&tables).is_err());
    }

    #[test]
    fn devices_are_listed() {
        // Device (COM1) { Name (_HID, EisaId ("PNP0501")) Name (_UID, One) }
        let body = [
            0x5B, 0x82, 0x15, b'C', b'O', b'M', b'1', //
            0x08, b'_', b'H', b'I', b'D', 0x0C, 0x41, 0xD0, 0x05, 0x01, //
            0x08, b'_', b'U', b'I', b'D', 0x01,
        ];
        let tables = [TableFile {
            name: "DSDT".into(),
            bytes: table(b"DSDT", &body),
        }];
        let mut out = String::new();
        render_namespace(&mut out, &tables, true).unwrap();
        assert!(out.contains("\\COM1 PNP0501 uid 1"), "{out}");
    }
}
