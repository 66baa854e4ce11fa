//! Collects ACPI, PCI and processor information of the running board into a
//! plain-text report.

mod acpi;
mod cpu;
mod logger;
mod pci;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{LevelFilter, error, info};
use logger::StderrLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(about = "Inspect the firmware tables and devices of this board")]
struct Args {
    /// Name of the board; also the default report name.
    board_name: String,
    /// Where to write the report [default: <board_name>.txt].
    #[arg(long)]
    out: Option<PathBuf>,
    /// Parse and evaluate the DSDT and SSDTs.
    #[arg(long)]
    advanced: bool,
    /// Leave out ACPI devices whose `_STA` clears the present bit.
    #[arg(long)]
    check_device_status: bool,
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
    #[arg(long, default_value = "/sys/firmware/acpi/tables")]
    acpi_dir: PathBuf,
    #[arg(long, default_value = "/sys/bus/pci/devices")]
    pci_dir: PathBuf,
    /// Logical CPU to report on.
    #[arg(long, default_value_t = 0)]
    cpu: u32,
    /// Output of `cpuid -r` captured earlier; the tool runs when absent.
    #[arg(long)]
    cpuid_dump: Option<PathBuf>,
}

fn run(args: &Args) -> Result<PathBuf> {
    let mut report = String::new();

    let tables = acpi::read_tables(&args.acpi_dir)?;
    acpi::render_tables(&mut report, &tables)?;

    let dump = cpu::read_dump(args.cpuid_dump.as_deref())?;
    cpu::render(&mut report, &dump, &cpu::msr_reader(), args.cpu)?;

    let devices = pci::read_devices(&args.pci_dir)?;
    pci::render(&mut report, &devices)?;

    if args.advanced {
        acpi::render_namespace(&mut report, &tables, args.check_device_status)?;
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.txt", args.board_name)));
    std::fs::write(&out, report).with_context(|| format!("cannot write {}", out.display()))?;
    Ok(out)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = StderrLogger::new(args.log_level).init() {
        eprintln!("cannot install logger: {e}");
    }

    match run(&args) {
        Ok(out) => {
            info!("report for {} written to {}", args.board_name, out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["board-inspector", "nuc11"]).unwrap();
        assert_eq!(args.board_name, "nuc11");
        assert!(!args.advanced);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert_eq!(args.acpi_dir, PathBuf::from("/sys/firmware/acpi/tables"));
        assert_eq!(args.cpu, 0);

        let args = Args::try_parse_from([
            "board-inspector",
            "nuc11",
            "--advanced",
            "--check-device-status",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(args.advanced && args.check_device_status);
        assert_eq!(args.log_level, LevelFilter::Debug);
    }
}
