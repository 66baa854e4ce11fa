//! Fixed ACPI Description Table (`FACP`, a.k.a. FADT).
//!
//! Revision 1 tables end after the fixed feature flags at offset 116. From
//! revision 3 on the reset register and the 64-bit `X_` register blocks follow
//! (up to offset 244), and revision 5 adds the sleep control/status registers
//! (up to offset 268). Optional blocks are decoded only when both the revision
//! and the declared length cover them.

use crate::header::open;
use crate::{AcpiError, GenericAddress, TableHeader};
use bitfield_struct::bitfield;
use inspector_layout::{Cursor, Decode, LayoutError};
use log::warn;

pub const SIGNATURE: &[u8; 4] = b"FACP";

const EXTENDED_END: usize = 244;
const SLEEP_END: usize = 268;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fadt {
    pub header: TableHeader,
    pub firmware_ctrl: u32,
    pub dsdt: u32,
    /// `INT_MODEL` in revision 1, reserved afterwards.
    pub int_model: u8,
    pub preferred_pm_profile: PmProfile,
    pub sci_int: u16,
    pub smi_cmd: u32,
    pub acpi_enable: u8,
    pub acpi_disable: u8,
    pub s4bios_req: u8,
    pub pstate_cnt: u8,
    pub pm1a_evt_blk: u32,
    pub pm1b_evt_blk: u32,
    pub pm1a_cnt_blk: u32,
    pub pm1b_cnt_blk: u32,
    pub pm2_cnt_blk: u32,
    pub pm_tmr_blk: u32,
    pub gpe0_blk: u32,
    pub gpe1_blk: u32,
    pub pm1_evt_len: u8,
    pub pm1_cnt_len: u8,
    pub pm2_cnt_len: u8,
    pub pm_tmr_len: u8,
    pub gpe0_blk_len: u8,
    pub gpe1_blk_len: u8,
    pub gpe1_base: u8,
    pub cst_cnt: u8,
    pub p_lvl2_lat: u16,
    pub p_lvl3_lat: u16,
    pub flush_size: u16,
    pub flush_stride: u16,
    pub duty_offset: u8,
    pub duty_width: u8,
    pub day_alrm: u8,
    pub mon_alrm: u8,
    pub century: u8,
    /// Reserved before revision 3.
    pub iapc_boot_arch: Option<BootArchFlags>,
    pub flags: FixedFeatureFlags,
    pub extended: Option<FadtExtended>,
    pub sleep: Option<FadtSleep>,
}

/// Revision 3+ register blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadtExtended {
    pub reset_reg: GenericAddress,
    pub reset_value: u8,
    pub x_firmware_ctrl: u64,
    pub x_dsdt: u64,
    pub x_pm1a_evt_blk: GenericAddress,
    pub x_pm1b_evt_blk: GenericAddress,
    pub x_pm1a_cnt_blk: GenericAddress,
    pub x_pm1b_cnt_blk: GenericAddress,
    pub x_pm2_cnt_blk: GenericAddress,
    pub x_pm_tmr_blk: GenericAddress,
    pub x_gpe0_blk: GenericAddress,
    pub x_gpe1_blk: GenericAddress,
}

/// Revision 5+ sleep registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadtSleep {
    pub control: GenericAddress,
    pub status: GenericAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmProfile {
    Unspecified,
    Desktop,
    Mobile,
    Workstation,
    EnterpriseServer,
    SohoServer,
    AppliancePc,
    PerformanceServer,
    Tablet,
    Reserved(u8),
}

impl From<u8> for PmProfile {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Unspecified,
            1 => Self::Desktop,
            2 => Self::Mobile,
            3 => Self::Workstation,
            4 => Self::EnterpriseServer,
            5 => Self::SohoServer,
            6 => Self::AppliancePc,
            7 => Self::PerformanceServer,
            8 => Self::Tablet,
            _ => Self::Reserved(v),
        }
    }
}

/// Fixed feature flags (offset 112).
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct FixedFeatureFlags {
    pub wbinvd: bool,
    pub wbinvd_flush: bool,
    pub proc_c1: bool,
    pub p_lvl2_up: bool,
    pub pwr_button: bool,
    pub slp_button: bool,
    pub fix_rtc: bool,
    pub rtc_s4: bool,
    pub tmr_val_ext: bool,
    pub dck_cap: bool,
    pub reset_reg_sup: bool,
    pub sealed_case: bool,
    pub headless: bool,
    pub cpu_sw_slp: bool,
    pub pci_exp_wak: bool,
    pub use_platform_clock: bool,
    pub s4_rtc_sts_valid: bool,
    pub remote_power_on_capable: bool,
    pub force_apic_cluster_mode: bool,
    pub force_apic_physical_destination_mode: bool,
    pub hw_reduced_acpi: bool,
    pub low_power_s0_idle_capable: bool,
    #[bits(10)]
    _reserved1: u16,
}

/// IA-PC boot architecture flags (offset 109).
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct BootArchFlags {
    pub legacy_devices: bool,
    pub has_8042: bool,
    pub vga_not_present: bool,
    pub msi_not_supported: bool,
    pub pcie_aspm_controls: bool,
    pub cmos_rtc_not_present: bool,
    #[bits(10)]
    _reserved2: u16,
}

/// Decodes a `FACP` table.
///
/// # Errors
/// Header errors, or a table too short for the revision 1 layout.
pub fn decode(bytes: &[u8]) -> Result<Fadt, AcpiError> {
    let (header, mut c) = open(bytes, SIGNATURE)?;
    let revision = header.revision;
    let table_len = c.len();

    let firmware_ctrl = c.u32()?;
    let dsdt = c.u32()?;
    let int_model = c.u8()?;
    let preferred_pm_profile = PmProfile::from(c.u8()?);
    let sci_int = c.u16()?;
    let smi_cmd = c.u32()?;
    let acpi_enable = c.u8()?;
    let acpi_disable = c.u8()?;
    let s4bios_req = c.u8()?;
    let pstate_cnt = c.u8()?;
    let pm1a_evt_blk = c.u32()?;
    let pm1b_evt_blk = c.u32()?;
    let pm1a_cnt_blk = c.u32()?;
    let pm1b_cnt_blk = c.u32()?;
    let pm2_cnt_blk = c.u32()?;
    let pm_tmr_blk = c.u32()?;
    let gpe0_blk = c.u32()?;
    let gpe1_blk = c.u32()?;
    let pm1_evt_len = c.u8()?;
    let pm1_cnt_len = c.u8()?;
    let pm2_cnt_len = c.u8()?;
    let pm_tmr_len = c.u8()?;
    let gpe0_blk_len = c.u8()?;
    let gpe1_blk_len = c.u8()?;
    let gpe1_base = c.u8()?;
    let cst_cnt = c.u8()?;
    let p_lvl2_lat = c.u16()?;
    let p_lvl3_lat = c.u16()?;
    let flush_size = c.u16()?;
    let flush_stride = c.u16()?;
    let duty_offset = c.u8()?;
    let duty_width = c.u8()?;
    let day_alrm = c.u8()?;
    let mon_alrm = c.u8()?;
    let century = c.u8()?;
    let boot_arch = c.u16()?;
    c.skip(1)?;
    let flags = FixedFeatureFlags::from_bits(c.u32()?);

    let extended = if revision >= 3 {
        optional_block(&mut c, table_len, EXTENDED_END, "extended register blocks", decode_extended)?
    } else {
        None
    };
    let sleep = if revision >= 5 && extended.is_some() {
        optional_block(&mut c, table_len, SLEEP_END, "sleep registers", |c| {
            Ok(FadtSleep {
                control: GenericAddress::decode(c)?,
                status: GenericAddress::decode(c)?,
            })
        })?
    } else {
        None
    };

    Ok(Fadt {
        header,
        firmware_ctrl,
        dsdt,
        int_model,
        preferred_pm_profile,
        sci_int,
        smi_cmd,
        acpi_enable,
        acpi_disable,
        s4bios_req,
        pstate_cnt,
        pm1a_evt_blk,
        pm1b_evt_blk,
        pm1a_cnt_blk,
        pm1b_cnt_blk,
        pm2_cnt_blk,
        pm_tmr_blk,
        gpe0_blk,
        gpe1_blk,
        pm1_evt_len,
        pm1_cnt_len,
        pm2_cnt_len,
        pm_tmr_len,
        gpe0_blk_len,
        gpe1_blk_len,
        gpe1_base,
        cst_cnt,
        p_lvl2_lat,
        p_lvl3_lat,
        flush_size,
        flush_stride,
        duty_offset,
        duty_width,
        day_alrm,
        mon_alrm,
        century,
        iapc_boot_arch: (revision >= 3).then(|| BootArchFlags::from_bits(boot_arch)),
        flags,
        extended,
        sleep,
    })
}

fn optional_block<'a, T>(
    c: &mut Cursor<'a>,
    table_len: usize,
    end: usize,
    what: &str,
    decode: impl FnOnce(&mut Cursor<'a>) -> Result<T, LayoutError>,
) -> Result<Option<T>, LayoutError> {
    if table_len < end {
        warn!("FACP: table of {table_len} byte(s) is too short for the {what}");
        return Ok(None);
    }
    decode(c).map(Some)
}

fn decode_extended(c: &mut Cursor<'_>) -> Result<FadtExtended, LayoutError> {
    let reset_reg = GenericAddress::decode(c)?;
    let reset_value = c.u8()?;
    c.skip(3)?;
    Ok(FadtExtended {
        reset_reg,
        reset_value,
        x_firmware_ctrl: c.u64()?,
        x_dsdt: c.u64()?,
        x_pm1a_evt_blk: GenericAddress::decode(c)?,
        x_pm1b_evt_blk: GenericAddress::decode(c)?,
        x_pm1a_cnt_blk: GenericAddress::decode(c)?,
        x_pm1b_cnt_blk: GenericAddress::decode(c)?,
        x_pm2_cnt_blk: GenericAddress::decode(c)?,
        x_pm_tmr_blk: GenericAddress::decode(c)?,
        x_gpe0_blk: GenericAddress::decode(c)?,
        x_gpe1_blk: GenericAddress::decode(c)?,
    })
}
