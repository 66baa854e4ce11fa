//! # ACPI Table Decoders
//!
//! Read-only decoders for the static ACPI tables a board inspection cares
//! about. Every decoder is a pure function from the raw table bytes (as exposed
//! under `/sys/firmware/acpi/tables`) to a typed record.
//!
//! ## Decoding policy
//!
//! * The common [`TableHeader`] is read first; its `length` bounds everything
//!   that follows. A declared length larger than the buffer is an error, a
//!   shorter one truncates the view.
//! * Fixed fields that do not fit are errors.
//! * Repeated sub-records ("type, length, ..." entries) are decoded until the
//!   declared length is consumed. An entry that does not fit ends the walk with
//!   a logged warning and the entries decoded so far are kept.
//! * Unknown sub-record types and enumerants are kept as explicit
//!   `Unknown`/`Reserved` values.
//!
//! ## Tables
//!
//! | Signature | Module | Record |
//! |-----------|--------|--------|
//! | `APIC` | [`apic`] | [`Madt`] |
//! | `FACP` | [`facp`] | [`Fadt`] |
//! | `DMAR` | [`dmar`] | [`Dmar`] |
//! | `TPM2` | [`tpm2`] | [`Tpm2`] |
//! | `RTCT`, `PTCT` | [`rtct`] | [`Rtct`] |
//!
//! [`resource`] decodes the resource templates returned by `_CRS`/`_PRS`.

pub mod apic;
pub mod dmar;
mod entries;
mod error;
pub mod facp;
mod gas;
mod header;
pub mod resource;
pub mod rtct;
pub mod tpm2;

pub use apic::Madt;
pub use dmar::Dmar;
pub use error::AcpiError;
pub use facp::Fadt;
pub use gas::{AccessSize, AddressSpace, GenericAddress};
pub use header::{HEADER_LEN, TableHeader, table_bytes};
pub use rtct::Rtct;
pub use tpm2::Tpm2;

/// Any table this crate knows how to decode, selected by signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Table {
    Apic(Madt),
    Facp(Fadt),
    Dmar(Dmar),
    Tpm2(Tpm2),
    Rtct(Rtct),
    /// A table without a dedicated decoder; only the header is kept.
    Other(TableHeader),
}

impl Table {
    #[must_use]
    pub const fn header(&self) -> &TableHeader {
        match self {
            Self::Apic(t) => &t.header,
            Self::Facp(t) => &t.header,
            Self::Dmar(t) => &t.header,
            Self::Tpm2(t) => &t.header,
            Self::Rtct(t) => &t.header,
            Self::Other(h) => h,
        }
    }
}

/// Decodes `bytes` with the decoder matching its signature.
///
/// # Errors
/// Whatever the selected decoder reports; see [`AcpiError`].
pub fn decode_table(bytes: &[u8]) -> Result<Table, AcpiError> {
    let (header, _) = table_bytes(bytes)?;
    Ok(match &header.signature {
        apic::SIGNATURE => Table::Apic(apic::decode(bytes)?),
        facp::SIGNATURE => Table::Facp(facp::decode(bytes)?),
        dmar::SIGNATURE => Table::Dmar(dmar::decode(bytes)?),
        tpm2::SIGNATURE => Table::Tpm2(tpm2::decode(bytes)?),
        rtct::SIGNATURE | rtct::LEGACY_SIGNATURE => Table::Rtct(rtct::decode(bytes)?),
        _ => Table::Other(header),
    })
}
