//! # Packed Binary Layout Helpers
//!
//! Firmware structures (ACPI tables, PCI configuration space, resource
//! descriptors) are C-style packed records: little-endian, no implicit padding,
//! bit ranges numbered LSB-first inside their storage unit. This crate provides
//! the small set of primitives every decoder in the workspace builds on.
//!
//! ## Key Components
//!
//! ### Byte cursor ([`Cursor`])
//! A bounds-checked read position over a borrowed buffer. Every read either
//! returns the requested bytes or a [`LayoutError::OutOfBounds`] naming the
//! offset; nothing ever reads past the slice it was given. Sub-cursors carve a
//! record out of its parent so a decoder cannot overrun a declared length.
//!
//! ### Bit ranges ([`bits`])
//! `mask`/`field`/`with_field` helpers over `msb:lsb` ranges. Writing a value
//! that does not fit the range fails with [`LayoutError::FieldOverflow`].
//!
//! ### Repeated records ([`Decode`], [`decode_array`])
//! Fixed-size records implement [`Decode`]; arrays of them are decoded either
//! with an explicit count or by filling the remaining bytes of a cursor.

pub mod bits;
mod cursor;
mod error;
mod record;

pub use cursor::{Cursor, read_u8, read_u16, read_u32, read_u64};
pub use error::LayoutError;
pub use record::{Count, Decode, decode_array};

/// Byte-sum of `bytes` modulo 256.
///
/// ACPI tables and several PCI structures are valid when this is zero.
#[inline]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}
