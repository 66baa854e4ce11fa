//! Bit-range helpers over `msb:lsb` ranges (inclusive, LSB-first).

use crate::LayoutError;

/// Right-aligned mask covering `msb:lsb`, i.e. `(1 << (msb - lsb + 1)) - 1`.
///
/// A full 64-bit range yields `u64::MAX`. `msb` must not be below `lsb`;
/// release builds treat such a range as the single bit `lsb`.
#[inline]
#[must_use]
pub const fn mask(msb: u32, lsb: u32) -> u64 {
    debug_assert!(msb >= lsb, "bit range msb:lsb is reversed");
    let width = msb.saturating_sub(lsb) + 1;
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extracts bits `msb:lsb` of `value`.
#[inline]
#[must_use]
pub const fn field(value: u64, msb: u32, lsb: u32) -> u64 {
    (value >> lsb) & mask(msb, lsb)
}

/// Returns `value` with bits `msb:lsb` replaced by `new`.
///
/// # Errors
/// [`LayoutError::FieldOverflow`] when `new` needs more than `msb - lsb + 1` bits,
/// [`LayoutError::ReversedRange`] when `msb` is below `lsb`.
pub const fn with_field(value: u64, msb: u32, lsb: u32, new: u64) -> Result<u64, LayoutError> {
    if msb < lsb {
        return Err(LayoutError::ReversedRange { msb, lsb });
    }
    let m = mask(msb, lsb);
    if new & !m != 0 {
        return Err(LayoutError::FieldOverflow {
            value: new,
            msb,
            lsb,
        });
    }
    Ok((value & !(m << lsb)) | (new << lsb))
}

/// Tests a single bit.
#[inline]
#[must_use]
pub const fn bit(value: u64, n: u32) -> bool {
    n < 64 && (value >> n) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mask_widths() {
        assert_eq!(mask(0, 0), 1);
        assert_eq!(mask(7, 4), 0xF);
        assert_eq!(mask(31, 0), 0xFFFF_FFFF);
        assert_eq!(mask(63, 0), u64::MAX);
    }

    #[test]
    fn overflow_names_range() {
        let err = with_field(0, 6, 4, 0b1000).unwrap_err();
        assert_eq!(
            err,
            LayoutError::FieldOverflow {
                value: 8,
                msb: 6,
                lsb: 4
            }
        );
        assert!(err.to_string().contains("bits 6:4"));
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(
            with_field(0, 3, 4, 0),
            Err(LayoutError::ReversedRange { msb: 3, lsb: 4 })
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reversed")]
    fn reversed_mask_panics_in_debug_builds() {
        let _ = mask(3, 4);
    }

    #[test]
    fn write_keeps_neighbours() {
        let v = with_field(0xFFFF_FFFF, 15, 8, 0x12).unwrap();
        assert_eq!(v, 0xFFFF_12FF);
    }

    proptest! {
        #[test]
        fn written_field_reads_back(value in any::<u64>(), lsb in 0u32..63, width in 1u32..16, new in any::<u64>()) {
            let msb = (lsb + width - 1).min(63);
            let new = new & mask(msb, lsb);
            let out = with_field(value, msb, lsb, new).unwrap();
            prop_assert_eq!(field(out, msb, lsb), new);
        }
    }
}
