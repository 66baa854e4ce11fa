use crate::{Cursor, LayoutError};

/// A fixed-size packed record.
pub trait Decode: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decodes one record, consuming exactly [`Self::SIZE`] bytes on success.
    ///
    /// # Errors
    /// [`LayoutError`] when the cursor runs out of bytes.
    fn decode(cur: &mut Cursor<'_>) -> Result<Self, LayoutError>;
}

macro_rules! impl_decode_int {
    ($($t:ty => $read:ident),*) => {
        $(impl Decode for $t {
            const SIZE: usize = size_of::<$t>();

            #[inline]
            fn decode(cur: &mut Cursor<'_>) -> Result<Self, LayoutError> {
                cur.$read()
            }
        })*
    };
}

impl_decode_int!(u8 => u8, u16 => u16, u32 => u32, u64 => u64);

/// How many elements a trailing array holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Exactly this many elements; running short is an error.
    Fixed(usize),
    /// As many whole elements as fit in the remaining bytes.
    FillRemaining,
}

/// Decodes an array of `T`.
///
/// With [`Count::FillRemaining`] a trailing partial element is skipped and
/// logged rather than treated as an error.
///
/// # Errors
/// [`LayoutError::OutOfBounds`] when a [`Count::Fixed`] array does not fit.
pub fn decode_array<T: Decode>(cur: &mut Cursor<'_>, count: Count) -> Result<Vec<T>, LayoutError> {
    match count {
        Count::Fixed(n) => {
            let needed = n.saturating_mul(T::SIZE);
            if cur.remaining() < needed {
                return Err(LayoutError::OutOfBounds {
                    offset: cur.position(),
                    needed,
                    available: cur.remaining(),
                });
            }
            (0..n).map(|_| T::decode(cur)).collect()
        }
        Count::FillRemaining => {
            let n = cur.remaining() / T::SIZE.max(1);
            let out = (0..n).map(|_| T::decode(cur)).collect::<Result<Vec<_>, _>>()?;
            let leftover = cur.remaining();
            if leftover != 0 {
                log::warn!(
                    "{leftover} trailing byte(s) at offset {:#x} do not form a whole element",
                    cur.position()
                );
                cur.rest();
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_count_must_fit() {
        let buf = [1u8, 0, 2, 0, 3];
        let mut c = Cursor::new(&buf);
        assert!(decode_array::<u16>(&mut c, Count::Fixed(3)).is_err());
        assert_eq!(c.position(), 0);
        let v: Vec<u16> = decode_array(&mut c, Count::Fixed(2)).unwrap();
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn fill_skips_partial_tail() {
        let buf = [1u8, 0, 2, 0, 3];
        let mut c = Cursor::new(&buf);
        let v: Vec<u16> = decode_array(&mut c, Count::FillRemaining).unwrap();
        assert_eq!(v, vec![1, 2]);
        assert_eq!(c.remaining(), 0);
    }
}
