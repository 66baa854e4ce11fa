use inspector_layout::{Cursor, LayoutError};
use log::warn;

/// Walks a run of self-sized sub-records.
///
/// `entry_len` peeks the declared size of the entry at the cursor. Each entry
/// is handed to `decode` as its own bounded cursor, starting at the entry
/// header. The walk stops with a warning at the first entry that is
/// truncated, undersized, or fails to decode.
pub(crate) fn decode_entries<'a, T>(
    body: Cursor<'a>,
    what: &str,
    min_len: usize,
    entry_len: impl Fn(&Cursor<'a>) -> Result<usize, LayoutError>,
    mut decode: impl FnMut(Cursor<'a>) -> Result<T, LayoutError>,
) -> Vec<T> {
    let mut cur = body;
    let mut out = Vec::new();
    while cur.remaining() > 0 {
        let offset = cur.position();
        let len = match entry_len(&cur) {
            Ok(len) => len,
            Err(e) => {
                warn!("{what}: truncated entry header at {offset:#x}: {e}");
                break;
            }
        };
        if len < min_len {
            warn!("{what}: entry at {offset:#x} declares length {len}, below the minimum of {min_len}");
            break;
        }
        let Ok(entry) = cur.sub(len) else {
            warn!(
                "{what}: entry at {offset:#x} declares {len} byte(s), only {} remain",
                cur.remaining()
            );
            break;
        };
        match decode(entry) {
            Ok(v) => out.push(v),
            Err(e) => {
                warn!("{what}: entry at {offset:#x} is truncated: {e}");
                break;
            }
        }
    }
    out
}

/// Length in the second byte (`type: u8, length: u8`).
pub(crate) fn byte_len(cur: &Cursor<'_>) -> Result<usize, LayoutError> {
    Ok(usize::from(cur.peek_bytes(2)?[1]))
}

/// Length in the second word (`type: u16, length: u16`).
pub(crate) fn word_len_at_2(cur: &Cursor<'_>) -> Result<usize, LayoutError> {
    let b = cur.peek_bytes(4)?;
    Ok(usize::from(u16::from_le_bytes([b[2], b[3]])))
}

/// Length in the first word (`size: u16, ...`).
pub(crate) fn word_len_at_0(cur: &Cursor<'_>) -> Result<usize, LayoutError> {
    let b = cur.peek_bytes(2)?;
    Ok(usize::from(u16::from_le_bytes([b[0], b[1]])))
}
