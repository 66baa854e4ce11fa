/// Errors raised while decoding fixed-layout binary data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A value does not fit the bit range it is written to.
    #[error("field overflow: {value:#x} does not fit bits {msb}:{lsb}")]
    FieldOverflow { value: u64, msb: u32, lsb: u32 },
    /// A bit range whose most significant bit is below its least.
    #[error("reversed bit range {msb}:{lsb}")]
    ReversedRange { msb: u32, lsb: u32 },
    /// A read would cross the end of the buffer.
    #[error("out of bounds: {needed} byte(s) at offset {offset:#x}, {available} available")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },
}
