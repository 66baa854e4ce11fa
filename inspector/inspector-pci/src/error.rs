use inspector_layout::LayoutError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PciError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("configuration space of {len} byte(s) is shorter than the 64-byte header")]
    TooShort { len: usize },
}
