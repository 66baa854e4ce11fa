use inspector_layout::LayoutError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcpiError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("unexpected table signature {found:?}, expected {expected:?}")]
    Signature { expected: String, found: String },
    #[error("declared table length {declared} is smaller than the table header")]
    LengthBelowHeader { declared: u32 },
    #[error("declared table length {declared} exceeds the {available} byte(s) read")]
    LengthExceedsBuffer { declared: u32, available: usize },
}
