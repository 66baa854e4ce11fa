use inspector_acpi::AcpiError;
use inspector_layout::LayoutError;

/// Errors raised while loading AML tables.
///
/// Only [`AmlError::Decode`] at the top level of a table is fatal for that
/// table. The other kinds are raised inside packages and cause the package to
/// be deferred until the namespace is complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmlError {
    /// No production matches the bytes at `offset`.
    #[error("cannot decode {production} at offset {offset:#x} (opcode {opcode:#06x})")]
    Decode {
        opcode: u16,
        offset: usize,
        production: &'static str,
    },
    /// A name is used before anything defines it.
    #[error("undefined symbol {name} in scope {scope}")]
    UndefinedSymbol { name: String, scope: String },
    /// A package or name prefix reaches outside its enclosing scope.
    #[error("scope mismatch at offset {offset:#x}: {reason}")]
    ScopeMismatch { offset: usize, reason: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Acpi(#[from] AcpiError),
    #[error("malformed AML: {0}")]
    Malformed(String),
}

impl AmlError {
    /// Whether the enclosing package may be retried after more of the
    /// namespace is known.
    #[must_use]
    pub const fn is_deferrable(&self) -> bool {
        !matches!(self, Self::Acpi(_) | Self::Malformed(_))
    }
}
