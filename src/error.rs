use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required collaborator or argument was not provided.
    #[error("missing input: {0}")]
    NullInput(String),
    /// A vector or matrix does not have the expected shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// Structural misuse (bad layer wiring, training before setup, ...).
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A scalar parameter is outside its valid domain.
    #[error("out of range: {0}")]
    Range(String),
    /// Hidden-layer backward against a layer whose input size disagrees.
    #[error("layer mismatch: {0}")]
    LayerMismatch(String),
    /// The operation exists but is not implemented (network persistence).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fails with `DimensionMismatch` unless `values.len() == expected`.
#[inline]
pub(crate) fn check_len(values: &[f32], expected: usize, name: &str) -> Result<()> {
    if values.len() != expected {
        return Err(Error::DimensionMismatch(format!(
            "{name} has len {}, expected {expected}",
            values.len()
        )));
    }
    Ok(())
}
