use thiserror::Error;

/// Unified error type for all Vexel operations.
///
/// The engine distinguishes two fatal failure classes: configuration errors
/// (surfaced before any row is processed, as [`Error::InvalidArgumentError`])
/// and runtime errors reported by the underlying columnar library (wrapped as
/// [`Error::Arrow`]). Neither is recovered locally; an aggregator that
/// returned an error must be discarded.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error during columnar data operations.
    ///
    /// Raised when a compute kernel, array builder, or record-batch
    /// constructor reports a failure. These errors carry the underlying
    /// Arrow message verbatim.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid user input or API parameter.
    ///
    /// Covers unsupported `(aggregate, column type)` pairs, column names
    /// missing from the input schema, and aggregates applied to types they
    /// cannot consume. Always surfaced at configuration time, before any
    /// row has been folded into a group.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This should never occur during normal operation: it marks violated
    /// internal invariants such as a slot holding the wrong variant for its
    /// aggregate, or a group-builder method that must never be invoked.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}
