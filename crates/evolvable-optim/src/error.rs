//! Error types for optimizer binding operations.

use thiserror::Error;

/// Errors that can occur while binding, driving or restoring optimizers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimError {
    /// Inconsistent construction inputs or state payloads: no resolved network
    /// names, cardinality mismatches, per-network state length mismatches.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A scalar form was given where a per-network sequence is required, or vice versa.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Sequence-style access on a wrapper that holds a single optimizer.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Forwarded attribute not found on the underlying optimizer.
    #[error("Attribute lookup error: {0}")]
    AttributeLookup(String),

    /// Error raised by an optimizer while updating parameters or loading state.
    #[error("Optimizer error: {0}")]
    OptimizerError(String),

    /// Error in checkpoint save/load.
    #[error("Checkpoint error: {0}")]
    CheckpointError(String),
}

/// Result type for optimizer binding operations.
pub type OptimResult<T> = Result<T, OptimError>;
