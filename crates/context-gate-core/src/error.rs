//! Typed errors for configuration and index validation.
//!
//! Both are fatal for the call that raised them and are never retried.
//! Empty results (no documents, no candidates, everything gated out) are
//! not errors and never appear here.

use thiserror::Error;

/// Invalid pipeline parameters, detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("chunk_size must be > 0")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },

    #[error("top_n_output must be >= 1")]
    ZeroOutputSize,

    #[error("top_n_output ({top_n_output}) must not exceed top_k_input ({top_k_input})")]
    OutputExceedsInput {
        top_n_output: usize,
        top_k_input: usize,
    },

    #[error("blend_alpha must be in [0.0, 1.0], got {0}")]
    AlphaOutOfRange(f64),

    #[error("batch_size must be >= 1")]
    ZeroBatchSize,

    #[error("unknown policy '{0}': expected fail_closed, fail_open, or hybrid")]
    UnknownPolicy(String),
}

/// Rejected index writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("ids and {field} length mismatch ({ids} ids, {actual} {field})")]
    LengthMismatch {
        field: &'static str,
        ids: usize,
        actual: usize,
    },
}
