//! Error types for sse-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    Store(String),

    #[error("leaf index out of range: {index} > {max}")]
    LeafOutOfRange { index: u64, max: u64 },

    #[error("invalid constrained range: [{min}, {max}] for tree height {height}")]
    InvalidRange { min: u64, max: u64, height: u8 },

    #[error("invalid tree height: {0}")]
    InvalidHeight(u8),

    #[error("malformed {what}: need {expected} bytes, got {actual}")]
    Format {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}
