//! Error types for sse-tethys

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("vertex index {index} out of bounds (table size {max})")]
    OutOfRange { index: usize, max: usize },

    #[error("table must be 0 or 1, got {0}")]
    InvalidTable(u8),

    #[error("invalid store parameter: {0}")]
    InvalidParameter(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("allocation overflow: {unassigned} entries across keys {keys:?} could not be placed")]
    Overflow {
        unassigned: usize,
        keys: Vec<String>,
    },

    #[error("malformed page: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
