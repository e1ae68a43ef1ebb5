//! Error types for sse-diana

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("core error: {0}")]
    Core(#[from] sse_core::Error),

    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("malformed {what}: need {expected} bytes, got {actual}")]
    Format {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("search worker panicked")]
    WorkerPanicked,
}
