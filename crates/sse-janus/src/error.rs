//! Error types for sse-janus

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("core error: {0}")]
    Core(#[from] sse_core::Error),

    #[error("search engine error: {0}")]
    Diana(#[from] sse_diana::Error),
}
