//! sse-janus: forward- and backward-private search by composition
//!
//! Two independent single-keyword engines run side by side: one stores
//! puncturable ciphertexts for insertions, the other stores key shares
//! for deletions. Deleting `(keyword, index)` punctures the key on that
//! pair's tag, so the matching insertion ciphertext becomes undecryptable
//! at search time. Deletion never touches the insertion database; it is
//! cryptographic, not structural.

mod client;
mod error;
mod server;
mod types;

pub use client::JanusClient;
pub use error::Error;
pub use server::JanusServer;
pub use types::{
    DeletionRequest, InsertionRequest, KeywordToken, SearchRequest, KEYWORD_TOKEN_SIZE,
};

pub type Result<T> = std::result::Result<T, Error>;
