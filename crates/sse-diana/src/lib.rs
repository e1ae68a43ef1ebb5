//! sse-diana: forward-private single-keyword search engine
//!
//! The server stores `(update token -> masked index)` pairs it cannot
//! interpret. A search hands it a constrained RCPRF covering exactly the
//! leaves of the matching updates; the server re-derives each leaf's
//! update token and mask, looks the token up, unmasks the hit, and emits
//! the plaintext index. Updates are unlinkable to past searches because
//! every token comes from a fresh leaf.
//!
//! ## What the server learns
//!
//! | Information | Server knowledge |
//! |-------------|------------------|
//! | Result count per search | YES - it equals the leaf count |
//! | Which updates matched a past search | NO - forward privacy |
//! | Keywords, plaintext indices | NO - masked end to end |

mod client;
mod derive;
mod error;
mod server;
mod types;

pub use client::DianaClient;
pub use derive::derive_update_token_mask;
pub use error::Error;
pub use server::DianaServer;
pub use types::{SearchRequest, UpdateRequest};

pub type Result<T> = std::result::Result<T, Error>;

/// Height of the per-keyword token tree: up to 2^32 updates per keyword
pub const TOKEN_TREE_HEIGHT: u8 = 32;

/// Hard cap on search workers; thread ids travel as `u8`
pub const MAX_SEARCH_THREADS: usize = 255;
