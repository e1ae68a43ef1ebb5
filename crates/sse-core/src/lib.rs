//! sse-core: shared types and primitives for searchable-encryption server cores
//!
//! This crate defines what the scheme crates have in common:
//! - fixed-width token types and the masked index payload trait
//! - the encrypted key-value store contract (plus an in-memory store)
//! - the cryptographic seams: block hash, keyed PRF, the GGM
//!   range-constrained PRF, and the puncturable-encryption primitive
//!
//! # Privacy model
//!
//! The schemes built on top of this crate are *forward private*: an update
//! does not reveal which earlier search it matches. The composition layer
//! adds *backward privacy*: a search does not reveal indices that were
//! deleted before it. The server only ever sees derived tokens and masked
//! payloads; everything keyword-shaped stays on the client.

pub mod crypto;
mod edb;
mod error;
mod tokens;

pub use edb::{EncryptedDb, MemoryEdb};
pub use error::Error;
pub use tokens::{
    IndexValue, SearchTokenKey, UpdateToken, SEARCH_TOKEN_KEY_SIZE, UPDATE_TOKEN_SIZE,
};

pub type Result<T> = std::result::Result<T, Error>;
