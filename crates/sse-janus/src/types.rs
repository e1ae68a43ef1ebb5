//! Request types for the composed scheme

use sse_core::crypto::punct::{Ciphertext, KeyShare};
use sse_diana::UpdateRequest;

/// Keyword token width, in bytes
pub const KEYWORD_TOKEN_SIZE: usize = 16;

/// Opaque per-keyword token carried by search requests
pub type KeywordToken = [u8; KEYWORD_TOKEN_SIZE];

/// An insertion stores a puncturable ciphertext in the insertion engine.
pub type InsertionRequest = UpdateRequest<Ciphertext>;

/// A deletion stores a puncture key share in the deletion engine.
pub type DeletionRequest = UpdateRequest<KeyShare>;

/// A composed search request: one search per engine plus the material to
/// rebuild the punctured decryption key.
#[derive(Clone)]
pub struct SearchRequest {
    pub keyword_token: KeywordToken,
    pub insertion_search_request: sse_diana::SearchRequest,
    pub deletion_search_request: sse_diana::SearchRequest,
    pub first_key_share: KeyShare,
}
