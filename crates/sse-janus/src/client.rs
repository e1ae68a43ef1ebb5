//! Client-side request builders for the composed scheme
//!
//! One master key fans out into domain-separated subkeys: the tag PRF,
//! the per-keyword puncturable-encryption master, the keyword-token PRF,
//! and one derivation master per underlying engine.

use sse_core::crypto::punct::{PunctEncryption, Tag};
use sse_core::crypto::Prf;
use sse_diana::DianaClient;
use tracing::error;

use crate::types::{DeletionRequest, InsertionRequest, SearchRequest};
use crate::Result;

pub struct JanusClient {
    tag_prf: Prf,
    punct_master_prf: Prf,
    keyword_token_prf: Prf,
    insertion_client: DianaClient<sse_core::crypto::punct::Ciphertext>,
    deletion_client: DianaClient<sse_core::crypto::punct::KeyShare>,
}

impl JanusClient {
    pub fn new(master_key: [u8; 32]) -> Self {
        let master = Prf::new(&master_key);
        Self {
            tag_prf: Prf::new(&master.derive_key("tag_derivation")),
            punct_master_prf: Prf::new(&master.derive_key("punct_enc")),
            keyword_token_prf: Prf::new(&master.derive_key("kw_token")),
            insertion_client: DianaClient::new(master.derive_key("add_derivation_master_key")),
            deletion_client: DianaClient::new(master.derive_key("del_derivation_master_key")),
        }
    }

    /// Per-keyword puncturable-encryption instance
    fn keyword_punct_encryption(&self, keyword: &str) -> PunctEncryption {
        PunctEncryption::new(self.punct_master_prf.eval_array::<32>(keyword.as_bytes()))
    }

    /// Tag binding `(keyword, index)`; puncturing it hides exactly that
    /// pair.
    fn tag(&self, keyword: &str, index: u64) -> Tag {
        let mut input = Vec::with_capacity(keyword.len() + 8);
        input.extend_from_slice(keyword.as_bytes());
        input.extend_from_slice(&index.to_le_bytes());
        self.tag_prf.eval_array(&input)
    }

    /// Build the insertion request for `(keyword, index)`.
    pub fn insertion_request(&mut self, keyword: &str, index: u64) -> Result<InsertionRequest> {
        let punct = self.keyword_punct_encryption(keyword);
        let ciphertext = punct.encrypt(index, self.tag(keyword, index));
        Ok(self.insertion_client.update_request(keyword, ciphertext)?)
    }

    /// Build the deletion request for `(keyword, index)`.
    pub fn deletion_request(&mut self, keyword: &str, index: u64) -> Result<DeletionRequest> {
        let punct = self.keyword_punct_encryption(keyword);
        let deletions = self.deletion_client.match_count(keyword);
        let share = punct.inc_puncture(deletions + 1, self.tag(keyword, index));
        Ok(self.deletion_client.update_request(keyword, share)?)
    }

    /// Build the composed search request for `keyword`.
    pub fn search_request(&self, keyword: &str) -> Result<SearchRequest> {
        let insertion_search_request = self.insertion_client.search_request(keyword)?;
        let deletion_search_request = self.deletion_client.search_request(keyword)?;

        if insertion_search_request.add_count < deletion_search_request.add_count {
            error!(
                keyword,
                insertions = insertion_search_request.add_count,
                deletions = deletion_search_request.add_count,
                "keyword deleted more often than inserted"
            );
        }

        let punct = self.keyword_punct_encryption(keyword);
        Ok(SearchRequest {
            keyword_token: self.keyword_token_prf.eval_array(keyword.as_bytes()),
            first_key_share: punct.initial_keyshare(deletion_search_request.add_count),
            insertion_search_request,
            deletion_search_request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_bind_keyword_and_index() {
        let client = JanusClient::new([5u8; 32]);
        assert_eq!(client.tag("alpha", 1), client.tag("alpha", 1));
        assert_ne!(client.tag("alpha", 1), client.tag("alpha", 2));
        assert_ne!(client.tag("alpha", 1), client.tag("beta", 1));
    }

    #[test]
    fn test_keyword_tokens_differ() {
        let client = JanusClient::new([5u8; 32]);
        let a = client.search_request("alpha").unwrap();
        let b = client.search_request("beta").unwrap();
        assert_ne!(a.keyword_token, b.keyword_token);
    }

    #[test]
    fn test_search_request_counts() {
        let mut client = JanusClient::new([5u8; 32]);
        client.insertion_request("alpha", 1).unwrap();
        client.insertion_request("alpha", 2).unwrap();
        client.deletion_request("alpha", 1).unwrap();

        let req = client.search_request("alpha").unwrap();
        assert_eq!(req.insertion_search_request.add_count, 2);
        assert_eq!(req.deletion_search_request.add_count, 1);
    }
}
