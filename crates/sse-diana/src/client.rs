//! Client-side derivations
//!
//! The client owns the master key and the per-keyword insertion counters;
//! everything it sends the server is derived, masked material. This is
//! the counterpart the round-trip tests (and the composition layer) run
//! against the server.

use std::collections::HashMap;
use std::marker::PhantomData;

use sse_core::crypto::{Prf, RcPrf};
use sse_core::IndexValue;

use crate::derive::derive_update_token_mask;
use crate::types::{SearchRequest, UpdateRequest};
use crate::{Result, TOKEN_TREE_HEIGHT};

/// Client state for one scheme instance
pub struct DianaClient<T: IndexValue> {
    derivation_prf: Prf,
    counters: HashMap<String, u64>,
    _index: PhantomData<T>,
}

impl<T: IndexValue> DianaClient<T> {
    pub fn new(master_key: [u8; 32]) -> Self {
        Self {
            derivation_prf: Prf::new(&master_key),
            counters: HashMap::new(),
            _index: PhantomData,
        }
    }

    /// Per-keyword token tree, rooted at PRF(keyword).
    fn keyword_tree(&self, keyword: &str) -> Result<RcPrf> {
        let root = self.derivation_prf.eval_array::<32>(keyword.as_bytes());
        Ok(RcPrf::new(root, TOKEN_TREE_HEIGHT)?)
    }

    /// Number of updates issued so far for `keyword`
    pub fn match_count(&self, keyword: &str) -> u64 {
        self.counters.get(keyword).copied().unwrap_or(0)
    }

    /// Produce the update request for the next insertion of
    /// `(keyword, index)` and advance the keyword counter.
    pub fn update_request(&mut self, keyword: &str, index: T) -> Result<UpdateRequest<T>> {
        let tree = self.keyword_tree(keyword)?;
        let counter = self.counters.entry(keyword.to_string()).or_insert(0);
        let leaf = tree.eval(*counter)?;
        *counter += 1;

        let (token, mask) = derive_update_token_mask::<T>(&leaf);
        Ok(UpdateRequest::new(token, index.xor_mask(&mask)))
    }

    /// Produce the search request covering every update issued so far
    /// for `keyword`.
    pub fn search_request(&self, keyword: &str) -> Result<SearchRequest> {
        let count = self.match_count(keyword);
        if count == 0 {
            return Ok(SearchRequest::empty());
        }

        let tree = self.keyword_tree(keyword)?;
        let constrained = tree.constrain(0, count - 1)?;
        SearchRequest::new(count, constrained)
    }
}
