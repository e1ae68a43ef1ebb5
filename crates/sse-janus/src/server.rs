//! Composed server: two search engines plus punctured decryption

use sse_core::crypto::punct::{Ciphertext, KeyShare, PunctDecryptor};
use sse_core::EncryptedDb;
use sse_diana::DianaServer;
use tracing::{debug, error};

use crate::types::{DeletionRequest, InsertionRequest, SearchRequest};
use crate::Result;

/// Forward- and backward-private search server
pub struct JanusServer<DI, DD>
where
    DI: EncryptedDb<Ciphertext>,
    DD: EncryptedDb<KeyShare>,
{
    insertion_server: DianaServer<Ciphertext, DI>,
    deletion_server: DianaServer<KeyShare, DD>,
}

impl<DI, DD> JanusServer<DI, DD>
where
    DI: EncryptedDb<Ciphertext>,
    DD: EncryptedDb<KeyShare>,
{
    pub fn new(insertion_edb: DI, deletion_edb: DD) -> Self {
        Self {
            insertion_server: DianaServer::new(insertion_edb),
            deletion_server: DianaServer::new(deletion_edb),
        }
    }

    pub fn insertion_server(&self) -> &DianaServer<Ciphertext, DI> {
        &self.insertion_server
    }

    pub fn deletion_server(&self) -> &DianaServer<KeyShare, DD> {
        &self.deletion_server
    }

    /// Search: collect insertion ciphertexts and deletion key shares,
    /// rebuild the punctured key, and keep the indices that still
    /// decrypt. Punctured (deleted) entries drop out silently.
    pub fn search(&self, req: &SearchRequest) -> Result<Vec<u64>> {
        self.check_counts(req);

        let ciphertexts = self
            .insertion_server
            .search_collect(&req.insertion_search_request, false)?;
        let shares = self
            .deletion_server
            .search_collect(&req.deletion_search_request, false)?;

        Ok(self.decrypt_matches(req, ciphertexts, shares))
    }

    /// Parallel variant; each engine search runs with the given worker
    /// count.
    pub fn search_parallel(&self, req: &SearchRequest, threads_count: usize) -> Result<Vec<u64>> {
        self.check_counts(req);

        let ciphertexts = self.insertion_server.search_parallel_collect(
            &req.insertion_search_request,
            threads_count,
            false,
        )?;
        let shares = self.deletion_server.search_parallel_collect(
            &req.deletion_search_request,
            threads_count,
            false,
        )?;

        Ok(self.decrypt_matches(req, ciphertexts, shares))
    }

    fn check_counts(&self, req: &SearchRequest) {
        let insertions = req.insertion_search_request.add_count;
        let deletions = req.deletion_search_request.add_count;
        if insertions < deletions {
            error!(
                keyword_token = %hex::encode(req.keyword_token),
                insertions,
                deletions,
                "keyword deleted more often than inserted"
            );
        }
    }

    fn decrypt_matches(
        &self,
        req: &SearchRequest,
        ciphertexts: Vec<Ciphertext>,
        shares: Vec<KeyShare>,
    ) -> Vec<u64> {
        let mut decryptor = PunctDecryptor::new(req.first_key_share);
        for share in &shares {
            decryptor.add_key_share(share);
        }

        let results: Vec<u64> = ciphertexts
            .iter()
            .filter_map(|ct| decryptor.decrypt(ct))
            .collect();

        debug!(
            candidates = ciphertexts.len(),
            punctures = decryptor.puncture_count(),
            matches = results.len(),
            "punctured decryption done"
        );
        results
    }

    /// Store an insertion ciphertext.
    pub fn insert(&self, req: &InsertionRequest) -> Result<()> {
        self.insertion_server.insert(req)?;
        Ok(())
    }

    /// Store a deletion key share.
    pub fn remove(&self, req: &DeletionRequest) -> Result<()> {
        self.deletion_server.insert(req)?;
        Ok(())
    }

    /// Flush both underlying stores.
    pub fn flush(&self) -> Result<()> {
        self.insertion_server.flush()?;
        self.deletion_server.flush()?;
        Ok(())
    }
}
