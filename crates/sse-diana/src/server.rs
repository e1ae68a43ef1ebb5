//! Server-side search and insert loops
//!
//! The server is generic over the index payload and the encrypted store.
//! Searches drive the constrained RCPRF leaf by leaf; parallel searches
//! partition the leaf range statically so workers share nothing mutable
//! beyond the store itself.

use std::marker::PhantomData;
use std::ops::Range;
use std::thread;

use sse_core::{EncryptedDb, IndexValue};
use tracing::{debug, error};

use crate::derive::derive_update_token_mask;
use crate::types::{SearchRequest, UpdateRequest};
use crate::{Error, Result, MAX_SEARCH_THREADS};

/// Forward-private search server over an encrypted key-value store
pub struct DianaServer<T: IndexValue, D: EncryptedDb<T>> {
    edb: D,
    _index: PhantomData<T>,
}

impl<T: IndexValue, D: EncryptedDb<T>> DianaServer<T, D> {
    pub fn new(edb: D) -> Self {
        Self {
            edb,
            _index: PhantomData,
        }
    }

    /// The underlying encrypted store
    pub fn edb(&self) -> &D {
        &self.edb
    }

    /// Store an update verbatim.
    pub fn insert(&self, req: &UpdateRequest<T>) -> Result<()> {
        debug!(token = %hex::encode(req.token), "storing update");
        self.edb.put(req.token, req.index)?;
        Ok(())
    }

    /// Durability boundary of the underlying store.
    pub fn flush(&self) -> Result<()> {
        self.edb.flush()?;
        Ok(())
    }

    /// Derive one leaf, look it up, unmask.
    ///
    /// A missing entry is logged and skipped: after a destructive search
    /// the client legitimately derives tokens that are gone.
    fn process_leaf(
        &self,
        req: &SearchRequest,
        leaf: u64,
        delete_results: bool,
    ) -> Result<Option<T>> {
        let leaf_token = req.constrained_rcprf.eval(leaf)?;
        let (token, mask) = derive_update_token_mask::<T>(&leaf_token);

        let found = if delete_results {
            self.edb.get_and_remove(&token)?
        } else {
            self.edb.get(&token)?
        };

        match found {
            Some(masked) => Ok(Some(masked.xor_mask(&mask))),
            None => {
                error!(
                    leaf,
                    token = %hex::encode(token),
                    "expected entry missing from encrypted database"
                );
                Ok(None)
            }
        }
    }

    /// Sequential search. Emits plaintext indices in increasing leaf
    /// order. With `delete_results` the search is destructive: matched
    /// entries are removed as they are read.
    pub fn search<F: FnMut(T)>(
        &self,
        req: &SearchRequest,
        delete_results: bool,
        mut emit: F,
    ) -> Result<()> {
        debug!(expected = req.add_count, "starting search");
        for leaf in 0..req.add_count {
            if let Some(index) = self.process_leaf(req, leaf, delete_results)? {
                emit(index);
            }
        }
        Ok(())
    }

    /// Sequential search collecting into a vector.
    pub fn search_collect(&self, req: &SearchRequest, delete_results: bool) -> Result<Vec<T>> {
        let mut results = Vec::with_capacity(req.add_count as usize);
        self.search(req, delete_results, |index| results.push(index))?;
        Ok(results)
    }

    /// Parallel search with a worker-tagged callback.
    ///
    /// The leaf range is split into `threads_count` contiguous chunks
    /// (clamped to the leaf count and to [`MAX_SEARCH_THREADS`]); the
    /// first `add_count % threads` workers take one extra leaf. Emission
    /// order across workers is unspecified; the worker id lets callers
    /// partition output without locking. Returns the effective worker
    /// count.
    pub fn search_parallel_tagged<F>(
        &self,
        req: &SearchRequest,
        threads_count: usize,
        delete_results: bool,
        emit: &F,
    ) -> Result<u8>
    where
        F: Fn(T, u8) + Sync,
    {
        if req.add_count == 0 {
            return Ok(0);
        }

        let threads = effective_threads(threads_count, req.add_count);
        let ranges = partition_leaves(req.add_count, threads);
        debug!(expected = req.add_count, workers = threads, "starting parallel search");

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(ranges.len());
            for (worker, range) in ranges.into_iter().enumerate() {
                handles.push(scope.spawn(move || -> Result<()> {
                    for leaf in range {
                        if let Some(index) = self.process_leaf(req, leaf, delete_results)? {
                            emit(index, worker as u8);
                        }
                    }
                    Ok(())
                }));
            }
            for handle in handles {
                handle.join().map_err(|_| Error::WorkerPanicked)??;
            }
            Ok(threads)
        })
    }

    /// Parallel search with a plain callback.
    pub fn search_parallel<F>(
        &self,
        req: &SearchRequest,
        threads_count: usize,
        delete_results: bool,
        emit: &F,
    ) -> Result<u8>
    where
        F: Fn(T) + Sync,
    {
        self.search_parallel_tagged(req, threads_count, delete_results, &|index, _worker| {
            emit(index)
        })
    }

    /// Parallel search collecting into a vector. One result list per
    /// worker, merged after the join, so the hot path takes no lock.
    pub fn search_parallel_collect(
        &self,
        req: &SearchRequest,
        threads_count: usize,
        delete_results: bool,
    ) -> Result<Vec<T>> {
        if req.add_count == 0 {
            return Ok(Vec::new());
        }

        let threads = effective_threads(threads_count, req.add_count);
        let ranges = partition_leaves(req.add_count, threads);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(ranges.len());
            for range in ranges {
                handles.push(scope.spawn(move || -> Result<Vec<T>> {
                    let mut results = Vec::with_capacity((range.end - range.start) as usize);
                    for leaf in range {
                        if let Some(index) = self.process_leaf(req, leaf, delete_results)? {
                            results.push(index);
                        }
                    }
                    Ok(results)
                }));
            }

            let mut merged = Vec::with_capacity(req.add_count as usize);
            for handle in handles {
                merged.extend(handle.join().map_err(|_| Error::WorkerPanicked)??);
            }
            Ok(merged)
        })
    }

    /// Parallel search writing into a preallocated sink. The sink is
    /// grown to `add_count` first; slots past the number of found
    /// entries keep their previous contents. Returns the effective
    /// worker count.
    pub fn search_parallel_into(
        &self,
        req: &SearchRequest,
        threads_count: usize,
        delete_results: bool,
        results: &mut Vec<T>,
    ) -> Result<u8> {
        let needed = req.add_count as usize;
        if results.len() < needed {
            results.resize(needed, T::zeroed());
        }
        if req.add_count == 0 {
            return Ok(0);
        }

        let collected = self.search_parallel_collect(req, threads_count, delete_results)?;
        for (slot, index) in results.iter_mut().zip(collected.iter()) {
            *slot = *index;
        }
        Ok(effective_threads(threads_count, req.add_count))
    }
}

/// Clamp the requested worker count to the leaf count and the hard cap.
fn effective_threads(requested: usize, add_count: u64) -> u8 {
    let cap = add_count.min(MAX_SEARCH_THREADS as u64).max(1) as usize;
    requested.clamp(1, cap) as u8
}

/// Split `[0, add_count)` into `threads` contiguous ranges; the first
/// `add_count % threads` ranges take one extra leaf.
fn partition_leaves(add_count: u64, threads: u8) -> Vec<Range<u64>> {
    let threads = threads as u64;
    let step = add_count / threads;
    let remaining = add_count % threads;

    let mut ranges = Vec::with_capacity(threads as usize);
    let mut start = 0;
    for worker in 0..threads {
        let len = step + u64::from(worker < remaining);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_seven_leaves_three_workers() {
        let ranges = partition_leaves(7, 3);
        assert_eq!(ranges, vec![0..3, 3..5, 5..7]);
    }

    #[test]
    fn test_partition_covers_every_leaf_once() {
        for add_count in [1u64, 2, 5, 16, 255, 1000] {
            for threads in [1u8, 2, 3, 7, 255] {
                let threads = effective_threads(threads as usize, add_count);
                let ranges = partition_leaves(add_count, threads);
                assert_eq!(ranges.len(), threads as usize);

                let mut next = 0;
                for range in &ranges {
                    assert_eq!(range.start, next);
                    assert!(!range.is_empty(), "empty worker range");
                    next = range.end;
                }
                assert_eq!(next, add_count);
            }
        }
    }

    #[test]
    fn test_effective_threads_clamps() {
        assert_eq!(effective_threads(10, 3), 3);
        assert_eq!(effective_threads(3, 10), 3);
        assert_eq!(effective_threads(1000, 1000), 255);
        assert_eq!(effective_threads(0, 10), 1);
    }
}
