//! Store builder and reader
//!
//! The builder collects `(key, values)` lists, sizes the two tables from
//! the load-factor target, solves the assignment, and emits one page per
//! bucket in table-major, bucket-index order. The reader maps a key to
//! its two candidate pages and stitches the head chunk (table 0) and the
//! tail chunk (table 1) back together.

use std::collections::HashSet;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sse_core::IndexValue;
use tiny_keccak::{Hasher, Keccak};
use tracing::{debug, info};

use crate::allocator::{AllocatorKey, TethysAllocator};
use crate::bucket::{control_block_entries, encode_chunk, scan_bucket, BucketEdge, StoreKey};
use crate::{Error, Result};

/// Maps a store key to its two bucket choices.
pub trait KeyHasher<K> {
    fn hash(&self, key: &K) -> AllocatorKey;
}

/// Default hasher: two domain-separated keccak-256 digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHasher;

fn domain_digest(domain: u8, bytes: &[u8]) -> u64 {
    let mut hasher = Keccak::v256();
    hasher.update(&[domain]);
    hasher.update(bytes);
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    u64::from_le_bytes(digest[..8].try_into().unwrap())
}

impl<K: AsRef<[u8]>> KeyHasher<K> for KeccakHasher {
    fn hash(&self, key: &K) -> AllocatorKey {
        let bytes = key.as_ref();
        AllocatorKey::new(domain_digest(0, bytes), domain_digest(1, bytes))
    }
}

/// Sizing parameters of a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TethysStoreBuilderParams {
    /// Upper bound on the total number of stored values
    pub max_n_elements: usize,
    /// Load-factor slack: tables target an occupancy of `1 - epsilon`
    pub epsilon: f64,
}

impl TethysStoreBuilderParams {
    pub fn new(max_n_elements: usize, epsilon: f64) -> Self {
        Self {
            max_n_elements,
            epsilon,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "epsilon must lie in (0, 1), got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    /// Buckets per table so that `2 * bucket_capacity * table_size`
    /// covers `max_n_elements / (1 - epsilon)`.
    pub fn table_size(&self, bucket_capacity: usize) -> usize {
        let target = (self.max_n_elements as f64 / (1.0 - self.epsilon)).ceil() as usize;
        target.div_ceil(2 * bucket_capacity).max(1)
    }

    /// Load parameters from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Save parameters to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct TethysStoreStats {
    pub lists: usize,
    pub entries: usize,
    pub flow: usize,
    pub table_size: usize,
    pub bucket_capacity: usize,
    pub pages_written: usize,
}

/// Builds the page file from inserted lists.
pub struct TethysStoreBuilder<const PAGE_SIZE: usize, K, T, H>
where
    K: StoreKey,
    T: IndexValue,
    H: KeyHasher<K>,
{
    params: TethysStoreBuilderParams,
    hasher: H,
    lists: Vec<(K, Vec<T>)>,
    keys: HashSet<K>,
    entries: usize,
    built: bool,
    _value: PhantomData<T>,
}

impl<const PAGE_SIZE: usize, K, T, H> TethysStoreBuilder<PAGE_SIZE, K, T, H>
where
    K: StoreKey,
    T: IndexValue,
    H: KeyHasher<K>,
{
    /// Value entries per bucket page
    pub const BUCKET_CAPACITY: usize = PAGE_SIZE / T::WIDTH;

    pub fn new(params: TethysStoreBuilderParams, hasher: H) -> Result<Self> {
        params.validate()?;
        if Self::BUCKET_CAPACITY <= control_block_entries::<K, T>() {
            return Err(Error::InvalidParameter(format!(
                "page of {} bytes holds {} entries, not enough for a {}-entry control block",
                PAGE_SIZE,
                Self::BUCKET_CAPACITY,
                control_block_entries::<K, T>()
            )));
        }
        Ok(Self {
            params,
            hasher,
            lists: Vec::new(),
            keys: HashSet::new(),
            entries: 0,
            built: false,
            _value: PhantomData,
        })
    }

    fn check_building(&self) -> Result<()> {
        if self.built {
            return Err(Error::InvalidState {
                expected: "Building",
                found: "Built",
            });
        }
        Ok(())
    }

    /// Queue a list for the build. Keys are unique; the total value count
    /// must stay within `max_n_elements`.
    pub fn insert_list(&mut self, key: K, values: Vec<T>) -> Result<()> {
        self.check_building()?;

        if self.keys.contains(&key) {
            return Err(Error::DuplicateKey(hex::encode(key.as_ref())));
        }
        if self.entries + values.len() > self.params.max_n_elements {
            return Err(Error::Overflow {
                unassigned: self.entries + values.len() - self.params.max_n_elements,
                keys: vec![hex::encode(key.as_ref())],
            });
        }

        self.entries += values.len();
        self.keys.insert(key.clone());
        self.lists.push((key, values));
        Ok(())
    }

    /// Solve the assignment and write every page to `writer`, table 0
    /// first, buckets in index order. Fails with `Overflow` (before
    /// writing anything) if the flow cannot place every list.
    pub fn build<W: Write>(&mut self, writer: &mut W) -> Result<TethysStoreStats> {
        self.check_building()?;
        self.built = true;

        let bucket_capacity = Self::BUCKET_CAPACITY;
        let table_size = self.params.table_size(bucket_capacity);
        let control = control_block_entries::<K, T>();
        debug!(
            lists = self.lists.len(),
            entries = self.entries,
            table_size,
            bucket_capacity,
            "building store"
        );

        let mut allocator = TethysAllocator::new(table_size, bucket_capacity);
        for (key, values) in &self.lists {
            allocator.insert(self.hasher.hash(key), values.len() + control)?;
        }
        allocator.allocate()?;

        let mut unassigned = 0;
        let mut overflow_keys = Vec::new();
        for ((key, _), assignment) in self.lists.iter().zip(allocator.assignments()) {
            if !assignment.is_complete() {
                unassigned += assignment.length - assignment.assigned_total();
                overflow_keys.push(hex::encode(key.as_ref()));
            }
        }
        if !overflow_keys.is_empty() {
            return Err(Error::Overflow {
                unassigned,
                keys: overflow_keys,
            });
        }

        struct Chunk {
            list: usize,
            assigned: usize,
            dual_assigned: usize,
            edge: BucketEdge,
        }
        let mut tables: [Vec<Vec<Chunk>>; 2] = [
            (0..table_size).map(|_| Vec::new()).collect(),
            (0..table_size).map(|_| Vec::new()).collect(),
        ];
        for (list, assignment) in allocator.assignments().iter().enumerate() {
            tables[0][assignment.bucket0].push(Chunk {
                list,
                assigned: assignment.assigned0,
                dual_assigned: assignment.assigned1,
                edge: BucketEdge::Outgoing,
            });
            tables[1][assignment.bucket1].push(Chunk {
                list,
                assigned: assignment.assigned1,
                dual_assigned: assignment.assigned0,
                edge: BucketEdge::Incoming,
            });
        }

        let mut pages_written = 0;
        for table in &tables {
            for chunks in table {
                let mut page = vec![0u8; PAGE_SIZE];
                let mut offset = 0;
                for chunk in chunks {
                    let (key, values) = &self.lists[chunk.list];
                    offset += encode_chunk(
                        &mut page[offset..],
                        key,
                        values,
                        chunk.assigned,
                        chunk.dual_assigned,
                        chunk.edge,
                    );
                }
                writer.write_all(&page)?;
                pages_written += 1;
            }
        }
        writer.flush()?;

        let stats = TethysStoreStats {
            lists: self.lists.len(),
            entries: self.entries,
            flow: allocator.flow(),
            table_size,
            bucket_capacity,
            pages_written,
        };
        info!(
            lists = stats.lists,
            entries = stats.entries,
            pages = stats.pages_written,
            "store built"
        );
        Ok(stats)
    }
}

/// Reads lists back out of a page file.
pub struct TethysStoreReader<const PAGE_SIZE: usize, K, T, H>
where
    K: StoreKey,
    T: IndexValue,
    H: KeyHasher<K>,
{
    data: Vec<u8>,
    table_size: usize,
    hasher: H,
    _marker: PhantomData<(K, T)>,
}

impl<const PAGE_SIZE: usize, K, T, H> TethysStoreReader<PAGE_SIZE, K, T, H>
where
    K: StoreKey,
    T: IndexValue,
    H: KeyHasher<K>,
{
    /// Wrap an in-memory page file of `2 * table_size` pages.
    pub fn from_bytes(data: Vec<u8>, table_size: usize, hasher: H) -> Result<Self> {
        if table_size == 0 {
            return Err(Error::InvalidParameter("table_size must be positive".to_string()));
        }
        let expected = 2 * table_size * PAGE_SIZE;
        if data.len() != expected {
            return Err(Error::Format(format!(
                "page file holds {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self {
            data,
            table_size,
            hasher,
            _marker: PhantomData,
        })
    }

    /// Read a page file from disk.
    pub fn open(path: impl AsRef<Path>, table_size: usize, hasher: H) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data, table_size, hasher)
    }

    fn page(&self, table: usize, bucket: usize) -> &[u8] {
        let index = table * self.table_size + bucket;
        &self.data[index * PAGE_SIZE..(index + 1) * PAGE_SIZE]
    }

    /// Look a key up in its two candidate buckets and reassemble the
    /// list: head chunk from table 0, tail chunk from table 1. Unknown
    /// keys return an empty list.
    pub fn lookup(&self, key: &K) -> Result<Vec<T>> {
        let hashed = self.hasher.hash(key);
        let bucket0 = (hashed.h[0] % self.table_size as u64) as usize;
        let bucket1 = (hashed.h[1] % self.table_size as u64) as usize;

        let mut values = scan_bucket::<K, T>(self.page(0, bucket0), key)?.unwrap_or_default();
        if let Some(tail) = scan_bucket::<K, T>(self.page(1, bucket1), key)? {
            values.extend(tail);
        }
        Ok(values)
    }
}
