//! sse-tethys: static page-packed encrypted multimap
//!
//! Builds a read-only two-table store from `(key, value list)` pairs.
//! Every list is split across at most two page-sized buckets chosen by
//! two independent hashes; the split itself is the solution of a max-flow
//! problem over a bipartite assignment graph, so the tables fill up to
//! their capacity before anything overflows. Lookups read exactly two
//! pages whatever the database contains.

mod allocator;
mod bucket;
mod error;
mod graph;
mod store;

pub use allocator::{AllocatorKey, ListAssignment, TethysAllocator, EMPTY_VALUE_INDEX};
pub use bucket::{
    control_block_entries, header_entries, key_entries, length_entries, StoreKey, KEY_PAD_BYTE,
    LENGTH_PAD_BYTE, LIST_LENGTH_SIZE,
};
pub use error::Error;
pub use graph::{EdgeOrientation, EdgePtr, GraphState, TethysGraph, VertexPtr};
pub use store::{
    KeccakHasher, KeyHasher, TethysStoreBuilder, TethysStoreBuilderParams, TethysStoreReader,
    TethysStoreStats,
};

pub type Result<T> = std::result::Result<T, Error>;
