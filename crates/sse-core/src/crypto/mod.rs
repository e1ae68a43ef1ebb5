//! Cryptographic seams: block hash, keyed PRF, range-constrained PRF and
//! puncturable encryption.
//!
//! The schemes only rely on the contracts exposed here; swapping in a
//! different primitive library means reimplementing these modules against
//! the same signatures.

mod block_hash;
mod prf;
pub mod punct;
mod rcprf;

pub use block_hash::block_hash;
pub use prf::Prf;
pub use rcprf::{ConstrainedRcPrf, RcPrf, MAX_TREE_HEIGHT};
