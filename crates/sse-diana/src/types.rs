//! Request types and their wire encodings
//!
//! All integers are little-endian. The constrained-RCPRF blob layout is
//! owned by the primitive; a request only frames it behind the count.

use sse_core::crypto::ConstrainedRcPrf;
use sse_core::{IndexValue, UpdateToken, UPDATE_TOKEN_SIZE};

use crate::{Error, Result};

/// A search request: the expected match count and the constrained RCPRF
/// whose leaves `0..add_count` derive the matching update tokens.
#[derive(Clone)]
pub struct SearchRequest {
    /// Exact number of leaves (= expected matches)
    pub add_count: u64,
    /// Constrained RCPRF covering leaves `[0, add_count - 1]`
    pub constrained_rcprf: ConstrainedRcPrf,
}

impl SearchRequest {
    /// Build a request, checking that the RCPRF covers exactly
    /// `[0, add_count - 1]`.
    pub fn new(add_count: u64, constrained_rcprf: ConstrainedRcPrf) -> Result<Self> {
        if constrained_rcprf.leaf_count() != add_count {
            return Err(Error::InvalidRequest(format!(
                "rcprf covers {} leaves, expected {}",
                constrained_rcprf.leaf_count(),
                add_count
            )));
        }
        if add_count > 0 && constrained_rcprf.min_leaf() != 0 {
            return Err(Error::InvalidRequest(format!(
                "rcprf range starts at leaf {}, expected 0",
                constrained_rcprf.min_leaf()
            )));
        }
        Ok(Self {
            add_count,
            constrained_rcprf,
        })
    }

    /// Request matching nothing (keyword never inserted)
    pub fn empty() -> Self {
        Self {
            add_count: 0,
            constrained_rcprf: ConstrainedRcPrf::empty(),
        }
    }

    /// Serialize: `add_count` u64 LE, then the opaque RCPRF blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let blob = self.constrained_rcprf.to_bytes();
        let mut out = Vec::with_capacity(8 + blob.len());
        out.extend_from_slice(&self.add_count.to_le_bytes());
        out.extend_from_slice(&blob);
        out
    }

    /// Parse and validate a serialized request.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Format {
                what: "search request",
                expected: 8,
                actual: data.len(),
            });
        }
        let add_count = u64::from_le_bytes(data[..8].try_into().unwrap());
        let constrained_rcprf = ConstrainedRcPrf::from_bytes(&data[8..])?;
        Self::new(add_count, constrained_rcprf)
    }
}

/// An update request, stored verbatim by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest<T: IndexValue> {
    /// Encrypted-database key
    pub token: UpdateToken,
    /// Masked index payload
    pub index: T,
}

impl<T: IndexValue> UpdateRequest<T> {
    pub const WIRE_SIZE: usize = UPDATE_TOKEN_SIZE + T::WIDTH;

    pub fn new(token: UpdateToken, index: T) -> Self {
        Self { token, index }
    }

    /// Serialize: 16-byte token, then the index payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_SIZE];
        out[..UPDATE_TOKEN_SIZE].copy_from_slice(&self.token);
        self.index.write_bytes(&mut out[UPDATE_TOKEN_SIZE..]);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::WIRE_SIZE {
            return Err(Error::Format {
                what: "update request",
                expected: Self::WIRE_SIZE,
                actual: data.len(),
            });
        }
        let token: UpdateToken = data[..UPDATE_TOKEN_SIZE].try_into().unwrap();
        let index = T::read_bytes(&data[UPDATE_TOKEN_SIZE..]);
        Ok(Self { token, index })
    }
}
