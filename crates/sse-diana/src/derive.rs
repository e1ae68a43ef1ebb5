//! Leaf token to (update token, mask) derivation
//!
//! The 32-byte leaf splits into two halves: the first half hashes to the
//! update token, the second to the index mask. Client and server both run
//! this exact function; any drift breaks search correctness.

use sse_core::crypto::block_hash;
use sse_core::{IndexValue, SearchTokenKey, UpdateToken, UPDATE_TOKEN_SIZE};

/// Derive the update token and the `T::WIDTH`-byte mask from a leaf.
pub fn derive_update_token_mask<T: IndexValue>(leaf: &SearchTokenKey) -> (UpdateToken, Vec<u8>) {
    let mut token = [0u8; UPDATE_TOKEN_SIZE];
    block_hash(&leaf[..16], &mut token);

    let mut mask = vec![0u8; T::WIDTH];
    block_hash(&leaf[16..], &mut mask);

    (token, mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_depends_on_first_half_only() {
        let mut a = [0x11u8; 32];
        let mut b = [0x11u8; 32];
        b[20] = 0xFF;
        a[20] = 0x00;

        let (token_a, mask_a) = derive_update_token_mask::<u64>(&a);
        let (token_b, mask_b) = derive_update_token_mask::<u64>(&b);

        assert_eq!(token_a, token_b);
        assert_ne!(mask_a, mask_b);
    }

    #[test]
    fn test_mask_depends_on_second_half_only() {
        let a = [0x22u8; 32];
        let mut b = a;
        b[3] = 0x00;

        let (token_a, mask_a) = derive_update_token_mask::<u64>(&a);
        let (token_b, mask_b) = derive_update_token_mask::<u64>(&b);

        assert_ne!(token_a, token_b);
        assert_eq!(mask_a, mask_b);
    }

    #[test]
    fn test_mask_width_follows_index_type() {
        let leaf = [0x33u8; 32];
        let (_, mask32) = derive_update_token_mask::<u32>(&leaf);
        let (_, mask64) = derive_update_token_mask::<u64>(&leaf);
        assert_eq!(mask32.len(), 4);
        assert_eq!(mask64.len(), 8);
        // prefix-stable across widths
        assert_eq!(mask32[..], mask64[..4]);
    }
}
