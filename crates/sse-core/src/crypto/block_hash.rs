//! Block-hash primitive behind token and mask derivation

use tiny_keccak::{Hasher, Keccak};

/// Hash `input` into `out`.
///
/// The first 32 output bytes are `keccak256(input)`; longer outputs append
/// `keccak256(input || block_counter)` blocks. Prefix stability holds: a
/// shorter output is always a prefix of a longer one for the same input.
pub fn block_hash(input: &[u8], out: &mut [u8]) {
    let mut offset = 0;
    let mut block: u32 = 0;
    while offset < out.len() {
        let mut hasher = Keccak::v256();
        hasher.update(input);
        if block > 0 {
            hasher.update(&block.to_le_bytes());
        }
        let mut digest = [0u8; 32];
        hasher.finalize(&mut digest);

        let n = (out.len() - offset).min(32);
        out[offset..offset + n].copy_from_slice(&digest[..n]);
        offset += n;
        block += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        block_hash(b"input", &mut a);
        block_hash(b"input", &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_separation() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        block_hash(b"input-a", &mut a);
        block_hash(b"input-b", &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_stability() {
        let mut short = [0u8; 16];
        let mut long = [0u8; 48];
        block_hash(b"input", &mut short);
        block_hash(b"input", &mut long);
        assert_eq!(short, long[..16]);
        // the extension block is not a repeat of the first one
        assert_ne!(long[..16], long[32..48]);
    }

    #[test]
    fn test_zero_length_output() {
        let mut out = [0u8; 0];
        block_hash(b"input", &mut out);
    }
}
