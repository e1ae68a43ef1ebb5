//! Keyed pseudo-random function over the block hash

use tiny_keccak::{Hasher, Keccak};

/// Keyed PRF with arbitrary-width output.
///
/// Evaluation is `keccak256(key || input)`, extended with a block counter
/// for outputs wider than one digest. Subkeys for independent roles are
/// derived from string labels.
#[derive(Clone)]
pub struct Prf {
    key: [u8; 32],
}

impl Prf {
    pub fn new(key: &[u8; 32]) -> Self {
        Self { key: *key }
    }

    /// Evaluate the PRF on `input`, filling `out`.
    pub fn eval(&self, input: &[u8], out: &mut [u8]) {
        let mut offset = 0;
        let mut block: u32 = 0;
        while offset < out.len() {
            let mut hasher = Keccak::v256();
            hasher.update(&self.key);
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

    /// Evaluate into a fixed-size array
    pub fn eval_array<const N: usize>(&self, input: &[u8]) -> [u8; N] {
        let mut out = [0u8; N];
        self.eval(input, &mut out);
        out
    }

    /// Derive a labelled 32-byte subkey
    pub fn derive_key(&self, label: &str) -> [u8; 32] {
        self.eval_array(label.as_bytes())
    }
}

impl std::fmt::Debug for Prf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never render key material
        f.debug_struct("Prf").finish_non_exhaustive()
    }
}
