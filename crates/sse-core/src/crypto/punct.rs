//! Puncturable encryption seam
//!
//! The composition layer only needs the contract: an initial key share, a
//! tagged `encrypt`, an incremental `inc_puncture` producing one share per
//! deleted tag, and a decryptor that combines shares in any order and
//! refuses punctured ciphertexts. This module implements that contract
//! with a tag-set construction: the first share carries the decryption
//! secret, every further share carries one punctured tag, and ciphertexts
//! carry their tag alongside the PRF-masked payload.

use super::prf::Prf;
use std::collections::HashSet;

/// Puncture tag width, in bytes
pub const TAG_SIZE: usize = 16;

/// Ciphertext width: tag plus masked 8-byte index
pub const CIPHERTEXT_SIZE: usize = TAG_SIZE + 8;

/// Key-share width, in bytes
pub const KEY_SHARE_SIZE: usize = 32;

pub type Tag = [u8; TAG_SIZE];
pub type Ciphertext = [u8; CIPHERTEXT_SIZE];
pub type KeyShare = [u8; KEY_SHARE_SIZE];

const MASK_LABEL: &[u8] = b"punct_mask";

fn index_mask(prf: &Prf, tag: &Tag) -> [u8; 8] {
    let mut input = Vec::with_capacity(MASK_LABEL.len() + TAG_SIZE);
    input.extend_from_slice(MASK_LABEL);
    input.extend_from_slice(tag);
    prf.eval_array(&input)
}

/// Encryption side of the puncturable scheme (client-held)
pub struct PunctEncryption {
    key: [u8; 32],
    prf: Prf,
}

impl PunctEncryption {
    pub fn new(key: [u8; 32]) -> Self {
        let prf = Prf::new(&key);
        Self { key, prf }
    }

    /// Key share of the never-punctured key.
    ///
    /// The puncture count parameter is part of the primitive contract;
    /// this construction does not need it.
    pub fn initial_keyshare(&self, _punctures: u64) -> KeyShare {
        self.key
    }

    /// Encrypt `index` under `tag`.
    pub fn encrypt(&self, index: u64, tag: Tag) -> Ciphertext {
        let mask = index_mask(&self.prf, &tag);
        let masked = (index ^ u64::from_le_bytes(mask)).to_le_bytes();

        let mut ct = [0u8; CIPHERTEXT_SIZE];
        ct[..TAG_SIZE].copy_from_slice(&tag);
        ct[TAG_SIZE..].copy_from_slice(&masked);
        ct
    }

    /// Puncture share number `_n` for `tag`.
    ///
    /// The share sequence number is part of the primitive contract; this
    /// construction derives the share from the tag alone.
    pub fn inc_puncture(&self, _n: u64, tag: Tag) -> KeyShare {
        let mut share = [0u8; KEY_SHARE_SIZE];
        share[..TAG_SIZE].copy_from_slice(&tag);
        share
    }
}

/// Decryption side, reconstructed from key shares (server-held during a
/// search). Share combination is order-independent.
pub struct PunctDecryptor {
    prf: Prf,
    punctured: HashSet<Tag>,
}

impl PunctDecryptor {
    pub fn new(first_key_share: KeyShare) -> Self {
        Self {
            prf: Prf::new(&first_key_share),
            punctured: HashSet::new(),
        }
    }

    /// Fold in one puncture share.
    pub fn add_key_share(&mut self, share: &KeyShare) {
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&share[..TAG_SIZE]);
        self.punctured.insert(tag);
    }

    /// Number of punctures folded in so far
    pub fn puncture_count(&self) -> usize {
        self.punctured.len()
    }

    /// Decrypt a ciphertext; `None` when its tag has been punctured.
    pub fn decrypt(&self, ct: &Ciphertext) -> Option<u64> {
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&ct[..TAG_SIZE]);

        if self.punctured.contains(&tag) {
            return None;
        }

        let mask = index_mask(&self.prf, &tag);
        let masked = u64::from_le_bytes(ct[TAG_SIZE..].try_into().unwrap());
        Some(masked ^ u64::from_le_bytes(mask))
    }
}
