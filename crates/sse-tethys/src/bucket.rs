//! Bucket layout: header arithmetic, chunk encoding, page scanning
//!
//! A bucket stores a sequence of list chunks, each laid out as
//! `[key | 0x11 pad | list_len (u64 LE) | 0x22 pad | values]`, with every
//! field rounded up to whole value entries. Assignments are *logical*
//! lengths: a chunk pays its header out of its own assignment, and a
//! header-less dual bucket (assignment below one header) spills its
//! overhead into this one.

use sse_core::IndexValue;

use crate::{Error, Result};

/// Byte filling the key field up to a whole number of entries
pub const KEY_PAD_BYTE: u8 = 0x11;

/// Byte filling the length field up to a whole number of entries
pub const LENGTH_PAD_BYTE: u8 = 0x22;

/// Stored list length width (u64, little-endian)
pub const LIST_LENGTH_SIZE: usize = 8;

/// Fixed-size lookup key of a stored list
pub trait StoreKey: Clone + Eq + std::hash::Hash + AsRef<[u8]> {
    const SIZE: usize;
}

impl<const N: usize> StoreKey for [u8; N] {
    const SIZE: usize = N;
}

/// Key field size, in entries
pub fn key_entries<K: StoreKey, T: IndexValue>() -> usize {
    K::SIZE.div_ceil(T::WIDTH)
}

/// Length field size, in entries
pub fn length_entries<T: IndexValue>() -> usize {
    LIST_LENGTH_SIZE.div_ceil(T::WIDTH)
}

/// Header size, in entries
pub fn header_entries<K: StoreKey, T: IndexValue>() -> usize {
    key_entries::<K, T>() + length_entries::<T>()
}

/// Control-block budget of a list, in entries: two headers, one per
/// candidate bucket.
pub fn control_block_entries<K: StoreKey, T: IndexValue>() -> usize {
    2 * header_entries::<K, T>()
}

/// Which end of the list's cross edge this bucket sits on. The outgoing
/// bucket encodes the head of the list, the incoming one the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketEdge {
    Outgoing,
    Incoming,
}

/// Encode one list chunk at the start of `chunk`, returning the bytes
/// written. An assignment below one header encodes nothing (the list
/// lives entirely in the dual bucket).
pub(crate) fn encode_chunk<K: StoreKey, T: IndexValue>(
    chunk: &mut [u8],
    key: &K,
    values: &[T],
    assigned: usize,
    dual_assigned: usize,
    edge: BucketEdge,
) -> usize {
    let entry_size = T::WIDTH;
    let header = header_entries::<K, T>();

    if assigned < header {
        return 0;
    }

    let mut encoded = assigned - header;
    if dual_assigned < header {
        // the dual bucket spilled its header overhead into our
        // assignment; those entries carry no values
        encoded = encoded.saturating_sub(header - dual_assigned);
    }

    let skip = match edge {
        BucketEdge::Outgoing => 0,
        BucketEdge::Incoming => dual_assigned.saturating_sub(header),
    };
    debug_assert!(skip + encoded <= values.len());

    let key_field = key_entries::<K, T>() * entry_size;
    let header_bytes = header * entry_size;

    chunk[..K::SIZE].copy_from_slice(key.as_ref());
    for byte in &mut chunk[K::SIZE..key_field] {
        *byte = KEY_PAD_BYTE;
    }

    chunk[key_field..key_field + LIST_LENGTH_SIZE]
        .copy_from_slice(&(encoded as u64).to_le_bytes());
    for byte in &mut chunk[key_field + LIST_LENGTH_SIZE..header_bytes] {
        *byte = LENGTH_PAD_BYTE;
    }

    let mut cursor = header_bytes;
    for value in &values[skip..skip + encoded] {
        value.write_bytes(&mut chunk[cursor..cursor + entry_size]);
        cursor += entry_size;
    }
    cursor
}

/// Scan one bucket page for `key`; `Ok(None)` when the key has no chunk
/// here, `Err(Format)` on malformed padding or lengths.
pub(crate) fn scan_bucket<K: StoreKey, T: IndexValue>(
    page: &[u8],
    key: &K,
) -> Result<Option<Vec<T>>> {
    let entry_size = T::WIDTH;
    let key_field = key_entries::<K, T>() * entry_size;
    let header_bytes = header_entries::<K, T>() * entry_size;

    let mut offset = 0;
    while offset + header_bytes <= page.len() {
        let chunk = &page[offset..];

        // zero fill after the last chunk
        if chunk.iter().all(|&b| b == 0) {
            break;
        }

        for &byte in &chunk[K::SIZE..key_field] {
            if byte != KEY_PAD_BYTE {
                return Err(Error::Format(format!(
                    "bad key padding in chunk at page offset {}",
                    offset
                )));
            }
        }
        for &byte in &chunk[key_field + LIST_LENGTH_SIZE..header_bytes] {
            if byte != LENGTH_PAD_BYTE {
                return Err(Error::Format(format!(
                    "bad length padding in chunk at page offset {}",
                    offset
                )));
            }
        }

        let encoded = u64::from_le_bytes(
            chunk[key_field..key_field + LIST_LENGTH_SIZE].try_into().unwrap(),
        ) as usize;
        let chunk_bytes = encoded
            .checked_mul(entry_size)
            .and_then(|b| b.checked_add(header_bytes))
            .ok_or_else(|| Error::Format("list length overflows".to_string()))?;
        if offset + chunk_bytes > page.len() {
            return Err(Error::Format(format!(
                "list of {} entries overruns the page at offset {}",
                encoded, offset
            )));
        }

        if &chunk[..K::SIZE] == key.as_ref() {
            let mut values = Vec::with_capacity(encoded);
            let mut cursor = header_bytes;
            for _ in 0..encoded {
                values.push(T::read_bytes(&chunk[cursor..cursor + entry_size]));
                cursor += entry_size;
            }
            return Ok(Some(values));
        }

        offset += chunk_bytes;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Key = [u8; 16];

    // with u64 entries: key = 2 entries, length = 1 entry, header = 3
    const HDR: usize = 3;

    fn values(n: usize) -> Vec<u64> {
        (0..n as u64).map(|i| 0xAB00_0000 + i).collect()
    }

    #[test]
    fn test_header_arithmetic() {
        assert_eq!(key_entries::<Key, u64>(), 2);
        assert_eq!(length_entries::<u64>(), 1);
        assert_eq!(header_entries::<Key, u64>(), HDR);
        assert_eq!(control_block_entries::<Key, u64>(), 2 * HDR);

        // entries wider than the length field still round up to one
        assert_eq!(length_entries::<[u8; 24]>(), 1);
        assert_eq!(key_entries::<Key, u32>(), 4);
        assert_eq!(length_entries::<u32>(), 2);
    }

    #[test]
    fn test_whole_list_in_one_bucket() {
        let key: Key = [7u8; 16];
        let vals = values(5);
        let mut page = vec![0u8; 512];

        // logical length 5 + 2*HDR, all assigned here
        let written = encode_chunk(&mut page, &key, &vals, 5 + 2 * HDR, 0, BucketEdge::Outgoing);
        assert_eq!(written, (HDR + 5) * 8);

        let found = scan_bucket::<Key, u64>(&page, &key).unwrap();
        assert_eq!(found, Some(vals));
    }

    #[test]
    fn test_split_list_is_contiguous() {
        let key: Key = [9u8; 16];
        let vals = values(10);
        // logical 10 + 6 = 16, split 9 / 7
        let (a0, a1) = (9usize, 7usize);

        let mut page0 = vec![0u8; 512];
        let mut page1 = vec![0u8; 512];
        encode_chunk(&mut page0, &key, &vals, a0, a1, BucketEdge::Outgoing);
        encode_chunk(&mut page1, &key, &vals, a1, a0, BucketEdge::Incoming);

        let head = scan_bucket::<Key, u64>(&page0, &key).unwrap().unwrap();
        let tail = scan_bucket::<Key, u64>(&page1, &key).unwrap().unwrap();
        assert_eq!(head, vals[..6]);
        assert_eq!(tail, vals[6..]);
    }

    #[test]
    fn test_headerless_dual_spills_overhead() {
        let key: Key = [3u8; 16];
        let vals = values(4);
        // logical 4 + 6 = 10, split 8 / 2: the dual cannot fit a header,
        // so this bucket absorbs the missing entry of overhead
        let mut page = vec![0u8; 512];
        encode_chunk(&mut page, &key, &vals, 8, 2, BucketEdge::Outgoing);
        let head = scan_bucket::<Key, u64>(&page, &key).unwrap().unwrap();
        assert_eq!(head, vals);

        let mut dual = vec![0u8; 512];
        let written = encode_chunk(&mut dual, &key, &vals, 2, 8, BucketEdge::Incoming);
        assert_eq!(written, 0);
        assert_eq!(scan_bucket::<Key, u64>(&dual, &key).unwrap(), None);
    }

    #[test]
    fn test_multiple_chunks_per_bucket() {
        let key_a: Key = [1u8; 16];
        let key_b: Key = [2u8; 16];
        let vals_a = values(3);
        let vals_b = values(6);

        let mut page = vec![0u8; 512];
        let mut offset = 0;
        offset += encode_chunk(
            &mut page[offset..],
            &key_a,
            &vals_a,
            3 + 2 * HDR,
            0,
            BucketEdge::Outgoing,
        );
        encode_chunk(
            &mut page[offset..],
            &key_b,
            &vals_b,
            6 + 2 * HDR,
            0,
            BucketEdge::Outgoing,
        );

        assert_eq!(scan_bucket::<Key, u64>(&page, &key_a).unwrap(), Some(vals_a));
        assert_eq!(scan_bucket::<Key, u64>(&page, &key_b).unwrap(), Some(vals_b));
        assert_eq!(scan_bucket::<Key, u64>(&page, &[0xEEu8; 16]).unwrap(), None);
    }

    #[test]
    fn test_empty_page_has_no_chunks() {
        let page = vec![0u8; 256];
        assert_eq!(scan_bucket::<Key, u64>(&page, &[1u8; 16]).unwrap(), None);
    }

    #[test]
    fn test_corrupted_key_is_a_miss_not_an_error() {
        let key: Key = [7u8; 16];
        let mut page = vec![0u8; 512];
        encode_chunk(&mut page, &key, &values(2), 2 + 2 * HDR, 0, BucketEdge::Outgoing);

        page[0] ^= 0xFF;
        assert_eq!(scan_bucket::<Key, u64>(&page, &key).unwrap(), None);
    }

    #[test]
    fn test_bad_padding_is_a_format_error() {
        // 24-byte entries leave 16 bytes of 0x22 padding after the length
        let key: Key = [7u8; 16];
        let vals = vec![[0x55u8; 24]; 2];
        let mut page = vec![0u8; 512];
        // key = 1 entry, length = 1 entry, header = 2
        encode_chunk::<Key, [u8; 24]>(&mut page, &key, &vals, 2 + 4, 0, BucketEdge::Outgoing);

        // key field: 16 key bytes + 8 bytes of 0x11 padding
        assert_eq!(page[16], KEY_PAD_BYTE);
        // length field: 8 length bytes + 16 bytes of 0x22 padding
        assert_eq!(page[32], LENGTH_PAD_BYTE);

        let mut corrupted = page.clone();
        corrupted[33] = 0x00;
        assert!(matches!(
            scan_bucket::<Key, [u8; 24]>(&corrupted, &key),
            Err(Error::Format(_))
        ));

        let mut corrupted = page;
        corrupted[17] = 0x99;
        assert!(matches!(
            scan_bucket::<Key, [u8; 24]>(&corrupted, &key),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_overrunning_length_is_a_format_error() {
        let key: Key = [7u8; 16];
        let mut page = vec![0u8; 128];
        encode_chunk(&mut page, &key, &values(2), 2 + 2 * HDR, 0, BucketEdge::Outgoing);

        // inflate the stored length beyond the page
        let key_field = key_entries::<Key, u64>() * 8;
        page[key_field..key_field + 8].copy_from_slice(&1000u64.to_le_bytes());
        assert!(matches!(
            scan_bucket::<Key, u64>(&page, &key),
            Err(Error::Format(_))
        ));
    }
}
