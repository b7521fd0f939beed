//! Bucket hash for file names.
//!
//! CRC-16/ARC over the name bytes. Used purely for spreading names across
//! buckets, never for integrity.

use crc::{Crc, CRC_16_ARC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// 16-bit checksum of `name`.
#[inline]
pub fn bucket_hash(name: &str) -> u16 {
    CRC16.checksum(name.as_bytes())
}

/// Bucket slot for `name` in a table of `bucket_count` buckets.
///
/// `bucket_count` must be non-zero; tables enforce this at construction.
#[inline]
pub fn bucket_index(name: &str, bucket_count: usize) -> usize {
    bucket_hash(name) as usize % bucket_count
}
