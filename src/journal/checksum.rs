//! CRC32 checksums for journal entries
//!
//! An entry's checksum covers its length field, kind, sequence number and
//! body. Any mismatch is corruption.

use crc32fast::Hasher;

/// CRC32 (IEEE) over `data`
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// True if `data` hashes to `expected`
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
