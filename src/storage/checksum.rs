//! CRC32 checksums over batch frames
//!
//! Every frame carries a CRC32 (IEEE) of all bytes before it; readers verify
//! it before decoding a single row.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut frame = b"tt0000001\tmovie".to_vec();
        let original = compute_checksum(&frame);
        frame[3] ^= 0x01;
        assert_ne!(original, compute_checksum(&frame));
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"title_ratings";
        let checksum = compute_checksum(data);
        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }
}
