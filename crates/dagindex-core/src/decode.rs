//! Field-level decoding of reported values.

use std::num::ParseIntError;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Parse hex text (with or without `0x`) into a `u32`.
pub fn parse_hex_u32(s: &str) -> Result<u32, ParseIntError> {
    u32::from_str_radix(strip_hex_prefix(s), 16)
}

/// Parse hex text (with or without `0x`) into a `u64`.
pub fn parse_hex_u64(s: &str) -> Result<u64, ParseIntError> {
    u64::from_str_radix(strip_hex_prefix(s), 16)
}

/// Decode a hex byte string. The empty string decodes to no bytes.
pub fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(strip_hex_prefix(s))
}

/// Fixed-width little-endian encoding of a `u64`.
///
/// Stored as bytes so the full unsigned range survives signed integer columns.
pub fn u64_to_bytes(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Inverse of [`u64_to_bytes`]. Returns `None` unless exactly 8 bytes are given.
pub fn bytes_to_u64(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_u32_basic() {
        assert_eq!(parse_hex_u32("207fffff").unwrap(), 0x207f_ffff);
        assert_eq!(parse_hex_u32("0x1d00ffff").unwrap(), 0x1d00_ffff);
        assert!(parse_hex_u32("zz").is_err());
        assert!(parse_hex_u32("").is_err());
        // 33 bits
        assert!(parse_hex_u32("1ffffffff").is_err());
    }

    #[test]
    fn parse_hex_u64_full_range() {
        assert_eq!(parse_hex_u64("ffffffffffffffff").unwrap(), u64::MAX);
        assert_eq!(parse_hex_u64("0").unwrap(), 0);
    }

    #[test]
    fn hex_bytes() {
        assert_eq!(decode_hex_bytes("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_hex_bytes("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert!(decode_hex_bytes("abc").is_err()); // odd length
        assert!(decode_hex_bytes("zz").is_err());
    }

    #[test]
    fn u64_bytes_are_little_endian() {
        assert_eq!(u64_to_bytes(1), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(bytes_to_u64(&u64_to_bytes(u64::MAX)), Some(u64::MAX));
        assert_eq!(bytes_to_u64(&[1, 2, 3]), None);
    }
}
