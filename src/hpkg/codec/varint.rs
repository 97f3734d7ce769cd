//! Unsigned LEB128, the variable-length integer encoding of the TOC.

use crate::hpkg::types::error::{HpkgError, Result};

/// Reads an unsigned LEB128 number and advances the slice past it.
pub fn read_unsigned_leb128(reader: &mut &[u8]) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;

    let data = *reader;
    for (index, &byte) in data.iter().enumerate() {
        let bits = u64::from(byte & 0x7f);
        if (shift == 63 && bits > 1) || shift > 63 {
            return Err(HpkgError::MalformedData("LEB128 value exceeds 64 bits".to_string()));
        }
        result |= bits << shift;
        if byte & 0x80 == 0 {
            *reader = &data[index + 1..];
            return Ok(result);
        }
        shift += 7;
    }

    Err(HpkgError::MalformedData("Truncated LEB128 value".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte() {
        let data = [0x05u8, 0xff];
        let mut reader = &data[..];
        assert_eq!(read_unsigned_leb128(&mut reader).unwrap(), 5);
        assert_eq!(reader, &[0xff]);
    }

    #[test]
    fn multi_byte() {
        // 624485 from the DWARF specification
        let data = [0xe5u8, 0x8e, 0x26];
        let mut reader = &data[..];
        assert_eq!(read_unsigned_leb128(&mut reader).unwrap(), 624_485);
        assert!(reader.is_empty());
    }

    #[test]
    fn max_value() {
        let data = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut reader = &data[..];
        assert_eq!(read_unsigned_leb128(&mut reader).unwrap(), u64::MAX);
    }

    #[test]
    fn overflow() {
        let data = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        let mut reader = &data[..];
        assert!(read_unsigned_leb128(&mut reader).is_err());
    }

    #[test]
    fn truncated() {
        let data = [0x80u8, 0x80];
        let mut reader = &data[..];
        assert!(read_unsigned_leb128(&mut reader).is_err());
        let mut empty: &[u8] = &[];
        assert!(read_unsigned_leb128(&mut empty).is_err());
    }
}
