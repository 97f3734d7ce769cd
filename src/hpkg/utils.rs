//! Low-level byte reading utilities

use byteorder::{BigEndian, ReadBytesExt};

use super::types::error::{HpkgError, Result};

/// Allocates a zeroed buffer, reporting allocation failure instead of aborting.
pub fn alloc_buffer(size: u64, context: &'static str) -> Result<Vec<u8>> {
    let len = usize::try_from(size).map_err(|_| HpkgError::OutOfMemory { context, size })?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| HpkgError::OutOfMemory { context, size })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Reads a NUL-terminated string and advances the slice past the terminator.
pub fn read_cstr<'a>(reader: &mut &'a [u8], context: &'static str) -> Result<&'a str> {
    let data: &'a [u8] = *reader;
    let end_pos = data
        .iter()
        .position(|&byte| byte == 0)
        .ok_or_else(|| HpkgError::MalformedData(format!("Missing NUL terminator in {}", context)))?;

    let text = std::str::from_utf8(&data[..end_pos])
        .map_err(|e| HpkgError::MalformedData(format!("Invalid UTF-8 in {}: {}", context, e)))?;
    *reader = &data[end_pos + 1..];
    Ok(text)
}

/// Reads a 1, 2, 4 or 8 byte big-endian unsigned number.
pub fn read_number(reader: &mut &[u8], number_width: usize) -> Result<u64> {
    let value = match number_width {
        1 => reader.read_u8().map(u64::from),
        2 => reader.read_u16::<BigEndian>().map(u64::from),
        4 => reader.read_u32::<BigEndian>().map(u64::from),
        8 => reader.read_u64::<BigEndian>(),
        _ => {
            return Err(HpkgError::MalformedData(format!(
                "Invalid number width: {}",
                number_width
            )));
        }
    };
    value.map_err(|_| truncated(number_width))
}

/// Reads a 1, 2, 4 or 8 byte big-endian signed number, sign-extended to 64 bits.
pub fn read_signed_number(reader: &mut &[u8], number_width: usize) -> Result<i64> {
    let value = match number_width {
        1 => reader.read_i8().map(i64::from),
        2 => reader.read_i16::<BigEndian>().map(i64::from),
        4 => reader.read_i32::<BigEndian>().map(i64::from),
        8 => reader.read_i64::<BigEndian>(),
        _ => {
            return Err(HpkgError::MalformedData(format!(
                "Invalid number width: {}",
                number_width
            )));
        }
    };
    value.map_err(|_| truncated(number_width))
}

fn truncated(number_width: usize) -> HpkgError {
    HpkgError::MalformedData(format!("Truncated {}-byte number", number_width))
}
