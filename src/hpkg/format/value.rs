//! Attribute value decoding.

use crate::hpkg::codec::varint::read_unsigned_leb128;
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{AttributeValue, AttributeValueType, StringTable},
};
use crate::hpkg::utils::{read_cstr, read_number, read_signed_number};

pub const ENCODING_INT_8_BIT: u8 = 0;
pub const ENCODING_INT_16_BIT: u8 = 1;
pub const ENCODING_INT_32_BIT: u8 = 2;
pub const ENCODING_INT_64_BIT: u8 = 3;

pub const ENCODING_STRING_INLINE: u8 = 0;
pub const ENCODING_STRING_TABLE: u8 = 1;

pub const ENCODING_RAW_INLINE: u8 = 0;
pub const ENCODING_RAW_HEAP: u8 = 1;

/// Decodes attribute values from the TOC attribute tree.
///
/// Inline strings and inline raw data borrow from the tree buffer, string
/// references borrow from the string table.
#[derive(Debug, Clone, Copy)]
pub struct ValueDecoder<'a> {
    strings: &'a StringTable,
    heap_size: u64,
    max_inline_data_size: usize,
}

impl<'a> ValueDecoder<'a> {
    pub fn new(strings: &'a StringTable, heap_size: u64, max_inline_data_size: usize) -> Self {
        Self {
            strings,
            heap_size,
            max_inline_data_size,
        }
    }

    /// Decodes one value of `type_code` stored with `encoding`, advancing `cursor`.
    ///
    /// # Errors
    /// Returns `MalformedData` for an unknown type/encoding combination, a
    /// truncated value, a string index out of range, oversized inline data or
    /// a heap range reaching past the end of the heap.
    pub fn decode(
        &self,
        type_code: u8,
        encoding: u8,
        cursor: &mut &'a [u8],
    ) -> Result<AttributeValue<'a>> {
        match AttributeValueType::try_from(type_code)? {
            AttributeValueType::Int => {
                let width = int_width(encoding)?;
                Ok(AttributeValue::Int(read_signed_number(cursor, width)?))
            }
            AttributeValueType::Uint => {
                let width = int_width(encoding)?;
                Ok(AttributeValue::Uint(read_number(cursor, width)?))
            }
            AttributeValueType::String => match encoding {
                ENCODING_STRING_INLINE => Ok(AttributeValue::String(read_cstr(cursor, "inline string")?)),
                ENCODING_STRING_TABLE => {
                    let index = read_unsigned_leb128(cursor)?;
                    let string = self.strings.get(index).ok_or_else(|| {
                        HpkgError::MalformedData(format!(
                            "String index {} out of range ({} strings)",
                            index,
                            self.strings.len()
                        ))
                    })?;
                    Ok(AttributeValue::String(string))
                }
                _ => Err(unknown_encoding(type_code, encoding)),
            },
            AttributeValueType::Raw => {
                let size = read_unsigned_leb128(cursor)?;
                match encoding {
                    ENCODING_RAW_INLINE => self.decode_inline_raw(size, cursor),
                    ENCODING_RAW_HEAP => {
                        let offset = read_unsigned_leb128(cursor)?;
                        if offset.checked_add(size).is_none_or(|end| end > self.heap_size) {
                            return Err(HpkgError::MalformedData(format!(
                                "Heap data [{}, +{}) exceeds the heap size of {} bytes",
                                offset, size, self.heap_size
                            )));
                        }
                        Ok(AttributeValue::HeapData { offset, size })
                    }
                    _ => Err(unknown_encoding(type_code, encoding)),
                }
            }
        }
    }

    fn decode_inline_raw(&self, size: u64, cursor: &mut &'a [u8]) -> Result<AttributeValue<'a>> {
        let len = usize::try_from(size)
            .ok()
            .filter(|len| *len <= self.max_inline_data_size)
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "Inline data of {} bytes exceeds the maximum of {} bytes",
                    size, self.max_inline_data_size
                ))
            })?;
        let data: &'a [u8] = *cursor;
        if data.len() < len {
            return Err(HpkgError::MalformedData(format!(
                "Truncated inline data: need {} bytes, {} available",
                len,
                data.len()
            )));
        }
        let (bytes, rest) = data.split_at(len);
        *cursor = rest;
        Ok(AttributeValue::Raw(bytes))
    }
}

fn int_width(encoding: u8) -> Result<usize> {
    match encoding {
        ENCODING_INT_8_BIT => Ok(1),
        ENCODING_INT_16_BIT => Ok(2),
        ENCODING_INT_32_BIT => Ok(4),
        ENCODING_INT_64_BIT => Ok(8),
        _ => Err(HpkgError::MalformedData(format!("Invalid integer encoding: {}", encoding))),
    }
}

fn unknown_encoding(type_code: u8, encoding: u8) -> HpkgError {
    HpkgError::MalformedData(format!(
        "Unknown encoding {} for attribute type {}",
        encoding, type_code
    ))
}
