//! TOC loading and its two lookup tables.
//!
//! The decompressed TOC is laid out as:
//!
//! ```text
//! [attribute types]  (type code: u8, name: NUL-terminated)*, 0
//! [strings]          (NUL-terminated string)*, "" (single NUL)
//! [attribute tree]   tagged attribute stream, see `walker`
//! ```
//!
//! Lengths and record counts of the first two subsections come from the
//! header; both counts must match exactly.

use log::{debug, info, trace};

use crate::hpkg::codec::block::BlockDecompressor;
use crate::hpkg::codec::compression::Decompressors;
use crate::hpkg::io::ReadAt;
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{AttributeType, AttributeValueType, StringTable},
};
use crate::hpkg::utils::{alloc_buffer, read_cstr};

use super::header::{SectionInfo, SectionLayout};

/// The decompressed TOC, split into its subsections.
#[derive(Debug, Clone, Default)]
pub struct TocBuffer {
    data: Vec<u8>,
    attribute_types_end: usize,
    strings_end: usize,
}

impl TocBuffer {
    pub fn new(data: Vec<u8>, attribute_types_length: u64, strings_length: u64) -> Result<Self> {
        let too_large = || {
            HpkgError::MalformedData(format!(
                "TOC subsections ({} + {} bytes) exceed the TOC size of {} bytes",
                attribute_types_length,
                strings_length,
                data.len()
            ))
        };
        let attribute_types_end = usize::try_from(attribute_types_length).map_err(|_| too_large())?;
        let strings_end = usize::try_from(strings_length)
            .ok()
            .and_then(|length| attribute_types_end.checked_add(length))
            .filter(|end| *end <= data.len())
            .ok_or_else(too_large)?;
        Ok(Self {
            data,
            attribute_types_end,
            strings_end,
        })
    }

    pub fn attribute_types(&self) -> &[u8] {
        &self.data[..self.attribute_types_end]
    }

    pub fn strings(&self) -> &[u8] {
        &self.data[self.attribute_types_end..self.strings_end]
    }

    pub fn attribute_tree(&self) -> &[u8] {
        &self.data[self.strings_end..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads and decompresses one whole section into a fresh buffer.
pub fn load_section<S: ReadAt + ?Sized>(
    source: &S,
    offset: u64,
    info: &SectionInfo,
    decompressors: &Decompressors,
    scratch: &mut [u8],
    context: &'static str,
) -> Result<Vec<u8>> {
    let mut buffer = alloc_buffer(info.uncompressed_length, context)?;
    BlockDecompressor::new(decompressors, scratch)?.decompress(
        source,
        offset,
        info.compressed_length,
        info.compression,
        &mut buffer,
    )?;
    Ok(buffer)
}

/// Loads the TOC section described by `layout`.
pub fn load<S: ReadAt + ?Sized>(
    source: &S,
    layout: &SectionLayout,
    decompressors: &Decompressors,
    scratch: &mut [u8],
) -> Result<TocBuffer> {
    debug!(
        "Loading TOC at {}: {} -> {} bytes ({:?})",
        layout.toc_offset,
        layout.toc.compressed_length,
        layout.toc.uncompressed_length,
        layout.toc.compression
    );
    let data = load_section(source, layout.toc_offset, &layout.toc, decompressors, scratch, "TOC")?;
    let toc = TocBuffer::new(data, layout.toc_attribute_types_length, layout.toc_strings_length)?;
    info!("TOC loaded: {} bytes", toc.len());
    Ok(toc)
}

/// Parses the attribute type table.
///
/// # Errors
/// Returns an error if:
/// - A record has an unknown type code or an unterminated name
/// - The `0` sentinel is missing or not the last byte of the subsection
/// - The number of records differs from `expected_count`
pub fn parse_attribute_types(section: &[u8], expected_count: u64) -> Result<Vec<AttributeType>> {
    let mut reader = section;
    let mut types = Vec::new();

    loop {
        let Some((&type_code, rest)) = reader.split_first() else {
            return Err(HpkgError::MalformedData(
                "Attribute type table is missing its terminator".to_string(),
            ));
        };
        reader = rest;
        if type_code == 0 {
            break;
        }

        AttributeValueType::try_from(type_code)?;
        let name = read_cstr(&mut reader, "attribute type name")?;
        if types.len() as u64 >= expected_count {
            return Err(HpkgError::CountMismatch {
                item_type: "attribute types",
                expected: expected_count,
                found: types.len() as u64 + 1,
            });
        }
        trace!("Attribute type #{}: '{}' (type {})", types.len(), name, type_code);
        types.push(AttributeType::new(type_code, name));
    }

    if !reader.is_empty() {
        return Err(HpkgError::MalformedData(format!(
            "{} bytes after the attribute type table terminator",
            reader.len()
        )));
    }
    if types.len() as u64 != expected_count {
        return Err(HpkgError::CountMismatch {
            item_type: "attribute types",
            expected: expected_count,
            found: types.len() as u64,
        });
    }

    debug!(
        "Parsed {} attribute types ({} standard)",
        types.len(),
        types.iter().filter(|t| t.standard.is_some()).count()
    );
    Ok(types)
}

/// Parses a string table terminated by an empty string.
///
/// Subject to the same terminator and count checks as
/// [`parse_attribute_types`].
pub fn parse_strings(section: &[u8], expected_count: u64) -> Result<StringTable> {
    let mut reader = section;
    let mut strings = Vec::new();

    loop {
        if reader.is_empty() {
            return Err(HpkgError::MalformedData(
                "String table is missing its terminator".to_string(),
            ));
        }
        let string = read_cstr(&mut reader, "string table")?;
        if string.is_empty() {
            break;
        }
        if strings.len() as u64 >= expected_count {
            return Err(HpkgError::CountMismatch {
                item_type: "strings",
                expected: expected_count,
                found: strings.len() as u64 + 1,
            });
        }
        strings.push(string.to_string());
    }

    if !reader.is_empty() {
        return Err(HpkgError::MalformedData(format!(
            "{} bytes after the string table terminator",
            reader.len()
        )));
    }
    if strings.len() as u64 != expected_count {
        return Err(HpkgError::CountMismatch {
            item_type: "strings",
            expected: expected_count,
            found: strings.len() as u64,
        });
    }

    debug!("Parsed {} strings", strings.len());
    Ok(StringTable::new(strings))
}
