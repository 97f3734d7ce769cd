//! Random-access readers for entry and attribute payloads.
//!
//! # Module Organization
//! - `inline`: payloads stored in the TOC
//! - `uncompressed`: heap payloads read straight from the file
//! - `block`: chunked, zlib-compressed heap payloads

pub mod block;
pub mod inline;
pub mod uncompressed;

use log::debug;

use crate::hpkg::codec::compression::Decompressors;
use crate::hpkg::io::ReadAt;
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{CompressionType, DataLocation, PackageData},
    options::ReaderOptions,
};

pub use block::BlockCompressedDataReader;
pub use inline::InlineDataReader;
pub use uncompressed::UncompressedDataReader;

/// Reads the uncompressed bytes of one payload at arbitrary offsets.
pub trait PackageDataReader {
    /// Uncompressed size of the payload.
    fn size(&self) -> u64;

    /// Preferred read granularity.
    fn block_size(&self) -> u64;

    /// Fills `buffer` with the bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns `BadValue` if the requested range reaches past [`size`](Self::size).
    /// An empty `buffer` always succeeds.
    fn read_data(&mut self, offset: u64, buffer: &mut [u8]) -> Result<()>;
}

/// Byte range of the heap within the package file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRange {
    pub offset: u64,
    pub size: u64,
}

impl HeapRange {
    /// Absolute file offset of `[offset, offset + size)` within the heap.
    fn resolve(&self, offset: u64, size: u64) -> Result<u64> {
        offset
            .checked_add(size)
            .filter(|end| *end <= self.size)
            .map(|_| self.offset + offset)
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "Data [{}, +{}) exceeds the heap size of {} bytes",
                    offset, size, self.size
                ))
            })
    }
}

pub(crate) fn check_read_range(offset: u64, len: usize, size: u64) -> Result<()> {
    let in_range = offset <= size && (len as u64) <= size - offset;
    if !in_range {
        return Err(HpkgError::BadValue(format!(
            "Read of {} bytes at offset {} exceeds the data size of {} bytes",
            len, offset, size
        )));
    }
    Ok(())
}

/// Creates the reader matching how `data` is stored.
///
/// # Errors
/// Returns an error if:
/// - `options` are inconsistent
/// - The payload lies outside the heap
/// - The compression algorithm has no registered decompressor
/// - A block-compressed payload has an invalid chunk size or offset table
pub fn create_reader<'s, S: ReadAt + ?Sized>(
    source: &'s S,
    heap: HeapRange,
    data: &PackageData,
    decompressors: &'s Decompressors,
    options: &ReaderOptions,
) -> Result<Box<dyn PackageDataReader + 's>> {
    options.validate()?;
    let offset = match data.location() {
        DataLocation::Inline(bytes) => {
            return Ok(Box::new(InlineDataReader::new(bytes.clone())));
        }
        DataLocation::Heap { offset } => *offset,
    };
    let file_offset = heap.resolve(offset, data.compressed_size())?;

    match data.compression() {
        CompressionType::None => {
            debug!("Uncompressed data reader at {}: {} bytes", file_offset, data.uncompressed_size());
            Ok(Box::new(UncompressedDataReader::new(
                source,
                file_offset,
                data.uncompressed_size(),
                options.default_chunk_size,
            )))
        }
        compression => {
            if !decompressors.supports(compression) {
                return Err(HpkgError::UnsupportedCompression(compression.code()));
            }
            Ok(Box::new(BlockCompressedDataReader::new(
                source,
                decompressors,
                file_offset,
                data,
                options,
            )?))
        }
    }
}
