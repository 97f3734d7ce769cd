//! Reader for chunked, compressed heap payloads.
//!
//! # Payload Structure
//! ```text
//! [(chunk_count - 1) x u64 BE]  offsets of chunks 1.. relative to the chunk area
//! [chunk area]                  chunk 0 at offset 0, then chunk 1, ...
//! ```
//! Every chunk decompresses to `chunk_size` bytes except possibly the last.
//! A chunk whose stored size equals its uncompressed size is stored verbatim.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};

use crate::hpkg::codec::block::BlockDecompressor;
use crate::hpkg::codec::compression::Decompressors;
use crate::hpkg::io::ReadAt;
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{CompressionType, PackageData},
    options::ReaderOptions,
};
use crate::hpkg::utils::alloc_buffer;

use super::{PackageDataReader, check_read_range};

const OFFSET_ENTRY_SIZE: u64 = 8;

pub struct BlockCompressedDataReader<'s, S: ?Sized> {
    source: &'s S,
    decompressors: &'s Decompressors,
    compression: CompressionType,

    /// Absolute file offset of the offset table.
    file_offset: u64,
    uncompressed_size: u64,
    chunk_size: u64,
    chunk_count: u64,
    offset_table_size: u64,
    chunk_area_size: u64,

    /// Window of the offset table, `offset_cache[i]` is entry `offset_cache_start + i`.
    offset_cache: Vec<u64>,
    offset_cache_start: u64,
    offset_cache_capacity: usize,

    /// Decompressed bytes of chunk `cached_chunk`.
    chunk_buffer: Vec<u8>,
    cached_chunk: Option<u64>,
    scratch: Vec<u8>,
}

impl<'s, S: ReadAt + ?Sized> BlockCompressedDataReader<'s, S> {
    /// `file_offset` is the absolute position of the payload in `source`.
    ///
    /// # Errors
    /// Returns `BadValue` for inconsistent `options`, and `MalformedData` if
    /// the chunk size is out of range or the offset table does not fit in
    /// the compressed payload.
    pub fn new(
        source: &'s S,
        decompressors: &'s Decompressors,
        file_offset: u64,
        data: &PackageData,
        options: &ReaderOptions,
    ) -> Result<Self> {
        options.validate()?;
        let chunk_size = u64::from(options.resolve_chunk_size(data.chunk_size())?);
        let uncompressed_size = data.uncompressed_size();
        let compressed_size = data.compressed_size();
        let chunk_count = uncompressed_size.div_ceil(chunk_size);

        let offset_table_size = chunk_count.saturating_sub(1) * OFFSET_ENTRY_SIZE;
        if offset_table_size >= compressed_size {
            return Err(HpkgError::MalformedData(format!(
                "Chunk offset table of {} bytes does not fit in {} bytes of compressed data",
                offset_table_size, compressed_size
            )));
        }

        debug!(
            "Block compressed data reader at {}: {} chunks of {} bytes, {} -> {} bytes",
            file_offset, chunk_count, chunk_size, compressed_size, uncompressed_size
        );

        let chunk_len = chunk_size.min(uncompressed_size);
        let scratch_len = (options.scratch_buffer_size as u64).min(chunk_len).max(1);
        Ok(Self {
            source,
            decompressors,
            compression: data.compression(),
            file_offset,
            uncompressed_size,
            chunk_size,
            chunk_count,
            offset_table_size,
            chunk_area_size: compressed_size - offset_table_size,
            offset_cache: Vec::new(),
            offset_cache_start: 0,
            offset_cache_capacity: options.offset_cache_entries,
            chunk_buffer: alloc_buffer(chunk_len, "data chunk")?,
            cached_chunk: None,
            scratch: alloc_buffer(scratch_len, "decompression scratch")?,
        })
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Offset of `chunk` within the chunk area.
    fn chunk_offset(&mut self, chunk: u64) -> Result<u64> {
        if chunk == 0 {
            return Ok(0);
        }
        if chunk >= self.chunk_count {
            return Ok(self.chunk_area_size);
        }

        let entry = chunk - 1;
        let cache_end = self.offset_cache_start + self.offset_cache.len() as u64;
        if !(self.offset_cache_start..cache_end).contains(&entry) {
            self.load_offsets(entry)?;
        }
        Ok(self.offset_cache[(entry - self.offset_cache_start) as usize])
    }

    /// Fills the offset cache with the table entries starting at `first`.
    fn load_offsets(&mut self, first: u64) -> Result<()> {
        let entries = (self.chunk_count - 1 - first).min(self.offset_cache_capacity as u64);
        trace!("Loading chunk offsets {}..{}", first, first + entries);

        let mut bytes = alloc_buffer(entries * OFFSET_ENTRY_SIZE, "chunk offset table")?;
        self.source
            .read_exact_at(self.file_offset + first * OFFSET_ENTRY_SIZE, &mut bytes)?;

        self.offset_cache.clear();
        self.offset_cache_start = first;
        let mut previous = 0u64;
        for raw in bytes.chunks_exact(OFFSET_ENTRY_SIZE as usize) {
            let offset = BigEndian::read_u64(raw);
            if offset >= self.chunk_area_size || offset < previous {
                self.offset_cache.clear();
                return Err(HpkgError::MalformedData(format!(
                    "Invalid chunk offset {} (previous {}, chunk area {} bytes)",
                    offset, previous, self.chunk_area_size
                )));
            }
            previous = offset;
            self.offset_cache.push(offset);
        }
        Ok(())
    }

    /// Makes `chunk` the cached chunk, decompressing it if necessary.
    fn load_chunk(&mut self, chunk: u64) -> Result<()> {
        if self.cached_chunk == Some(chunk) {
            return Ok(());
        }
        self.cached_chunk = None;

        let start = self.chunk_offset(chunk)?;
        let end = self.chunk_offset(chunk + 1)?;
        if end < start {
            return Err(HpkgError::MalformedData(format!(
                "Chunk offsets of chunk {} are not monotonic ({} > {})",
                chunk, start, end
            )));
        }
        let compressed_len = end - start;
        let uncompressed_len = self.chunk_size.min(self.uncompressed_size - chunk * self.chunk_size);
        if compressed_len > uncompressed_len {
            return Err(HpkgError::MalformedData(format!(
                "Chunk {} stores {} bytes for {} uncompressed bytes",
                chunk, compressed_len, uncompressed_len
            )));
        }

        let compression = if compressed_len == uncompressed_len {
            CompressionType::None
        } else {
            self.compression
        };
        trace!(
            "Loading chunk {}: {} -> {} bytes ({:?})",
            chunk, compressed_len, uncompressed_len, compression
        );

        let output = &mut self.chunk_buffer[..uncompressed_len as usize];
        BlockDecompressor::new(self.decompressors, &mut self.scratch)?.decompress(
            self.source,
            self.file_offset + self.offset_table_size + start,
            compressed_len,
            compression,
            output,
        )?;
        self.cached_chunk = Some(chunk);
        Ok(())
    }
}

impl<S: ReadAt + ?Sized> PackageDataReader for BlockCompressedDataReader<'_, S> {
    fn size(&self) -> u64 {
        self.uncompressed_size
    }

    fn block_size(&self) -> u64 {
        self.chunk_size
    }

    fn read_data(&mut self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        check_read_range(offset, buffer.len(), self.uncompressed_size)?;

        let mut position = offset;
        let mut copied = 0usize;
        while copied < buffer.len() {
            let chunk = position / self.chunk_size;
            self.load_chunk(chunk)?;

            let in_chunk = (position - chunk * self.chunk_size) as usize;
            let chunk_len = self.chunk_size.min(self.uncompressed_size - chunk * self.chunk_size) as usize;
            let count = (chunk_len - in_chunk).min(buffer.len() - copied);
            buffer[copied..copied + count]
                .copy_from_slice(&self.chunk_buffer[in_chunk..in_chunk + count]);

            copied += count;
            position += count as u64;
        }
        Ok(())
    }
}
