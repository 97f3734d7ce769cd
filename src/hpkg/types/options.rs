//! Reader configuration.
//!
//! The package format fixes a handful of small bounds (inline data size,
//! default chunk size) and the reader adds sanity limits of its own (TOC size,
//! tree depth). All of them live here so callers can tighten or relax them.

use super::error::{HpkgError, Result};

/// Largest payload that may be stored inline in the TOC.
pub const DEFAULT_MAX_INLINE_DATA_SIZE: usize = 8;
/// Chunk size assumed when a compressed payload declares a chunk size of 0.
pub const DEFAULT_DATA_CHUNK_SIZE: u32 = 64 * 1024;
pub const MIN_DATA_CHUNK_SIZE: u32 = 1024;
pub const MAX_DATA_CHUNK_SIZE: u32 = 10 * 1024 * 1024;
/// Upper bound on the uncompressed TOC size accepted from a header.
pub const DEFAULT_MAX_TOC_SIZE: u64 = 64 * 1024 * 1024;
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;
pub const DEFAULT_SCRATCH_BUFFER_SIZE: usize = 64 * 1024;
pub const DEFAULT_OFFSET_CACHE_ENTRIES: usize = 256;

/// Limits and format constants used by a [`PackageReader`](crate::PackageReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    pub max_inline_data_size: usize,
    pub default_chunk_size: u32,
    pub min_chunk_size: u32,
    pub max_chunk_size: u32,
    pub max_toc_size: u64,
    /// Maximum depth of the attribute handler stack, root included.
    pub max_tree_depth: usize,
    /// Size of the scratch buffer compressed sections are streamed through.
    pub scratch_buffer_size: usize,
    /// Number of chunk offsets a block-compressed reader keeps in memory.
    pub offset_cache_entries: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_inline_data_size: DEFAULT_MAX_INLINE_DATA_SIZE,
            default_chunk_size: DEFAULT_DATA_CHUNK_SIZE,
            min_chunk_size: MIN_DATA_CHUNK_SIZE,
            max_chunk_size: MAX_DATA_CHUNK_SIZE,
            max_toc_size: DEFAULT_MAX_TOC_SIZE,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            scratch_buffer_size: DEFAULT_SCRATCH_BUFFER_SIZE,
            offset_cache_entries: DEFAULT_OFFSET_CACHE_ENTRIES,
        }
    }
}

impl ReaderOptions {
    pub fn with_max_toc_size(mut self, max_toc_size: u64) -> Self {
        self.max_toc_size = max_toc_size;
        self
    }

    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    pub fn with_max_inline_data_size(mut self, max_inline_data_size: usize) -> Self {
        self.max_inline_data_size = max_inline_data_size;
        self
    }

    pub fn with_default_chunk_size(mut self, default_chunk_size: u32) -> Self {
        self.default_chunk_size = default_chunk_size;
        self
    }

    pub fn with_scratch_buffer_size(mut self, scratch_buffer_size: usize) -> Self {
        self.scratch_buffer_size = scratch_buffer_size;
        self
    }

    pub fn with_offset_cache_entries(mut self, offset_cache_entries: usize) -> Self {
        self.offset_cache_entries = offset_cache_entries;
        self
    }

    /// Checks that the limits are consistent with each other.
    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size == 0 || self.min_chunk_size > self.max_chunk_size {
            return Err(HpkgError::BadValue(format!(
                "Invalid chunk size range [{}, {}]",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if !(self.min_chunk_size..=self.max_chunk_size).contains(&self.default_chunk_size) {
            return Err(HpkgError::BadValue(format!(
                "Default chunk size {} outside of [{}, {}]",
                self.default_chunk_size, self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.max_tree_depth == 0 {
            return Err(HpkgError::BadValue("Maximum tree depth must be at least 1".to_string()));
        }
        if self.scratch_buffer_size == 0 || self.offset_cache_entries == 0 {
            return Err(HpkgError::BadValue(
                "Scratch buffer and offset cache must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates a payload's declared chunk size, substituting the default for 0.
    pub fn resolve_chunk_size(&self, chunk_size: u32) -> Result<u32> {
        let chunk_size = if chunk_size == 0 { self.default_chunk_size } else { chunk_size };
        if !(self.min_chunk_size..=self.max_chunk_size).contains(&chunk_size) {
            return Err(HpkgError::MalformedData(format!(
                "Chunk size {} outside of [{}, {}]",
                chunk_size, self.min_chunk_size, self.max_chunk_size
            )));
        }
        Ok(chunk_size)
    }
}
