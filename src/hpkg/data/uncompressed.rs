use crate::hpkg::io::ReadAt;
use crate::hpkg::types::error::Result;

use super::{PackageDataReader, check_read_range};

/// Pass-through reader for a heap payload stored without compression.
#[derive(Debug)]
pub struct UncompressedDataReader<'s, S: ?Sized> {
    source: &'s S,
    file_offset: u64,
    size: u64,
    block_size: u64,
}

impl<'s, S: ReadAt + ?Sized> UncompressedDataReader<'s, S> {
    /// `file_offset` is the absolute position of the payload in `source`.
    pub fn new(source: &'s S, file_offset: u64, size: u64, block_size: u32) -> Self {
        Self {
            source,
            file_offset,
            size,
            block_size: u64::from(block_size),
        }
    }
}

impl<S: ReadAt + ?Sized> PackageDataReader for UncompressedDataReader<'_, S> {
    fn size(&self) -> u64 {
        self.size
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }

    fn read_data(&mut self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        check_read_range(offset, buffer.len(), self.size)?;
        self.source.read_exact_at(self.file_offset + offset, buffer)
    }
}
