use crate::hpkg::types::error::Result;

use super::{PackageDataReader, check_read_range};

/// Reader over a payload stored inline in the TOC.
#[derive(Debug, Clone, Default)]
pub struct InlineDataReader {
    data: Vec<u8>,
}

impl InlineDataReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl PackageDataReader for InlineDataReader {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn block_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_data(&mut self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        check_read_range(offset, buffer.len(), self.size())?;
        let start = offset as usize;
        buffer.copy_from_slice(&self.data[start..start + buffer.len()]);
        Ok(())
    }
}
