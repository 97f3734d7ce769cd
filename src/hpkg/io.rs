//! Byte-range input and bounded output used by the decoder.
//!
//! - [`ReadAt`]: positioned reads from the package file (or any in-memory copy of it)
//! - [`DataOutput`]: the sink a decompressor writes into

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use log::trace;

use super::types::error::{HpkgError, Result};

/// Positioned reads from a package file.
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes at `offset`, returning the number of bytes read.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Total size of the source in bytes.
    fn size(&self) -> Result<u64>;

    /// Fills `buf` completely from `offset` or fails.
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let read = self.read_at(offset, buf)?;
            if read == 0 {
                return Err(HpkgError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Unexpected end of file at offset {}", offset),
                )));
            }
            offset += read as u64;
            buf = &mut buf[read..];
        }
        Ok(())
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let count = buf.len().min(self.len() - start);
        buf[..count].copy_from_slice(&self[start..start + count]);
        Ok(count)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.as_slice().read_at(offset, buf)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> Result<u64> {
        (**self).size()
    }
}

/// A package file on disk.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    size: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        trace!("Opening package file: {}", path.display());
        let file = File::open(path)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl ReadAt for FileSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file.lock().map_err(|_| HpkgError::LockPoisoned)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(file.read(buf)?)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// Destination of decompressed bytes.
pub trait DataOutput {
    fn write_data(&mut self, data: &[u8]) -> Result<()>;
}

/// A bounded in-memory sink; writing past its end is malformed input.
#[derive(Debug)]
pub struct BufferDataOutput<'a> {
    buffer: &'a mut [u8],
    written: usize,
}

impl<'a> BufferDataOutput<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }
}

impl DataOutput for BufferDataOutput<'_> {
    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let end = self.written + data.len();
        if end > self.buffer.len() {
            return Err(HpkgError::MalformedData(format!(
                "Decompressed data exceeds the expected {} bytes",
                self.buffer.len()
            )));
        }
        self.buffer[self.written..end].copy_from_slice(data);
        self.written = end;
        Ok(())
    }
}
