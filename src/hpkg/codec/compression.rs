//! Decompression primitives for package sections and data chunks.
//!
//! A decompressor is an opaque stateful object: it is created, fed the
//! compressed bytes in as many pieces as the caller likes, and finally
//! finished. Its output goes to a [`DataOutput`] sink.
//!
//! Algorithms are looked up through a [`Decompressors`] registry so callers
//! can restrict the set of supported algorithms (or wrap them, e.g. to count
//! invocations).

use flate2::{Decompress, FlushDecompress, Status};
use log::trace;

use crate::hpkg::io::DataOutput;
use crate::hpkg::types::error::{HpkgError, Result};
use crate::hpkg::types::models::CompressionType;

const ZLIB_OUTPUT_BUFFER_SIZE: usize = 16 * 1024;

/// A single decompression run.
pub trait Decompressor {
    /// Decompresses the next piece of input, appending to `output`.
    fn decompress_next(&mut self, input: &[u8], output: &mut dyn DataOutput) -> Result<()>;

    /// Flushes pending output and verifies the stream is complete.
    fn finish(&mut self, output: &mut dyn DataOutput) -> Result<()>;
}

/// Factory for [`Decompressor`]s of one algorithm.
pub trait DecompressionAlgorithm {
    fn create_decompressor(&self) -> Result<Box<dyn Decompressor>>;
}

/// Zlib (deflate with zlib framing) via flate2.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZlibAlgorithm;

impl DecompressionAlgorithm for ZlibAlgorithm {
    fn create_decompressor(&self) -> Result<Box<dyn Decompressor>> {
        Ok(Box::new(ZlibDecompressor::new()))
    }
}

pub struct ZlibDecompressor {
    stream: Decompress,
    buffer: Vec<u8>,
    finished: bool,
}

impl ZlibDecompressor {
    pub fn new() -> Self {
        Self {
            stream: Decompress::new(true),
            buffer: vec![0u8; ZLIB_OUTPUT_BUFFER_SIZE],
            finished: false,
        }
    }

    /// Runs one inflate step and forwards whatever it produced.
    fn step(
        &mut self,
        input: &[u8],
        flush: FlushDecompress,
        output: &mut dyn DataOutput,
    ) -> Result<(usize, usize, Status)> {
        let in_before = self.stream.total_in();
        let out_before = self.stream.total_out();
        let status = self
            .stream
            .decompress(input, &mut self.buffer, flush)
            .map_err(|e| HpkgError::DecompressionError(format!("Zlib decompression failed: {}", e)))?;
        let consumed = (self.stream.total_in() - in_before) as usize;
        let produced = (self.stream.total_out() - out_before) as usize;
        output.write_data(&self.buffer[..produced])?;
        if status == Status::StreamEnd {
            self.finished = true;
        }
        Ok((consumed, produced, status))
    }
}

impl Default for ZlibDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for ZlibDecompressor {
    fn decompress_next(&mut self, mut input: &[u8], output: &mut dyn DataOutput) -> Result<()> {
        loop {
            if self.finished {
                if input.is_empty() {
                    return Ok(());
                }
                return Err(HpkgError::MalformedData(format!(
                    "{} bytes of trailing data after the end of the zlib stream",
                    input.len()
                )));
            }

            let (consumed, produced, _) = self.step(input, FlushDecompress::None, output)?;
            input = &input[consumed..];

            // A partially filled output buffer means inflate has nothing more to give for now.
            if input.is_empty() && produced < self.buffer.len() {
                return Ok(());
            }
            if consumed == 0 && produced == 0 {
                return Err(HpkgError::DecompressionError("Zlib stream stalled".to_string()));
            }
        }
    }

    fn finish(&mut self, output: &mut dyn DataOutput) -> Result<()> {
        while !self.finished {
            let (_, produced, _) = self.step(&[], FlushDecompress::Finish, output)?;
            if !self.finished && produced == 0 {
                return Err(HpkgError::MalformedData(
                    "Zlib stream ended prematurely".to_string(),
                ));
            }
        }
        trace!(
            "Zlib stream finished: {} bytes in, {} bytes out",
            self.stream.total_in(),
            self.stream.total_out()
        );
        Ok(())
    }
}

/// Registry of the decompression algorithms available to a reader.
pub struct Decompressors {
    zlib: Option<Box<dyn DecompressionAlgorithm>>,
}

impl Decompressors {
    /// All algorithms this crate implements.
    pub fn standard() -> Self {
        Self {
            zlib: Some(Box::new(ZlibAlgorithm)),
        }
    }

    /// No algorithms at all; only uncompressed packages can be read.
    pub fn empty() -> Self {
        Self { zlib: None }
    }

    /// Registers (or replaces) the algorithm used for `compression`.
    pub fn with(
        mut self,
        compression: CompressionType,
        algorithm: Box<dyn DecompressionAlgorithm>,
    ) -> Result<Self> {
        match compression {
            CompressionType::Zlib => self.zlib = Some(algorithm),
            CompressionType::None => {
                return Err(HpkgError::BadValue(
                    "Uncompressed data does not take a decompressor".to_string(),
                ));
            }
        }
        Ok(self)
    }

    pub fn supports(&self, compression: CompressionType) -> bool {
        match compression {
            CompressionType::None => true,
            CompressionType::Zlib => self.zlib.is_some(),
        }
    }

    pub fn create(&self, compression: CompressionType) -> Result<Box<dyn Decompressor>> {
        let algorithm = match compression {
            CompressionType::Zlib => self.zlib.as_ref(),
            CompressionType::None => {
                return Err(HpkgError::BadValue(
                    "Uncompressed data does not take a decompressor".to_string(),
                ));
            }
        };
        algorithm
            .ok_or(HpkgError::UnsupportedCompression(compression.code()))?
            .create_decompressor()
    }
}

impl Default for Decompressors {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Decompressors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decompressors")
            .field("zlib", &self.zlib.is_some())
            .finish()
    }
}
