//! Decompression of a whole file section into memory.
//!
//! Compressed bytes are streamed from the source through a caller-owned
//! scratch buffer, so the compressed section never has to be resident.

use log::{debug, trace};

use crate::hpkg::io::{BufferDataOutput, ReadAt};
use crate::hpkg::types::error::{HpkgError, Result};
use crate::hpkg::types::models::CompressionType;

use super::compression::Decompressors;

pub struct BlockDecompressor<'a> {
    decompressors: &'a Decompressors,
    scratch: &'a mut [u8],
}

impl<'a> BlockDecompressor<'a> {
    pub fn new(decompressors: &'a Decompressors, scratch: &'a mut [u8]) -> Result<Self> {
        if scratch.is_empty() {
            return Err(HpkgError::BadValue("Scratch buffer must not be empty".to_string()));
        }
        Ok(Self {
            decompressors,
            scratch,
        })
    }

    /// Decompresses `compressed_size` bytes at `offset` into `output`.
    ///
    /// The output buffer's length is the advertised uncompressed size; producing
    /// fewer or more bytes than that is malformed input.
    pub fn decompress<S: ReadAt + ?Sized>(
        &mut self,
        source: &S,
        offset: u64,
        compressed_size: u64,
        compression: CompressionType,
        output: &mut [u8],
    ) -> Result<()> {
        debug!(
            "Decompressing section at {}: {} bytes ({:?}) -> {} bytes",
            offset,
            compressed_size,
            compression,
            output.len()
        );

        if compression == CompressionType::None {
            if compressed_size != output.len() as u64 {
                return Err(HpkgError::SizeMismatch {
                    context: "uncompressed section",
                    expected: output.len() as u64,
                    found: compressed_size,
                });
            }
            return source.read_exact_at(offset, output);
        }

        let mut decompressor = self.decompressors.create(compression)?;
        let mut sink = BufferDataOutput::new(output);
        let mut position = 0u64;
        while position < compressed_size {
            let to_read = (compressed_size - position).min(self.scratch.len() as u64) as usize;
            let piece = &mut self.scratch[..to_read];
            source.read_exact_at(offset + position, piece)?;
            decompressor.decompress_next(piece, &mut sink)?;
            position += to_read as u64;
            trace!("Fed {} of {} compressed bytes", position, compressed_size);
        }
        decompressor.finish(&mut sink)?;

        let written = sink.bytes_written();
        if written != output.len() {
            return Err(HpkgError::SizeMismatch {
                context: "decompressed section",
                expected: output.len() as u64,
                found: written as u64,
            });
        }
        Ok(())
    }
}
