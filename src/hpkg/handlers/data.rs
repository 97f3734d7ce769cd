//! Handler of a `data` attribute and its `data:*` children.

use log::trace;

use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{AttributeType, AttributeValue, CompressionType, PackageData},
    standard::StandardAttribute,
};

use super::{AttributeHandler, BoxedHandler, Finished, HandlerContext, u32_value, uint_value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Inline(Vec<u8>),
    Heap { offset: u64, size: u64 },
}

/// Collects the description of one payload.
///
/// A heap payload without a `data:size` child has an uncompressed size equal
/// to its stored size.
#[derive(Debug, Clone)]
pub struct DataHandler {
    payload: Payload,
    compression: CompressionType,
    uncompressed_size: Option<u64>,
    chunk_size: u32,
    max_inline_data_size: usize,
}

impl DataHandler {
    pub fn new(value: &AttributeValue<'_>, max_inline_data_size: usize) -> Result<Self> {
        let payload = match *value {
            AttributeValue::Raw(bytes) => Payload::Inline(bytes.to_vec()),
            AttributeValue::HeapData { offset, size } => Payload::Heap { offset, size },
            _ => {
                return Err(HpkgError::MalformedData(format!(
                    "Data attribute requires a raw value, got {:?}",
                    value
                )));
            }
        };
        Ok(Self {
            payload,
            compression: CompressionType::None,
            uncompressed_size: None,
            chunk_size: 0,
            max_inline_data_size,
        })
    }

    /// Builds the final descriptor.
    pub fn build(&self) -> Result<PackageData> {
        match &self.payload {
            Payload::Inline(bytes) => {
                if self.compression != CompressionType::None {
                    return Err(HpkgError::MalformedData(
                        "Inline data cannot be compressed".to_string(),
                    ));
                }
                if let Some(size) = self.uncompressed_size
                    && size != bytes.len() as u64
                {
                    return Err(HpkgError::SizeMismatch {
                        context: "inline data",
                        expected: size,
                        found: bytes.len() as u64,
                    });
                }
                PackageData::inline(bytes, self.max_inline_data_size)
            }
            Payload::Heap { offset, size } => PackageData::heap(
                *offset,
                *size,
                self.uncompressed_size.unwrap_or(*size),
                self.compression,
                self.chunk_size,
            ),
        }
    }
}

impl<'a, C: ?Sized> AttributeHandler<'a, C> for DataHandler {
    fn kind(&self) -> &'static str {
        "data"
    }

    fn handle_child(
        &mut self,
        _context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        match attribute.standard {
            Some(StandardAttribute::DataCompression) => {
                self.compression = CompressionType::try_from(u32_value(attribute, &value)?)?;
            }
            Some(StandardAttribute::DataSize) => {
                self.uncompressed_size = Some(uint_value(attribute, &value)?);
            }
            Some(StandardAttribute::DataChunkSize) => {
                self.chunk_size = u32_value(attribute, &value)?;
            }
            _ => trace!("Data: ignoring attribute '{}'", attribute.name),
        }
        Ok(None)
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Data(self.build()?))
    }
}
