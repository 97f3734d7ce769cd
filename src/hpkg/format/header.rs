//! Package file header parsing and section layout validation.
//!
//! This module handles:
//! - Reading the fixed-size header at offset 0
//! - Checking magic, version and total size
//! - Validating the per-section compression claims
//! - Computing the byte ranges of the heap, TOC and package attributes sections

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, info, trace};

use crate::hpkg::io::ReadAt;
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::CompressionType,
    options::ReaderOptions,
};

/// `b"hpkg"` read as a big-endian u32.
pub const HPKG_MAGIC: u32 = 0x6870_6b67;
pub const HPKG_VERSION: u16 = 1;
/// On-disk size of [`PackageHeader`].
pub const HPKG_HEADER_SIZE: usize = 88;

/// The fixed header at the start of every package file.
///
/// # Header Structure
/// ```text
/// [4 bytes] magic "hpkg"          [2 bytes] header size
/// [2 bytes] version               [8 bytes] total file size
/// package attributes section:
///   [4] compression  [4] length compressed  [4] length uncompressed
///   [4] strings length  [4] strings count
/// TOC section:
///   [4] compression  [8] length compressed  [8] length uncompressed
///   [8] attribute types length  [8] attribute types count
///   [8] strings length  [8] strings count
/// ```
/// All fields are big-endian.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageHeader {
    pub magic: u32,
    pub header_size: u16,
    pub version: u16,
    pub total_size: u64,

    pub attributes_compression: u32,
    pub attributes_length_compressed: u32,
    pub attributes_length_uncompressed: u32,
    pub attributes_strings_length: u32,
    pub attributes_strings_count: u32,

    pub toc_compression: u32,
    pub toc_length_compressed: u64,
    pub toc_length_uncompressed: u64,
    pub toc_attribute_types_length: u64,
    pub toc_attribute_types_count: u64,
    pub toc_strings_length: u64,
    pub toc_strings_count: u64,
}

impl PackageHeader {
    /// Decodes the header from its on-disk bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HPKG_HEADER_SIZE {
            return Err(HpkgError::MalformedData(format!(
                "Header too short: {} bytes, need {}",
                bytes.len(),
                HPKG_HEADER_SIZE
            )));
        }
        let mut reader = &bytes[..HPKG_HEADER_SIZE];
        Ok(Self {
            magic: reader.read_u32::<BigEndian>()?,
            header_size: reader.read_u16::<BigEndian>()?,
            version: reader.read_u16::<BigEndian>()?,
            total_size: reader.read_u64::<BigEndian>()?,
            attributes_compression: reader.read_u32::<BigEndian>()?,
            attributes_length_compressed: reader.read_u32::<BigEndian>()?,
            attributes_length_uncompressed: reader.read_u32::<BigEndian>()?,
            attributes_strings_length: reader.read_u32::<BigEndian>()?,
            attributes_strings_count: reader.read_u32::<BigEndian>()?,
            toc_compression: reader.read_u32::<BigEndian>()?,
            toc_length_compressed: reader.read_u64::<BigEndian>()?,
            toc_length_uncompressed: reader.read_u64::<BigEndian>()?,
            toc_attribute_types_length: reader.read_u64::<BigEndian>()?,
            toc_attribute_types_count: reader.read_u64::<BigEndian>()?,
            toc_strings_length: reader.read_u64::<BigEndian>()?,
            toc_strings_count: reader.read_u64::<BigEndian>()?,
        })
    }

    /// Reads and decodes the header at offset 0 of `source`.
    pub fn read<S: ReadAt + ?Sized>(source: &S) -> Result<Self> {
        let mut bytes = [0u8; HPKG_HEADER_SIZE];
        source.read_exact_at(0, &mut bytes).map_err(|e| match e {
            HpkgError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                HpkgError::MalformedData("File too small to hold a package header".to_string())
            }
            other => other,
        })?;
        Self::parse(&bytes)
    }
}

/// Compression claim of one independently compressed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    pub compression: CompressionType,
    pub compressed_length: u64,
    pub uncompressed_length: u64,
}

impl SectionInfo {
    fn validate(name: &'static str, compression: u32, compressed: u64, uncompressed: u64) -> Result<Self> {
        let compression = CompressionType::try_from(compression)?;
        match compression {
            CompressionType::None if compressed != uncompressed => {
                return Err(HpkgError::MalformedData(format!(
                    "Uncompressed {} section claims {} compressed but {} uncompressed bytes",
                    name, compressed, uncompressed
                )));
            }
            CompressionType::Zlib if compressed >= uncompressed => {
                return Err(HpkgError::MalformedData(format!(
                    "Compressed {} section is not smaller than its content ({} >= {})",
                    name, compressed, uncompressed
                )));
            }
            _ => {}
        }
        trace!("{} section: {:?}, {} -> {} bytes", name, compression, compressed, uncompressed);
        Ok(Self {
            compression,
            compressed_length: compressed,
            uncompressed_length: uncompressed,
        })
    }
}

/// Validated byte ranges of all sections of a package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLayout {
    pub header_size: u64,
    pub total_size: u64,

    pub heap_offset: u64,
    pub heap_size: u64,

    pub toc_offset: u64,
    pub toc: SectionInfo,
    pub toc_attribute_types_length: u64,
    pub toc_attribute_types_count: u64,
    pub toc_strings_length: u64,
    pub toc_strings_count: u64,

    pub package_attributes_offset: u64,
    pub package_attributes: SectionInfo,
    pub package_attributes_strings_length: u64,
    pub package_attributes_strings_count: u64,
}

impl SectionLayout {
    /// Validates `header` against the actual file size and computes the layout.
    pub fn validate(header: &PackageHeader, file_size: u64, options: &ReaderOptions) -> Result<Self> {
        if header.magic != HPKG_MAGIC {
            return Err(HpkgError::MalformedData(format!(
                "Invalid magic {:#010x}, expected {:#010x}",
                header.magic, HPKG_MAGIC
            )));
        }
        let header_size = u64::from(header.header_size);
        if header_size < HPKG_HEADER_SIZE as u64 {
            return Err(HpkgError::MalformedData(format!(
                "Header size {} is smaller than the {} byte header",
                header_size, HPKG_HEADER_SIZE
            )));
        }
        if header.version != HPKG_VERSION {
            return Err(HpkgError::UnsupportedVersion(header.version));
        }
        if header.total_size != file_size {
            return Err(HpkgError::SizeMismatch {
                context: "package file",
                expected: header.total_size,
                found: file_size,
            });
        }

        let package_attributes = SectionInfo::validate(
            "package attributes",
            header.attributes_compression,
            u64::from(header.attributes_length_compressed),
            u64::from(header.attributes_length_uncompressed),
        )?;
        let toc = SectionInfo::validate(
            "TOC",
            header.toc_compression,
            header.toc_length_compressed,
            header.toc_length_uncompressed,
        )?;

        if toc.uncompressed_length > options.max_toc_size {
            return Err(HpkgError::MalformedData(format!(
                "TOC claims {} bytes, more than the {} byte limit",
                toc.uncompressed_length, options.max_toc_size
            )));
        }

        let package_attributes_offset = header
            .total_size
            .checked_sub(package_attributes.compressed_length)
            .filter(|offset| *offset >= header_size)
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "Package attributes section of {} bytes does not fit in the file",
                    package_attributes.compressed_length
                ))
            })?;
        let toc_offset = package_attributes_offset
            .checked_sub(toc.compressed_length)
            .filter(|offset| *offset >= header_size)
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "TOC section of {} bytes does not fit in the file",
                    toc.compressed_length
                ))
            })?;
        let heap_offset = header_size;
        let heap_size = toc_offset - heap_offset;

        let toc_sections_length = header
            .toc_attribute_types_length
            .checked_add(header.toc_strings_length)
            .filter(|length| *length <= toc.uncompressed_length)
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "TOC subsections ({} + {} bytes) exceed the TOC size of {} bytes",
                    header.toc_attribute_types_length,
                    header.toc_strings_length,
                    toc.uncompressed_length
                ))
            })?;
        trace!("TOC subsections occupy {} bytes", toc_sections_length);

        let package_attributes_strings_length = u64::from(header.attributes_strings_length);
        if package_attributes_strings_length > package_attributes.uncompressed_length {
            return Err(HpkgError::MalformedData(format!(
                "Package attributes strings ({} bytes) exceed the section size of {} bytes",
                package_attributes_strings_length, package_attributes.uncompressed_length
            )));
        }

        debug!(
            "Layout: heap=[{}, +{}), toc=[{}, +{}), attributes=[{}, +{})",
            heap_offset,
            heap_size,
            toc_offset,
            toc.compressed_length,
            package_attributes_offset,
            package_attributes.compressed_length
        );

        Ok(Self {
            header_size,
            total_size: header.total_size,
            heap_offset,
            heap_size,
            toc_offset,
            toc,
            toc_attribute_types_length: header.toc_attribute_types_length,
            toc_attribute_types_count: header.toc_attribute_types_count,
            toc_strings_length: header.toc_strings_length,
            toc_strings_count: header.toc_strings_count,
            package_attributes_offset,
            package_attributes,
            package_attributes_strings_length,
            package_attributes_strings_count: u64::from(header.attributes_strings_count),
        })
    }
}

/// Reads the header of `source` and validates it into a [`SectionLayout`].
pub fn parse<S: ReadAt + ?Sized>(source: &S, options: &ReaderOptions) -> Result<SectionLayout> {
    info!("Parsing package header");

    let header = PackageHeader::read(source)?;
    let file_size = source.size()?;
    let layout = SectionLayout::validate(&header, file_size, options)?;

    info!(
        "Header parsed successfully: version={}, total_size={}, heap={} bytes, toc={} bytes",
        header.version, layout.total_size, layout.heap_size, layout.toc.uncompressed_length
    );
    Ok(layout)
}
