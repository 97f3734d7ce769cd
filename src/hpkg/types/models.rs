//! Core data structures for package format components.
//!
//! This module defines the fundamental types used throughout the library:
//! - Attribute types, values and the string table of a TOC
//! - Payload descriptors ([`PackageData`])
//! - The entries and extended attributes built while walking the TOC
//! - Package-level metadata from the package attributes section

use std::fmt;

use super::error::{HpkgError, Result};
use super::standard::StandardAttribute;

/// Compression applied to a section or to an entry's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    None,
    Zlib,
}

impl CompressionType {
    /// On-disk code of this compression type.
    pub fn code(self) -> u32 {
        match self {
            CompressionType::None => 0,
            CompressionType::Zlib => 1,
        }
    }
}

impl TryFrom<u32> for CompressionType {
    type Error = HpkgError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            _ => Err(HpkgError::MalformedData(format!("Unknown compression type: {}", value))),
        }
    }
}

/// The declared value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValueType {
    Int,
    Uint,
    String,
    Raw,
}

impl AttributeValueType {
    pub fn code(self) -> u8 {
        match self {
            AttributeValueType::Int => 1,
            AttributeValueType::Uint => 2,
            AttributeValueType::String => 3,
            AttributeValueType::Raw => 4,
        }
    }
}

impl TryFrom<u8> for AttributeValueType {
    type Error = HpkgError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Int),
            2 => Ok(Self::Uint),
            3 => Ok(Self::String),
            4 => Ok(Self::Raw),
            _ => Err(HpkgError::MalformedData(format!("Unknown attribute type: {}", value))),
        }
    }
}

/// One record of the TOC attribute-type table.
///
/// The standard attribute (if any) is resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub type_code: u8,
    pub name: String,
    pub standard: Option<StandardAttribute>,
}

impl AttributeType {
    pub fn new(type_code: u8, name: impl Into<String>) -> Self {
        let name = name.into();
        let standard = StandardAttribute::lookup(type_code, &name);
        Self {
            type_code,
            name,
            standard,
        }
    }
}

/// The deduplicated strings of a TOC, referenced by index from attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    pub fn get(&self, index: u64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.strings.get(index))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

/// A decoded attribute value.
///
/// Strings and inline raw bytes borrow from the TOC buffer (or the string
/// table) of the parse session that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue<'a> {
    Int(i64),
    Uint(u64),
    String(&'a str),
    /// Raw bytes stored inline in the TOC.
    Raw(&'a [u8]),
    /// Raw bytes stored in the heap, relative to the heap start.
    HeapData { offset: u64, size: u64 },
}

impl<'a> AttributeValue<'a> {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            AttributeValue::Uint(v) => Some(v),
            AttributeValue::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            AttributeValue::Int(v) => Some(v),
            AttributeValue::Uint(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Where the bytes described by a [`PackageData`] live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    /// Offset relative to the start of the heap.
    Heap { offset: u64 },
    /// Small payloads stored directly in the TOC.
    Inline(Vec<u8>),
}

/// Describes the payload of an entry or an entry attribute.
///
/// The default value is an empty payload (no content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageData {
    compressed_size: u64,
    uncompressed_size: u64,
    compression: CompressionType,
    chunk_size: u32,
    location: DataLocation,
}

impl Default for PackageData {
    fn default() -> Self {
        Self {
            compressed_size: 0,
            uncompressed_size: 0,
            compression: CompressionType::None,
            chunk_size: 0,
            location: DataLocation::Heap { offset: 0 },
        }
    }
}

impl PackageData {
    /// Payload stored in the heap. A `chunk_size` of 0 selects the default.
    pub fn heap(
        offset: u64,
        compressed_size: u64,
        uncompressed_size: u64,
        compression: CompressionType,
        chunk_size: u32,
    ) -> Result<Self> {
        if compression == CompressionType::None && compressed_size != uncompressed_size {
            return Err(HpkgError::SizeMismatch {
                context: "uncompressed heap data",
                expected: compressed_size,
                found: uncompressed_size,
            });
        }
        Ok(Self {
            compressed_size,
            uncompressed_size,
            compression,
            chunk_size,
            location: DataLocation::Heap { offset },
        })
    }

    /// Payload stored inline in the TOC; never compressed.
    pub fn inline(bytes: &[u8], max_inline_size: usize) -> Result<Self> {
        if bytes.len() > max_inline_size {
            return Err(HpkgError::MalformedData(format!(
                "Inline data of {} bytes exceeds the maximum of {} bytes",
                bytes.len(),
                max_inline_size
            )));
        }
        Ok(Self {
            compressed_size: bytes.len() as u64,
            uncompressed_size: bytes.len() as u64,
            compression: CompressionType::None,
            chunk_size: 0,
            location: DataLocation::Inline(bytes.to_vec()),
        })
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn location(&self) -> &DataLocation {
        &self.location
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.location, DataLocation::Inline(_))
    }

    /// Heap-relative offset, `None` for inline data.
    pub fn offset(&self) -> Option<u64> {
        match self.location {
            DataLocation::Heap { offset } => Some(offset),
            DataLocation::Inline(_) => None,
        }
    }

    pub fn inline_data(&self) -> Option<&[u8]> {
        match &self.location {
            DataLocation::Inline(bytes) => Some(bytes),
            DataLocation::Heap { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uncompressed_size == 0
    }
}

/// Kind of filesystem node an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryType {
    #[default]
    File,
    Directory,
    Symlink,
}

impl EntryType {
    /// Permissions assumed when the entry does not declare any.
    pub fn default_permissions(self) -> u32 {
        match self {
            EntryType::File => 0o644,
            EntryType::Directory => 0o755,
            EntryType::Symlink => 0o777,
        }
    }
}

impl TryFrom<u64> for EntryType {
    type Error = HpkgError;
    fn try_from(value: u64) -> Result<Self> {
        match value {
            0 => Ok(Self::File),
            1 => Ok(Self::Directory),
            2 => Ok(Self::Symlink),
            _ => Err(HpkgError::MalformedData(format!("Unknown file type: {}", value))),
        }
    }
}

/// Identifier of an entry within one parse session, assigned in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

/// A timestamp with a nanosecond component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct EntryTime {
    pub seconds: u64,
    pub nanos: u32,
}

/// A filesystem-like node of the package tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub id: EntryId,
    /// Back-reference to the containing directory entry, `None` at top level.
    pub parent: Option<EntryId>,
    pub name: String,
    pub entry_type: EntryType,
    pub permissions: u32,
    pub user: Option<String>,
    pub group: Option<String>,
    pub access_time: EntryTime,
    pub modified_time: EntryTime,
    pub creation_time: EntryTime,
    pub symlink_target: Option<String>,
    pub data: PackageData,
}

impl PackageEntry {
    pub fn new(id: EntryId, parent: Option<EntryId>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            name: name.into(),
            entry_type: EntryType::File,
            permissions: EntryType::File.default_permissions(),
            user: None,
            group: None,
            access_time: EntryTime::default(),
            modified_time: EntryTime::default(),
            creation_time: EntryTime::default(),
            symlink_target: None,
            data: PackageData::default(),
        }
    }
}

/// A named, typed extended attribute attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntryAttribute {
    pub name: String,
    pub type_code: u32,
    pub data: PackageData,
}

impl PackageEntryAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: 0,
            data: PackageData::default(),
        }
    }
}

/// One decoded attribute of the package attributes section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAttribute<'a> {
    Name(&'a str),
    Summary(&'a str),
    Description(&'a str),
    Vendor(&'a str),
    Packager(&'a str),
    Flags(u32),
    Architecture(u32),
    VersionMajor(&'a str),
    VersionMinor(&'a str),
    VersionMicro(&'a str),
    VersionRelease(u32),
    Copyright(&'a str),
    License(&'a str),
    Provides(&'a str),
    Requires(&'a str),
}

/// A package version, printed as `major.minor.micro-release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersion {
    pub major: String,
    pub minor: Option<String>,
    pub micro: Option<String>,
    /// `0` when the version has no release part.
    pub release: u32,
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = &self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(micro) = &self.micro {
            write!(f, ".{}", micro)?;
        }
        if self.release != 0 {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

/// Package-level metadata. Single-valued attributes keep their last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub packager: Option<String>,
    pub flags: u32,
    pub architecture: u32,
    pub version: Option<PackageVersion>,
    pub copyrights: Vec<String>,
    pub licenses: Vec<String>,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
}

impl PackageInfo {
    pub fn apply(&mut self, attribute: &PackageAttribute<'_>) {
        match *attribute {
            PackageAttribute::Name(name) => self.name = Some(name.to_string()),
            PackageAttribute::Summary(summary) => self.summary = Some(summary.to_string()),
            PackageAttribute::Description(text) => self.description = Some(text.to_string()),
            PackageAttribute::Vendor(vendor) => self.vendor = Some(vendor.to_string()),
            PackageAttribute::Packager(packager) => self.packager = Some(packager.to_string()),
            PackageAttribute::Flags(flags) => self.flags = flags,
            PackageAttribute::Architecture(architecture) => self.architecture = architecture,
            PackageAttribute::VersionMajor(major) => self.version_mut().major = major.to_string(),
            PackageAttribute::VersionMinor(minor) => {
                self.version_mut().minor = Some(minor.to_string());
            }
            PackageAttribute::VersionMicro(micro) => {
                self.version_mut().micro = Some(micro.to_string());
            }
            PackageAttribute::VersionRelease(release) => self.version_mut().release = release,
            PackageAttribute::Copyright(copyright) => self.copyrights.push(copyright.to_string()),
            PackageAttribute::License(license) => self.licenses.push(license.to_string()),
            PackageAttribute::Provides(provides) => self.provides.push(provides.to_string()),
            PackageAttribute::Requires(requires) => self.requires.push(requires.to_string()),
        }
    }

    fn version_mut(&mut self) -> &mut PackageVersion {
        self.version.get_or_insert_with(PackageVersion::default)
    }
}
