//! # hpkg-reader
//!
//! A read-only decoder for HPKG package files.
//! Validates the container, walks the TOC attribute tree into entries and
//! extended attributes, and reads entry payloads at random offsets without
//! decompressing the whole package.
pub mod hpkg;

// Re-export the main types for convenience
pub use hpkg::{
    ErrorKind, HpkgError, PackageReader, Result,
    codec::compression::{DecompressionAlgorithm, Decompressor, Decompressors, ZlibAlgorithm},
    data::{HeapRange, PackageDataReader},
    format::{header::SectionLayout, walker::WalkStats},
    handlers::{
        AttributeToken, ContentHandler, LowLevelHandler, PackageInfoHandler,
        collector::{CollectedEntry, EntryCollector, PackageInfoCollector},
    },
    io::{DataOutput, FileSource, ReadAt},
    types::{
        models::{
            AttributeType, AttributeValue, AttributeValueType, CompressionType, DataLocation,
            EntryId, EntryTime, EntryType, PackageAttribute, PackageData, PackageEntry,
            PackageEntryAttribute, PackageInfo, PackageVersion, StringTable,
        },
        options::ReaderOptions,
        standard::StandardAttribute,
    },
};
