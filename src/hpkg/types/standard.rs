//! Table of well-known attribute `(name, type)` pairs.
//!
//! Every attribute type declared in a TOC is matched against this table once,
//! when the type table is loaded. Handlers then dispatch on the resulting
//! [`StandardAttribute`] instead of comparing names for every occurrence.

use super::models::{AttributeType, AttributeValueType};

/// A well-known attribute recognized by the entry and package handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardAttribute {
    DirectoryEntry,
    FileType,
    FilePermissions,
    FileUser,
    FileGroup,
    FileAtime,
    FileAtimeNanos,
    FileMtime,
    FileMtimeNanos,
    FileCrtime,
    FileCrtimeNanos,
    FileAttribute,
    FileAttributeType,
    Data,
    DataCompression,
    DataSize,
    DataChunkSize,
    SymlinkTarget,
    PackageName,
    PackageSummary,
    PackageDescription,
    PackageVendor,
    PackagePackager,
    PackageFlags,
    PackageArchitecture,
    PackageVersionMajor,
    PackageVersionMinor,
    PackageVersionMicro,
    PackageVersionRelease,
    PackageCopyright,
    PackageLicense,
    PackageProvides,
    PackageRequires,
}

// Kept in the same order as the enum variants; `index()` relies on it.
const STANDARD_ATTRIBUTES: &[(&str, AttributeValueType, StandardAttribute)] = &[
    ("dir:entry", AttributeValueType::String, StandardAttribute::DirectoryEntry),
    ("file:type", AttributeValueType::Uint, StandardAttribute::FileType),
    ("file:permissions", AttributeValueType::Uint, StandardAttribute::FilePermissions),
    ("file:user", AttributeValueType::String, StandardAttribute::FileUser),
    ("file:group", AttributeValueType::String, StandardAttribute::FileGroup),
    ("file:atime", AttributeValueType::Uint, StandardAttribute::FileAtime),
    ("file:atime:nanos", AttributeValueType::Uint, StandardAttribute::FileAtimeNanos),
    ("file:mtime", AttributeValueType::Uint, StandardAttribute::FileMtime),
    ("file:mtime:nanos", AttributeValueType::Uint, StandardAttribute::FileMtimeNanos),
    ("file:crtime", AttributeValueType::Uint, StandardAttribute::FileCrtime),
    ("file:crtime:nanos", AttributeValueType::Uint, StandardAttribute::FileCrtimeNanos),
    ("file:attribute", AttributeValueType::String, StandardAttribute::FileAttribute),
    ("file:attribute:type", AttributeValueType::Uint, StandardAttribute::FileAttributeType),
    ("data", AttributeValueType::Raw, StandardAttribute::Data),
    ("data:compression", AttributeValueType::Uint, StandardAttribute::DataCompression),
    ("data:size", AttributeValueType::Uint, StandardAttribute::DataSize),
    ("data:chunk_size", AttributeValueType::Uint, StandardAttribute::DataChunkSize),
    ("symlink:target", AttributeValueType::String, StandardAttribute::SymlinkTarget),
    ("package:name", AttributeValueType::String, StandardAttribute::PackageName),
    ("package:summary", AttributeValueType::String, StandardAttribute::PackageSummary),
    ("package:description", AttributeValueType::String, StandardAttribute::PackageDescription),
    ("package:vendor", AttributeValueType::String, StandardAttribute::PackageVendor),
    ("package:packager", AttributeValueType::String, StandardAttribute::PackagePackager),
    ("package:flags", AttributeValueType::Uint, StandardAttribute::PackageFlags),
    ("package:architecture", AttributeValueType::Uint, StandardAttribute::PackageArchitecture),
    ("package:version.major", AttributeValueType::String, StandardAttribute::PackageVersionMajor),
    ("package:version.minor", AttributeValueType::String, StandardAttribute::PackageVersionMinor),
    ("package:version.micro", AttributeValueType::String, StandardAttribute::PackageVersionMicro),
    ("package:version.release", AttributeValueType::Uint, StandardAttribute::PackageVersionRelease),
    ("package:copyright", AttributeValueType::String, StandardAttribute::PackageCopyright),
    ("package:license", AttributeValueType::String, StandardAttribute::PackageLicense),
    ("package:provides", AttributeValueType::String, StandardAttribute::PackageProvides),
    ("package:requires", AttributeValueType::String, StandardAttribute::PackageRequires),
];

impl StandardAttribute {
    /// Looks up the standard attribute for a declared `(type_code, name)` pair.
    ///
    /// Both parts must match: an attribute named `data` with a string type is
    /// a user-defined attribute, not the standard one.
    pub fn lookup(type_code: u8, name: &str) -> Option<Self> {
        STANDARD_ATTRIBUTES
            .iter()
            .find(|(n, t, _)| t.code() == type_code && *n == name)
            .map(|(_, _, attribute)| *attribute)
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    pub fn value_type(self) -> AttributeValueType {
        self.entry().1
    }

    /// Position of this attribute in the standard table.
    pub fn index(self) -> usize {
        self as usize
    }

    fn entry(self) -> &'static (&'static str, AttributeValueType, StandardAttribute) {
        &STANDARD_ATTRIBUTES[self.index()]
    }
}

/// The whole standard table as attribute types, position `i` holding the
/// attribute with index `i`.
///
/// The package attributes section has no type table of its own: its tags
/// carry standard indices.
pub fn standard_attribute_types() -> Vec<AttributeType> {
    STANDARD_ATTRIBUTES
        .iter()
        .map(|&(name, value_type, attribute)| AttributeType {
            type_code: value_type.code(),
            name: name.to_string(),
            standard: Some(attribute),
        })
        .collect()
}
