//! Custom error types for the hpkg-reader crate.

use thiserror::Error;

/// Coarse classification of every [`HpkgError`].
///
/// Tools built on top of the reader usually only need to know *what kind* of
/// failure happened (to pick an exit code or a message), not the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Any structural violation of the package format.
    MalformedData,
    /// An allocation demanded by the package could not be satisfied.
    OutOfMemory,
    /// The byte-range reader failed.
    Io,
    /// A recognized but unimplemented version or compression algorithm.
    Unsupported,
    /// The caller passed an argument outside the valid range.
    BadValue,
    /// A content handler rejected an entry or attribute.
    Handler,
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum HpkgError {
    /// An error originating from the underlying byte-range reader.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file is structurally invalid or does not conform to the package format.
    #[error("Malformed package data: {0}")]
    MalformedData(String),

    /// A declared count of items does not match the actual number of items found.
    #[error("Count mismatch for {item_type}: expected {expected}, but found {found}")]
    CountMismatch {
        item_type: &'static str,
        expected: u64,
        found: u64,
    },

    /// A buffer or section has an unexpected size after an operation.
    #[error("Size mismatch for {context}: expected {expected} bytes, but found {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// The package file version is not the one this reader implements.
    #[error("Unsupported package file version: {0}. Only version 1 is supported.")]
    UnsupportedVersion(u16),

    /// The compression algorithm is known, but no decompressor is registered for it.
    #[error("Unsupported compression algorithm: {0}")]
    UnsupportedCompression(u32),

    /// The decompressor rejected its input.
    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    /// A buffer demanded by the package could not be allocated.
    #[error("Out of memory allocating {size} bytes for {context}")]
    OutOfMemory { context: &'static str, size: u64 },

    /// An argument is outside of its valid range (e.g. a read past the end of the data).
    #[error("Bad value: {0}")]
    BadValue(String),

    /// A content handler callback refused to continue.
    #[error("Content handler failed: {0}")]
    Handler(String),

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,

    /// An error raised while walking the attribute tree, tagged with the
    /// handler stack depth at which it occurred.
    #[error("Attribute tree error at level {level}: {source}")]
    AtLevel {
        level: usize,
        #[source]
        source: Box<HpkgError>,
    },
}

impl HpkgError {
    /// Maps the error onto the coarse [`ErrorKind`] taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HpkgError::Io(_) | HpkgError::LockPoisoned => ErrorKind::Io,
            HpkgError::MalformedData(_)
            | HpkgError::CountMismatch { .. }
            | HpkgError::SizeMismatch { .. }
            | HpkgError::DecompressionError(_) => ErrorKind::MalformedData,
            HpkgError::UnsupportedVersion(_) | HpkgError::UnsupportedCompression(_) => {
                ErrorKind::Unsupported
            }
            HpkgError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            HpkgError::BadValue(_) => ErrorKind::BadValue,
            HpkgError::Handler(_) => ErrorKind::Handler,
            HpkgError::AtLevel { source, .. } => source.kind(),
        }
    }

    /// Strips any [`HpkgError::AtLevel`] wrapping and returns the originating error.
    pub fn root_cause(&self) -> &HpkgError {
        match self {
            HpkgError::AtLevel { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A convenience `Result` type alias using the crate's `HpkgError` type.
pub type Result<T> = std::result::Result<T, HpkgError>;
