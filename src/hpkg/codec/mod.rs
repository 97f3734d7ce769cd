//! Codec layer for the variable-length integer and decompression primitives.
//!
//! # Submodules
//!
//! - [`varint`][]: Unsigned LEB128 decoding used throughout the TOC
//! - [`compression`][]: Decompressor interface, zlib implementation and registry
//! - [`block`][]: Streaming decompression of whole sections into memory

pub mod block;
pub mod compression;
pub mod varint;
