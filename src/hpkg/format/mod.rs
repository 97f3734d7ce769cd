//! On-disk structure of a package file.
//!
//! # Module Organization
//! - `header`: fixed header and section layout validation
//! - `toc`: TOC decompression, attribute type table and string table
//! - `tag`: attribute tag bit packing
//! - `value`: attribute value decoding
//! - `walker`: the attribute tree walker driving the handler stack

pub mod header;
pub mod tag;
pub mod toc;
pub mod value;
pub mod walker;
