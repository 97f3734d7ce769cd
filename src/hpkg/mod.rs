//! Core package reader module

pub mod codec;
pub mod data;
pub mod format;
pub mod handlers;
pub mod io;
pub mod reader;
pub mod types;
mod utils;

pub use reader::PackageReader;
pub use types::error::{ErrorKind, HpkgError, Result};
