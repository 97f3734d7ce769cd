//! Foundational data structures, error types, and reader configuration.

pub mod error;
pub mod models;
pub mod options;
pub mod standard;
