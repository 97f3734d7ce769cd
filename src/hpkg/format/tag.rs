//! Attribute tags of the TOC attribute tree.
//!
//! A tag is a single LEB128 number. `0` closes the current level; any other
//! value `v` packs, in `v - 1`:
//!
//! ```text
//! bit 0      has-children flag
//! bits 1-2   value encoding
//! bits 3..   index into the attribute type table
//! ```

use crate::hpkg::types::error::{HpkgError, Result};

const HAS_CHILDREN_BIT: u64 = 0x1;
const ENCODING_SHIFT: u32 = 1;
const ENCODING_MASK: u64 = 0x3;
const INDEX_SHIFT: u32 = 3;

/// A decoded non-zero attribute tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTag {
    pub type_index: u64,
    pub encoding: u8,
    pub has_children: bool,
}

impl AttributeTag {
    /// Decodes a raw tag. Returns `None` for the level terminator `0`.
    pub fn decode(tag: u64) -> Option<Self> {
        let bits = tag.checked_sub(1)?;
        Some(Self {
            type_index: bits >> INDEX_SHIFT,
            encoding: ((bits >> ENCODING_SHIFT) & ENCODING_MASK) as u8,
            has_children: bits & HAS_CHILDREN_BIT != 0,
        })
    }

    /// Packs the tag back into its on-disk value.
    pub fn compose(&self) -> Result<u64> {
        if u64::from(self.encoding) > ENCODING_MASK {
            return Err(HpkgError::BadValue(format!("Invalid tag encoding: {}", self.encoding)));
        }
        self.type_index
            .checked_mul(1 << INDEX_SHIFT)
            .map(|bits| {
                bits | (u64::from(self.encoding) << ENCODING_SHIFT)
                    | u64::from(self.has_children)
            })
            .and_then(|bits| bits.checked_add(1))
            .ok_or_else(|| {
                HpkgError::BadValue(format!("Attribute type index too large: {}", self.type_index))
            })
    }
}
