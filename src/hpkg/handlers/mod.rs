//! Attribute handlers and the content handler interfaces.
//!
//! While the attribute tree is walked, every open tree node is owned by one
//! [`AttributeHandler`] on an explicit stack. A handler sees the children of
//! its node, may spawn a handler for a child, and hands its finished object
//! to its parent when the node closes.
//!
//! # Module Organization
//! - `root` / `entry` / `attribute` / `data`: build [`PackageEntry`] and
//!   [`PackageEntryAttribute`] objects for a [`ContentHandler`]
//! - `low_level`: forwards every attribute to a [`LowLevelHandler`]
//! - `package`: reports the package attributes section to a [`PackageInfoHandler`]
//! - `ignore`: swallows subtrees nobody is interested in
//! - `collector`: in-memory [`ContentHandler`] and [`PackageInfoHandler`]

pub mod attribute;
pub mod collector;
pub mod data;
pub mod entry;
pub mod ignore;
pub mod low_level;
pub mod package;
pub mod root;

use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{
        AttributeType, AttributeValue, EntryId, PackageAttribute, PackageData, PackageEntry,
        PackageEntryAttribute,
    },
    options::ReaderOptions,
};

/// Receives the entries of a package as they are decoded.
///
/// For every entry `handle_entry` is called exactly once, before any of its
/// attributes or child entries are reported, and `handle_entry_done` exactly
/// once after all of them.
pub trait ContentHandler {
    fn handle_entry(&mut self, entry: &PackageEntry) -> Result<()>;

    fn handle_entry_attribute(
        &mut self,
        entry: &PackageEntry,
        attribute: &PackageEntryAttribute,
    ) -> Result<()>;

    fn handle_entry_done(&mut self, entry: &PackageEntry) -> Result<()>;

    /// Called once when parsing fails, after all partially built state was released.
    fn handle_error_occurred(&mut self);
}

/// Opaque value a [`LowLevelHandler`] associates with an attribute node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeToken(pub u64);

/// Receives every attribute of the tree, regardless of its meaning.
pub trait LowLevelHandler {
    /// Reports an attribute; the returned token is passed back as the parent
    /// token of its children and to [`handle_attribute_done`](Self::handle_attribute_done).
    fn handle_attribute(
        &mut self,
        name: &str,
        value: &AttributeValue<'_>,
        parent: Option<AttributeToken>,
    ) -> Result<AttributeToken>;

    fn handle_attribute_done(
        &mut self,
        name: &str,
        value: &AttributeValue<'_>,
        token: AttributeToken,
    ) -> Result<()>;

    fn handle_error_occurred(&mut self);
}

/// Receives the attributes of the package attributes section.
pub trait PackageInfoHandler {
    fn handle_package_attribute(&mut self, attribute: &PackageAttribute<'_>) -> Result<()>;

    fn handle_error_occurred(&mut self);
}

/// State shared by all handlers of one walk.
pub struct HandlerContext<'c, C: ?Sized> {
    pub sink: &'c mut C,
    pub options: &'c ReaderOptions,
    next_entry_id: usize,
}

impl<'c, C: ?Sized> HandlerContext<'c, C> {
    pub fn new(sink: &'c mut C, options: &'c ReaderOptions) -> Self {
        Self {
            sink,
            options,
            next_entry_id: 0,
        }
    }

    /// Hands out entry ids in discovery order.
    pub fn allocate_entry_id(&mut self) -> EntryId {
        let id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;
        id
    }
}

/// What a handler produced for its parent when its node closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished {
    Nothing,
    Data(PackageData),
    Attribute(PackageEntryAttribute),
    Entry(EntryId),
}

/// Handler of one node of the attribute tree.
pub trait AttributeHandler<'a, C: ?Sized> {
    /// Short name used in diagnostics.
    fn kind(&self) -> &'static str;

    /// Handles a child attribute of this node.
    ///
    /// A returned handler takes over the child's subtree. If the child has
    /// no subtree it is finalized right away.
    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<Box<dyn AttributeHandler<'a, C> + 'a>>>;

    /// Receives the result of a child handler's [`finalize`](Self::finalize).
    fn child_finished(
        &mut self,
        _context: &mut HandlerContext<'_, C>,
        _finished: Finished,
    ) -> Result<()> {
        Ok(())
    }

    /// Completes the node.
    ///
    /// Called at most once. If it fails, [`release`](Self::release) follows.
    fn finalize(&mut self, context: &mut HandlerContext<'_, C>) -> Result<Finished>;

    /// Drops the partially built node after a failure in the walk.
    fn release(self: Box<Self>, _context: &mut HandlerContext<'_, C>) {}
}

/// Boxed handler as stored on the walker's stack.
pub type BoxedHandler<'a, C> = Box<dyn AttributeHandler<'a, C> + 'a>;

pub(crate) fn uint_value(attribute: &AttributeType, value: &AttributeValue<'_>) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        HpkgError::MalformedData(format!(
            "Attribute '{}' requires an unsigned value, got {:?}",
            attribute.name, value
        ))
    })
}

pub(crate) fn u32_value(attribute: &AttributeType, value: &AttributeValue<'_>) -> Result<u32> {
    let number = uint_value(attribute, value)?;
    u32::try_from(number).map_err(|_| {
        HpkgError::MalformedData(format!(
            "Value {} of attribute '{}' is out of range",
            number, attribute.name
        ))
    })
}

pub(crate) fn string_value<'a>(
    attribute: &AttributeType,
    value: &AttributeValue<'a>,
) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        HpkgError::MalformedData(format!(
            "Attribute '{}' requires a string value, got {:?}",
            attribute.name, value
        ))
    })
}
