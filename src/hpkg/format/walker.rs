//! The attribute tree walker.
//!
//! The tree is a flat stream of tagged attributes. Nesting is expressed by
//! the has-children bit of a tag and closed by a `0` tag. The walker keeps
//! one handler per open node on an explicit stack, so the depth of a hostile
//! tree costs heap memory (bounded by `max_tree_depth`) rather than native
//! stack.
//!
//! On failure every handler still on the stack is released, innermost first,
//! before the error is returned.

use log::{debug, trace};

use crate::hpkg::codec::varint::read_unsigned_leb128;
use crate::hpkg::handlers::ignore::IgnoreHandler;
use crate::hpkg::handlers::{BoxedHandler, HandlerContext};
use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{AttributeType, StringTable},
    options::ReaderOptions,
};

use super::tag::AttributeTag;
use super::value::ValueDecoder;

/// Handler bookkeeping of the last walk.
///
/// After any walk, `pushed == finalized + released`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Handlers placed on the stack, the root included.
    pub pushed: usize,
    /// Stack handlers whose node was closed and finalized successfully.
    pub finalized: usize,
    /// Stack handlers released because the walk failed, including one whose
    /// own `finalize` failed.
    pub released: usize,
    /// Attributes decoded.
    pub attributes: usize,
    /// Deepest stack observed.
    pub max_depth: usize,
}

pub struct AttributeTreeWalker<'a> {
    attribute_types: &'a [AttributeType],
    decoder: ValueDecoder<'a>,
    max_depth: usize,
    stats: WalkStats,
    level: usize,
}

impl<'a> AttributeTreeWalker<'a> {
    pub fn new(
        attribute_types: &'a [AttributeType],
        strings: &'a StringTable,
        heap_size: u64,
        options: &ReaderOptions,
    ) -> Self {
        Self {
            attribute_types,
            decoder: ValueDecoder::new(strings, heap_size, options.max_inline_data_size),
            max_depth: options.max_tree_depth,
            stats: WalkStats::default(),
            level: 0,
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Walks `tree` with `root` as the handler of the outermost level.
    ///
    /// The tree must end with the `0` tag closing the root level and nothing
    /// after it.
    ///
    /// # Errors
    /// Errors raised while the stack is non-empty are wrapped in
    /// [`HpkgError::AtLevel`] with the stack depth at which they occurred.
    pub fn walk<C: ?Sized>(
        &mut self,
        tree: &'a [u8],
        root: BoxedHandler<'a, C>,
        context: &mut HandlerContext<'_, C>,
    ) -> Result<()> {
        self.stats = WalkStats::default();
        let mut stack: Vec<BoxedHandler<'a, C>> = Vec::new();
        stack.push(root);
        self.stats.pushed = 1;
        self.stats.max_depth = 1;

        let mut cursor = tree;
        if let Err(error) = self.run(&mut stack, &mut cursor, context) {
            let level = self.level;
            debug!(
                "Attribute tree walk failed at level {}, releasing {} handlers",
                level,
                stack.len()
            );
            while let Some(handler) = stack.pop() {
                trace!("Releasing {} handler", handler.kind());
                handler.release(context);
                self.stats.released += 1;
            }
            return Err(HpkgError::AtLevel {
                level,
                source: Box::new(error),
            });
        }

        if !cursor.is_empty() {
            return Err(HpkgError::MalformedData(format!(
                "{} bytes after the end of the attribute tree",
                cursor.len()
            )));
        }
        debug!(
            "Attribute tree walked: {} attributes, {} handlers, depth {}",
            self.stats.attributes, self.stats.pushed, self.stats.max_depth
        );
        Ok(())
    }

    fn run<C: ?Sized>(
        &mut self,
        stack: &mut Vec<BoxedHandler<'a, C>>,
        cursor: &mut &'a [u8],
        context: &mut HandlerContext<'_, C>,
    ) -> Result<()> {
        let attribute_types = self.attribute_types;

        loop {
            self.level = stack.len();
            let raw_tag = read_unsigned_leb128(cursor)?;

            let Some(tag) = AttributeTag::decode(raw_tag) else {
                // Popped only once finalized, so a failing handler is released by the unwind.
                let handler = stack.last_mut().ok_or_else(unbalanced)?;
                trace!("Closing {} handler at level {}", handler.kind(), self.level);
                let finished = handler.finalize(context)?;
                stack.pop();
                self.stats.finalized += 1;
                match stack.last_mut() {
                    Some(parent) => parent.child_finished(context, finished)?,
                    None => return Ok(()),
                }
                continue;
            };

            let attribute = usize::try_from(tag.type_index)
                .ok()
                .and_then(|index| attribute_types.get(index))
                .ok_or_else(|| {
                    HpkgError::MalformedData(format!(
                        "Attribute type index {} out of range ({} types)",
                        tag.type_index,
                        attribute_types.len()
                    ))
                })?;
            let value = self.decoder.decode(attribute.type_code, tag.encoding, cursor)?;
            self.stats.attributes += 1;
            trace!(
                "Attribute '{}' = {:?} at level {}{}",
                attribute.name,
                value,
                self.level,
                if tag.has_children { " (has children)" } else { "" }
            );

            let parent = stack.last_mut().ok_or_else(unbalanced)?;
            let child = parent.handle_child(context, attribute, value)?;

            if tag.has_children {
                if stack.len() >= self.max_depth {
                    if let Some(child) = child {
                        child.release(context);
                    }
                    return Err(HpkgError::MalformedData(format!(
                        "Attribute tree nesting exceeds the maximum depth of {}",
                        self.max_depth
                    )));
                }
                let child: BoxedHandler<'a, C> = match child {
                    Some(child) => child,
                    None => Box::new(IgnoreHandler),
                };
                stack.push(child);
                self.stats.pushed += 1;
                self.stats.max_depth = self.stats.max_depth.max(stack.len());
            } else if let Some(mut child) = child {
                let finished = match child.finalize(context) {
                    Ok(finished) => finished,
                    Err(error) => {
                        child.release(context);
                        return Err(error);
                    }
                };
                let parent = stack.last_mut().ok_or_else(unbalanced)?;
                parent.child_finished(context, finished)?;
            }
        }
    }
}

fn unbalanced() -> HpkgError {
    HpkgError::MalformedData("Attribute tree closes more levels than it opened".to_string())
}
