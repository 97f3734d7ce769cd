use log::trace;

use crate::hpkg::types::{
    error::Result,
    models::{AttributeType, AttributeValue},
    standard::StandardAttribute,
};

use super::entry::EntryHandler;
use super::{AttributeHandler, BoxedHandler, ContentHandler, Finished, HandlerContext, string_value};

/// Root of a content walk: only top-level `dir:entry` attributes matter here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootHandler;

impl<'a, C: ContentHandler + ?Sized> AttributeHandler<'a, C> for RootHandler {
    fn kind(&self) -> &'static str {
        "root"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        if attribute.standard != Some(StandardAttribute::DirectoryEntry) {
            trace!("Root: ignoring attribute '{}'", attribute.name);
            return Ok(None);
        }
        let name = string_value(attribute, &value)?;
        let child: BoxedHandler<'a, C> = Box::new(EntryHandler::new(context, None, name)?);
        Ok(Some(child))
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Nothing)
    }
}
