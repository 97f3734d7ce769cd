use log::trace;

use crate::hpkg::types::{
    error::Result,
    models::{AttributeType, AttributeValue},
};

use super::{AttributeHandler, BoxedHandler, Finished, HandlerContext};

/// Swallows a subtree. Its own children get ignore handlers pushed by the walker.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreHandler;

impl<'a, C: ?Sized> AttributeHandler<'a, C> for IgnoreHandler {
    fn kind(&self) -> &'static str {
        "ignore"
    }

    fn handle_child(
        &mut self,
        _context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        _value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        trace!("Ignoring attribute '{}'", attribute.name);
        Ok(None)
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Nothing)
    }
}
