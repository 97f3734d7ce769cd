//! Handlers forwarding the raw attribute tree to a [`LowLevelHandler`].

use log::trace;

use crate::hpkg::types::{
    error::Result,
    models::{AttributeType, AttributeValue},
};

use super::{
    AttributeHandler, AttributeToken, BoxedHandler, Finished, HandlerContext, LowLevelHandler,
};

fn forward<'a, C: LowLevelHandler + ?Sized>(
    context: &mut HandlerContext<'_, C>,
    attribute: &'a AttributeType,
    value: AttributeValue<'a>,
    parent: Option<AttributeToken>,
) -> Result<Option<BoxedHandler<'a, C>>> {
    trace!("Attribute '{}' = {:?} (parent {:?})", attribute.name, value, parent);
    let token = context.sink.handle_attribute(&attribute.name, &value, parent)?;
    let child: BoxedHandler<'a, C> = Box::new(LowLevelNodeHandler {
        name: &attribute.name,
        value,
        token,
    });
    Ok(Some(child))
}

/// Root of a low-level walk; top-level attributes have no parent token.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowLevelRootHandler;

impl<'a, C: LowLevelHandler + ?Sized> AttributeHandler<'a, C> for LowLevelRootHandler {
    fn kind(&self) -> &'static str {
        "low-level root"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        forward(context, attribute, value, None)
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Nothing)
    }
}

/// Remembers one attribute until its `done` notification.
#[derive(Debug, Clone, Copy)]
pub struct LowLevelNodeHandler<'a> {
    name: &'a str,
    value: AttributeValue<'a>,
    token: AttributeToken,
}

impl<'a, C: LowLevelHandler + ?Sized> AttributeHandler<'a, C> for LowLevelNodeHandler<'a> {
    fn kind(&self) -> &'static str {
        "low-level node"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        forward(context, attribute, value, Some(self.token))
    }

    fn finalize(&mut self, context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        context.sink.handle_attribute_done(self.name, &self.value, self.token)?;
        Ok(Finished::Nothing)
    }
}
