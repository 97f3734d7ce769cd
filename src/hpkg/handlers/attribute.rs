use log::trace;

use crate::hpkg::types::{
    error::Result,
    models::{AttributeType, AttributeValue, PackageEntryAttribute},
    standard::StandardAttribute,
};

use super::data::DataHandler;
use super::{AttributeHandler, BoxedHandler, Finished, HandlerContext, u32_value};

/// Builds one extended attribute (`file:attribute`) of an entry.
#[derive(Debug, Clone)]
pub struct EntryAttributeHandler {
    attribute: PackageEntryAttribute,
}

impl EntryAttributeHandler {
    pub fn new(name: &str) -> Self {
        Self {
            attribute: PackageEntryAttribute::new(name),
        }
    }
}

impl<'a, C: ?Sized> AttributeHandler<'a, C> for EntryAttributeHandler {
    fn kind(&self) -> &'static str {
        "entry attribute"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        match attribute.standard {
            Some(StandardAttribute::FileAttributeType) => {
                self.attribute.type_code = u32_value(attribute, &value)?;
            }
            Some(StandardAttribute::Data) => {
                let child: BoxedHandler<'a, C> =
                    Box::new(DataHandler::new(&value, context.options.max_inline_data_size)?);
                return Ok(Some(child));
            }
            _ => trace!(
                "Attribute '{}': ignoring attribute '{}'",
                self.attribute.name, attribute.name
            ),
        }
        Ok(None)
    }

    fn child_finished(
        &mut self,
        _context: &mut HandlerContext<'_, C>,
        finished: Finished,
    ) -> Result<()> {
        if let Finished::Data(data) = finished {
            self.attribute.data = data;
        }
        Ok(())
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Attribute(self.attribute.clone()))
    }
}
