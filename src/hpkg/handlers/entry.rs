//! Handler of a `dir:entry` node.

use log::trace;

use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{AttributeType, AttributeValue, EntryId, EntryType, PackageEntry},
    standard::StandardAttribute,
};

use super::attribute::EntryAttributeHandler;
use super::data::DataHandler;
use super::{
    AttributeHandler, BoxedHandler, ContentHandler, Finished, HandlerContext, string_value,
    u32_value, uint_value,
};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Rejects names that are empty, `.`, `..` or contain a `/`.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(HpkgError::MalformedData(format!("Invalid entry name: '{}'", name)));
    }
    Ok(())
}

/// Builds one [`PackageEntry`].
///
/// The content handler learns about the entry right before its first nested
/// entry or extended attribute, or when the entry closes, whichever comes
/// first.
#[derive(Debug, Clone)]
pub struct EntryHandler {
    entry: PackageEntry,
    explicit_permissions: bool,
    notified: bool,
}

impl EntryHandler {
    pub fn new<C: ?Sized>(
        context: &mut HandlerContext<'_, C>,
        parent: Option<EntryId>,
        name: &str,
    ) -> Result<Self> {
        validate_entry_name(name)?;
        let id = context.allocate_entry_id();
        trace!("New entry #{} '{}' (parent {:?})", id.0, name, parent);
        Ok(Self {
            entry: PackageEntry::new(id, parent, name),
            explicit_permissions: false,
            notified: false,
        })
    }

    fn notify<C: ContentHandler + ?Sized>(&mut self, context: &mut HandlerContext<'_, C>) -> Result<()> {
        if !self.notified {
            self.notified = true;
            context.sink.handle_entry(&self.entry)?;
        }
        Ok(())
    }
}

fn nanos_value(attribute: &AttributeType, value: &AttributeValue<'_>) -> Result<u32> {
    let nanos = uint_value(attribute, value)?;
    if nanos >= NANOS_PER_SECOND {
        return Err(HpkgError::MalformedData(format!(
            "Invalid nanoseconds value {} for '{}'",
            nanos, attribute.name
        )));
    }
    Ok(nanos as u32)
}

impl<'a, C: ContentHandler + ?Sized> AttributeHandler<'a, C> for EntryHandler {
    fn kind(&self) -> &'static str {
        "entry"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        let Some(standard) = attribute.standard else {
            trace!("Entry '{}': ignoring attribute '{}'", self.entry.name, attribute.name);
            return Ok(None);
        };

        match standard {
            StandardAttribute::DirectoryEntry => {
                self.notify(context)?;
                let name = string_value(attribute, &value)?;
                let child: BoxedHandler<'a, C> =
                    Box::new(EntryHandler::new(context, Some(self.entry.id), name)?);
                return Ok(Some(child));
            }
            StandardAttribute::FileAttribute => {
                self.notify(context)?;
                let name = string_value(attribute, &value)?;
                let child: BoxedHandler<'a, C> = Box::new(EntryAttributeHandler::new(name));
                return Ok(Some(child));
            }
            StandardAttribute::Data => {
                let child: BoxedHandler<'a, C> =
                    Box::new(DataHandler::new(&value, context.options.max_inline_data_size)?);
                return Ok(Some(child));
            }
            StandardAttribute::FileType => {
                self.entry.entry_type = EntryType::try_from(uint_value(attribute, &value)?)?;
                if !self.explicit_permissions {
                    self.entry.permissions = self.entry.entry_type.default_permissions();
                }
            }
            StandardAttribute::FilePermissions => {
                self.entry.permissions = u32_value(attribute, &value)?;
                self.explicit_permissions = true;
            }
            StandardAttribute::FileUser => {
                self.entry.user = Some(string_value(attribute, &value)?.to_string());
            }
            StandardAttribute::FileGroup => {
                self.entry.group = Some(string_value(attribute, &value)?.to_string());
            }
            StandardAttribute::FileAtime => {
                self.entry.access_time.seconds = uint_value(attribute, &value)?;
            }
            StandardAttribute::FileAtimeNanos => {
                self.entry.access_time.nanos = nanos_value(attribute, &value)?;
            }
            StandardAttribute::FileMtime => {
                self.entry.modified_time.seconds = uint_value(attribute, &value)?;
            }
            StandardAttribute::FileMtimeNanos => {
                self.entry.modified_time.nanos = nanos_value(attribute, &value)?;
            }
            StandardAttribute::FileCrtime => {
                self.entry.creation_time.seconds = uint_value(attribute, &value)?;
            }
            StandardAttribute::FileCrtimeNanos => {
                self.entry.creation_time.nanos = nanos_value(attribute, &value)?;
            }
            StandardAttribute::SymlinkTarget => {
                self.entry.symlink_target = Some(string_value(attribute, &value)?.to_string());
            }
            _ => trace!("Entry '{}': ignoring attribute '{}'", self.entry.name, attribute.name),
        }
        Ok(None)
    }

    fn child_finished(&mut self, context: &mut HandlerContext<'_, C>, finished: Finished) -> Result<()> {
        match finished {
            Finished::Data(data) => self.entry.data = data,
            Finished::Attribute(attribute) => {
                self.notify(context)?;
                context.sink.handle_entry_attribute(&self.entry, &attribute)?;
            }
            Finished::Entry(_) | Finished::Nothing => {}
        }
        Ok(())
    }

    fn finalize(&mut self, context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        self.notify(context)?;
        context.sink.handle_entry_done(&self.entry)?;
        trace!(
            "Entry #{} '{}' done: {:?}, {} bytes",
            self.entry.id.0,
            self.entry.name,
            self.entry.entry_type,
            self.entry.data.uncompressed_size()
        );
        Ok(Finished::Entry(self.entry.id))
    }

    fn release(self: Box<Self>, _context: &mut HandlerContext<'_, C>) {
        trace!("Releasing partially built entry '{}'", self.entry.name);
    }
}
