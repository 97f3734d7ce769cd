//! Handler of the package attributes section.

use log::trace;

use crate::hpkg::types::{
    error::Result,
    models::{AttributeType, AttributeValue, PackageAttribute},
    standard::StandardAttribute,
};

use super::{
    AttributeHandler, BoxedHandler, Finished, HandlerContext, PackageInfoHandler, string_value,
    u32_value,
};

/// Maps a standard package attribute onto its typed form, `None` for anything else.
fn package_attribute<'v>(
    attribute: &AttributeType,
    value: &AttributeValue<'v>,
) -> Result<Option<PackageAttribute<'v>>> {
    let Some(standard) = attribute.standard else {
        return Ok(None);
    };
    let string = || string_value(attribute, value);
    let number = || u32_value(attribute, value);

    let parsed = match standard {
        StandardAttribute::PackageName => PackageAttribute::Name(string()?),
        StandardAttribute::PackageSummary => PackageAttribute::Summary(string()?),
        StandardAttribute::PackageDescription => PackageAttribute::Description(string()?),
        StandardAttribute::PackageVendor => PackageAttribute::Vendor(string()?),
        StandardAttribute::PackagePackager => PackageAttribute::Packager(string()?),
        StandardAttribute::PackageFlags => PackageAttribute::Flags(number()?),
        StandardAttribute::PackageArchitecture => PackageAttribute::Architecture(number()?),
        StandardAttribute::PackageVersionMajor => PackageAttribute::VersionMajor(string()?),
        StandardAttribute::PackageVersionMinor => PackageAttribute::VersionMinor(string()?),
        StandardAttribute::PackageVersionMicro => PackageAttribute::VersionMicro(string()?),
        StandardAttribute::PackageVersionRelease => PackageAttribute::VersionRelease(number()?),
        StandardAttribute::PackageCopyright => PackageAttribute::Copyright(string()?),
        StandardAttribute::PackageLicense => PackageAttribute::License(string()?),
        StandardAttribute::PackageProvides => PackageAttribute::Provides(string()?),
        StandardAttribute::PackageRequires => PackageAttribute::Requires(string()?),
        _ => return Ok(None),
    };
    Ok(Some(parsed))
}

/// Root and inner handler of a package attributes walk.
///
/// Package attributes may nest, e.g. the minor and micro parts below
/// `package:version.major`, and every level is handled alike. Entry-level
/// attributes are skipped together with their subtrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageAttributesHandler;

impl<'a, C: PackageInfoHandler + ?Sized> AttributeHandler<'a, C> for PackageAttributesHandler {
    fn kind(&self) -> &'static str {
        "package attributes"
    }

    fn handle_child(
        &mut self,
        context: &mut HandlerContext<'_, C>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> Result<Option<BoxedHandler<'a, C>>> {
        let Some(parsed) = package_attribute(attribute, &value)? else {
            trace!("Package attributes: ignoring attribute '{}'", attribute.name);
            return Ok(None);
        };
        trace!("Package attribute {:?}", parsed);
        context.sink.handle_package_attribute(&parsed)?;
        let child: BoxedHandler<'a, C> = Box::new(PackageAttributesHandler);
        Ok(Some(child))
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, C>) -> Result<Finished> {
        Ok(Finished::Nothing)
    }
}
