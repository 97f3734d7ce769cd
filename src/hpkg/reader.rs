use std::path::Path;

use log::{info, warn};

use super::codec::compression::Decompressors;
use super::data::{self, HeapRange, PackageDataReader};
use super::format::header::{self, SectionLayout};
use super::format::toc::{self, TocBuffer};
use super::format::walker::{AttributeTreeWalker, WalkStats};
use super::handlers::low_level::LowLevelRootHandler;
use super::handlers::package::PackageAttributesHandler;
use super::handlers::root::RootHandler;
use super::handlers::{
    BoxedHandler, ContentHandler, HandlerContext, LowLevelHandler, PackageInfoHandler,
};
use super::io::{FileSource, ReadAt};
use super::types::error::{HpkgError, Result};
use super::types::models::{AttributeType, PackageData, StringTable};
use super::types::options::ReaderOptions;
use super::types::standard::standard_attribute_types;
use super::utils::alloc_buffer;

/// A parse session over one package file.
///
/// Opening validates the header and loads the TOC with its attribute type and
/// string tables. The tree itself is walked on demand by
/// [`parse_content`](Self::parse_content) or
/// [`parse_attributes`](Self::parse_attributes), the package attributes
/// section by [`parse_package_attributes`](Self::parse_package_attributes).
/// Payloads are read later through [`create_data_reader`](Self::create_data_reader).
///
/// A session is meant to be used from a single thread. Open independent
/// sessions to read packages in parallel.
#[derive(Debug)]
pub struct PackageReader<S: ReadAt> {
    source: S,
    options: ReaderOptions,
    decompressors: Decompressors,
    layout: SectionLayout,

    /// Reusable buffer compressed sections are streamed through.
    scratch: Vec<u8>,
    toc: TocBuffer,
    attribute_types: Vec<AttributeType>,
    strings: StringTable,
}

impl PackageReader<FileSource> {
    /// Opens a package file from the given path with default options.
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened
    /// - File format is invalid or corrupted
    /// - Unsupported version or compression algorithm
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening package file: {}", path.display());
        Self::new(FileSource::open(path)?)
    }
}

impl<S: ReadAt> PackageReader<S> {
    /// Opens a package from any byte-range source with default options.
    pub fn new(source: S) -> Result<Self> {
        Self::with_options(source, ReaderOptions::default(), Decompressors::standard())
    }

    /// Opens a package with explicit limits and decompression algorithms.
    ///
    /// # Arguments
    /// * `source` - The package bytes
    /// * `options` - Limits and format constants, see [`ReaderOptions`]
    /// * `decompressors` - Algorithms available for compressed sections and payloads
    ///
    /// # Errors
    /// Returns `BadValue` for inconsistent options, and any error of header
    /// validation or TOC loading.
    pub fn with_options(
        source: S,
        options: ReaderOptions,
        decompressors: Decompressors,
    ) -> Result<Self> {
        options.validate()?;

        let layout = header::parse(&source, &options)?;
        let mut scratch = alloc_buffer(options.scratch_buffer_size as u64, "scratch buffer")?;
        let toc = toc::load(&source, &layout, &decompressors, &mut scratch)?;
        let attribute_types =
            toc::parse_attribute_types(toc.attribute_types(), layout.toc_attribute_types_count)?;
        let strings = toc::parse_strings(toc.strings(), layout.toc_strings_count)?;

        info!(
            "Package opened: {} attribute types, {} strings, {} byte attribute tree",
            attribute_types.len(),
            strings.len(),
            toc.attribute_tree().len()
        );

        Ok(Self {
            source,
            options,
            decompressors,
            layout,
            scratch,
            toc,
            attribute_types,
            strings,
        })
    }

    pub fn layout(&self) -> &SectionLayout {
        &self.layout
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn attribute_types(&self) -> &[AttributeType] {
        &self.attribute_types
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn heap(&self) -> HeapRange {
        HeapRange {
            offset: self.layout.heap_offset,
            size: self.layout.heap_size,
        }
    }

    /// Walks the attribute tree, reporting entries to `handler`.
    ///
    /// On failure `handler.handle_error_occurred()` is called after all
    /// partially built entries were dropped, then the error is returned.
    pub fn parse_content<H: ContentHandler + ?Sized>(&self, handler: &mut H) -> Result<WalkStats> {
        let mut context = HandlerContext::new(handler, &self.options);
        let root: BoxedHandler<'_, H> = Box::new(RootHandler);
        let result = self.walk(root, &mut context);
        if let Err(error) = &result {
            warn!("Package content parsing failed: {}", error);
            context.sink.handle_error_occurred();
        }
        result
    }

    /// Walks the attribute tree, reporting every attribute to `handler`.
    pub fn parse_attributes<H: LowLevelHandler + ?Sized>(
        &self,
        handler: &mut H,
    ) -> Result<WalkStats> {
        let mut context = HandlerContext::new(handler, &self.options);
        let root: BoxedHandler<'_, H> = Box::new(LowLevelRootHandler);
        let result = self.walk(root, &mut context);
        if let Err(error) = &result {
            warn!("Package attribute parsing failed: {}", error);
            context.sink.handle_error_occurred();
        }
        result
    }

    fn walk<'a, C: ?Sized>(
        &'a self,
        root: BoxedHandler<'a, C>,
        context: &mut HandlerContext<'_, C>,
    ) -> Result<WalkStats> {
        let mut walker = AttributeTreeWalker::new(
            &self.attribute_types,
            &self.strings,
            self.layout.heap_size,
            &self.options,
        );
        walker.walk(self.toc.attribute_tree(), root, context)?;
        let stats = walker.stats();
        info!(
            "Attribute tree parsed: {} attributes, {} nodes",
            stats.attributes, stats.pushed
        );
        Ok(stats)
    }

    /// Decompresses the package attributes section and parses its string table.
    pub fn read_package_attribute_strings(&mut self) -> Result<StringTable> {
        let (section, strings_length) = self.load_package_attributes()?;
        toc::parse_strings(
            &section[..strings_length],
            self.layout.package_attributes_strings_count,
        )
    }

    /// Walks the attribute tree of the package attributes section.
    ///
    /// Tags in that tree index the standard attribute table directly, and
    /// string references resolve against the section's own string table.
    /// On failure `handler.handle_error_occurred()` is called, then the error
    /// is returned.
    pub fn parse_package_attributes<H: PackageInfoHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<WalkStats> {
        let result = self.walk_package_attributes(handler);
        if let Err(error) = &result {
            warn!("Package attributes parsing failed: {}", error);
            handler.handle_error_occurred();
        }
        result
    }

    fn walk_package_attributes<H: PackageInfoHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<WalkStats> {
        let (section, strings_length) = self.load_package_attributes()?;
        let strings = toc::parse_strings(
            &section[..strings_length],
            self.layout.package_attributes_strings_count,
        )?;
        let attribute_types = standard_attribute_types();

        let mut context = HandlerContext::new(handler, &self.options);
        let root: BoxedHandler<'_, H> = Box::new(PackageAttributesHandler);
        let mut walker = AttributeTreeWalker::new(
            &attribute_types,
            &strings,
            self.layout.heap_size,
            &self.options,
        );
        walker.walk(&section[strings_length..], root, &mut context)?;
        let stats = walker.stats();
        info!("Package attributes parsed: {} attributes", stats.attributes);
        Ok(stats)
    }

    /// Decompresses the package attributes section, returning it together
    /// with the length of its string subsection.
    fn load_package_attributes(&mut self) -> Result<(Vec<u8>, usize)> {
        let section = toc::load_section(
            &self.source,
            self.layout.package_attributes_offset,
            &self.layout.package_attributes,
            &self.decompressors,
            &mut self.scratch,
            "package attributes",
        )?;
        let strings_length = usize::try_from(self.layout.package_attributes_strings_length)
            .ok()
            .filter(|length| *length <= section.len())
            .ok_or_else(|| {
                HpkgError::MalformedData(format!(
                    "Package attributes strings ({} bytes) exceed the section size of {} bytes",
                    self.layout.package_attributes_strings_length,
                    section.len()
                ))
            })?;
        Ok((section, strings_length))
    }

    /// Creates a random-access reader for a payload found during a walk.
    pub fn create_data_reader(&self, data: &PackageData) -> Result<Box<dyn PackageDataReader + '_>> {
        data::create_reader(&self.source, self.heap(), data, &self.decompressors, &self.options)
    }

    /// Reads a whole payload into memory.
    pub fn read_data_to_vec(&self, data: &PackageData) -> Result<Vec<u8>> {
        let mut reader = self.create_data_reader(data)?;
        let mut buffer = alloc_buffer(reader.size(), "entry data")?;
        reader.read_data(0, &mut buffer)?;
        Ok(buffer)
    }
}
