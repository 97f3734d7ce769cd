//! In-memory [`ContentHandler`] and [`PackageInfoHandler`] implementations.

use std::collections::HashMap;

use log::debug;

use crate::hpkg::types::{
    error::{HpkgError, Result},
    models::{EntryId, PackageAttribute, PackageEntry, PackageEntryAttribute, PackageInfo},
};

use super::{ContentHandler, PackageInfoHandler};

/// An entry together with everything reported about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedEntry {
    pub entry: PackageEntry,
    /// Slash-separated path from the package root.
    pub path: String,
    pub attributes: Vec<PackageEntryAttribute>,
    /// Whether `handle_entry_done` was received.
    pub complete: bool,
}

/// Collects all entries of a package, in discovery order.
#[derive(Debug, Default)]
pub struct EntryCollector {
    entries: Vec<CollectedEntry>,
    index: HashMap<EntryId, usize>,
    error_occurred: bool,
}

impl EntryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CollectedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CollectedEntry> {
        self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&CollectedEntry> {
        self.index.get(&id).map(|&position| &self.entries[position])
    }

    /// Looks an entry up by its full path, e.g. `"bin/tool"`.
    pub fn find(&self, path: &str) -> Option<&CollectedEntry> {
        self.entries.iter().find(|collected| collected.path == path)
    }

    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    fn position(&self, id: EntryId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| HpkgError::Handler(format!("Unknown entry #{}", id.0)))
    }
}

impl ContentHandler for EntryCollector {
    fn handle_entry(&mut self, entry: &PackageEntry) -> Result<()> {
        let path = match entry.parent {
            Some(parent) => format!("{}/{}", self.entries[self.position(parent)?].path, entry.name),
            None => entry.name.clone(),
        };
        self.index.insert(entry.id, self.entries.len());
        self.entries.push(CollectedEntry {
            entry: entry.clone(),
            path,
            attributes: Vec::new(),
            complete: false,
        });
        Ok(())
    }

    fn handle_entry_attribute(
        &mut self,
        entry: &PackageEntry,
        attribute: &PackageEntryAttribute,
    ) -> Result<()> {
        let position = self.position(entry.id)?;
        self.entries[position].attributes.push(attribute.clone());
        Ok(())
    }

    fn handle_entry_done(&mut self, entry: &PackageEntry) -> Result<()> {
        let position = self.position(entry.id)?;
        let collected = &mut self.entries[position];
        collected.entry = entry.clone();
        collected.complete = true;
        Ok(())
    }

    fn handle_error_occurred(&mut self) {
        debug!("Parse failed after collecting {} entries", self.entries.len());
        self.error_occurred = true;
    }
}

/// Gathers the package attributes into a [`PackageInfo`].
#[derive(Debug, Default)]
pub struct PackageInfoCollector {
    info: PackageInfo,
    error_occurred: bool,
}

impl PackageInfoCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self) -> &PackageInfo {
        &self.info
    }

    pub fn into_info(self) -> PackageInfo {
        self.info
    }

    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }
}

impl PackageInfoHandler for PackageInfoCollector {
    fn handle_package_attribute(&mut self, attribute: &PackageAttribute<'_>) -> Result<()> {
        self.info.apply(attribute);
        Ok(())
    }

    fn handle_error_occurred(&mut self) {
        debug!("Package attributes parse failed");
        self.error_occurred = true;
    }
}
