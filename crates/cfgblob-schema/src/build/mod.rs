use crate::prelude::*;
use std::collections::BTreeMap;

///
/// DescriptorSet
///
/// Every record of one run, keyed by full path. Iteration is sorted by path
/// so generation order never depends on provider order.
///

#[derive(Clone, Debug, Default)]
pub struct DescriptorSet {
    records: BTreeMap<String, RecordDescriptor>,
}

impl DescriptorSet {
    pub fn new(
        records: impl IntoIterator<Item = RecordDescriptor>,
    ) -> Result<Self, DescriptorError> {
        let mut set = Self::default();
        for record in records {
            set.insert(record)?;
        }

        Ok(set)
    }

    pub fn insert(&mut self, record: RecordDescriptor) -> Result<(), DescriptorError> {
        let path = record.path();
        if self.records.contains_key(&path) {
            return Err(DescriptorError::DuplicateRecord(path));
        }
        self.records.insert(path, record);

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDescriptor> {
        self.records.values()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&RecordDescriptor> {
        self.records.get(path)
    }

    /// Resolve a type name to a record: exact path first, then a unique
    /// match on the last path segment.
    #[must_use]
    pub fn find(&self, type_name: &str) -> Option<&RecordDescriptor> {
        let type_name = type_name.trim_start_matches("::");
        if let Some(record) = self.records.get(type_name) {
            return Some(record);
        }

        let short = type_name.rsplit("::").next().unwrap_or(type_name);
        let mut matches = self.records.values().filter(|r| r.name == short);
        match (matches.next(), matches.next()) {
            (Some(record), None) => Some(record),
            _ => None,
        }
    }

    /// Layout type path for a record type name.
    #[must_use]
    pub fn layout_of(&self, type_name: &str, suffix: &str) -> LayoutName {
        if let Some(record) = self.find(type_name) {
            let name = record.layout_name(suffix);
            let source = if record.layout.is_some() {
                LayoutSource::Declared
            } else {
                LayoutSource::Suffix
            };
            let path = if record.namespace.is_empty() {
                name
            } else {
                format!("{}::{name}", record.namespace)
            };

            return LayoutName { path, source };
        }

        LayoutName {
            path: format!("{}{suffix}", type_name.trim_start_matches("::")),
            source: LayoutSource::Unknown,
        }
    }
}

///
/// LayoutName
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayoutName {
    pub path: String,
    pub source: LayoutSource,
}

///
/// LayoutSource
///
/// Where a layout name came from. Only `Declared` is authoritative.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayoutSource {
    Declared,
    Suffix,
    Unknown,
}
