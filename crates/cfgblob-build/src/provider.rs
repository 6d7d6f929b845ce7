use crate::error::BuildError;
use cfgblob_schema::prelude::*;
use std::{fs, path::PathBuf};

///
/// DescriptorProvider
///
/// Source of the reflected record descriptors for one run.
///

pub trait DescriptorProvider {
    fn load(&self) -> Result<DescriptorSet, BuildError>;
}

impl DescriptorProvider for DescriptorSet {
    fn load(&self) -> Result<DescriptorSet, BuildError> {
        Ok(self.clone())
    }
}

///
/// DescriptorFile
///
/// `{ "records": [ ... ] }`
///

#[derive(Debug, Deserialize, Serialize)]
pub struct DescriptorFile {
    pub records: Vec<RecordDescriptor>,
}

///
/// JsonFileProvider
///

#[derive(Clone, Debug)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(text: &str) -> Result<DescriptorSet, BuildError> {
        let file: DescriptorFile = serde_json::from_str(text)?;

        Ok(DescriptorSet::new(file.records)?)
    }
}

impl DescriptorProvider for JsonFileProvider {
    fn load(&self) -> Result<DescriptorSet, BuildError> {
        Self::parse(&fs::read_to_string(&self.path)?)
    }
}
