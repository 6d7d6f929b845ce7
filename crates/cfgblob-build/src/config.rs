use crate::error::BuildError;
use cfgblob_codegen::{CodegenOptions, DEFAULT_LAYOUT_SUFFIX, parse::MarkupOptions, paths::CratePaths};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Conventional config file name, looked up next to the build script.
pub const CONFIG_FILE: &str = "cfgblob.toml";

///
/// BuildConfig
///
/// Parsed `cfgblob.toml`. Every key is optional.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// JSON descriptor file.
    pub descriptors: PathBuf,

    /// Directory generated files are written to.
    pub out_dir: PathBuf,

    /// Runtime crate path used by generated code.
    pub runtime_crate: Option<String>,

    pub layout_suffix: String,

    /// Generate records on the rayon pool.
    pub parallel: bool,

    pub markup: MarkupOptions,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            descriptors: PathBuf::from("descriptors.json"),
            out_dir: PathBuf::from("generated"),
            runtime_crate: None,
            layout_suffix: DEFAULT_LAYOUT_SUFFIX.to_string(),
            parallel: true,
            markup: MarkupOptions::default(),
        }
    }
}

impl BuildConfig {
    pub fn from_toml(text: &str) -> Result<Self, BuildError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let mut config = Self::from_toml(&fs::read_to_string(path)?)?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        Ok(config)
    }

    /// Resolve relative `descriptors` and `out_dir` against `base`.
    pub fn rebase(&mut self, base: &Path) {
        if self.descriptors.is_relative() {
            self.descriptors = base.join(&self.descriptors);
        }
        if self.out_dir.is_relative() {
            self.out_dir = base.join(&self.out_dir);
        }
    }

    /// Options for one generation pass. Built per worker, since token
    /// streams cannot cross threads.
    pub fn codegen_options(&self) -> Result<CodegenOptions, BuildError> {
        Ok(CodegenOptions {
            paths: CratePaths::with_runtime(self.runtime_crate.as_deref())?,
            layout_suffix: self.layout_suffix.clone(),
            markup: self.markup.clone(),
        })
    }
}
