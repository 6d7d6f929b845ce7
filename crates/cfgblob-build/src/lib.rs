//! Build-script driver: reads `cfgblob.toml`, loads record descriptors,
//! generates one file per record and writes only what changed.

pub mod config;
pub mod error;
pub mod output;
pub mod provider;
pub mod run;

use crate::{config::BuildConfig, provider::JsonFileProvider, run::RunReport};
use std::path::Path;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::{BuildConfig, CONFIG_FILE},
        error::BuildError,
        provider::{DescriptorProvider, JsonFileProvider},
        run::{RecordOutcome, RunReport, run, run_set},
        run_from_config,
    };
}

/// Load `path` as a config file and run it against its JSON descriptors.
pub fn run_from_config(path: impl AsRef<Path>) -> Result<RunReport, error::BuildError> {
    let config = BuildConfig::load(path)?;
    let provider = JsonFileProvider::new(&config.descriptors);

    run::run(&config, &provider)
}
