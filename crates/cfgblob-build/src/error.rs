use cfgblob_codegen::error::CodegenError;
use cfgblob_schema::error::DescriptorError;
use std::{io, path::PathBuf};
use thiserror::Error as ThisError;

///
/// BuildError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum BuildError {
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid descriptor file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}
