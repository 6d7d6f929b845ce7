use cfgblob_schema::error::DescriptorError;
use thiserror::Error as ThisError;

///
/// CodegenError
///
/// Generation-time failures. Every variant is fatal for the one record it
/// names; unsupported shapes are not errors and never reach this type.
///

#[derive(Debug, ThisError)]
pub enum CodegenError {
    #[error("record '{record}', field '{field}': {message}")]
    Descriptor {
        record: String,
        field: String,
        message: String,
    },

    #[error("invalid runtime crate path '{0}'")]
    RuntimePath(String),

    #[error(transparent)]
    Validation(#[from] DescriptorError),
}

impl CodegenError {
    pub fn descriptor(
        record: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Descriptor {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}
