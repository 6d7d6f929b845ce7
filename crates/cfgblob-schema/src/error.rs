use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// DescriptorError
///
/// Descriptor inconsistencies found before or during generation. Each one is
/// fatal for the record it names and for no other record.
///

#[derive(Debug, ThisError)]
pub enum DescriptorError {
    #[error("duplicate record '{0}'")]
    DuplicateRecord(String),

    #[error("record '{record}', field '{field}': {message}")]
    Field {
        record: String,
        field: String,
        message: String,
    },

    #[error("record '{record}': {message}")]
    Record { record: String, message: String },

    #[error("record '{record}' failed validation: {errors}")]
    Validation { record: String, errors: ErrorTree },
}

impl DescriptorError {
    pub fn field(
        record: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Field {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn record(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Record {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Name of the record the error belongs to.
    #[must_use]
    pub fn record_name(&self) -> &str {
        match self {
            Self::DuplicateRecord(record)
            | Self::Field { record, .. }
            | Self::Record { record, .. }
            | Self::Validation { record, .. } => record,
        }
    }
}

///
/// ErrorTree
///
/// Ordered collection of validation messages for one record, keyed by the
/// route (field or index name) they were found on.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<(Option<String>, String)>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.messages.push((None, message.into()));
    }

    pub fn add_route(&mut self, route: impl Into<String>, message: impl Into<String>) {
        self.messages.push((Some(route.into()), message.into()));
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (route, message)) in self.messages.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match route {
                Some(route) => write!(f, "field '{route}': {message}")?,
                None => f.write_str(message)?,
            }
        }

        Ok(())
    }
}

/// Push a formatted message onto an `ErrorTree`, optionally under a route.
#[macro_export]
macro_rules! err {
    ($errs:expr, route = $route:expr, $($arg:tt)*) => {
        $errs.add_route($route, format!($($arg)*))
    };
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}
