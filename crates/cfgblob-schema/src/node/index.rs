use crate::prelude::*;
use std::{
    fmt::{self, Display},
    ops::Not,
};

///
/// IndexDescriptor
///
/// Field order is significant: it defines composite-key ordering and equality.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Not::not")]
    pub unique: bool,
}

impl IndexDescriptor {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.fields.len() < other.fields.len() && other.fields.starts_with(&self.fields)
    }
}

impl Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.join(", ");

        if self.unique {
            write!(f, "{} UNIQUE ({fields})", self.name)
        } else {
            write!(f, "{} ({fields})", self.name)
        }
    }
}
