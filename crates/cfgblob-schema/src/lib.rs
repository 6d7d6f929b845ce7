pub mod build;
pub mod error;
pub mod node;
pub mod types;
pub mod validate;

/// Maximum length for record and field identifiers.
pub const MAX_IDENT_LEN: usize = 64;

/// Maximum number of fields allowed in a declared index.
pub const MAX_INDEX_FIELDS: usize = 4;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        build::{DescriptorSet, LayoutName, LayoutSource},
        err,
        error::{DescriptorError, ErrorTree},
        node::*,
        types::{FieldRole, Primitive, StringMode, TypeKind, WellKnown},
    };
    pub use serde::{Deserialize, Serialize};
}
