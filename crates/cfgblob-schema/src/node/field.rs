use crate::prelude::*;
use convert_case::{Case, Casing};

///
/// FieldDescriptor
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,

    /// Default literal in markup text form, e.g. `5`, `Sword` or `1,2,3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_mode: Option<StringMode>,

    #[serde(default)]
    pub role: FieldRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            string_mode: None,
            role: FieldRole::Data,
            markup_name: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    #[must_use]
    pub const fn with_string_mode(mut self, mode: StringMode) -> Self {
        self.string_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_markup_name(mut self, name: impl Into<String>) -> Self {
        self.markup_name = Some(name.into());
        self
    }

    /// Explicit string mode, or the interned handle when none was declared.
    #[must_use]
    pub fn string_mode(&self) -> StringMode {
        self.string_mode.unwrap_or_default()
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.ty.is_option()
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.ty.unwrap_option().kind == TypeKind::Enum
    }

    #[must_use]
    pub fn reference_target(&self) -> Option<&str> {
        self.ty.reference_target()
    }

    /// Name the field carries in markup; PascalCase of the field name by default.
    #[must_use]
    pub fn markup_name(&self) -> String {
        self.markup_name
            .clone()
            .unwrap_or_else(|| self.name.to_case(Case::Pascal))
    }
}
