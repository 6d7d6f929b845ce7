use derive_more::{Display, FromStr};
use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use serde::{Deserialize, Serialize};

///
/// Primitive
///
/// Scalar leaf types that are copied verbatim into a layout.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, FromStr, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum Primitive {
    Bool,
    Char,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
}

impl Primitive {
    /// Recognise a reflected Rust type name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        let prim = match name {
            "bool" => Self::Bool,
            "char" => Self::Char,
            "f32" => Self::Float32,
            "f64" => Self::Float64,
            "i8" => Self::Int8,
            "i16" => Self::Int16,
            "i32" => Self::Int32,
            "i64" => Self::Int64,
            "u8" => Self::Nat8,
            "u16" => Self::Nat16,
            "u32" => Self::Nat32,
            "u64" => Self::Nat64,
            _ => return None,
        };

        Some(prim)
    }

    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Nat8 => "u8",
            Self::Nat16 => "u16",
            Self::Nat32 => "u32",
            Self::Nat64 => "u64",
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    // floats have no total equality, so they cannot key a hashed index
    #[must_use]
    pub const fn supports_hash(self) -> bool {
        !self.is_float()
    }

    #[must_use]
    pub fn as_type(self) -> TokenStream {
        let ident = format_ident!("{}", self.type_name());

        quote!(#ident)
    }
}

impl ToTokens for Primitive {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(self.as_type());
    }
}

///
/// TypeKind
///
/// Reflection hint attached to a declared type. `Auto` means the type is
/// recognised by name (primitives, strings, containers).
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, FromStr, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Auto,
    Enum,
    Record,
    Reference,
}

///
/// StringMode
///
/// Layout representation for string leaves. Inline buffers truncate, so they
/// are only ever selected explicitly.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, FromStr, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StringMode {
    #[default]
    Interned,
    Inline32,
    Inline64,
    Label,
}

impl StringMode {
    /// Inline buffers never fail; handle-backed modes resolve through a table.
    #[must_use]
    pub const fn is_fallible(self) -> bool {
        matches!(self, Self::Interned | Self::Label)
    }

    #[must_use]
    pub const fn inline_capacity(self) -> Option<usize> {
        match self {
            Self::Inline32 => Some(32),
            Self::Inline64 => Some(64),
            Self::Interned | Self::Label => None,
        }
    }
}

///
/// FieldRole
///
/// Structural role of a field within its record.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, FromStr, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    #[default]
    Data,

    /// The record's own identity key, resolved to an identity handle.
    Identity,

    /// Reference to the enclosing (parent) record.
    ParentLink,

    /// Reference to the record itself, resolved to its own position.
    SelfLink,
}

impl FieldRole {
    #[must_use]
    pub const fn is_link(self) -> bool {
        matches!(self, Self::ParentLink | Self::SelfLink)
    }
}

///
/// WellKnown
///
/// Declared types recognised by name, independent of reflection hints.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WellKnown {
    Option,
    List,
    Map,
    Set,
    String,
    Primitive(Primitive),
}

impl WellKnown {
    /// Number of generic arguments the type must carry.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Option | Self::List | Self::Set => 1,
            Self::Map => 2,
            Self::String | Self::Primitive(_) => 0,
        }
    }

    #[must_use]
    pub fn recognise(name: &str) -> Option<Self> {
        let name = name.trim_start_matches("::");
        let short = name
            .strip_prefix("std::collections::")
            .or_else(|| name.strip_prefix("alloc::collections::"))
            .or_else(|| name.strip_prefix("std::option::"))
            .or_else(|| name.strip_prefix("core::option::"))
            .or_else(|| name.strip_prefix("std::vec::"))
            .or_else(|| name.strip_prefix("alloc::vec::"))
            .or_else(|| name.strip_prefix("std::string::"))
            .or_else(|| name.strip_prefix("alloc::string::"))
            .unwrap_or(name);

        let known = match short {
            "Option" => Self::Option,
            "Vec" => Self::List,
            "HashMap" | "BTreeMap" => Self::Map,
            "HashSet" | "BTreeSet" => Self::Set,
            "String" => Self::String,
            other => Self::Primitive(Primitive::from_type_name(other)?),
        };

        Some(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_prefixed_container_names() {
        assert_eq!(
            WellKnown::recognise("std::collections::HashMap"),
            Some(WellKnown::Map)
        );
        assert_eq!(WellKnown::recognise("::std::vec::Vec"), Some(WellKnown::List));
        assert_eq!(WellKnown::recognise("BTreeSet"), Some(WellKnown::Set));
        assert_eq!(
            WellKnown::recognise("u16"),
            Some(WellKnown::Primitive(Primitive::Nat16))
        );
    }

    #[test]
    fn rejects_pointer_sized_and_unknown_names() {
        assert_eq!(WellKnown::recognise("usize"), None);
        assert_eq!(WellKnown::recognise("VecDeque"), None);
        assert_eq!(WellKnown::recognise("crate::Vec3"), None);
    }

    #[test]
    fn string_modes_parse_from_config_spelling() {
        let mode: StringMode = serde_json::from_str("\"inline32\"").expect("parse mode");
        assert_eq!(mode, StringMode::Inline32);
        assert!(!mode.is_fallible());
        assert!(StringMode::default().is_fallible());
    }
}
