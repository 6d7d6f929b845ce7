use cfgblob_schema::prelude::*;
use convert_case::{Case, Casing};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{Path, Type};

// Path helpers

/// Parse a Rust path, tolerating a leading `::`.
#[must_use]
pub fn parse_path(s: &str) -> Option<Path> {
    syn::parse_str::<Path>(s.trim()).ok()
}

/// snake_case ident from an arbitrary record or type name.
#[must_use]
pub fn snake_ident(prefix: &str, name: &str) -> Ident {
    let snake = name.replace("::", "_").to_case(Case::Snake);

    if prefix.is_empty() {
        format_ident!("{snake}")
    } else {
        format_ident!("{prefix}_{snake}")
    }
}

// Managed types

/// Fully qualified path for a well-known type spelled by its short name.
fn qualify(name: &str) -> &str {
    match name {
        "Option" => "::core::option::Option",
        "Vec" => "::std::vec::Vec",
        "String" => "::std::string::String",
        "HashMap" => "::std::collections::HashMap",
        "BTreeMap" => "::std::collections::BTreeMap",
        "HashSet" => "::std::collections::HashSet",
        "BTreeSet" => "::std::collections::BTreeSet",
        other => other,
    }
}

/// Render a declared type as the managed Rust type it names.
pub fn managed_type(ty: &TypeDescriptor) -> Result<Type, String> {
    // references are declared by their key type
    let name = if matches!(ty.kind, TypeKind::Auto | TypeKind::Reference) {
        qualify(&ty.name)
    } else {
        ty.name.as_str()
    };

    if ty.args.is_empty() {
        return syn::parse_str::<Type>(name).map_err(|_| format!("invalid type '{}'", ty.name));
    }

    let base = parse_path(name).ok_or_else(|| format!("invalid generic type '{}'", ty.name))?;
    let args = ty
        .args
        .iter()
        .map(managed_type)
        .collect::<Result<Vec<_>, _>>()?;
    let tokens: TokenStream = quote!(#base<#(#args),*>);

    syn::parse2::<Type>(tokens).map_err(|_| format!("invalid generic type '{ty}'"))
}
