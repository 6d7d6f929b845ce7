use crate::{MAX_IDENT_LEN, prelude::*, validate::reserved::is_reserved_word};
use convert_case::{Case, Casing};
use std::collections::BTreeSet;

/// Record name, namespace and field identifiers.
pub fn validate_naming(record: &RecordDescriptor, errs: &mut ErrorTree) {
    if let Err(msg) = validate_ident(&record.name) {
        err!(errs, "record name: {msg}");
    }
    if !record.namespace.is_empty() && syn::parse_str::<syn::Path>(&record.namespace).is_err() {
        err!(errs, "namespace '{}' is not a valid module path", record.namespace);
    }
    if let Some(layout) = &record.layout
        && let Err(msg) = validate_ident(layout)
    {
        err!(errs, "declared layout: {msg}");
    }

    let mut seen = BTreeSet::new();
    for field in &record.fields {
        let name = field.name.as_str();
        if !seen.insert(name) {
            err!(errs, route = name, "duplicate field name");
            continue;
        }
        if let Err(msg) = validate_ident(name) {
            err!(errs, route = name, "{msg}");
        } else if name.to_case(Case::Snake) != name {
            err!(errs, route = name, "field ident '{name}' must be snake_case");
        }
    }
}

/// Ensure an identifier is non-empty, bounded, not reserved and parseable.
pub(crate) fn validate_ident(ident: &str) -> Result<(), String> {
    if ident.is_empty() {
        return Err("ident is empty".to_string());
    }
    if ident.len() > MAX_IDENT_LEN {
        return Err(format!("ident '{ident}' exceeds max length {MAX_IDENT_LEN}"));
    }
    if is_reserved_word(ident) {
        return Err(format!("the word '{ident}' is reserved"));
    }
    if syn::parse_str::<syn::Ident>(ident).is_err() {
        return Err(format!("'{ident}' is not a valid identifier"));
    }

    Ok(())
}
