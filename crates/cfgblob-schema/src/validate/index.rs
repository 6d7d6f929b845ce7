use crate::{MAX_INDEX_FIELDS, prelude::*, validate::naming::validate_ident};
use std::collections::HashSet;

/// Validate index definitions against the record's own fields.
pub fn validate_indexes(record: &RecordDescriptor, errs: &mut ErrorTree) {
    let mut names = HashSet::new();

    for index in &record.indexes {
        let route = format!("index {}", index.name);

        if let Err(msg) = validate_ident(&index.name) {
            err!(errs, "{route}: {msg}");
        }
        if !names.insert(index.name.as_str()) {
            err!(errs, "{route}: duplicate index name");
        }

        // basic shape
        if index.fields.is_empty() {
            err!(errs, "{route}: index must reference at least one field");
            continue;
        }
        if index.fields.len() > MAX_INDEX_FIELDS {
            err!(
                errs,
                "{route}: index has {} fields; maximum is {MAX_INDEX_FIELDS}",
                index.fields.len()
            );
        }

        // existence, uniqueness and key eligibility
        let mut seen = HashSet::new();
        for field_name in &index.fields {
            if !seen.insert(field_name.as_str()) {
                err!(errs, "{route}: index contains duplicate field '{field_name}'");
                continue;
            }
            let Some(field) = record.get_field(field_name) else {
                err!(errs, "{route}: index field '{field_name}' not found");
                continue;
            };
            if let Err(msg) = key_eligible(&field.ty) {
                err!(errs, "{route}: index field '{field_name}' {msg}");
            }
        }
    }

    // redundant indexes (equal or prefix of another with the same uniqueness)
    for (i, a) in record.indexes.iter().enumerate() {
        for b in record.indexes.iter().skip(i + 1) {
            if a.unique != b.unique {
                continue;
            }
            if a.fields == b.fields {
                err!(errs, "index {} duplicates index {}", b.name, a.name);
            } else if a.is_prefix_of(b) {
                err!(errs, "index {a} is redundant (prefix of {b})");
            } else if b.is_prefix_of(a) {
                err!(errs, "index {b} is redundant (prefix of {a})");
            }
        }
    }
}

// Index keys must hash and compare by value.
fn key_eligible(ty: &TypeDescriptor) -> Result<(), &'static str> {
    let ty = ty.unwrap_option();

    match (ty.kind, ty.well_known()) {
        (TypeKind::Record, _) => Err("cannot be a composite record"),
        (_, Some(WellKnown::List | WellKnown::Map | WellKnown::Set)) => {
            Err("cannot be a container")
        }
        (_, Some(WellKnown::Primitive(prim))) if !prim.supports_hash() => {
            Err("cannot be floating point")
        }
        (_, Some(WellKnown::Option)) => Err("cannot be doubly nullable"),
        _ => Ok(()),
    }
}
