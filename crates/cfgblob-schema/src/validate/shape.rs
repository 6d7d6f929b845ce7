use crate::prelude::*;

/// Per-field checks: type shape, string mode and role.
pub fn validate_field(record: &RecordDescriptor, field: &FieldDescriptor, errs: &mut ErrorTree) {
    let route = field.name.as_str();

    let mut shape_errs = Vec::new();
    validate_type(&field.ty, &mut shape_errs);
    for msg in shape_errs {
        err!(errs, route = route, "{msg}");
    }

    if field.string_mode.is_some() && !has_string_leaf(&field.ty) {
        err!(
            errs,
            route = route,
            "string mode '{}' set on a field without string leaves",
            field.string_mode()
        );
    }

    validate_role(record, field, errs);
}

// Recursive structural check of one declared type.
fn validate_type(ty: &TypeDescriptor, errs: &mut Vec<String>) {
    if syn::parse_str::<syn::Type>(&ty.name).is_err() {
        errs.push(format!("type name '{}' is not a valid type", ty.name));
    }

    match ty.kind {
        TypeKind::Reference => match &ty.target {
            Some(target) => {
                if syn::parse_str::<syn::Path>(target).is_err() {
                    errs.push(format!("reference target '{target}' is not a valid path"));
                }
            }
            None => errs.push(format!("reference type '{ty}' has no target record")),
        },
        TypeKind::Enum | TypeKind::Record if !ty.args.is_empty() => {
            errs.push(format!("generic {} type '{ty}' is not supported", ty.kind));
        }
        _ => {}
    }

    if let Some(known) = ty.well_known()
        && known.arity() != ty.args.len()
    {
        errs.push(format!(
            "'{}' expects {} type argument(s), found {}",
            ty.name,
            known.arity(),
            ty.args.len()
        ));
    }

    let hashed = match ty.well_known() {
        Some(WellKnown::Set | WellKnown::Map) => ty.args.first(),
        _ => None,
    };
    if let Some(key) = hashed
        && has_float(key)
    {
        errs.push(format!("'{key}' cannot key a set or map: floats are not hashable"));
    }

    for arg in &ty.args {
        validate_type(arg, errs);
    }
}

fn has_float(ty: &TypeDescriptor) -> bool {
    matches!(ty.well_known(), Some(WellKnown::Primitive(prim)) if !prim.supports_hash())
        || ty.args.iter().any(has_float)
}

fn validate_role(record: &RecordDescriptor, field: &FieldDescriptor, errs: &mut ErrorTree) {
    let route = field.name.as_str();
    let leaf = field.ty.unwrap_option();

    match field.role {
        FieldRole::Data => {}
        FieldRole::Identity => {
            if leaf.well_known() != Some(WellKnown::String) {
                err!(errs, route = route, "identity fields must be strings, found '{}'", field.ty);
            }
        }
        FieldRole::ParentLink | FieldRole::SelfLink => {
            if leaf.kind != TypeKind::Reference {
                err!(
                    errs,
                    route = route,
                    "{} fields must be references, found '{}'",
                    field.role,
                    field.ty
                );
                return;
            }
            if field.role == FieldRole::SelfLink {
                let target = leaf.target.as_deref().unwrap_or_default();
                let target = target.trim_start_matches("::");
                if target != record.path() && target != record.name {
                    err!(
                        errs,
                        route = route,
                        "self link must target '{}', found '{target}'",
                        record.path()
                    );
                }
            }
        }
    }
}

fn has_string_leaf(ty: &TypeDescriptor) -> bool {
    ty.well_known() == Some(WellKnown::String) || ty.args.iter().any(has_string_leaf)
}
