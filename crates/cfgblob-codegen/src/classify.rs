use cfgblob_schema::prelude::*;
use derive_more::Display;

///
/// TypeCategory
///
/// Closed classification of a declared type. `Unsupported` is the sentinel
/// every planner turns into a visible stub.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum TypeCategory {
    CompositeRecord,
    CrossReference,
    Enum,
    ListContainer,
    MapContainer,
    Nullable,
    Primitive,
    SetContainer,
    String,
    Unsupported,
}

impl TypeCategory {
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::ListContainer | Self::MapContainer | Self::SetContainer
        )
    }

    /// Categories the element transcoder converts directly.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::CrossReference | Self::Enum | Self::Nullable | Self::Primitive | Self::String
        )
    }
}

///
/// ShapeError
///
/// A known container with the wrong number of type arguments.
///

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("'{name}' expects {expected} type argument(s), found {found}")]
pub struct ShapeError {
    pub name: String,
    pub expected: usize,
    pub found: usize,
}

/// Classify one declared type. Nullability is stripped first; the result is
/// `Nullable` only for value-type leaves.
pub fn classify(ty: &TypeDescriptor) -> Result<TypeCategory, ShapeError> {
    let category = match ty.kind {
        TypeKind::Enum => TypeCategory::Enum,
        TypeKind::Record => TypeCategory::CompositeRecord,
        TypeKind::Reference => TypeCategory::CrossReference,
        TypeKind::Auto => {
            let Some(known) = ty.well_known() else {
                return Ok(TypeCategory::Unsupported);
            };
            if known.arity() != ty.args.len() {
                return Err(ShapeError {
                    name: ty.name.clone(),
                    expected: known.arity(),
                    found: ty.args.len(),
                });
            }

            match known {
                WellKnown::Option => classify_nullable(&ty.args[0])?,
                WellKnown::List => TypeCategory::ListContainer,
                WellKnown::Map => TypeCategory::MapContainer,
                WellKnown::Set => TypeCategory::SetContainer,
                WellKnown::String => TypeCategory::String,
                WellKnown::Primitive(_) => TypeCategory::Primitive,
            }
        }
    };

    Ok(category)
}

fn classify_nullable(inner: &TypeDescriptor) -> Result<TypeCategory, ShapeError> {
    if inner.is_option() {
        return Ok(TypeCategory::Unsupported);
    }

    let category = match classify(inner)? {
        TypeCategory::Primitive | TypeCategory::Enum => TypeCategory::Nullable,
        other => other,
    };

    Ok(category)
}

///
/// ContainerParts
///
/// Key and element types of a classified container (nullability stripped).
///

#[derive(Clone, Copy, Debug)]
pub struct ContainerParts<'a> {
    pub key: Option<&'a TypeDescriptor>,
    pub element: &'a TypeDescriptor,
}

/// Split a container into its parts, or `None` if it is not a container.
#[must_use]
pub fn container_parts(ty: &TypeDescriptor) -> Option<ContainerParts<'_>> {
    let ty = ty.unwrap_option();

    match ty.well_known()? {
        WellKnown::List | WellKnown::Set => Some(ContainerParts {
            key: None,
            element: ty.arg(0)?,
        }),
        WellKnown::Map => Some(ContainerParts {
            key: Some(ty.arg(0)?),
            element: ty.arg(1)?,
        }),
        _ => None,
    }
}

/// First reason the shape cannot be planned, searching through containers.
pub fn find_unsupported(ty: &TypeDescriptor) -> Result<Option<String>, ShapeError> {
    let category = classify(ty)?;
    if category == TypeCategory::Unsupported {
        return Ok(Some(format!("unsupported type '{ty}'")));
    }
    if !category.is_container() {
        return Ok(None);
    }

    let Some(parts) = container_parts(ty) else {
        return Ok(None);
    };
    if let Some(key) = parts.key {
        let key_category = classify(key)?;
        if !key_category.is_leaf() || key_category == TypeCategory::Nullable {
            return Ok(Some(format!("unsupported map key '{key}'")));
        }
    }

    find_unsupported(parts.element)
}
