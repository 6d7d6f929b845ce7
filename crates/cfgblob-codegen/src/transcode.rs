//! Leaf conversion shared by every write site.
//!
//! Index-assign, set-add, map-key, map-value and direct field assignment all
//! take their conversion from here, so a leaf converts identically wherever
//! it appears.

use crate::{
    analysis::RecordCx,
    classify::TypeCategory,
    error::CodegenError,
    plan::{Binding, Expr, Resolver, Stmt, nest},
};
use cfgblob_schema::prelude::*;

///
/// Transcoded
///
/// A converted leaf: the value expression plus, for fallible conversions,
/// the resolution block that must enclose its use.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transcoded {
    pub open: Option<(Binding, Resolver)>,
    pub value: Expr,
}

impl Transcoded {
    const fn direct(value: Expr) -> Self {
        Self { open: None, value }
    }

    fn guarded(bind: Binding, resolver: Resolver) -> Self {
        Self {
            open: Some((bind, resolver)),
            value: Expr::Local(bind),
        }
    }

    #[must_use]
    pub const fn opens_block(&self) -> bool {
        self.open.is_some()
    }

    /// Emit `write(value)`, inside the resolution block if one is open.
    pub fn emit(self, write: impl FnOnce(Expr) -> Vec<Stmt>) -> Vec<Stmt> {
        let body = write(self.value);

        nest(self.open.into_iter().collect(), body)
    }
}

/// Convert one leaf. Returns `None` for categories that are not leaves
/// (composites, containers, unsupported), which callers handle one level up.
pub fn transcode(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
    category: TypeCategory,
    source: Expr,
    bind: Binding,
) -> Result<Option<Transcoded>, CodegenError> {
    let leaf = ty.unwrap_option();

    let transcoded = match category {
        TypeCategory::Primitive => Transcoded::direct(source),
        TypeCategory::Nullable => {
            let value = source.unwrap_or_default();
            if leaf.kind == TypeKind::Enum {
                Transcoded::direct(value.enum_key(cx.enum_helper(field, leaf)?))
            } else {
                Transcoded::direct(value)
            }
        }
        TypeCategory::String => match field.string_mode() {
            StringMode::Interned => Transcoded::guarded(bind, Resolver::String(source)),
            StringMode::Label => Transcoded::guarded(bind, Resolver::Label(source)),
            mode @ (StringMode::Inline32 | StringMode::Inline64) => {
                let capacity = mode.inline_capacity().unwrap_or(32);
                Transcoded::direct(source.truncate(capacity))
            }
        },
        TypeCategory::Enum => Transcoded::direct(source.enum_key(cx.enum_helper(field, leaf)?)),
        TypeCategory::CrossReference => {
            let target = cx.reference_target(field, leaf)?;
            let layout = cx.layout_path(field, &target)?;

            Transcoded::guarded(
                bind,
                Resolver::Ref {
                    target,
                    layout,
                    key: source,
                },
            )
        }
        TypeCategory::CompositeRecord
        | TypeCategory::ListContainer
        | TypeCategory::MapContainer
        | TypeCategory::SetContainer
        | TypeCategory::Unsupported => return Ok(None),
    };

    Ok(Some(transcoded))
}
