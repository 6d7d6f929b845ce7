//! Recursive container flattening.
//!
//! One planner covers List, Set and Map at any nesting depth. Each level
//! binds `src_d`, `dst_d`, `i_d`, `elem_d`, ... with its own depth `d`, so an
//! inner level never shadows an outer one. The depth only names bindings;
//! recursion ends because every level descends into a strictly smaller type.

use crate::{
    analysis::RecordCx,
    classify::TypeCategory,
    error::CodegenError,
    layout::map_type,
    plan::{Alloc, Binding, BindingKind, Expr, ForPattern, Sink, Stmt, nest},
    transcode::transcode,
};
use cfgblob_schema::prelude::*;

/// Plan the population of one container value into `sink`.
pub fn plan_container(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
    source: Expr,
    sink: Sink,
    depth: usize,
) -> Result<Vec<Stmt>, CodegenError> {
    let category = cx.classify(field, ty)?;
    let parts = cx.parts(field, ty)?;

    let src = Binding::new(BindingKind::Source, depth);
    let dst = Binding::new(BindingKind::Dest, depth);
    let element_layout = map_type(cx, field, parts.element)?;

    let (alloc, pattern, body) = match category {
        TypeCategory::ListContainer => {
            let index = Binding::new(BindingKind::Index, depth);
            let element = Binding::new(BindingKind::Element, depth);
            let body = plan_element(
                cx,
                field,
                parts.element,
                Expr::Deref(element),
                Sink::Index { dst, index },
                depth,
            )?;

            (
                Alloc::Array(element_layout),
                ForPattern::Enumerate { index, element },
                body,
            )
        }
        TypeCategory::SetContainer => {
            let element = Binding::new(BindingKind::Element, depth);
            let body = plan_element(
                cx,
                field,
                parts.element,
                Expr::Deref(element),
                Sink::Add { dst },
                depth,
            )?;

            (
                Alloc::Set(element_layout),
                ForPattern::Single(element),
                body,
            )
        }
        TypeCategory::MapContainer => {
            let Some(key_ty) = parts.key else {
                return Err(cx.fail(field, format!("map '{ty}' has no key type")));
            };
            let key = Binding::new(BindingKind::Key, depth);
            let value = Binding::new(BindingKind::Value, depth);

            // a failed key resolution skips this entry only
            let key_category = cx.classify(field, key_ty)?;
            let Some(key_conv) = transcode(
                cx,
                field,
                key_ty,
                key_category,
                Expr::Deref(key),
                Binding::new(BindingKind::ResolvedKey, depth),
            )?
            else {
                return Ok(vec![unsupported(cx, field, format!("unsupported map key '{key_ty}'"))]);
            };

            let key_layout = map_type(cx, field, key_ty)?;
            let body = plan_element(
                cx,
                field,
                parts.element,
                Expr::Deref(value),
                Sink::Insert {
                    dst,
                    key: key_conv.value.clone(),
                },
                depth,
            )?;

            (
                Alloc::Map(key_layout, element_layout),
                ForPattern::Pair { key, value },
                nest(key_conv.open.into_iter().collect(), body),
            )
        }
        other => {
            return Err(cx.fail(field, format!("'{ty}' is {other}, not a container")));
        }
    };

    // a nested empty or absent value is still written, so its key or slot survives
    let otherwise = if matches!(sink, Sink::Field(_)) {
        Vec::new()
    } else {
        vec![Stmt::Write {
            sink: sink.clone(),
            value: Expr::Empty(alloc.clone()),
        }]
    };

    Ok(vec![Stmt::Guard {
        source,
        bind: src,
        otherwise,
        body: vec![
            Stmt::Alloc {
                bind: dst,
                alloc,
                len: src,
            },
            Stmt::ForEach {
                pattern,
                source: src,
                body,
            },
            Stmt::Write {
                sink,
                value: Expr::Finish(dst),
            },
        ],
    }])
}

// One element (or map value) written through `sink` at `depth`.
fn plan_element(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
    place: Expr,
    sink: Sink,
    depth: usize,
) -> Result<Vec<Stmt>, CodegenError> {
    let category = cx.classify(field, ty)?;

    if category.is_container() {
        return plan_container(cx, field, ty, place, sink, depth + 1);
    }

    if category == TypeCategory::CompositeRecord {
        let leaf = ty.unwrap_option();
        let nested = Binding::new(BindingKind::Nested, depth);

        return Ok(vec![
            Stmt::Compose {
                bind: nested,
                record: leaf.name.clone(),
                layout: cx.layout_path(field, &leaf.name)?,
                source: place,
                nullable: ty.is_option(),
            },
            Stmt::Write {
                sink,
                value: Expr::Local(nested),
            },
        ]);
    }

    let converted = transcode(
        cx,
        field,
        ty,
        category,
        place,
        Binding::new(BindingKind::Resolved, depth),
    )?;

    Ok(match converted {
        Some(conv) => conv.emit(|value| vec![Stmt::Write { sink, value }]),
        None => vec![unsupported(cx, field, format!("unsupported element '{ty}'"))],
    })
}

/// Visible stub for a shape the planners do not handle.
pub fn unsupported(cx: &RecordCx<'_>, field: &FieldDescriptor, reason: String) -> Stmt {
    tracing::warn!(
        target: "cfgblob",
        record = %cx.record.path(),
        field = %field.name,
        "emitting stub: {reason}"
    );

    Stmt::Unsupported {
        record: cx.record.path(),
        field: field.name.clone(),
        reason,
    }
}
