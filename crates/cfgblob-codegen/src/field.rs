//! Top-level assignment for non-container, non-composite fields.
//!
//! Categories overlap (a parent link is also a reference, a nullable enum is
//! also an enum), so the rules form an ordered table and the first match
//! wins. New leaf categories are added as new rows.

use crate::{
    analysis::RecordCx,
    classify::TypeCategory,
    container::unsupported,
    error::CodegenError,
    plan::{Binding, BindingKind, Expr, Resolver, Sink, Stmt},
    transcode::transcode,
};
use cfgblob_schema::prelude::*;
use quote::format_ident;

///
/// FieldFacts
///

#[derive(Clone, Copy, Debug)]
pub struct FieldFacts {
    pub category: TypeCategory,
    pub role: FieldRole,
}

type Handler = fn(&RecordCx<'_>, &FieldDescriptor, FieldFacts) -> Result<Vec<Stmt>, CodegenError>;

///
/// Rule
///

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(FieldFacts) -> bool,
    pub handler: Handler,
}

/// Assignment rules in priority order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "unsupported",
        applies: |f| f.category == TypeCategory::Unsupported,
        handler: plan_unsupported,
    },
    Rule {
        name: "cross_reference",
        applies: |f| f.category == TypeCategory::CrossReference || f.role.is_link(),
        handler: plan_reference,
    },
    Rule {
        name: "identity",
        applies: |f| f.role == FieldRole::Identity,
        handler: plan_identity,
    },
    Rule {
        name: "nullable",
        applies: |f| f.category == TypeCategory::Nullable,
        handler: plan_leaf,
    },
    Rule {
        name: "enum",
        applies: |f| f.category == TypeCategory::Enum,
        handler: plan_leaf,
    },
    Rule {
        name: "string",
        applies: |f| f.category == TypeCategory::String,
        handler: plan_leaf,
    },
    Rule {
        name: "default",
        applies: |_| true,
        handler: plan_leaf,
    },
];

/// The first rule that applies to a field.
#[must_use]
pub fn select_rule(facts: FieldFacts) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(facts))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Plan the assignment of one scalar or reference field.
pub fn plan_field(cx: &RecordCx<'_>, field: &FieldDescriptor) -> Result<Vec<Stmt>, CodegenError> {
    let facts = FieldFacts {
        category: cx.classify(field, &field.ty)?,
        role: field.role,
    };
    let rule = select_rule(facts);
    tracing::trace!(target: "cfgblob", field = %field.name, rule = rule.name, "assignment rule");

    (rule.handler)(cx, field, facts)
}

fn source(field: &FieldDescriptor) -> Expr {
    Expr::SourceField(format_ident!("{}", field.name))
}

fn sink(field: &FieldDescriptor) -> Sink {
    Sink::Field(format_ident!("{}", field.name))
}

fn resolved() -> Binding {
    Binding::new(BindingKind::Resolved, 0)
}

// visible stub, the layout slot keeps its default
fn plan_unsupported(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    _: FieldFacts,
) -> Result<Vec<Stmt>, CodegenError> {
    Ok(vec![unsupported(cx, field, format!("unsupported type '{}'", field.ty))])
}

// resolve, assign if found, else leave the default
fn plan_reference(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    _: FieldFacts,
) -> Result<Vec<Stmt>, CodegenError> {
    let leaf = field.ty.unwrap_option();
    let target = cx.reference_target(field, leaf)?;
    let layout = cx.layout_path(field, &target)?;

    let resolver = match field.role {
        FieldRole::ParentLink => Resolver::Parent { target, layout },
        FieldRole::SelfLink => Resolver::SelfLink { target, layout },
        FieldRole::Data | FieldRole::Identity => Resolver::Ref {
            target,
            layout,
            key: source(field),
        },
    };

    Ok(vec![Stmt::Resolve {
        bind: resolved(),
        resolver,
        body: vec![Stmt::Write {
            sink: sink(field),
            value: Expr::Local(resolved()),
        }],
    }])
}

fn plan_identity(
    _: &RecordCx<'_>,
    field: &FieldDescriptor,
    _: FieldFacts,
) -> Result<Vec<Stmt>, CodegenError> {
    Ok(vec![Stmt::Resolve {
        bind: resolved(),
        resolver: Resolver::Identity(source(field)),
        body: vec![Stmt::Write {
            sink: sink(field),
            value: Expr::Local(resolved()),
        }],
    }])
}

// nullable, enum, string and plain copies share the leaf transcoder
fn plan_leaf(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    facts: FieldFacts,
) -> Result<Vec<Stmt>, CodegenError> {
    let converted = transcode(cx, field, &field.ty, facts.category, source(field), resolved())?;

    match converted {
        Some(conv) => Ok(conv.emit(|value| {
            vec![Stmt::Write {
                sink: sink(field),
                value,
            }]
        })),
        None => Err(cx.fail(
            field,
            format!("{} field reached the scalar planner", facts.category),
        )),
    }
}
