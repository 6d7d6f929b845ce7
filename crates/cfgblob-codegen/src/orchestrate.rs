use crate::{
    analysis::RecordCx,
    classify::{TypeCategory, find_unsupported},
    container::{self, plan_container},
    error::CodegenError,
    field::plan_field,
    layout::LayoutDecl,
    plan::{Expr, Render, RenderCx, Resolver, Sink, Stmt},
};
use cfgblob_schema::prelude::*;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use tracing::debug;

///
/// Phase
///
/// Allocation must finish before assignment: a self link is only meaningful
/// once the record's identity has been established.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Allocate,
    Assign,
    Done,
}

impl Phase {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Allocate => Self::Assign,
            Self::Assign | Self::Done => Self::Done,
        }
    }
}

///
/// PopulationPlan
///

#[derive(Clone, Debug)]
pub struct PopulationPlan {
    pub record: String,
    pub record_ty: syn::Path,
    pub layout: LayoutDecl,
    pub allocate: Vec<Stmt>,
    pub assign: Vec<Stmt>,
}

impl PopulationPlan {
    #[must_use]
    pub fn size(&self) -> usize {
        self.allocate
            .iter()
            .chain(&self.assign)
            .map(Stmt::size)
            .sum()
    }

    /// `impl rt::Populate for Record`
    #[must_use]
    pub fn render(&self, cx: &RenderCx) -> TokenStream {
        let rt = &cx.rt;
        let record_ty = &self.record_ty;
        let layout = &self.layout.ident;
        let allocate = self.allocate.render(cx);
        let assign = self.assign.render(cx);

        quote! {
            impl #rt::Populate for #record_ty {
                type Layout = #layout;

                #[allow(unused_variables)]
                fn populate<C: #rt::PopulateContext + ?Sized>(
                    &self,
                    ctx: &mut C,
                    target: &mut Self::Layout,
                ) {
                    let source = self;
                    #allocate
                    #assign
                }
            }
        }
    }
}

/// Phase a top-level field belongs to.
pub fn phase_of(cx: &RecordCx<'_>, field: &FieldDescriptor) -> Result<Phase, CodegenError> {
    let category = cx.classify(field, &field.ty)?;

    if category.is_container() || category == TypeCategory::CompositeRecord {
        Ok(Phase::Allocate)
    } else {
        Ok(Phase::Assign)
    }
}

/// Build the two-phase population plan for one record.
pub fn orchestrate(cx: &RecordCx<'_>, layout: LayoutDecl) -> Result<PopulationPlan, CodegenError> {
    let mut allocate = Vec::new();
    let mut assign = Vec::new();
    let mut phase = Phase::Allocate;

    while phase != Phase::Done {
        for field in &cx.record.fields {
            if phase_of(cx, field)? != phase {
                continue;
            }

            match phase {
                Phase::Allocate => allocate.extend(plan_allocation(cx, field)?),
                Phase::Assign => assign.extend(plan_field(cx, field)?),
                Phase::Done => {}
            }
        }
        phase = phase.next();
    }

    if allocate.iter().any(resolves_self) {
        return Err(CodegenError::Validation(DescriptorError::record(
            cx.record.path(),
            "self link resolved during allocation",
        )));
    }

    let plan = PopulationPlan {
        record: cx.record.path(),
        record_ty: cx.record_ty.clone(),
        layout,
        allocate,
        assign,
    };
    debug!(target: "cfgblob", record = %plan.record, statements = plan.size(), "population plan");

    Ok(plan)
}

fn plan_allocation(cx: &RecordCx<'_>, field: &FieldDescriptor) -> Result<Vec<Stmt>, CodegenError> {
    let ident = format_ident!("{}", field.name);

    if cx.classify(field, &field.ty)? == TypeCategory::CompositeRecord {
        return Ok(vec![Stmt::PopulateField {
            record: field.ty.unwrap_option().name.clone(),
            field: ident,
            nullable: field.is_nullable(),
        }]);
    }

    // one stub for the whole field, not one per element
    let unsupported = find_unsupported(&field.ty).map_err(|e| cx.fail(field, e.to_string()))?;
    if let Some(reason) = unsupported {
        return Ok(vec![container::unsupported(cx, field, reason)]);
    }

    plan_container(
        cx,
        field,
        &field.ty,
        Expr::SourceField(ident.clone()),
        Sink::Field(ident),
        0,
    )
}

fn resolves_self(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Resolve {
            resolver: Resolver::SelfLink { .. },
            ..
        }
    ) || stmt.children().iter().any(resolves_self)
}
