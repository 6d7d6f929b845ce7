use crate::{
    CodegenOptions,
    classify::{ContainerParts, TypeCategory, classify, container_parts},
    error::CodegenError,
    helper::{parse_path, snake_ident},
    plan::RenderCx,
};
use cfgblob_schema::prelude::*;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

///
/// RecordCx
///
/// Everything the planners need for one record, computed once per pass.
///

pub struct RecordCx<'a> {
    pub set: &'a DescriptorSet,
    pub record: &'a RecordDescriptor,
    pub options: &'a CodegenOptions,
    pub record_ty: syn::Path,
    pub layout: Ident,
    pub enums: EnumTable,
}

impl<'a> RecordCx<'a> {
    pub fn new(
        set: &'a DescriptorSet,
        record: &'a RecordDescriptor,
        options: &'a CodegenOptions,
    ) -> Result<Self, CodegenError> {
        let path = record.path();
        let record_ty = parse_path(&path).ok_or_else(|| {
            CodegenError::Validation(DescriptorError::record(&path, "record path does not parse"))
        })?;
        let layout = format_ident!("{}", record.layout_name(&options.layout_suffix));
        let enums = EnumTable::collect(record)?;

        Ok(Self {
            set,
            record,
            options,
            record_ty,
            layout,
            enums,
        })
    }

    #[must_use]
    pub const fn rt(&self) -> &TokenStream {
        &self.options.paths.runtime
    }

    #[must_use]
    pub fn render_cx(&self) -> RenderCx {
        RenderCx {
            rt: self.rt().clone(),
            layout: self.layout.clone(),
        }
    }

    pub fn fail(&self, field: &FieldDescriptor, message: impl Into<String>) -> CodegenError {
        CodegenError::descriptor(self.record.path(), &field.name, message)
    }

    pub fn classify(
        &self,
        field: &FieldDescriptor,
        ty: &TypeDescriptor,
    ) -> Result<TypeCategory, CodegenError> {
        classify(ty).map_err(|e| self.fail(field, e.to_string()))
    }

    pub fn parts<'t>(
        &self,
        field: &FieldDescriptor,
        ty: &'t TypeDescriptor,
    ) -> Result<ContainerParts<'t>, CodegenError> {
        container_parts(ty).ok_or_else(|| self.fail(field, format!("'{ty}' has no element type")))
    }

    pub fn reference_target(
        &self,
        field: &FieldDescriptor,
        ty: &TypeDescriptor,
    ) -> Result<String, CodegenError> {
        ty.target
            .clone()
            .ok_or_else(|| self.fail(field, format!("reference '{ty}' has no target record")))
    }

    pub fn enum_path(
        &self,
        field: &FieldDescriptor,
        ty: &TypeDescriptor,
    ) -> Result<syn::Path, CodegenError> {
        parse_path(&ty.name).ok_or_else(|| self.fail(field, format!("invalid enum path '{ty}'")))
    }

    /// Enum-key helper for an enum leaf.
    pub fn enum_helper(
        &self,
        field: &FieldDescriptor,
        ty: &TypeDescriptor,
    ) -> Result<Ident, CodegenError> {
        let name = &ty.unwrap_option().name;

        self.enums
            .get(name)
            .map(|conv| conv.helper.clone())
            .ok_or_else(|| self.fail(field, format!("no enum conversion for '{name}'")))
    }

    /// Layout path for a referenced or nested record. A record's declared
    /// layout is authoritative; suffix concatenation is the fallback.
    pub fn layout_path(
        &self,
        field: &FieldDescriptor,
        type_name: &str,
    ) -> Result<syn::Path, CodegenError> {
        let name = self.set.layout_of(type_name, &self.options.layout_suffix);

        match name.source {
            LayoutSource::Declared => {}
            LayoutSource::Suffix => {
                debug!(target: "cfgblob", record = %self.record.path(), field = %field.name,
                    "layout for '{type_name}' derived by suffix: {}", name.path);
            }
            LayoutSource::Unknown => {
                debug!(target: "cfgblob", record = %self.record.path(), field = %field.name,
                    "'{type_name}' is not in the descriptor set, assuming {}", name.path);
            }
        }

        parse_path(&name.path)
            .ok_or_else(|| self.fail(field, format!("invalid layout path '{}'", name.path)))
    }
}

///
/// EnumConversion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumConversion {
    pub helper: Ident,
    pub ty: syn::Path,
}

///
/// EnumTable
///
/// One conversion helper per distinct enum type seen anywhere in a record,
/// keyed by the enum's type path.
///

#[derive(Clone, Debug, Default)]
pub struct EnumTable(BTreeMap<String, EnumConversion>);

impl EnumTable {
    pub fn collect(record: &RecordDescriptor) -> Result<Self, CodegenError> {
        let mut paths = BTreeMap::new();
        for field in &record.fields {
            collect_enums(&field.ty, &field.name, &mut paths);
        }

        // short names that appear under more than one path are spelled out
        let mut seen = BTreeSet::new();
        let mut clashing = BTreeSet::new();
        for path in paths.keys() {
            let short = short_name(path);
            if !seen.insert(short) {
                clashing.insert(short);
            }
        }

        let mut table = BTreeMap::new();
        for (path, field) in &paths {
            let ty = parse_path(path).ok_or_else(|| {
                CodegenError::descriptor(record.path(), *field, format!("invalid enum path '{path}'"))
            })?;
            let short = short_name(path);
            let helper = if clashing.contains(short) {
                snake_ident("enum_key", path.trim_start_matches("::"))
            } else {
                snake_ident("enum_key", short)
            };

            table.insert(path.clone(), EnumConversion { helper, ty });
        }

        Ok(Self(table))
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&EnumConversion> {
        self.0.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Helper fns, placed inside the layout's inherent impl.
    #[must_use]
    pub fn render(&self, rt: &TokenStream) -> TokenStream {
        let helpers = self.0.values().map(|EnumConversion { helper, ty }| {
            quote! {
                #[must_use]
                pub fn #helper(value: #ty) -> #rt::EnumKey<#ty> {
                    #rt::EnumKey::new(value)
                }
            }
        });

        quote!(#(#helpers)*)
    }
}

fn collect_enums<'a>(ty: &'a TypeDescriptor, field: &'a str, out: &mut BTreeMap<String, &'a str>) {
    if ty.kind == TypeKind::Enum {
        out.entry(ty.name.clone()).or_insert(field);
    }
    for arg in &ty.args {
        collect_enums(arg, field, out);
    }
}

fn short_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
