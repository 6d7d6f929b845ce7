use crate::{
    analysis::RecordCx,
    error::CodegenError,
    helper::snake_ident,
    layout::{LayoutDecl, LayoutType},
};
use cfgblob_schema::prelude::*;
use convert_case::{Case, Casing};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

///
/// IndexPlan
///
/// Key struct, layout accessor and population routine for one declared
/// index. Key fields keep declaration order, which defines key equality.
///

#[derive(Clone, Debug)]
pub struct IndexPlan {
    pub name: String,
    pub unique: bool,
    pub key: Ident,
    pub accessor: Ident,
    pub populate: Ident,
    pub layout: Ident,
    pub fields: Vec<(Ident, LayoutType)>,
}

/// Plan every index declared on the record.
pub fn plan_indexes(cx: &RecordCx<'_>, layout: &LayoutDecl) -> Result<Vec<IndexPlan>, CodegenError> {
    cx.record
        .indexes
        .iter()
        .map(|index| plan_index(cx, layout, index))
        .collect()
}

fn plan_index(
    cx: &RecordCx<'_>,
    layout: &LayoutDecl,
    index: &IndexDescriptor,
) -> Result<IndexPlan, CodegenError> {
    let fields = index
        .fields
        .iter()
        .map(|name| {
            layout
                .get(name)
                .map(|field| (field.ident.clone(), field.ty.clone()))
                .ok_or_else(|| {
                    CodegenError::descriptor(
                        cx.record.path(),
                        name,
                        format!("index {} names an unknown field", index.name),
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let index_pascal = index.name.to_case(Case::Pascal);
    let record_snake = cx.record.name.to_case(Case::Snake);

    Ok(IndexPlan {
        name: index.name.clone(),
        unique: index.unique,
        key: format_ident!("{}{index_pascal}Key", cx.record.name),
        accessor: snake_ident(&index.name, "key"),
        populate: format_ident!("populate_{record_snake}_{}_index", index.name.to_case(Case::Snake)),
        layout: layout.ident.clone(),
        fields,
    })
}

impl IndexPlan {
    /// `#[derive(..)] pub struct <Record><Index>Key { .. }`
    #[must_use]
    pub fn render_key(&self, rt: &TokenStream) -> TokenStream {
        let key = &self.key;
        let doc = format!(" Key of index `{}`.", self.name);
        let fields = self.fields.iter().map(|(ident, ty)| {
            let ty = ty.tokens(rt);
            quote!(pub #ident: #ty)
        });

        quote! {
            #[doc = #doc]
            #[derive(Clone, Debug, PartialEq, Eq, Hash)]
            pub struct #key {
                #(#fields),*
            }
        }
    }

    /// Accessor placed in the layout's inherent impl.
    #[must_use]
    pub fn render_accessor(&self) -> TokenStream {
        let key = &self.key;
        let accessor = &self.accessor;
        let fields = self.fields.iter().map(|(ident, _)| quote!(#ident: self.#ident.clone()));

        quote! {
            #[must_use]
            pub fn #accessor(&self) -> #key {
                #key {
                    #(#fields),*
                }
            }
        }
    }

    /// Free fn mapping each key to its row position(s) in `rows`.
    #[must_use]
    pub fn render_populate(&self, rt: &TokenStream) -> TokenStream {
        let key = &self.key;
        let accessor = &self.accessor;
        let populate = &self.populate;
        let layout = &self.layout;

        if self.unique {
            // first row wins
            quote! {
                #[allow(clippy::cast_possible_truncation)]
                #[must_use]
                pub fn #populate<C: #rt::PopulateContext + ?Sized>(
                    rows: &[#layout],
                    ctx: &mut C,
                ) -> #rt::FlatMap<#key, u32> {
                    let mut seen = ::std::collections::HashSet::new();
                    let mut entries = ::std::vec::Vec::new();
                    for (row, layout) in rows.iter().enumerate() {
                        let key = layout.#accessor();
                        if seen.insert(key.clone()) {
                            entries.push((key, row as u32));
                        }
                    }

                    let mut index = ctx.alloc_map::<#key, u32>(entries.len());
                    for (key, row) in entries {
                        index.insert(key, row);
                    }
                    index.finish()
                }
            }
        } else {
            quote! {
                #[allow(clippy::cast_possible_truncation)]
                #[must_use]
                pub fn #populate<C: #rt::PopulateContext + ?Sized>(
                    rows: &[#layout],
                    ctx: &mut C,
                ) -> #rt::FlatMap<#key, #rt::FlatArray<u32>> {
                    let mut slots = ::std::collections::HashMap::new();
                    let mut groups: ::std::vec::Vec<(#key, ::std::vec::Vec<u32>)> = ::std::vec::Vec::new();
                    for (row, layout) in rows.iter().enumerate() {
                        let key = layout.#accessor();
                        match slots.get(&key) {
                            Some(&slot) => groups[slot].1.push(row as u32),
                            None => {
                                slots.insert(key.clone(), groups.len());
                                groups.push((key, ::std::vec![row as u32]));
                            }
                        }
                    }

                    let mut index = ctx.alloc_map::<#key, #rt::FlatArray<u32>>(groups.len());
                    for (key, positions) in groups {
                        let mut array = ctx.alloc_array::<u32>(positions.len());
                        for (i, row) in positions.into_iter().enumerate() {
                            array.set(i, row);
                        }
                        index.insert(key, array.finish());
                    }
                    index.finish()
                }
            }
        }
    }
}
