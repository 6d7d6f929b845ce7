use crate::{
    CodegenOptions,
    analysis::RecordCx,
    error::CodegenError,
    index::plan_indexes,
    layout::LayoutDecl,
    orchestrate::orchestrate,
    parse::plan_parse,
};
use cfgblob_schema::{prelude::*, validate::validate_record};
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::quote;

///
/// GeneratedRecord
///
/// Everything emitted for one record, ready to be written as one file.
///

#[derive(Clone, Debug)]
pub struct GeneratedRecord {
    pub record: String,
    pub file_stem: String,
    pub tokens: TokenStream,
}

impl GeneratedRecord {
    /// File name the record is written to.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.file_stem)
    }
}

/// Validate, plan and render one record.
pub fn generate_record(
    set: &DescriptorSet,
    record: &RecordDescriptor,
    options: &CodegenOptions,
) -> Result<GeneratedRecord, CodegenError> {
    validate_record(set, record)?;

    let cx = RecordCx::new(set, record, options)?;
    let rt = cx.rt();

    let layout = LayoutDecl::build(&cx)?;
    let layout_struct = layout.render(rt);
    let indexes = plan_indexes(&cx, &layout)?;

    // enum-key helpers and index accessors share the layout's inherent impl
    let layout_ident = &layout.ident;
    let helpers = cx.enums.render(rt);
    let accessors = indexes.iter().map(|index| index.render_accessor());
    let layout_impl = (!cx.enums.is_empty() || !indexes.is_empty()).then(|| {
        quote! {
            impl #layout_ident {
                #helpers
                #(#accessors)*
            }
        }
    });

    let population = orchestrate(&cx, layout)?.render(&cx.render_cx());
    let parse = plan_parse(&cx)?.render(rt);
    let index_keys = indexes.iter().map(|index| index.render_key(rt));
    let index_routines = indexes.iter().map(|index| index.render_populate(rt));

    let tokens = quote! {
        #layout_struct
        #layout_impl
        #population
        #parse
        #(#index_keys)*
        #(#index_routines)*
    };

    Ok(GeneratedRecord {
        record: record.path(),
        file_stem: record.path().replace("::", "_").to_case(Case::Snake),
        tokens,
    })
}
