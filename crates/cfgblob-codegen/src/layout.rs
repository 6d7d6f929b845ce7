use crate::{
    analysis::RecordCx,
    classify::TypeCategory,
    error::CodegenError,
};
use cfgblob_schema::prelude::*;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

///
/// LayoutType
///
/// Projection-layout type of one field or container part.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LayoutType {
    Primitive(Primitive),
    Str(StringMode),
    Identity,
    EnumKey(syn::Path),
    Ref { target: String, layout: syn::Path },
    Composite { record: String, layout: syn::Path },
    Array(Box<Self>),
    Map(Box<Self>, Box<Self>),
    Set(Box<Self>),
    Unsupported,
}

impl LayoutType {
    #[must_use]
    pub fn tokens(&self, rt: &TokenStream) -> TokenStream {
        match self {
            Self::Primitive(prim) => quote!(#prim),
            Self::Str(mode) => {
                let ident = match mode {
                    StringMode::Interned => format_ident!("StrHandle"),
                    StringMode::Inline32 => format_ident!("InlineStr32"),
                    StringMode::Inline64 => format_ident!("InlineStr64"),
                    StringMode::Label => format_ident!("LabelHandle"),
                };
                quote!(#rt::#ident)
            }
            Self::Identity => quote!(#rt::IdentityHandle),
            Self::EnumKey(path) => quote!(#rt::EnumKey<#path>),
            Self::Ref { layout, .. } => quote!(#rt::Ref<#layout>),
            Self::Composite { layout, .. } => quote!(#layout),
            Self::Array(element) => {
                let element = element.tokens(rt);
                quote!(#rt::FlatArray<#element>)
            }
            Self::Map(key, value) => {
                let key = key.tokens(rt);
                let value = value.tokens(rt);
                quote!(#rt::FlatMap<#key, #value>)
            }
            Self::Set(element) => {
                let element = element.tokens(rt);
                quote!(#rt::FlatSet<#element>)
            }
            Self::Unsupported => quote!(#rt::Unsupported),
        }
    }
}

/// Layout type of a top-level field.
pub fn map_layout(cx: &RecordCx<'_>, field: &FieldDescriptor) -> Result<LayoutType, CodegenError> {
    if field.role == FieldRole::Identity {
        return Ok(LayoutType::Identity);
    }

    map_type(cx, field, &field.ty)
}

/// Layout type of any declared type reachable from `field`.
pub fn map_type(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
) -> Result<LayoutType, CodegenError> {
    let category = cx.classify(field, ty)?;
    let leaf = ty.unwrap_option();

    let layout = match category {
        TypeCategory::Primitive => match leaf.well_known() {
            Some(WellKnown::Primitive(prim)) => LayoutType::Primitive(prim),
            _ => LayoutType::Unsupported,
        },
        TypeCategory::Nullable => map_type(cx, field, leaf)?,
        TypeCategory::String => LayoutType::Str(field.string_mode()),
        TypeCategory::Enum => LayoutType::EnumKey(cx.enum_path(field, leaf)?),
        TypeCategory::CrossReference => {
            let target = cx.reference_target(field, leaf)?;
            LayoutType::Ref {
                layout: cx.layout_path(field, &target)?,
                target,
            }
        }
        TypeCategory::CompositeRecord => LayoutType::Composite {
            layout: cx.layout_path(field, &leaf.name)?,
            record: leaf.name.clone(),
        },
        TypeCategory::ListContainer | TypeCategory::SetContainer => {
            let parts = cx.parts(field, ty)?;
            let element = Box::new(map_type(cx, field, parts.element)?);

            if category == TypeCategory::ListContainer {
                LayoutType::Array(element)
            } else {
                LayoutType::Set(element)
            }
        }
        TypeCategory::MapContainer => {
            let parts = cx.parts(field, ty)?;
            let key = match parts.key {
                Some(key) => map_type(cx, field, key)?,
                None => LayoutType::Unsupported,
            };

            LayoutType::Map(Box::new(key), Box::new(map_type(cx, field, parts.element)?))
        }
        TypeCategory::Unsupported => LayoutType::Unsupported,
    };

    Ok(layout)
}

///
/// LayoutDecl
///
/// The flat projection struct declared for one record.
///

#[derive(Clone, Debug)]
pub struct LayoutDecl {
    pub ident: Ident,
    pub fields: Vec<LayoutField>,
}

///
/// LayoutField
///

#[derive(Clone, Debug)]
pub struct LayoutField {
    pub ident: Ident,
    pub ty: LayoutType,
    pub comment: Option<String>,
}

impl LayoutDecl {
    pub fn build(cx: &RecordCx<'_>) -> Result<Self, CodegenError> {
        let fields = cx
            .record
            .fields
            .iter()
            .map(|field| {
                Ok(LayoutField {
                    ident: format_ident!("{}", field.name),
                    ty: map_layout(cx, field)?,
                    comment: field.comment.clone(),
                })
            })
            .collect::<Result<Vec<_>, CodegenError>>()?;

        Ok(Self {
            ident: cx.layout.clone(),
            fields,
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LayoutField> {
        self.fields.iter().find(|f| f.ident == name)
    }

    #[must_use]
    pub fn render(&self, rt: &TokenStream) -> TokenStream {
        let ident = &self.ident;
        let fields = self.fields.iter().map(|field| {
            let name = &field.ident;
            let ty = field.ty.tokens(rt);
            let doc = field.comment.as_ref().map(|c| quote!(#[doc = #c]));

            quote! {
                #doc
                pub #name: #ty
            }
        });

        quote! {
            #[derive(Clone, Debug, Default)]
            pub struct #ident {
                #(#fields),*
            }
        }
    }
}
