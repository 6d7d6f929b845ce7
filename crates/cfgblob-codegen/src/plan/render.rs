use crate::plan::{Alloc, Expr, ForPattern, Resolver, Sink, Stmt};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

///
/// RenderCx
///
/// Per-record rendering context: the runtime crate root and the layout
/// type that owns the enum-key helpers.
///

#[derive(Clone, Debug)]
pub struct RenderCx {
    pub rt: TokenStream,
    pub layout: Ident,
}

///
/// Render
///

pub trait Render {
    fn render(&self, cx: &RenderCx) -> TokenStream;
}

impl<T: Render> Render for [T] {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        let parts = self.iter().map(|item| item.render(cx));

        quote!(#(#parts)*)
    }
}

impl<T: Render> Render for Vec<T> {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        self.as_slice().render(cx)
    }
}

impl Render for Expr {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        let rt = &cx.rt;

        match self {
            Self::SourceField(field) => quote!(source.#field),
            Self::Local(bind) => quote!(#bind),
            Self::Deref(bind) => quote!((*#bind)),
            Self::UnwrapOrDefault(value) => {
                let value = value.render(cx);
                quote!(::core::option::Option::unwrap_or_default(#value))
            }
            Self::Truncate { capacity, value } => {
                let buffer = format_ident!("InlineStr{capacity}");
                let value = value.render(cx);
                quote!(#rt::#buffer::truncating(&#value))
            }
            Self::EnumKey { helper, value } => {
                let layout = &cx.layout;
                let value = value.render(cx);
                quote!(#layout::#helper(#value))
            }
            Self::Finish(bind) => quote!(#bind.finish()),
            Self::Empty(alloc) => {
                let alloc = alloc.render(cx);
                quote!(ctx.#alloc(0).finish())
            }
        }
    }
}

impl Render for Resolver {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        match self {
            Self::String(value) => {
                let value = value.render(cx);
                quote!(ctx.resolve_string(&#value))
            }
            Self::Label(value) => {
                let value = value.render(cx);
                quote!(ctx.resolve_label(&#value))
            }
            Self::Identity(value) => {
                let value = value.render(cx);
                quote!(ctx.resolve_identity(&#value))
            }
            Self::Ref { layout, key, .. } => {
                let key = key.render(cx);
                quote!(ctx.resolve_ref::<#layout>(&#key))
            }
            Self::Parent { layout, .. } => quote!(ctx.resolve_parent::<#layout>()),
            Self::SelfLink { layout, .. } => quote!(ctx.resolve_self::<#layout>()),
        }
    }
}

impl Render for Alloc {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        let rt = &cx.rt;

        match self {
            Self::Array(element) => {
                let element = element.tokens(rt);
                quote!(alloc_array::<#element>)
            }
            Self::Map(key, value) => {
                let key = key.tokens(rt);
                let value = value.tokens(rt);
                quote!(alloc_map::<#key, #value>)
            }
            Self::Set(element) => {
                let element = element.tokens(rt);
                quote!(alloc_set::<#element>)
            }
        }
    }
}

impl Render for Stmt {
    fn render(&self, cx: &RenderCx) -> TokenStream {
        let rt = &cx.rt;

        match self {
            Self::Guard {
                source,
                bind,
                body,
                otherwise,
            } => {
                let source = source.render(cx);
                let body = body.render(cx);

                if otherwise.is_empty() {
                    quote! {
                        if let Some(#bind) = #rt::non_empty(&#source) {
                            #body
                        }
                    }
                } else {
                    let otherwise = otherwise.render(cx);
                    quote! {
                        if let Some(#bind) = #rt::non_empty(&#source) {
                            #body
                        } else {
                            #otherwise
                        }
                    }
                }
            }
            Self::Alloc { bind, alloc, len } => {
                let alloc = alloc.render(cx);

                quote! {
                    let mut #bind = ctx.#alloc(#len.len());
                }
            }
            Self::ForEach {
                pattern,
                source,
                body,
            } => {
                let body = body.render(cx);

                match pattern {
                    ForPattern::Enumerate { index, element } => quote! {
                        for (#index, #element) in #source.iter().enumerate() {
                            #body
                        }
                    },
                    ForPattern::Single(element) => quote! {
                        for #element in #source.iter() {
                            #body
                        }
                    },
                    ForPattern::Pair { key, value } => quote! {
                        for (#key, #value) in #source.iter() {
                            #body
                        }
                    },
                }
            }
            Self::Resolve {
                bind,
                resolver,
                body,
            } => {
                let resolver = resolver.render(cx);
                let body = body.render(cx);

                quote! {
                    if let Some(#bind) = #resolver {
                        #body
                    }
                }
            }
            Self::Compose {
                bind,
                layout,
                source,
                nullable,
                ..
            } => {
                let source = source.render(cx);
                let populate = populate(rt, *nullable, &source, &quote!(#bind));

                quote! {
                    let mut #bind = <#layout as ::core::default::Default>::default();
                    #populate
                }
            }
            Self::PopulateField {
                field, nullable, ..
            } => populate(
                rt,
                *nullable,
                &quote!(source.#field),
                &quote!(target.#field),
            ),
            Self::Write { sink, value } => {
                let value = value.render(cx);

                match sink {
                    Sink::Field(field) => quote!(target.#field = #value;),
                    Sink::Index { dst, index } => quote!(#dst.set(#index, #value);),
                    Sink::Insert { dst, key } => {
                        let key = key.render(cx);
                        quote!(#dst.insert(#key, #value);)
                    }
                    Sink::Add { dst } => quote!(#dst.add(#value);),
                }
            }
            Self::Unsupported {
                record,
                field,
                reason,
            } => quote! {
                ctx.unsupported(#record, #field, #reason);
            },
        }
    }
}

// `Option<Record>` is not itself `Populate`; only a present value is populated
fn populate(rt: &TokenStream, nullable: bool, source: &TokenStream, dst: &TokenStream) -> TokenStream {
    if nullable {
        quote! {
            if let Some(present) = &#source {
                #rt::Populate::populate(present, ctx, &mut #dst);
            }
        }
    } else {
        quote! {
            #rt::Populate::populate(&#source, ctx, &mut #dst);
        }
    }
}
