//! Markup → managed parse routines.
//!
//! Classification is shared with population, emission is not. Leaves parse
//! their text and fall back to the declared default, then to
//! `Default::default()`. Containers try three tiers in order and stop at the
//! first that yields anything:
//!
//! 1. one element per structured item child,
//! 2. the delimiter-separated field text,
//! 3. the declared default literal, split the same way.
//!
//! Composite, cross-reference and nested-container elements only take part
//! in tier 1.

use crate::{
    analysis::RecordCx,
    classify::{TypeCategory, find_unsupported},
    error::CodegenError,
    helper::{managed_type, snake_ident},
    plan::{Binding, BindingKind},
};
use cfgblob_schema::prelude::*;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

///
/// MarkupOptions
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct MarkupOptions {
    pub item_tag: String,
    pub key_attribute: String,
    pub list_delimiter: String,
    pub pair_delimiter: String,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            item_tag: "Item".to_string(),
            key_attribute: "Key".to_string(),
            list_delimiter: ",".to_string(),
            pair_delimiter: ":".to_string(),
        }
    }
}

///
/// TextKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextKind {
    Primitive(Primitive),
    String,
    Enum,
    Other,
}

///
/// TextParse
///
/// `str::parse` into a managed leaf type. Strings are taken untrimmed.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextParse {
    pub ty: syn::Type,
    pub kind: TextKind,
    pub structured_only: bool,
}

impl TextParse {
    #[must_use]
    pub const fn trims(&self) -> bool {
        !matches!(self.kind, TextKind::String)
    }

    /// `text.trim().parse::<T>().ok()`
    #[must_use]
    pub fn render(&self, text: &TokenStream) -> TokenStream {
        let ty = &self.ty;

        if self.trims() {
            quote!(#text.trim().parse::<#ty>().ok())
        } else {
            quote!(#text.parse::<#ty>().ok())
        }
    }
}

///
/// ContainerShape
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerShape {
    List,
    Map,
    Set,
}

///
/// ElementParse
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementParse {
    Text { parse: TextParse, nullable: bool },
    Record { ty: syn::Type, record: String },
    Container(Box<ContainerParse>),
}

impl ElementParse {
    #[must_use]
    pub const fn delimited(&self) -> bool {
        match self {
            Self::Text { parse, .. } => !parse.structured_only,
            Self::Record { .. } | Self::Container(_) => false,
        }
    }
}

///
/// ContainerParse
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContainerParse {
    pub shape: ContainerShape,
    pub ty: syn::Type,
    pub key: Option<TextParse>,
    pub element: ElementParse,
    pub depth: usize,
}

impl ContainerParse {
    /// Whether tiers 2 and 3 apply.
    #[must_use]
    pub fn delimited(&self) -> bool {
        self.element.delimited() && self.key.as_ref().is_none_or(|key| !key.structured_only)
    }
}

///
/// ParseBody
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseBody {
    Leaf {
        parse: TextParse,
        default: Option<String>,
        nullable: bool,
    },
    Composite {
        ty: syn::Type,
        record: String,
        nullable: bool,
    },
    Container {
        plan: ContainerParse,
        default: Option<String>,
        nullable: bool,
    },
    Unsupported {
        reason: String,
    },
}

///
/// ParseRoutine
///
/// `parse_<field>` for one field.
///

#[derive(Clone, Debug)]
pub struct ParseRoutine {
    pub field: Ident,
    pub name: Ident,
    pub markup: String,
    pub ty: syn::Type,
    pub body: ParseBody,
}

///
/// ParsePlan
///

#[derive(Clone, Debug)]
pub struct ParsePlan {
    pub record: String,
    pub record_ty: syn::Path,
    pub markup: MarkupOptions,
    pub routines: Vec<ParseRoutine>,
}

/// Plan the parse routines of one record.
pub fn plan_parse(cx: &RecordCx<'_>) -> Result<ParsePlan, CodegenError> {
    let routines = cx
        .record
        .fields
        .iter()
        .map(|field| plan_routine(cx, field))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsePlan {
        record: cx.record.path(),
        record_ty: cx.record_ty.clone(),
        markup: cx.options.markup.clone(),
        routines,
    })
}

fn plan_routine(cx: &RecordCx<'_>, field: &FieldDescriptor) -> Result<ParseRoutine, CodegenError> {
    let ty = managed(cx, field, &field.ty)?;
    let nullable = field.is_nullable();
    let category = cx.classify(field, &field.ty)?;
    let unsupported = find_unsupported(&field.ty).map_err(|e| cx.fail(field, e.to_string()))?;

    let body = match (unsupported, category) {
        (Some(reason), _) => {
            tracing::warn!(target: "cfgblob", record = %cx.record.path(), field = %field.name,
                "parse stub: {reason}");
            ParseBody::Unsupported { reason }
        }
        (None, TypeCategory::CompositeRecord) => {
            let leaf = field.ty.unwrap_option();
            ParseBody::Composite {
                ty: managed(cx, field, leaf)?,
                record: leaf.name.clone(),
                nullable,
            }
        }
        (None, c) if c.is_container() => ParseBody::Container {
            plan: plan_container(cx, field, field.ty.unwrap_option(), 0)?,
            default: field.default.clone(),
            nullable,
        },
        (None, _) => ParseBody::Leaf {
            parse: text_parse(cx, field, field.ty.unwrap_option())?,
            default: field.default.clone(),
            nullable,
        },
    };

    Ok(ParseRoutine {
        field: format_ident!("{}", field.name),
        name: snake_ident("parse", &field.name),
        markup: field.markup_name(),
        ty,
        body,
    })
}

fn plan_container(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
    depth: usize,
) -> Result<ContainerParse, CodegenError> {
    let shape = match cx.classify(field, ty)? {
        TypeCategory::ListContainer => ContainerShape::List,
        TypeCategory::SetContainer => ContainerShape::Set,
        TypeCategory::MapContainer => ContainerShape::Map,
        other => return Err(cx.fail(field, format!("'{ty}' is {other}, not a container"))),
    };
    let parts = cx.parts(field, ty)?;

    let key = parts
        .key
        .map(|key| text_parse(cx, field, key))
        .transpose()?;
    let element = plan_element(cx, field, parts.element, depth)?;

    Ok(ContainerParse {
        shape,
        ty: managed(cx, field, ty)?,
        key,
        element,
        depth,
    })
}

fn plan_element(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
    depth: usize,
) -> Result<ElementParse, CodegenError> {
    let category = cx.classify(field, ty)?;

    let element = match category {
        c if c.is_container() => ElementParse::Container(Box::new(plan_container(
            cx,
            field,
            ty.unwrap_option(),
            depth + 1,
        )?)),
        TypeCategory::CompositeRecord => ElementParse::Record {
            ty: managed(cx, field, ty.unwrap_option())?,
            record: ty.unwrap_option().name.clone(),
        },
        _ => ElementParse::Text {
            parse: text_parse(cx, field, ty.unwrap_option())?,
            nullable: ty.is_option(),
        },
    };

    Ok(element)
}

fn text_parse(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
) -> Result<TextParse, CodegenError> {
    let kind = match ty.kind {
        TypeKind::Enum => TextKind::Enum,
        TypeKind::Auto | TypeKind::Reference => match WellKnown::recognise(&ty.name) {
            Some(WellKnown::String) => TextKind::String,
            Some(WellKnown::Primitive(prim)) => TextKind::Primitive(prim),
            _ => TextKind::Other,
        },
        TypeKind::Record => TextKind::Other,
    };

    Ok(TextParse {
        ty: managed(cx, field, ty)?,
        kind,
        structured_only: ty.kind == TypeKind::Reference,
    })
}

fn managed(
    cx: &RecordCx<'_>,
    field: &FieldDescriptor,
    ty: &TypeDescriptor,
) -> Result<syn::Type, CodegenError> {
    managed_type(ty).map_err(|e| cx.fail(field, e))
}

//
// Rendering
//

impl ParsePlan {
    /// Inherent `parse_<field>` routines plus the `rt::ParseMarkup` impl.
    #[must_use]
    pub fn render(&self, rt: &TokenStream) -> TokenStream {
        let record_ty = &self.record_ty;
        let routines = self.routines.iter().map(|r| r.render(rt, &self.markup));
        let assigns = self.routines.iter().map(|r| {
            let field = &r.field;
            let name = &r.name;
            quote!(#field: Self::#name(node))
        });

        quote! {
            impl #record_ty {
                #(#routines)*
            }

            impl #rt::ParseMarkup for #record_ty {
                fn parse_markup<N: #rt::MarkupNode + ?Sized>(node: &N) -> Self {
                    Self {
                        #(#assigns),*
                    }
                }
            }
        }
    }
}

impl ParseRoutine {
    #[must_use]
    pub fn render(&self, rt: &TokenStream, markup: &MarkupOptions) -> TokenStream {
        let name = &self.name;
        let ty = &self.ty;
        let tag = &self.markup;

        let (doc, body) = match &self.body {
            ParseBody::Leaf {
                parse,
                default,
                nullable,
            } => {
                let text = quote!(text);
                let conv = parse.render(&text);
                let fallback = default
                    .as_ref()
                    .map(|lit| quote!(.or_else(|| parse(#lit))));
                let finish = (!nullable).then(|| quote!(.unwrap_or_default()));

                let body = quote! {
                    let parse = |text: &str| #conv;
                    node.field_text(#tag).and_then(parse)#fallback #finish
                };
                (None, body)
            }
            ParseBody::Composite { ty, nullable, .. } => {
                let finish = (!nullable).then(|| quote!(.unwrap_or_default()));
                let body = quote! {
                    node.child_nodes(#tag)
                        .into_iter()
                        .next()
                        .map(|child| <#ty as #rt::ParseMarkup>::parse_markup(child))
                        #finish
                };
                (None, body)
            }
            ParseBody::Container {
                plan,
                default,
                nullable,
            } => (
                None,
                render_container(rt, plan, tag, default.as_deref(), *nullable, markup),
            ),
            ParseBody::Unsupported { reason } => {
                let doc = format!(" Unsupported shape ({reason}); always the default value.");
                let body = quote! {
                    let _ = node;
                    <#ty as ::core::default::Default>::default()
                };
                (Some(quote!(#[doc = #doc])), body)
            }
        };

        quote! {
            #doc
            #[must_use]
            pub fn #name<N: #rt::MarkupNode + ?Sized>(node: &N) -> #ty {
                #body
            }
        }
    }
}

fn render_container(
    rt: &TokenStream,
    plan: &ContainerParse,
    tag: &str,
    default: Option<&str>,
    nullable: bool,
    markup: &MarkupOptions,
) -> TokenStream {
    let out = Binding::new(BindingKind::Out, plan.depth);
    let field = Binding::new(BindingKind::Field, plan.depth);
    let ty = &plan.ty;
    let structured = render_structured(rt, plan, &field, markup);

    let mut tiers = quote! {
        let mut #out = <#ty as ::core::default::Default>::default();
        for #field in node.child_nodes(#tag) {
            #structured
        }
    };

    if plan.delimited() {
        let from_text = render_delimited(plan, &quote!(text), markup);
        tiers.extend(quote! {
            if #out.is_empty() {
                if let Some(text) = node.field_text(#tag) {
                    #from_text
                }
            }
        });

        if let Some(lit) = default {
            let from_default = render_delimited(plan, &quote!(#lit), markup);
            tiers.extend(quote! {
                if #out.is_empty() {
                    #from_default
                }
            });
        }
    }

    if nullable {
        quote! {
            #tiers
            Some(#out)
        }
    } else {
        quote! {
            #tiers
            #out
        }
    }
}

// Tier 1: one element per item child of `parent`.
fn render_structured(
    rt: &TokenStream,
    plan: &ContainerParse,
    parent: &Binding,
    markup: &MarkupOptions,
) -> TokenStream {
    let out = Binding::new(BindingKind::Out, plan.depth);
    let item = Binding::new(BindingKind::Item, plan.depth);
    let item_tag = &markup.item_tag;

    let body = match (&plan.shape, &plan.key) {
        (ContainerShape::Map, Some(key)) => {
            let k = Binding::new(BindingKind::ResolvedKey, plan.depth);
            let attr = &markup.key_attribute;
            let conv = key.render(&quote!(text));
            let insert = render_item(rt, plan, &item, markup, &quote!(#out.insert(#k, value)));

            quote! {
                if let Some(#k) = #item.attribute(#attr).and_then(|text| #conv) {
                    #insert
                }
            }
        }
        (ContainerShape::Set, _) => render_item(rt, plan, &item, markup, &quote!(#out.insert(value))),
        _ => render_item(rt, plan, &item, markup, &quote!(#out.push(value))),
    };

    quote! {
        for #item in #parent.child_nodes(#item_tag) {
            #body
        }
    }
}

// One tier-1 element parsed from `item`; `write` consumes the local `value`.
fn render_item(
    rt: &TokenStream,
    plan: &ContainerParse,
    item: &Binding,
    markup: &MarkupOptions,
    write: &TokenStream,
) -> TokenStream {
    match &plan.element {
        ElementParse::Text { parse, nullable } => {
            let v = Binding::new(BindingKind::Resolved, plan.depth);
            let conv = parse.render(&quote!(text));
            let value = if *nullable { quote!(Some(#v)) } else { quote!(#v) };

            quote! {
                if let Some(#v) = #item.text().and_then(|text| #conv) {
                    let value = #value;
                    #write;
                }
            }
        }
        ElementParse::Record { ty, .. } => quote! {
            let value = <#ty as #rt::ParseMarkup>::parse_markup(#item);
            #write;
        },
        ElementParse::Container(inner) => {
            let inner_out = Binding::new(BindingKind::Out, inner.depth);
            let inner_ty = &inner.ty;
            let nested = render_structured(rt, inner, item, markup);

            quote! {
                let mut #inner_out = <#inner_ty as ::core::default::Default>::default();
                #nested
                let value = #inner_out;
                #write;
            }
        }
    }
}

// Tiers 2 and 3: elements split out of `text`.
fn render_delimited(plan: &ContainerParse, text: &TokenStream, markup: &MarkupOptions) -> TokenStream {
    let out = Binding::new(BindingKind::Out, plan.depth);
    let part = Binding::new(BindingKind::Part, plan.depth);
    let v = Binding::new(BindingKind::Resolved, plan.depth);
    let list_delimiter = &markup.list_delimiter;

    let ElementParse::Text { parse, nullable } = &plan.element else {
        return quote!();
    };
    let value = if *nullable { quote!(Some(#v)) } else { quote!(#v) };

    let body = match (&plan.shape, &plan.key) {
        (ContainerShape::Map, Some(key)) => {
            let k = Binding::new(BindingKind::ResolvedKey, plan.depth);
            let pair_delimiter = &markup.pair_delimiter;
            let key_conv = key.render(&quote!(key_text));
            let value_conv = parse.render(&quote!(value_text));

            quote! {
                if let Some((key_text, value_text)) = #part.split_once(#pair_delimiter) {
                    let (key_text, value_text) = (key_text.trim(), value_text.trim());
                    if let Some(#k) = #key_conv {
                        if let Some(#v) = #value_conv {
                            #out.insert(#k, #value);
                        }
                    }
                }
            }
        }
        (shape, _) => {
            let conv = parse.render(&quote!(#part));
            let write = if *shape == ContainerShape::Set {
                quote!(#out.insert(#value);)
            } else {
                quote!(#out.push(#value);)
            };

            quote! {
                if let Some(#v) = #conv {
                    #write
                }
            }
        }
    };

    quote! {
        for #part in #text.split(#list_delimiter).map(str::trim).filter(|part| !part.is_empty()) {
            #body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        plan::eval::{Node, Value},
        tests::{context, options, parse_markup},
    };

    fn set() -> DescriptorSet {
        DescriptorSet::new([
            RecordDescriptor::new("Item"),
            RecordDescriptor::new("Stats")
                .with_field(FieldDescriptor::new("hp", TypeDescriptor::primitive(Primitive::Int32))),
            RecordDescriptor::new("Loot")
                .with_field(FieldDescriptor::new(
                    "weights",
                    TypeDescriptor::map(
                        TypeDescriptor::primitive(Primitive::Int32),
                        TypeDescriptor::primitive(Primitive::Int32),
                    ),
                ))
                .with_field(
                    FieldDescriptor::new(
                        "tags",
                        TypeDescriptor::list(TypeDescriptor::primitive(Primitive::Int32)),
                    )
                    .with_default("7, 8"),
                )
                .with_field(FieldDescriptor::new(
                    "items",
                    TypeDescriptor::list(TypeDescriptor::reference("String", "Item")),
                ))
                .with_field(FieldDescriptor::new(
                    "grid",
                    TypeDescriptor::list(TypeDescriptor::list(TypeDescriptor::primitive(
                        Primitive::Int32,
                    ))),
                ))
                .with_field(
                    FieldDescriptor::new("level", TypeDescriptor::primitive(Primitive::Int32))
                        .with_default("5"),
                )
                .with_field(FieldDescriptor::new(
                    "bonus",
                    TypeDescriptor::option(TypeDescriptor::primitive(Primitive::Int32)),
                ))
                .with_field(FieldDescriptor::new("name", TypeDescriptor::string()))
                .with_field(FieldDescriptor::new("stats", TypeDescriptor::record("Stats")))
                .with_field(FieldDescriptor::new("size", TypeDescriptor::named("usize")))
                .with_field(
                    FieldDescriptor::new("rank", TypeDescriptor::primitive(Primitive::Nat8))
                        .with_default("1"),
                ),
        ])
        .unwrap()
    }

    fn parse(node: Node) -> Value {
        parse_markup(&set(), "Loot", &node)
    }

    #[test]
    fn keyed_items_parse_into_a_map() {
        let node = Node::new("Loot").child(
            Node::new("Weights").child(Node::new("Item").attr("Key", "10").text("100")),
        );

        assert_eq!(
            parse(node).field("weights"),
            &Value::Map(vec![(Value::Int(10), Value::Int(100))])
        );
        assert_eq!(parse(Node::new("Loot")).field("weights"), &Value::Map(vec![]));
    }

    #[test]
    fn structured_items_win_over_text() {
        let node = Node::new("Loot").child(
            Node::new("Tags")
                .text("1,2")
                .child(Node::new("Item").text("9")),
        );

        assert_eq!(parse(node).field("tags"), &Value::List(vec![Value::Int(9)]));
    }

    #[test]
    fn delimited_text_is_the_second_tier() {
        let node = Node::new("Loot").child(Node::new("Tags").text(" 3, 1 ,4,"));

        assert_eq!(
            parse(node).field("tags"),
            &Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(4)])
        );
    }

    #[test]
    fn declared_default_is_the_third_tier() {
        let parsed = parse(Node::new("Loot"));

        assert_eq!(
            parsed.field("tags"),
            &Value::List(vec![Value::Int(7), Value::Int(8)])
        );
        // no structured items, no text, no default
        assert_eq!(parsed.field("grid"), &Value::List(vec![]));
    }

    #[test]
    fn references_and_nested_containers_are_structured_only() {
        let node = Node::new("Loot")
            .child(Node::new("Items").text("sword,shield"))
            .child(
                Node::new("Grid")
                    .text("1,2")
                    .child(Node::new("Item").child(Node::new("Item").text("5")))
                    .child(Node::new("Item")),
            );
        let parsed = parse(node);

        assert_eq!(parsed.field("items"), &Value::List(vec![]));
        assert_eq!(
            parsed.field("grid"),
            &Value::List(vec![Value::List(vec![Value::Int(5)]), Value::List(vec![])])
        );
    }

    #[test]
    fn leaves_fall_back_to_default_literal_then_default() {
        let parsed = parse(
            Node::new("Loot")
                .child(Node::new("Level").text("not a number"))
                .child(Node::new("Name").text(" padded "))
                .child(Node::new("Stats").child(Node::new("Hp").text("12"))),
        );

        assert_eq!(parsed.field("level"), &Value::Int(5));
        assert_eq!(parsed.field("bonus"), &Value::Null);
        assert_eq!(parsed.field("name"), &Value::str(" padded "));
        assert_eq!(parsed.field("stats").field("hp"), &Value::Int(12));
        assert_eq!(parsed.field("size"), &Value::Default);
    }

    #[test]
    fn out_of_range_text_falls_back_to_the_default() {
        let rank = |text: &str| {
            parse(Node::new("Loot").child(Node::new("Rank").text(text)))
                .field("rank")
                .clone()
        };

        assert_eq!(rank("200"), Value::Int(200));
        assert_eq!(rank("300"), Value::Int(1));
        assert_eq!(rank("-1"), Value::Int(1));
    }

    #[test]
    fn leaf_routine_text() {
        let set = set();
        let options = options();
        let cx = context(&set, "Loot", &options);
        let plan = plan_parse(&cx).unwrap();
        let level = plan
            .routines
            .iter()
            .find(|r| r.field == "level")
            .unwrap()
            .render(&quote!(rt), &plan.markup);

        let expected = quote! {
            #[must_use]
            pub fn parse_level<N: rt::MarkupNode + ?Sized>(node: &N) -> i32 {
                let parse = |text: &str| text.trim().parse::<i32>().ok();
                node.field_text("Level").and_then(parse).or_else(|| parse("5")).unwrap_or_default()
            }
        };
        assert_eq!(level.to_string(), expected.to_string());
    }

    #[test]
    fn rendered_plan_is_valid_rust() {
        let set = set();
        let options = options();
        let cx = context(&set, "Loot", &options);
        let tokens = plan_parse(&cx).unwrap().render(cx.rt());

        let file: syn::File = syn::parse2(tokens).expect("parse routines are valid Rust");
        assert_eq!(file.items.len(), 2);
    }
}
