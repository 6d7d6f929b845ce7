//! In-memory runtime for executing plans under test.
//!
//! Population plans run against a `MockContext`; parse plans run against a
//! `Node` tree. Both operate on `Value`, a dynamic stand-in for managed
//! records and their layouts.

use crate::{
    index::IndexPlan,
    layout::{LayoutDecl, LayoutType},
    orchestrate::PopulationPlan,
    parse::{
        ContainerParse, ContainerShape, ElementParse, MarkupOptions, ParseBody, ParsePlan,
        TextKind, TextParse,
    },
    plan::{Alloc, Binding, Expr, ForPattern, Resolver, Sink, Stmt},
};
use cfgblob_schema::prelude::*;
use std::collections::{BTreeMap, HashMap};

///
/// Value
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A layout slot or managed field never written.
    Default,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Enum(String),
    Handle(u32),
    Label(u32),
    Identity(u32),
    Inline(String),
    EnumKey(String),
    Ref(String, u32),
    List(Vec<Self>),
    Map(Vec<(Self, Self)>),
    Set(Vec<Self>),
    Record(BTreeMap<String, Self>),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Self)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    pub fn str(s: &str) -> Self {
        Self::Str(s.to_string())
    }

    /// Field of a record value; absent fields read as `Null`.
    pub fn field(&self, name: &str) -> &Self {
        match self {
            Self::Record(fields) => fields.get(name).unwrap_or(&NULL),
            other => panic!("field '{name}' read from non-record {other:?}"),
        }
    }

    fn len(&self) -> Option<usize> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    fn is_empty_container(&self) -> bool {
        self.len() == Some(0)
    }

    fn key_text(&self) -> String {
        match self {
            Self::Str(s) | Self::Enum(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            other => format!("{other:?}"),
        }
    }

    fn insert(&mut self, key: Self, value: Self) {
        let Self::Map(entries) = self else {
            panic!("insert into non-map {self:?}");
        };
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    fn add(&mut self, value: Self) {
        match self {
            Self::Set(items) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            Self::List(items) => items.push(value),
            other => panic!("add into non-collection {other:?}"),
        }
    }
}

///
/// Event
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Alloc(String),
    Assign(String),
    ResolveSelf,
}

///
/// MockContext
///
/// Populate context with in-memory string and reference tables.
///

#[derive(Debug, Default)]
pub struct MockContext {
    strings: Vec<String>,
    refs: BTreeMap<(String, String), u32>,
    pub self_position: u32,
    pub parent_position: Option<u32>,
    pub events: Vec<Event>,
    pub stubs: Vec<(String, String, String)>,
}

impl MockContext {
    pub fn add_ref(&mut self, target: &str, key: &str, position: u32) {
        self.refs
            .insert((target.to_string(), key.to_string()), position);
    }

    fn intern(&mut self, s: &str) -> u32 {
        let index = match self.strings.iter().position(|known| known == s) {
            Some(index) => index,
            None => {
                self.strings.push(s.to_string());
                self.strings.len() - 1
            }
        };

        u32::try_from(index).expect("string table fits u32")
    }

    fn resolve_text(&mut self, value: &Value) -> Option<u32> {
        match value {
            Value::Str(s) => Some(self.intern(s)),
            _ => None,
        }
    }

    fn resolve_ref(&self, target: &str, key: &Value) -> Option<Value> {
        if matches!(key, Value::Null | Value::Default) {
            return None;
        }

        self.refs
            .get(&(target.to_string(), key.key_text()))
            .map(|position| Value::Ref(target.to_string(), *position))
    }
}

///
/// Populator
///
/// Executes population plans; nested records run their own plan.
///

pub struct Populator<'p> {
    plans: &'p [PopulationPlan],
}

struct Frame<'s> {
    source: &'s Value,
    target: &'s mut Value,
    env: HashMap<Binding, Value>,
}

impl<'p> Populator<'p> {
    pub const fn new(plans: &'p [PopulationPlan]) -> Self {
        Self { plans }
    }

    fn find(&self, record: &str) -> Option<&'p PopulationPlan> {
        self.plans
            .iter()
            .find(|plan| plan.record == record)
            .or_else(|| {
                self.plans
                    .iter()
                    .find(|plan| plan.record.rsplit("::").next() == record.rsplit("::").next())
            })
    }

    pub fn default_layout(&self, decl: &LayoutDecl) -> Value {
        Value::Record(
            decl.fields
                .iter()
                .map(|field| (field.ident.to_string(), self.default_of(&field.ty)))
                .collect(),
        )
    }

    fn default_of(&self, ty: &LayoutType) -> Value {
        match ty {
            LayoutType::Array(_) => Value::List(Vec::new()),
            LayoutType::Map(..) => Value::Map(Vec::new()),
            LayoutType::Set(_) => Value::Set(Vec::new()),
            LayoutType::Composite { record, .. } => self
                .find(record)
                .map_or_else(|| Value::record([]), |plan| self.default_layout(&plan.layout)),
            _ => Value::Default,
        }
    }

    pub fn run(&self, record: &str, source: &Value, target: &mut Value, ctx: &mut MockContext) {
        let plan = self
            .find(record)
            .unwrap_or_else(|| panic!("no population plan for '{record}'"));
        let mut frame = Frame {
            source,
            target,
            env: HashMap::new(),
        };

        self.exec(&plan.allocate, &mut frame, ctx);
        self.exec(&plan.assign, &mut frame, ctx);
    }

    fn exec(&self, stmts: &[Stmt], frame: &mut Frame<'_>, ctx: &mut MockContext) {
        for stmt in stmts {
            self.exec_one(stmt, frame, ctx);
        }
    }

    fn exec_one(&self, stmt: &Stmt, frame: &mut Frame<'_>, ctx: &mut MockContext) {
        match stmt {
            Stmt::Guard {
                source,
                bind,
                body,
                otherwise,
            } => {
                let value = eval(source, frame);
                if matches!(value, Value::Null | Value::Default) || value.is_empty_container() {
                    self.exec(otherwise, frame, ctx);
                    return;
                }
                frame.env.insert(*bind, value);
                self.exec(body, frame, ctx);
            }
            Stmt::Alloc { bind, alloc, len } => {
                let len = frame.env[len].len().unwrap_or(0);
                let (kind, value) = match alloc {
                    Alloc::Array(element) => {
                        ("array", Value::List(vec![self.default_of(element); len]))
                    }
                    Alloc::Map(..) => ("map", Value::Map(Vec::new())),
                    Alloc::Set(_) => ("set", Value::Set(Vec::new())),
                };
                ctx.events.push(Event::Alloc(kind.to_string()));
                frame.env.insert(*bind, value);
            }
            Stmt::ForEach {
                pattern,
                source,
                body,
            } => {
                let items = frame.env[source].clone();
                match (pattern, items) {
                    (ForPattern::Enumerate { index, element }, Value::List(items)) => {
                        for (i, item) in items.into_iter().enumerate() {
                            frame.env.insert(*index, Value::Int(i64::try_from(i).unwrap()));
                            frame.env.insert(*element, item);
                            self.exec(body, frame, ctx);
                        }
                    }
                    (ForPattern::Single(element), Value::List(items) | Value::Set(items)) => {
                        for item in items {
                            frame.env.insert(*element, item);
                            self.exec(body, frame, ctx);
                        }
                    }
                    (ForPattern::Pair { key, value }, Value::Map(entries)) => {
                        for (k, v) in entries {
                            frame.env.insert(*key, k);
                            frame.env.insert(*value, v);
                            self.exec(body, frame, ctx);
                        }
                    }
                    (pattern, other) => panic!("cannot iterate {other:?} as {pattern:?}"),
                }
            }
            Stmt::Resolve {
                bind,
                resolver,
                body,
            } => {
                let resolved = match resolver {
                    Resolver::String(expr) => ctx.resolve_text(&eval(expr, frame)).map(Value::Handle),
                    Resolver::Label(expr) => ctx.resolve_text(&eval(expr, frame)).map(Value::Label),
                    Resolver::Identity(expr) => {
                        ctx.resolve_text(&eval(expr, frame)).map(Value::Identity)
                    }
                    Resolver::Ref { target, key, .. } => ctx.resolve_ref(target, &eval(key, frame)),
                    Resolver::Parent { target, .. } => ctx
                        .parent_position
                        .map(|position| Value::Ref(target.clone(), position)),
                    Resolver::SelfLink { target, .. } => {
                        ctx.events.push(Event::ResolveSelf);
                        Some(Value::Ref(target.clone(), ctx.self_position))
                    }
                };

                if let Some(value) = resolved {
                    frame.env.insert(*bind, value);
                    self.exec(body, frame, ctx);
                }
            }
            Stmt::Compose {
                bind,
                record,
                source,
                nullable,
                ..
            } => {
                let source = eval(source, frame);
                let mut nested = self
                    .find(record)
                    .map_or_else(|| Value::record([]), |plan| self.default_layout(&plan.layout));
                if !(*nullable && source == Value::Null) {
                    self.run(record, &source, &mut nested, ctx);
                }
                frame.env.insert(*bind, nested);
            }
            Stmt::PopulateField {
                record,
                field,
                nullable,
            } => {
                let source = frame.source.field(&field.to_string()).clone();
                if *nullable && source == Value::Null {
                    return;
                }
                let Value::Record(fields) = &mut *frame.target else {
                    panic!("target is not a record");
                };
                let slot = fields.entry(field.to_string()).or_insert(Value::Default);
                self.run(record, &source, slot, ctx);
                ctx.events.push(Event::Assign(field.to_string()));
            }
            Stmt::Write { sink, value } => {
                let value = eval(value, frame);
                match sink {
                    Sink::Field(field) => {
                        let Value::Record(fields) = &mut *frame.target else {
                            panic!("target is not a record");
                        };
                        fields.insert(field.to_string(), value);
                        ctx.events.push(Event::Assign(field.to_string()));
                    }
                    Sink::Index { dst, index } => {
                        let Value::Int(i) = frame.env[index] else {
                            panic!("index binding is not an integer");
                        };
                        let Some(Value::List(items)) = frame.env.get_mut(dst) else {
                            panic!("index write into non-array");
                        };
                        items[usize::try_from(i).unwrap()] = value;
                    }
                    Sink::Insert { dst, key } => {
                        let key = eval(key, frame);
                        frame.env.get_mut(dst).expect("map bound").insert(key, value);
                    }
                    Sink::Add { dst } => frame.env.get_mut(dst).expect("set bound").add(value),
                }
            }
            Stmt::Unsupported {
                record,
                field,
                reason,
            } => ctx
                .stubs
                .push((record.clone(), field.clone(), reason.clone())),
        }
    }
}

fn eval(expr: &Expr, frame: &Frame<'_>) -> Value {
    match expr {
        Expr::SourceField(field) => frame.source.field(&field.to_string()).clone(),
        Expr::Local(bind) | Expr::Deref(bind) | Expr::Finish(bind) => frame.env[bind].clone(),
        Expr::Empty(alloc) => match alloc {
            Alloc::Array(_) => Value::List(Vec::new()),
            Alloc::Map(..) => Value::Map(Vec::new()),
            Alloc::Set(_) => Value::Set(Vec::new()),
        },
        Expr::UnwrapOrDefault(value) => match eval(value, frame) {
            Value::Null => Value::Default,
            other => other,
        },
        Expr::Truncate { capacity, value } => match eval(value, frame) {
            Value::Str(s) => {
                let mut end = s.len().min(*capacity);
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                Value::Inline(s[..end].to_string())
            }
            _ => Value::Inline(String::new()),
        },
        Expr::EnumKey { value, .. } => match eval(value, frame) {
            Value::Enum(name) => Value::EnumKey(name),
            _ => Value::EnumKey("default".to_string()),
        },
    }
}

/// Run an index routine over populated layout rows: each key maps to its
/// first row when unique, else to every row position in row order.
pub fn index_rows(plan: &IndexPlan, rows: &[Value]) -> Value {
    let mut entries: Vec<(Value, Value)> = Vec::new();

    for (row, layout) in rows.iter().enumerate() {
        let key = Value::Record(
            plan.fields
                .iter()
                .map(|(ident, _)| {
                    let name = ident.to_string();
                    let value = layout.field(&name).clone();
                    (name, value)
                })
                .collect(),
        );
        let position = Value::Int(i64::try_from(row).unwrap());

        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(_) if plan.unique => {}
            Some((_, Value::List(positions))) => positions.push(position),
            Some(_) => unreachable!("grouped index entries are lists"),
            None if plan.unique => entries.push((key, position)),
            None => entries.push((key, Value::List(vec![position]))),
        }
    }

    Value::Map(entries)
}

///
/// Node
///
/// Markup element: tag, attributes, optional text and children.
///

#[derive(Clone, Debug, Default)]
pub struct Node {
    pub tag: String,
    pub text: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Self>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// `<Field>text</Field>` or `Field="text"`.
    fn field_text<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.attribute(name).or_else(|| {
            self.child_nodes(name)
                .find_map(|child| child.text.as_deref())
        })
    }

    fn child_nodes<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

///
/// Parser
///
/// Executes parse plans against a `Node` tree.
///

pub struct Parser<'p> {
    plans: &'p [ParsePlan],
}

impl<'p> Parser<'p> {
    pub const fn new(plans: &'p [ParsePlan]) -> Self {
        Self { plans }
    }

    fn find(&self, record: &str) -> Option<&'p ParsePlan> {
        self.plans
            .iter()
            .find(|plan| plan.record == record)
            .or_else(|| {
                self.plans
                    .iter()
                    .find(|plan| plan.record.rsplit("::").next() == record.rsplit("::").next())
            })
    }

    pub fn parse_record(&self, record: &str, node: &Node) -> Value {
        let plan = self
            .find(record)
            .unwrap_or_else(|| panic!("no parse plan for '{record}'"));

        Value::Record(
            plan.routines
                .iter()
                .map(|routine| {
                    let value = self.routine(&routine.body, &routine.markup, node, &plan.markup);
                    (routine.field.to_string(), value)
                })
                .collect(),
        )
    }

    fn routine(&self, body: &ParseBody, tag: &str, node: &Node, markup: &MarkupOptions) -> Value {
        match body {
            ParseBody::Leaf {
                parse,
                default,
                nullable,
            } => node
                .field_text(tag)
                .and_then(|text| parse_text(parse, text))
                .or_else(|| default.as_deref().and_then(|lit| parse_text(parse, lit)))
                .unwrap_or(if *nullable { Value::Null } else { Value::Default }),
            ParseBody::Composite {
                record, nullable, ..
            } => match node.child_nodes(tag).next() {
                Some(child) => self.parse_record(record, child),
                None if *nullable => Value::Null,
                None => Value::Default,
            },
            ParseBody::Container { plan, default, .. } => {
                let mut out = empty(plan.shape);
                for field in node.child_nodes(tag) {
                    self.structured(plan, field, markup, &mut out);
                }
                if plan.delimited() {
                    if out.is_empty_container() {
                        if let Some(text) = node.field_text(tag) {
                            delimited(plan, text, markup, &mut out);
                        }
                    }
                    if out.is_empty_container() {
                        if let Some(lit) = default {
                            delimited(plan, lit, markup, &mut out);
                        }
                    }
                }
                out
            }
            ParseBody::Unsupported { .. } => Value::Default,
        }
    }

    fn structured(&self, plan: &ContainerParse, parent: &Node, markup: &MarkupOptions, out: &mut Value) {
        for item in parent.child_nodes(&markup.item_tag) {
            let key = match &plan.key {
                Some(key) => match item
                    .attribute(&markup.key_attribute)
                    .and_then(|text| parse_text(key, text))
                {
                    Some(key) => Some(key),
                    None => continue,
                },
                None => None,
            };

            let value = match &plan.element {
                ElementParse::Text { parse, .. } => {
                    match item.text.as_deref().and_then(|text| parse_text(parse, text)) {
                        Some(value) => value,
                        None => continue,
                    }
                }
                ElementParse::Record { record, .. } => self.parse_record(record, item),
                ElementParse::Container(inner) => {
                    let mut nested = empty(inner.shape);
                    self.structured(inner, item, markup, &mut nested);
                    nested
                }
            };

            write(plan.shape, key, value, out);
        }
    }
}

fn delimited(plan: &ContainerParse, text: &str, markup: &MarkupOptions, out: &mut Value) {
    let ElementParse::Text { parse, .. } = &plan.element else {
        return;
    };

    for part in text
        .split(markup.list_delimiter.as_str())
        .map(str::trim)
        .filter(|part| !part.is_empty())
    {
        match &plan.key {
            Some(key) => {
                let Some((k, v)) = part.split_once(markup.pair_delimiter.as_str()) else {
                    continue;
                };
                if let (Some(k), Some(v)) = (parse_text(key, k.trim()), parse_text(parse, v.trim())) {
                    write(plan.shape, Some(k), v, out);
                }
            }
            None => {
                if let Some(v) = parse_text(parse, part) {
                    write(plan.shape, None, v, out);
                }
            }
        }
    }
}

fn empty(shape: ContainerShape) -> Value {
    match shape {
        ContainerShape::List => Value::List(Vec::new()),
        ContainerShape::Map => Value::Map(Vec::new()),
        ContainerShape::Set => Value::Set(Vec::new()),
    }
}

fn write(shape: ContainerShape, key: Option<Value>, value: Value, out: &mut Value) {
    match (shape, key) {
        (ContainerShape::Map, Some(key)) => out.insert(key, value),
        _ => out.add(value),
    }
}

fn parse_text(parse: &TextParse, text: &str) -> Option<Value> {
    if parse.kind == TextKind::String {
        return Some(Value::Str(text.to_string()));
    }

    let text = text.trim();
    match parse.kind {
        TextKind::Primitive(Primitive::Bool) => text.parse().ok().map(Value::Bool),
        TextKind::Primitive(Primitive::Char) => text.parse().ok().map(Value::Char),
        TextKind::Primitive(prim) => parse_number(prim, text),
        TextKind::Enum if !text.is_empty() => Some(Value::Enum(text.to_string())),
        TextKind::Other if !text.is_empty() => Some(Value::Str(text.to_string())),
        TextKind::String | TextKind::Enum | TextKind::Other => None,
    }
}

// parse at the declared width so out-of-range text fails as it would in `parse::<T>()`
fn parse_number(prim: Primitive, text: &str) -> Option<Value> {
    fn int<T: std::str::FromStr + Into<i64>>(text: &str) -> Option<Value> {
        text.parse::<T>().ok().map(|n| Value::Int(n.into()))
    }

    match prim {
        Primitive::Bool | Primitive::Char => None,
        Primitive::Float32 => text.parse::<f32>().ok().map(|n| Value::Float(f64::from(n))),
        Primitive::Float64 => text.parse::<f64>().ok().map(Value::Float),
        Primitive::Int8 => int::<i8>(text),
        Primitive::Int16 => int::<i16>(text),
        Primitive::Int32 => int::<i32>(text),
        Primitive::Int64 => int::<i64>(text),
        Primitive::Nat8 => int::<u8>(text),
        Primitive::Nat16 => int::<u16>(text),
        Primitive::Nat32 => int::<u32>(text),
        Primitive::Nat64 => text
            .parse::<u64>()
            .ok()
            .map(|n| Value::Int(i64::try_from(n).unwrap_or(i64::MAX))),
    }
}
