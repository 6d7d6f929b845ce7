//! Emission-plan IR.
//!
//! Planners build small statement trees instead of tokens so that one tree
//! can be rendered to Rust and, under test, executed against an in-memory
//! runtime.

#[cfg(test)]
pub(crate) mod eval;
pub mod render;

pub use render::{Render, RenderCx};

use crate::layout::LayoutType;
use derive_more::Display;
use proc_macro2::{Ident, TokenStream};
use quote::{ToTokens, format_ident};

///
/// BindingKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BindingKind {
    #[display("dst")]
    Dest,
    #[display("elem")]
    Element,
    #[display("field")]
    Field,
    #[display("i")]
    Index,
    #[display("item")]
    Item,
    #[display("key")]
    Key,
    #[display("nested")]
    Nested,
    #[display("out")]
    Out,
    #[display("part")]
    Part,
    #[display("k")]
    ResolvedKey,
    #[display("v")]
    Resolved,
    #[display("src")]
    Source,
    #[display("value")]
    Value,
}

///
/// Binding
///
/// A generated local, qualified by container depth so that no two nesting
/// levels ever share a name.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Binding {
    pub kind: BindingKind,
    pub depth: usize,
}

impl Binding {
    #[must_use]
    pub const fn new(kind: BindingKind, depth: usize) -> Self {
        Self { kind, depth }
    }

    #[must_use]
    pub fn ident(self) -> Ident {
        format_ident!("{}_{}", self.kind.to_string(), self.depth)
    }
}

impl ToTokens for Binding {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.ident().to_tokens(tokens);
    }
}

///
/// Expr
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// `source.field`
    SourceField(Ident),

    /// A bound local by value.
    Local(Binding),

    /// `(*binding)`, an element yielded by reference.
    Deref(Binding),

    /// `Option::unwrap_or_default(value)`
    UnwrapOrDefault(Box<Self>),

    /// Truncating copy into an inline buffer of `capacity` bytes.
    Truncate { capacity: usize, value: Box<Self> },

    /// The record layout's enum-key helper applied to `value`.
    EnumKey { helper: Ident, value: Box<Self> },

    /// `binding.finish()`
    Finish(Binding),

    /// A finished zero-length container.
    Empty(Alloc),
}

impl Expr {
    #[must_use]
    pub fn unwrap_or_default(self) -> Self {
        Self::UnwrapOrDefault(Box::new(self))
    }

    #[must_use]
    pub fn truncate(self, capacity: usize) -> Self {
        Self::Truncate {
            capacity,
            value: Box::new(self),
        }
    }

    #[must_use]
    pub fn enum_key(self, helper: Ident) -> Self {
        Self::EnumKey {
            helper,
            value: Box::new(self),
        }
    }
}

///
/// Resolver
///
/// Fallible leaf conversions. A failed resolution skips the guarded block.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolver {
    String(Expr),
    Label(Expr),
    Identity(Expr),
    Ref {
        target: String,
        layout: syn::Path,
        key: Expr,
    },
    Parent {
        target: String,
        layout: syn::Path,
    },
    SelfLink {
        target: String,
        layout: syn::Path,
    },
}

///
/// Alloc
///
/// Target container allocated at its source length.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Alloc {
    Array(LayoutType),
    Map(LayoutType, LayoutType),
    Set(LayoutType),
}

///
/// ForPattern
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ForPattern {
    /// `(i, elem)` over `iter().enumerate()`
    Enumerate { index: Binding, element: Binding },

    /// `elem` over `iter()`
    Single(Binding),

    /// `(key, value)` over `iter()`
    Pair { key: Binding, value: Binding },
}

///
/// Sink
///
/// Where a finished value is written. One planner serves every container
/// shape by varying only the sink.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Sink {
    /// `target.field = value;`
    Field(Ident),

    /// `dst.set(index, value);`
    Index { dst: Binding, index: Binding },

    /// `dst.insert(key, value);`
    Insert { dst: Binding, key: Expr },

    /// `dst.add(value);`
    Add { dst: Binding },
}

///
/// Stmt
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stmt {
    /// Run `body` for a present, non-empty source and `otherwise` for the
    /// rest. A top-level field leaves `otherwise` empty so the target keeps
    /// its zero-length default; nested levels still write an empty value.
    Guard {
        source: Expr,
        bind: Binding,
        body: Vec<Self>,
        otherwise: Vec<Self>,
    },

    Alloc {
        bind: Binding,
        alloc: Alloc,
        len: Binding,
    },

    ForEach {
        pattern: ForPattern,
        source: Binding,
        body: Vec<Self>,
    },

    Resolve {
        bind: Binding,
        resolver: Resolver,
        body: Vec<Self>,
    },

    /// Populate a fresh nested layout through the record's own entry point.
    /// A nullable source left as `None` keeps the default layout.
    Compose {
        bind: Binding,
        record: String,
        layout: syn::Path,
        source: Expr,
        nullable: bool,
    },

    /// Populate a composite field in place.
    PopulateField {
        record: String,
        field: Ident,
        nullable: bool,
    },

    Write {
        sink: Sink,
        value: Expr,
    },

    Unsupported {
        record: String,
        field: String,
        reason: String,
    },
}

impl Stmt {
    /// Total statements in this tree, for plan-size logging.
    #[must_use]
    pub fn size(&self) -> usize {
        let otherwise = match self {
            Self::Guard { otherwise, .. } => otherwise.iter().map(Self::size).sum(),
            _ => 0,
        };

        1 + otherwise + self.children().iter().map(Self::size).sum::<usize>()
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Guard { body, .. } | Self::ForEach { body, .. } | Self::Resolve { body, .. } => {
                body
            }
            _ => &[],
        }
    }

    /// Every binding introduced anywhere in this tree.
    #[must_use]
    pub fn bindings(&self) -> Vec<Binding> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);

        out
    }

    fn collect_bindings(&self, out: &mut Vec<Binding>) {
        match self {
            Self::Guard { bind, .. }
            | Self::Alloc { bind, .. }
            | Self::Resolve { bind, .. }
            | Self::Compose { bind, .. } => out.push(*bind),
            Self::ForEach { pattern, .. } => match pattern {
                ForPattern::Enumerate { index, element } => out.extend([*index, *element]),
                ForPattern::Single(element) => out.push(*element),
                ForPattern::Pair { key, value } => out.extend([*key, *value]),
            },
            _ => {}
        }
        for child in self.children() {
            child.collect_bindings(out);
        }
    }
}

/// Wrap `body` in `blocks` from the outside in.
#[must_use]
pub fn nest(blocks: Vec<(Binding, Resolver)>, body: Vec<Stmt>) -> Vec<Stmt> {
    blocks
        .into_iter()
        .rev()
        .fold(body, |body, (bind, resolver)| {
            vec![Stmt::Resolve {
                bind,
                resolver,
                body,
            }]
        })
}
