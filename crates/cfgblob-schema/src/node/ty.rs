use crate::prelude::*;
use std::fmt::{self, Display};

///
/// TypeDescriptor
///
/// A reflected type: the Rust path of the declared managed type, its generic
/// arguments in order, and a reflection hint for types that cannot be
/// recognised by name alone.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TypeDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Self>,

    #[serde(default)]
    pub kind: TypeKind,

    /// Target record path, for `kind = reference`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl TypeDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kind: TypeKind::Auto,
            target: None,
        }
    }

    #[must_use]
    pub fn primitive(prim: Primitive) -> Self {
        Self::named(prim.type_name())
    }

    #[must_use]
    pub fn string() -> Self {
        Self::named("String")
    }

    #[must_use]
    pub fn option(inner: Self) -> Self {
        Self::generic("Option", vec![inner])
    }

    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::generic("Vec", vec![element])
    }

    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::generic("HashMap", vec![key, value])
    }

    #[must_use]
    pub fn set(element: Self) -> Self {
        Self::generic("HashSet", vec![element])
    }

    pub fn enumeration(path: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Enum,
            ..Self::named(path)
        }
    }

    pub fn record(path: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Record,
            ..Self::named(path)
        }
    }

    /// A key type naming another record, e.g. `String` keys into `items::Item`.
    pub fn reference(key_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Reference,
            target: Some(target.into()),
            ..Self::named(key_type)
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self {
            args,
            ..Self::named(name)
        }
    }

    /// Name-based recognition; reflection hints take precedence.
    #[must_use]
    pub fn well_known(&self) -> Option<WellKnown> {
        match self.kind {
            TypeKind::Auto => WellKnown::recognise(&self.name),
            TypeKind::Enum | TypeKind::Record | TypeKind::Reference => None,
        }
    }

    #[must_use]
    pub fn is_option(&self) -> bool {
        self.well_known() == Some(WellKnown::Option)
    }

    /// Strip one `Option` wrapper, if present.
    #[must_use]
    pub fn unwrap_option(&self) -> &Self {
        match (self.is_option(), self.args.first()) {
            (true, Some(inner)) => inner,
            _ => self,
        }
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Self> {
        self.args.get(index)
    }

    /// First reference target found anywhere in the shape.
    #[must_use]
    pub fn reference_target(&self) -> Option<&str> {
        if self.kind == TypeKind::Reference {
            return self.target.as_deref();
        }

        self.args.iter().find_map(Self::reference_target)
    }

    /// Number of container levels wrapping the innermost leaf.
    #[must_use]
    pub fn container_depth(&self) -> usize {
        let nested = self.args.iter().map(Self::container_depth).max().unwrap_or(0);

        match self.well_known() {
            Some(WellKnown::List | WellKnown::Map | WellKnown::Set) => nested + 1,
            _ => nested,
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }

        Ok(())
    }
}
