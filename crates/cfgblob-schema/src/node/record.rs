use crate::prelude::*;

///
/// RecordDescriptor
///
/// A reflected configuration record type. Built once per run and never
/// mutated afterwards.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordDescriptor {
    pub name: String,

    /// Rust module path the record lives in, e.g. `crate::items`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    pub fields: Vec<FieldDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDescriptor>,

    /// Table identity; defaults to the record name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Declared layout type name; authoritative over suffix concatenation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            fields: Vec::new(),
            indexes: Vec::new(),
            table: None,
            layout: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Fully qualified path used as the record's identity in a run.
    #[must_use]
    pub fn path(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Layout type name: the declared one, or `name + suffix`.
    #[must_use]
    pub fn layout_name(&self, suffix: &str) -> String {
        self.layout
            .clone()
            .unwrap_or_else(|| format!("{}{suffix}", self.name))
    }
}
