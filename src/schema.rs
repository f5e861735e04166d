//! Table schema declarations and their resolution.
//!
//! A declaration is a JSON array of `{"name": ..., "type": ...}` objects stored
//! in the object store at `<schema_folder><table>.json`:
//!
//! ```json
//! [
//!   {"name": "order_id", "type": "long"},
//!   {"name": "placed_at", "type": "timestamp"},
//!   {"name": "note", "type": "decimal"}
//! ]
//! ```
//!
//! Unrecognized type names (`decimal` above) are accepted and treated as
//! `string`.

use crate::error::{StageError, StageResult};
use crate::io::cloud::ObjectIO;
use crate::record::LogicalType;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: String,
    pub logical_type: LogicalType,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// Ordered, uniquely named field list for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    fields: Vec<FieldDeclaration>,
}

impl SchemaDescriptor {
    /// Build a descriptor, rejecting repeated field names.
    ///
    /// # Errors
    /// Returns the first repeated name.
    pub fn new(fields: Vec<FieldDeclaration>) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(fields.len());
        for f in &fields {
            if !seen.insert(f.name.as_str()) {
                return Err(format!("duplicate field name '{}'", f.name));
            }
        }
        Ok(Self { fields })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Parse a JSON schema declaration.
///
/// # Errors
/// Returns a message if the bytes are not UTF-8, not a JSON array of
/// `{name, type}` objects, or declare the same name twice.
pub fn parse_declaration(bytes: &[u8]) -> Result<SchemaDescriptor, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
    let raw: Vec<RawField> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let fields = raw
        .into_iter()
        .map(|f| FieldDeclaration::new(f.name, LogicalType::from_declared(&f.kind)))
        .collect();
    SchemaDescriptor::new(fields)
}

/// Lookup service from table name to schema descriptor.
pub trait SchemaResolver: Send + Sync {
    /// Resolve the declared schema for `table`.
    ///
    /// # Errors
    /// Returns [`StageError::SchemaLoad`] if the declaration is missing,
    /// unreadable, or malformed.
    fn resolve(&self, table: &str) -> StageResult<SchemaDescriptor>;
}

/// Resolves schemas from `<prefix><table>.json` objects in a bucket.
#[derive(Clone)]
pub struct ObjectSchemaResolver {
    store: Arc<dyn ObjectIO>,
    bucket: String,
    prefix: String,
}

impl ObjectSchemaResolver {
    pub fn new(store: Arc<dyn ObjectIO>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn declaration_key(&self, table: &str) -> String {
        format!("{}{table}.json", self.prefix)
    }
}

impl SchemaResolver for ObjectSchemaResolver {
    fn resolve(&self, table: &str) -> StageResult<SchemaDescriptor> {
        let key = self.declaration_key(table);
        let bytes = self
            .store
            .get_object(&self.bucket, &key)
            .map_err(|e| StageError::schema_load(table, e))?;
        let schema = parse_declaration(&bytes).map_err(|e| StageError::schema_load(table, e))?;
        debug!(table, key = %key, fields = schema.len(), "resolved schema");
        Ok(schema)
    }
}
