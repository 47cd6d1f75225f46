use std::{fs, path::Path};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SchemaError;

/// Declarative shape of one relation: an ordered mapping from field name to
/// SQL column-type text, e.g. `"somefield" -> "VARCHAR(255)"`.
///
/// Field order is declaration order and drives the column order of the
/// `CREATE TABLE` statement built from this schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationSchema {
    fields: IndexMap<String, String>,
}

impl RelationSchema {
    /// Load a schema from a JSON file containing a single object whose values
    /// are column-type strings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        let value = serde_json::from_str::<Value>(&content)?;
        Self::from_value(value)
    }

    /// Build a schema from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::Shape(
                "relation schema must be a JSON object".to_string(),
            ));
        };

        let mut fields = IndexMap::new();
        for (name, column_type) in map {
            match column_type {
                Value::String(ty) => {
                    fields.insert(name, ty);
                }
                other => {
                    return Err(SchemaError::Shape(format!(
                        "column type for field {name} must be a string, got {other}"
                    )));
                }
            }
        }

        if fields.is_empty() {
            return Err(SchemaError::Shape(
                "relation schema declares no fields".to_string(),
            ));
        }

        Ok(Self { fields })
    }

    /// Build a schema from `(field, column type)` pairs, keeping their order.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, ty)| (name.into(), ty.into()))
            .collect();
        Self { fields }
    }

    /// Whether `field` is declared by this schema.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// `(field, column type)` pairs, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, ty)| (name.as_str(), ty.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
