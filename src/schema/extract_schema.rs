use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SchemaError;

/// Positional extraction schema for raw CSV rows, in one of three dialects.
///
/// The dialect is fixed once at deserialization; extraction never re-detects
/// the shape per row.
///
/// - `Flat`: field name maps straight to a row index.
///   `{"pcd": 0, "pcd2": 1}`
/// - `Nested`: the same logical field sits at different positions depending on
///   a format tag. `{"spd": {"Postcode": 0}, "spd2": {"Postcode": 3}}`
/// - `SizeVariant`: one field→index map shared by a "large" and a "small" row
///   layout that differ only in total column count.
///   `{"large": true, "fields": {"Postcode": 0}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtractSchema {
    SizeVariant {
        large: bool,
        fields: IndexMap<String, usize>,
    },
    Nested(IndexMap<String, IndexMap<String, usize>>),
    Flat(IndexMap<String, usize>),
}

impl ExtractSchema {
    /// Load an extraction schema from a JSON file, detecting the dialect from
    /// its shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str::<ExtractSchema>(&content).map_err(|_| {
            SchemaError::Shape(
                "extraction schema is neither flat-index, nested-format, nor size-variant"
                    .to_string(),
            )
        })
    }

    /// Whether a size-variant schema declares the large row layout. Flat and
    /// nested schemas have no size flag.
    pub fn is_large(&self) -> Option<bool> {
        match self {
            ExtractSchema::SizeVariant { large, .. } => Some(*large),
            _ => None,
        }
    }

    /// Whether resolving a field requires a format tag.
    pub fn needs_format(&self) -> bool {
        matches!(self, ExtractSchema::Nested(_))
    }
}
