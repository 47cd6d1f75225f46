use crate::{error::ExtractError, schema::ExtractSchema};

/// Extracts named fields out of raw positional CSV rows.
///
/// Built once per schema and reused across every row of a dataset. The
/// extractor holds only the immutable schema, performs no mutation, and is
/// safe to share across threads.
///
/// The returned value is exactly the string stored at the resolved index: no
/// trimming, no casting, no default substitution. Any failure to resolve a
/// field to a cell is an `ExtractError`, never a silently wrong value.
#[derive(Debug, Clone)]
pub struct CsvExtractor {
    schema: ExtractSchema,
}

impl CsvExtractor {
    pub fn new(schema: ExtractSchema) -> Self {
        Self { schema }
    }

    /// Resolve `field` to a row index.
    ///
    /// `format` selects the sub-mapping for nested-format schemas and is
    /// required there; flat and size-variant schemas resolve by field name
    /// alone and ignore a supplied tag.
    pub fn position(&self, field: &str, format: Option<&str>) -> Result<usize, ExtractError> {
        match &self.schema {
            ExtractSchema::Flat(fields) | ExtractSchema::SizeVariant { fields, .. } => fields
                .get(field)
                .copied()
                .ok_or_else(|| ExtractError::UnknownField(field.to_string())),
            ExtractSchema::Nested(formats) => {
                let Some(tag) = format else {
                    return Err(ExtractError::MissingFormat(field.to_string()));
                };
                let fields = formats
                    .get(tag)
                    .ok_or_else(|| ExtractError::UnknownFormat(tag.to_string()))?;
                fields
                    .get(field)
                    .copied()
                    .ok_or_else(|| ExtractError::UnknownField(field.to_string()))
            }
        }
    }

    /// Return the cell of `row` holding `field`, verbatim.
    ///
    /// The row may be any length; only the resolved index must be in range.
    /// Size-variant rows in particular are shorter or longer depending on the
    /// variant that produced them, while each declared field keeps its
    /// position.
    pub fn extract<'r, S: AsRef<str>>(
        &self,
        row: &'r [S],
        field: &str,
        format: Option<&str>,
    ) -> Result<&'r str, ExtractError> {
        let index = self.position(field, format)?;
        row.get(index)
            .map(AsRef::as_ref)
            .ok_or_else(|| ExtractError::OutOfRange {
                field: field.to_string(),
                index,
                len: row.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onspd_schema() -> ExtractSchema {
        serde_json::from_str(r#"{"pcd": 0, "pcd2": 1, "pcds": 2}"#).unwrap()
    }

    fn spd_small_schema() -> ExtractSchema {
        serde_json::from_str(
            r#"{
                "spd": {"Postcode": 0, "DateOfIntroduction": 3},
                "spd2": {"Postcode": 1, "DateOfIntroduction": 2}
            }"#,
        )
        .unwrap()
    }

    fn spd_large_schema() -> ExtractSchema {
        serde_json::from_str(
            r#"{
                "large": true,
                "fields": {
                    "Postcode": 0,
                    "ScottishParliamentaryConstituency2014Code": 14
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flat_schema_extracts_by_position() {
        let row = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        let extractor = CsvExtractor::new(onspd_schema());

        assert_eq!(extractor.extract(&row, "pcd", None).unwrap(), "foo");
        assert_eq!(extractor.extract(&row, "pcd2", None).unwrap(), "bar");
        assert_eq!(extractor.extract(&row, "pcds", None).unwrap(), "baz");
    }

    #[test]
    fn test_nested_schema_extracts_under_format_tag() {
        let row = vec!["foo", "bar", "baz", "date"];
        let extractor = CsvExtractor::new(spd_small_schema());

        assert_eq!(
            extractor.extract(&row, "Postcode", Some("spd")).unwrap(),
            "foo"
        );
        assert_eq!(
            extractor
                .extract(&row, "DateOfIntroduction", Some("spd"))
                .unwrap(),
            "date"
        );
        // Same fields sit elsewhere under the other tag.
        assert_eq!(
            extractor.extract(&row, "Postcode", Some("spd2")).unwrap(),
            "bar"
        );
    }

    #[test]
    fn test_size_variant_extracts_regardless_of_row_length() {
        let mut row = vec![String::new(); 15];
        row[14] = "yes".to_string();
        let extractor = CsvExtractor::new(spd_large_schema());

        assert_eq!(
            extractor
                .extract(&row, "ScottishParliamentaryConstituency2014Code", None)
                .unwrap(),
            "yes"
        );
        // A tag is ignored when positions are fixed by field name alone.
        assert_eq!(
            extractor
                .extract(&row, "ScottishParliamentaryConstituency2014Code", Some("spd"))
                .unwrap(),
            "yes"
        );
    }

    #[test]
    fn test_unknown_field_fails() {
        let row = vec!["foo", "bar", "baz"];
        let extractor = CsvExtractor::new(onspd_schema());

        assert_eq!(
            extractor.extract(&row, "bogus", None),
            Err(ExtractError::UnknownField("bogus".to_string()))
        );
    }

    #[test]
    fn test_nested_schema_requires_format_tag() {
        let row = vec!["foo", "bar", "baz", "date"];
        let extractor = CsvExtractor::new(spd_small_schema());

        assert_eq!(
            extractor.extract(&row, "Postcode", None),
            Err(ExtractError::MissingFormat("Postcode".to_string()))
        );
        assert_eq!(
            extractor.extract(&row, "Postcode", Some("unknown")),
            Err(ExtractError::UnknownFormat("unknown".to_string()))
        );
    }

    #[test]
    fn test_index_past_row_end_fails() {
        let short_row = vec!["foo"];
        let extractor = CsvExtractor::new(onspd_schema());

        assert_eq!(
            extractor.extract(&short_row, "pcds", None),
            Err(ExtractError::OutOfRange {
                field: "pcds".to_string(),
                index: 2,
                len: 1,
            })
        );
    }

    #[test]
    fn test_value_returned_verbatim() {
        let row = vec!["  padded  ", "", "0007"];
        let extractor = CsvExtractor::new(onspd_schema());

        assert_eq!(extractor.extract(&row, "pcd", None).unwrap(), "  padded  ");
        assert_eq!(extractor.extract(&row, "pcd2", None).unwrap(), "");
        assert_eq!(extractor.extract(&row, "pcds", None).unwrap(), "0007");
    }
}
