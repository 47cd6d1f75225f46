use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    engine::{QueryExecutor, QueryOutput},
    error::RelationError,
    schema::RelationSchema,
};

/// A single insert candidate: field name → value. Only schema-declared field
/// names are valid.
pub type Record = Map<String, Value>;

/// Options for bulk-seeding a relation from a CSV file.
///
/// `columns` names the relation columns the file's cells map onto, in file
/// order. No header row is skipped; if the file carries one, that is the
/// caller's problem to strip.
#[derive(Debug, Clone)]
pub struct CsvSeed {
    pub filepath: PathBuf,
    pub columns: Vec<String>,
}

impl CsvSeed {
    pub fn new<I, S>(filepath: impl AsRef<Path>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filepath: filepath.as_ref().to_path_buf(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Seed a single column from a one-column file.
    pub fn single(filepath: impl AsRef<Path>, column: impl Into<String>) -> Self {
        Self::new(filepath, [column.into()])
    }
}

/// Manages the lifecycle and contents of one named relation whose shape is
/// declared by a `RelationSchema`.
///
/// The manager owns the relation-name/schema pairing for its lifetime but not
/// the engine: the executor handle is injected at construction and may be
/// shared with other managers or raw queries issued elsewhere. Every
/// operation is async and completes exactly once with a result or an error;
/// the manager performs no internal queuing, locking, or retrying, and
/// guarantees no cross-operation ordering — callers sequence with `.await`.
///
/// Relation lifecycle: the relation does not exist until `create_relation`
/// succeeds and stops existing when `destroy_relation` succeeds. Operations
/// issued outside that window surface the engine's "does not exist" error
/// rather than panicking.
pub struct RelationManager {
    relation: String,
    schema: RelationSchema,
    engine: Arc<dyn QueryExecutor>,
}

impl RelationManager {
    pub fn new(
        relation: impl Into<String>,
        schema: RelationSchema,
        engine: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            relation: relation.into(),
            schema,
            engine,
        }
    }

    /// The relation name this manager is bound to.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn schema(&self) -> &RelationSchema {
        &self.schema
    }

    /// Execute an arbitrary, fully-formed statement against the engine and
    /// return the raw result. This is the primitive the other operations are
    /// built from; callers supplying raw SQL are trusted.
    pub async fn query(&self, sql: &str) -> Result<QueryOutput, RelationError> {
        debug!(relation = %self.relation, "raw query");
        Ok(self.engine.execute(sql, &[]).await?)
    }

    /// Create the relation with the columns declared by the schema, in
    /// declaration order. Not idempotent: creating an existing relation
    /// surfaces the engine's error.
    pub async fn create_relation(&self) -> Result<(), RelationError> {
        let columns = self
            .schema
            .columns()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE {} ({})", self.relation, columns);

        info!(relation = %self.relation, "creating relation");
        self.engine.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Drop the relation. Fails if it does not exist; that failure is
    /// reported, not swallowed.
    pub async fn destroy_relation(&self) -> Result<(), RelationError> {
        let sql = format!("DROP TABLE {}", self.relation);
        info!(relation = %self.relation, "destroying relation");
        self.engine.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Insert one record covering exactly its given fields.
    ///
    /// Every key is validated against the schema before any SQL is issued; an
    /// unknown key fails the whole call with no insert attempt. On success
    /// the stored row is returned.
    pub async fn create(&self, record: &Record) -> Result<Value, RelationError> {
        for field in record.keys() {
            if !self.schema.contains(field) {
                return Err(RelationError::UnknownField(field.clone()));
            }
        }

        let fields: Vec<&str> = record.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|n| format!("${n}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.relation,
            fields.join(", "),
            placeholders.join(", ")
        );
        let params: Vec<Value> = record.values().cloned().collect();

        let output = self.engine.execute(&sql, &params).await?;
        Ok(output.rows.into_iter().next().unwrap_or(Value::Null))
    }

    /// Every row currently stored in the relation, in whatever order the
    /// engine yields.
    pub async fn all(&self) -> Result<Vec<Value>, RelationError> {
        let sql = format!("SELECT * FROM {}", self.relation);
        let output = self.engine.execute(&sql, &[]).await?;
        Ok(output.rows)
    }

    /// Bulk-load the relation from a CSV file through the engine's native
    /// bulk-copy, inserting into exactly the named columns.
    ///
    /// Column names are checked against the schema before the engine is
    /// touched. After success the relation holds one row per data row of the
    /// file; any failure (missing file, arity mismatch, malformed content)
    /// surfaces as an error, never a partial silent load. Returns the number
    /// of rows loaded.
    pub async fn csv_seed(&self, seed: &CsvSeed) -> Result<u64, RelationError> {
        for column in &seed.columns {
            if !self.schema.contains(column) {
                return Err(RelationError::UnknownColumn(column.clone()));
            }
        }

        info!(
            relation = %self.relation,
            filepath = %seed.filepath.display(),
            "seeding relation from csv"
        );
        let count = self
            .engine
            .bulk_load(&seed.filepath, &self.relation, &seed.columns)
            .await?;
        Ok(count)
    }

    /// Delete every row while keeping the relation. Returns the number of
    /// rows removed; an already-empty relation clears to zero without error.
    pub async fn clear(&self) -> Result<u64, RelationError> {
        let sql = format!("DELETE FROM {}", self.relation);
        let output = self.engine.execute(&sql, &[]).await?;
        Ok(output.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::MemoryEngine, error::EngineError};
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn custom_relation() -> RelationManager {
        custom_relation_on(Arc::new(MemoryEngine::new()))
    }

    fn custom_relation_on(engine: Arc<MemoryEngine>) -> RelationManager {
        let schema = RelationSchema::from_pairs([
            ("somefield", "VARCHAR(255)"),
            ("counter", "INTEGER"),
        ]);
        RelationManager::new("customrelation", schema, engine)
    }

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn seed_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_raw_query_returns_rows() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let output = rel.query("SELECT * FROM customrelation").await.unwrap();
        assert!(output.rows.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_field_not_in_schema() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let result = rel.create(&record(json!({"bogus": "bogusfield"}))).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RelationError::UnknownField(_)));
        assert!(err.to_string().contains("could not create record"));

        // validation failed before any SQL: the relation is unchanged
        assert!(rel.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_all_contains_record() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let stored = rel
            .create(&record(json!({"somefield": "unique"})))
            .await
            .unwrap();
        assert_eq!(stored["somefield"], json!("unique"));
        // uncovered columns are present as NULL
        assert_eq!(stored["counter"], Value::Null);

        let rows = rel.all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().any(|row| row["somefield"] == json!("unique")));
    }

    #[tokio::test]
    async fn test_create_relation_twice_fails() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let result = rel.create_relation().await;
        assert!(matches!(
            result,
            Err(RelationError::Database(EngineError::RelationExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_destroy_relation_succeeds_exactly_once() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        rel.destroy_relation().await.unwrap();
        let result = rel.destroy_relation().await;
        assert!(matches!(
            result,
            Err(RelationError::Database(EngineError::UnknownRelation(_)))
        ));
    }

    #[tokio::test]
    async fn test_crud_against_missing_relation_fails() {
        let rel = custom_relation();

        let result = rel.all().await;
        assert!(matches!(
            result,
            Err(RelationError::Database(EngineError::UnknownRelation(_)))
        ));

        let result = rel.create(&record(json!({"somefield": "x"}))).await;
        assert!(matches!(
            result,
            Err(RelationError::Database(EngineError::UnknownRelation(_)))
        ));
    }

    #[tokio::test]
    async fn test_csv_seed_loads_every_file_row() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let tmp = TempDir::new().unwrap();
        let path = seed_file(&tmp, "seed.csv", b"Lorem\nIpsum\nDolor\n");

        let count = rel
            .csv_seed(&CsvSeed::single(&path, "somefield"))
            .await
            .unwrap();
        assert_eq!(count, 3);

        let rows = rel.all().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|row| row["somefield"] == json!("Lorem")));
        assert!(rows.iter().any(|row| row["somefield"] == json!("Dolor")));
    }

    #[tokio::test]
    async fn test_csv_seed_multiple_columns_verbatim_values() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let tmp = TempDir::new().unwrap();
        let path = seed_file(&tmp, "seed.csv", b"first,1\nsecond,2\n");

        let seed = CsvSeed::new(&path, ["somefield", "counter"]);
        assert_eq!(rel.csv_seed(&seed).await.unwrap(), 2);

        let rows = rel.all().await.unwrap();
        assert!(rows
            .iter()
            .any(|row| row["somefield"] == json!("first") && row["counter"] == json!(1)));
    }

    #[tokio::test]
    async fn test_csv_seed_rejects_unknown_column_before_engine() {
        let rel = custom_relation();
        // the relation was never created; validation still fires first
        let seed = CsvSeed::single("/nowhere.csv", "bogus");
        let result = rel.csv_seed(&seed).await;
        assert!(matches!(result, Err(RelationError::UnknownColumn(_))));
    }

    #[tokio::test]
    async fn test_csv_seed_missing_file_fails() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let seed = CsvSeed::single("/path/that/does/not/exist.csv", "somefield");
        let result = rel.csv_seed(&seed).await;
        assert!(matches!(
            result,
            Err(RelationError::Database(EngineError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn test_clear_empties_relation() {
        let rel = custom_relation();
        rel.create_relation().await.unwrap();

        let tmp = TempDir::new().unwrap();
        let path = seed_file(&tmp, "seed.csv", b"Lorem\nIpsum\n");
        rel.csv_seed(&CsvSeed::single(&path, "somefield"))
            .await
            .unwrap();
        assert_eq!(rel.all().await.unwrap().len(), 2);

        assert_eq!(rel.clear().await.unwrap(), 2);
        assert!(rel.all().await.unwrap().is_empty());

        // clearing an already-empty relation is not an error
        assert_eq!(rel.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_managers_share_one_engine() {
        let engine = Arc::new(MemoryEngine::new());
        let first = custom_relation_on(Arc::clone(&engine));
        first.create_relation().await.unwrap();

        let other_schema = RelationSchema::from_pairs([("label", "TEXT")]);
        let second = RelationManager::new("labels", other_schema, engine);
        second.create_relation().await.unwrap();

        first
            .create(&record(json!({"somefield": "a"})))
            .await
            .unwrap();
        second.create(&record(json!({"label": "b"}))).await.unwrap();

        assert_eq!(first.all().await.unwrap().len(), 1);
        assert_eq!(second.all().await.unwrap().len(), 1);

        // one manager's raw query can see the other's relation
        let output = first.query("SELECT * FROM labels").await.unwrap();
        assert_eq!(output.rows.len(), 1);
    }
}
