use std::{collections::HashMap, path::Path, sync::RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::{
    engine::{InsertValue, QueryExecutor, QueryOutput, Statement},
    error::EngineError,
};

/// Storage treatment of a column, classified once from its declared SQL type
/// when the table is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Double,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Classify a SQL column-type text by its leading type word; anything
    /// unrecognized stores as text.
    pub fn classify(sql_type: &str) -> ColumnKind {
        let head = sql_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        match head.as_str() {
            "INT" | "INTEGER" | "SMALLINT" | "BIGINT" | "SERIAL" | "BIGSERIAL" => {
                ColumnKind::Integer
            }
            "DOUBLE" | "REAL" | "FLOAT" | "NUMERIC" | "DECIMAL" => ColumnKind::Double,
            "BOOLEAN" | "BOOL" => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }

    /// Coerce one raw CSV cell. Text columns keep the cell verbatim; for the
    /// other kinds an empty cell loads as NULL and a non-empty cell must
    /// parse.
    fn coerce_cell(&self, column: &str, raw: &str) -> Result<Value, EngineError> {
        let invalid = || EngineError::InvalidValue {
            column: column.to_string(),
            value: raw.to_string(),
        };

        if *self != ColumnKind::Text && raw.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            ColumnKind::Text => Ok(Value::String(raw.to_string())),
            ColumnKind::Integer => raw
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| invalid()),
            ColumnKind::Double => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            ColumnKind::Boolean => match raw {
                "true" | "t" | "TRUE" | "T" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "FALSE" | "F" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
        }
    }

    /// Check an already-typed value (insert parameter or literal) against the
    /// column kind. Strings are parsed for typed columns; NULL always passes.
    fn coerce_value(&self, column: &str, value: Value) -> Result<Value, EngineError> {
        let invalid = |value: &Value| EngineError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
        };

        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnKind::Text, Value::String(s)) => Ok(Value::String(s)),
            (ColumnKind::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ColumnKind::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (ColumnKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(Value::Number(n))
            }
            (ColumnKind::Double, Value::Number(n)) => Ok(Value::Number(n)),
            (ColumnKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (kind, Value::String(s)) => kind.coerce_cell(column, &s),
            (_, other) => Err(invalid(&other)),
        }
    }
}

#[derive(Debug, Clone)]
struct Table {
    columns: IndexMap<String, ColumnKind>,
    rows: Vec<Map<String, Value>>,
}

impl Table {
    fn new(columns: Vec<(String, String)>) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, ty)| (name, ColumnKind::classify(&ty)))
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn kind_of(&self, relation: &str, column: &str) -> Result<ColumnKind, EngineError> {
        self.columns
            .get(column)
            .copied()
            .ok_or_else(|| EngineError::UnknownColumn {
                relation: relation.to_string(),
                column: column.to_string(),
            })
    }

    /// Build a full row from the named values, filling unnamed columns with
    /// NULL, in table column order.
    fn full_row(&self, named: &Map<String, Value>) -> Map<String, Value> {
        let mut row = Map::new();
        for name in self.columns.keys() {
            let value = named.get(name).cloned().unwrap_or(Value::Null);
            row.insert(name.clone(), value);
        }
        row
    }
}

/// Reference in-memory engine implementing `QueryExecutor` for the statement
/// surface the relation manager emits.
///
/// Tables live in an `RwLock`-protected map; the handle is cheap to share
/// behind an `Arc` and several relation managers may run against it
/// concurrently. Useful for tests and prototyping in place of a networked
/// engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all current tables, unordered.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().unwrap().keys().cloned().collect()
    }

    fn run(&self, statement: Statement, params: &[Value]) -> Result<QueryOutput, EngineError> {
        match statement {
            Statement::CreateTable { relation, columns } => {
                let mut tables = self.tables.write().unwrap();
                if tables.contains_key(&relation) {
                    return Err(EngineError::RelationExists(relation));
                }
                info!(relation = %relation, columns = columns.len(), "creating relation");
                tables.insert(relation, Table::new(columns));
                Ok(QueryOutput::default())
            }
            Statement::DropTable { relation } => {
                let mut tables = self.tables.write().unwrap();
                if tables.remove(&relation).is_none() {
                    return Err(EngineError::UnknownRelation(relation));
                }
                info!(relation = %relation, "dropped relation");
                Ok(QueryOutput::default())
            }
            Statement::Insert {
                relation,
                columns,
                values,
                returning,
            } => {
                if columns.len() != values.len() {
                    return Err(EngineError::ColumnMismatch {
                        expected: columns.len(),
                        found: values.len(),
                    });
                }

                let mut tables = self.tables.write().unwrap();
                let table = tables
                    .get_mut(&relation)
                    .ok_or_else(|| EngineError::UnknownRelation(relation.clone()))?;

                let mut named = Map::new();
                for (column, slot) in columns.into_iter().zip(values) {
                    let kind = table.kind_of(&relation, &column)?;
                    let value = match slot {
                        InsertValue::Param(n) => params
                            .get(n - 1)
                            .cloned()
                            .ok_or(EngineError::MissingParameter(n))?,
                        InsertValue::Literal(value) => value,
                    };
                    named.insert(column.clone(), kind.coerce_value(&column, value)?);
                }

                let row = table.full_row(&named);
                table.rows.push(row.clone());

                Ok(QueryOutput {
                    rows: if returning {
                        vec![Value::Object(row)]
                    } else {
                        Vec::new()
                    },
                    rows_affected: 1,
                })
            }
            Statement::SelectAll { relation } => {
                let tables = self.tables.read().unwrap();
                let table = tables
                    .get(&relation)
                    .ok_or_else(|| EngineError::UnknownRelation(relation.clone()))?;
                Ok(QueryOutput {
                    rows: table.rows.iter().cloned().map(Value::Object).collect(),
                    rows_affected: 0,
                })
            }
            Statement::DeleteAll { relation } => {
                let mut tables = self.tables.write().unwrap();
                let table = tables
                    .get_mut(&relation)
                    .ok_or_else(|| EngineError::UnknownRelation(relation.clone()))?;
                let count = table.rows.len() as u64;
                table.rows.clear();
                Ok(QueryOutput {
                    rows: Vec::new(),
                    rows_affected: count,
                })
            }
        }
    }
}

#[async_trait]
impl QueryExecutor for MemoryEngine {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, EngineError> {
        debug!(sql = %sql, params = params.len(), "executing statement");
        let statement = Statement::parse(sql)?;
        self.run(statement, params)
    }

    async fn bulk_load(
        &self,
        filepath: &Path,
        relation: &str,
        columns: &[String],
    ) -> Result<u64, EngineError> {
        // capture the column kinds up front so the file can be staged without
        // holding the table lock
        let kinds: Vec<ColumnKind> = {
            let tables = self.tables.read().unwrap();
            let table = tables
                .get(relation)
                .ok_or_else(|| EngineError::UnknownRelation(relation.to_string()))?;
            columns
                .iter()
                .map(|column| table.kind_of(relation, column))
                .collect::<Result<_, _>>()?
        };

        let content = tokio::fs::read(filepath).await?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_slice());

        // stage every row first; the table is only touched once the whole
        // file has parsed and coerced cleanly
        let mut staged: Vec<Map<String, Value>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() != columns.len() {
                return Err(EngineError::ColumnMismatch {
                    expected: columns.len(),
                    found: record.len(),
                });
            }

            let mut named = Map::new();
            for ((column, kind), cell) in columns.iter().zip(&kinds).zip(record.iter()) {
                named.insert(column.clone(), kind.coerce_cell(column, cell)?);
            }
            staged.push(named);
        }

        let mut tables = self.tables.write().unwrap();
        // the relation may have been dropped while the file was being read
        let table = tables
            .get_mut(relation)
            .ok_or_else(|| EngineError::UnknownRelation(relation.to_string()))?;

        let count = staged.len() as u64;
        for named in staged {
            let row = table.full_row(&named);
            table.rows.push(row);
        }

        info!(relation = %relation, rows = count, "bulk-loaded csv file");
        Ok(count)
    }
}
