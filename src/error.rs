use thiserror::Error;

/// Errors reported while loading or validating a schema descriptor file.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("could not read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed but does not match any recognized descriptor shape.
    #[error("unrecognized schema shape: {0}")]
    Shape(String),
}

/// Errors raised by `CsvExtractor::extract`.
///
/// Extraction never falls back to an empty or wrong value: every failure to
/// resolve a field to a cell is reported through one of these variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("unknown field {0}")]
    UnknownField(String),

    #[error("unknown format tag {0}")]
    UnknownFormat(String),

    /// The schema is nested by format but no tag was supplied.
    #[error("schema requires a format tag to resolve field {0}")]
    MissingFormat(String),

    #[error("field {field} resolves to index {index} but the row has {len} cells")]
    OutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
}

/// Errors reported by a query engine.
///
/// These pass through the relation manager verbatim; nothing downgrades or
/// swallows an engine failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("relation {0} does not exist")]
    UnknownRelation(String),

    #[error("relation {0} already exists")]
    RelationExists(String),

    #[error("column {column} does not exist in relation {relation}")]
    UnknownColumn { relation: String, column: String },

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("statement references parameter ${0} but it was not supplied")]
    MissingParameter(usize),

    #[error("value {value:?} is not valid for column {column}")]
    InvalidValue { column: String, value: String },

    #[error("row has {found} cells but {expected} columns were requested")]
    ColumnMismatch { expected: usize, found: usize },

    #[error("could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors surfaced by `RelationManager` operations.
#[derive(Debug, Error)]
pub enum RelationError {
    /// A record carried a field the schema does not declare. Raised before
    /// any SQL is issued; the insert is never attempted.
    #[error("could not create record: field {0} is not in the schema")]
    UnknownField(String),

    /// A csv_seed column name is not declared by the schema. Raised before
    /// the engine is asked to load anything.
    #[error("could not seed relation: column {0} is not in the schema")]
    UnknownColumn(String),

    #[error(transparent)]
    Database(#[from] EngineError),
}
