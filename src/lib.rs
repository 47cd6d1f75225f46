pub mod error;
pub use error::{EngineError, ExtractError, RelationError, SchemaError};

pub mod schema;
pub use schema::{CsvExtractor, ExtractSchema, RelationSchema};

pub mod engine;
pub use engine::{MemoryEngine, QueryExecutor, QueryOutput};

pub mod relation;
pub use relation::{CsvSeed, Record, RelationManager};
