pub mod relation_schema;
pub use relation_schema::*;

pub mod extract_schema;
pub use extract_schema::*;

pub mod extractor;
pub use extractor::*;
