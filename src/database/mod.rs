// Live schema introspection and its process-wide cache

pub mod schema_cache;

pub use schema_cache::{ColumnSource, DEFAULT_TTL, SchemaColumnCache};
