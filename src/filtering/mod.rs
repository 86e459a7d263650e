//! # Filtering & Search
//!
//! Translates a grid's filter state and search term into sea-orm conditions.
//!
//! ## Main Components
//!
//! - **[`FilterState`]**: typed filter state, parsed from the grid runtime's JSON
//! - **[`compile_filters`]**: AND-combined predicates, one group per filter kind
//! - **[`compile_search`]**: OR-combined auto-search over columns, raw expressions and relations
//! - **[`apply_sorting`]**: ordering restricted to sortable columns
//!
//! ## Filter Kinds
//!
//! ```rust,ignore
//! // Date or date range, whole days
//! {"datetime": {"created_at": "2024-01-01 to 2024-01-31"}}
//!
//! // IN list; an empty list or an empty-string entry means "all"
//! {"multi_select": {"status": ["paid", "shipped"]}}
//!
//! // Equality, optionally scoped to a relation key
//! {"select": {"category": {"name": "Books"}}}
//!
//! // "true"/"1" -> true, "all" -> no filter, anything else -> false
//! {"boolean": {"active": "true"}}
//!
//! // Text comparison, operator chosen per field (default "contains")
//! {"input_text": {"email": "example.com"}, "input_text_options": {"email": "ends_with"}}
//!
//! // Case-insensitive substring
//! {"contains_text": {"notes": "urgent"}}
//!
//! // Numeric range, de-localised with the field's NumberFormat
//! {"number": {"price": {"start": "1,000", "end": "5,000"}}}
//! ```
//!
//! ## Database Dialects
//!
//! Case-insensitive matching uses `ILIKE` on `PostgreSQL` and `LOWER(..) LIKE` on
//! `MySQL` and `SQLite`. LIKE wildcards in user input are always escaped.

pub mod conditions;
pub mod fields;
pub mod operators;
pub mod relations;
pub mod search;
pub mod sort;
pub mod state;
pub mod values;

// Re-export commonly used items
pub use conditions::{build_filter_condition, compile_filters};
pub use fields::FieldPath;
pub use operators::TextOperator;
pub use relations::{RelationLink, RelationSearch, RelationSearchMap, Relations};
pub use search::{SearchScope, build_search_condition, compile_search};
pub use sort::apply_sorting;
pub use state::{Filter, FilterKind, FilterState};
pub use values::{NumberFormat, NumberFormats, NumberRange};
