//! # gridcrate
//!
//! Data-grid queries for sea-orm: a grid's filter state, search term and sort
//! become conditions on a `Select`, with per-backend case-insensitive matching,
//! dotted relation fields, relation search through correlated `EXISTS`, and a
//! cached view of the live schema.
//!
//! ```rust,ignore
//! use gridcrate::{DataGrid, GridRequest};
//!
//! async fn list_users(
//!     State(db): State<DatabaseConnection>,
//!     Query(request): Query<GridRequest>,
//! ) -> Result<Json<Vec<users::Model>>, GridError> {
//!     let rows = UserGrid::request_query(&db, &request).await?.all(&db).await?;
//!     Ok(Json(rows))
//! }
//! ```

pub mod core;
pub mod database;
pub mod errors;
pub mod filtering;
pub mod grid;
pub mod models;
pub mod persistence;

pub use crate::core::DataGrid;
pub use database::{ColumnSource, SchemaColumnCache};
pub use errors::GridError;
pub use filtering::{
    Filter, FilterKind, FilterState, NumberFormat, NumberFormats, RelationLink, RelationSearchMap,
    Relations, TextOperator,
};
pub use grid::DataGridQuery;
pub use models::{ColumnDefinition, GridRequest};
pub use persistence::{GridSnapshot, PersistItem, StatePersistence};
