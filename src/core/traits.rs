use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Select, entity::prelude::*};

use crate::database::SchemaColumnCache;
use crate::errors::GridError;
use crate::filtering::{FilterState, NumberFormats, RelationSearchMap, Relations};
use crate::grid::DataGridQuery;
use crate::models::{ColumnDefinition, GridRequest};

/// Grid configuration for one entity.
///
/// ```rust,ignore
/// struct UserGrid;
///
/// impl DataGrid for UserGrid {
///     type EntityType = users::Entity;
///
///     fn columns() -> Vec<ColumnDefinition> {
///         vec![
///             ColumnDefinition::new("Name", "name").searchable().sortable(),
///             ColumnDefinition::new("Order status", "orders.status").searchable(),
///         ]
///     }
///
///     fn relations() -> Result<Relations, GridError> {
///         Relations::new().with_def("orders", &users::Relation::Orders.def())
///     }
///
///     fn relation_search() -> RelationSearchMap {
///         RelationSearchMap::new().direct("orders", ["status"])
///     }
/// }
/// ```
#[async_trait]
pub trait DataGrid: Sized + Send + Sync
where
    Self::EntityType: EntityTrait + Sync,
    <Self::EntityType as EntityTrait>::Model: Sync,
{
    type EntityType: EntityTrait + Sync;

    fn columns() -> Vec<ColumnDefinition>;

    /// Relation links used by relation search. Empty by default.
    ///
    /// # Errors
    ///
    /// Returns an error when a relation cannot be linked.
    fn relations() -> Result<Relations, GridError> {
        Ok(Relations::new())
    }

    #[must_use]
    fn relation_search() -> RelationSearchMap {
        RelationSearchMap::new()
    }

    #[must_use]
    fn number_formats() -> NumberFormats {
        NumberFormats::new()
    }

    #[must_use]
    fn table_name() -> String {
        Self::EntityType::default().table_name().to_string()
    }

    /// Filtered and searched select over the entity, not yet executed.
    async fn grid_query(
        db: &DatabaseConnection,
        filters: &FilterState,
        search: Option<&str>,
    ) -> Result<Select<Self::EntityType>, GridError> {
        let grid = DataGridQuery::new(
            Self::EntityType::find(),
            Self::table_name(),
            db.get_database_backend(),
        )
        .columns(Self::columns())
        .filters(filters.clone())
        .search(search.unwrap_or_default())
        .relations(Self::relations()?)
        .relation_search(Self::relation_search())
        .number_formats(Self::number_formats());

        grid.build(SchemaColumnCache::global(), db).await
    }

    /// Like [`DataGrid::grid_query`], taking filters, search and sorting from request parameters.
    async fn request_query(
        db: &DatabaseConnection,
        request: &GridRequest,
    ) -> Result<Select<Self::EntityType>, GridError> {
        let filters = request.filter_state()?;
        let query = Self::grid_query(db, &filters, request.search()).await?;
        Ok(DataGridQuery::new(query, Self::table_name(), db.get_database_backend())
            .columns(Self::columns())
            .sort(request.sort.as_deref(), request.order.as_deref().unwrap_or("asc"))
            .into_inner())
    }

    async fn fetch_all(
        db: &DatabaseConnection,
        filters: &FilterState,
        search: Option<&str>,
    ) -> Result<Vec<<Self::EntityType as EntityTrait>::Model>, GridError> {
        let rows = Self::grid_query(db, filters, search).await?.all(db).await?;
        Ok(rows)
    }
}
