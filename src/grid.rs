//! Request-scoped grid query compilation.
//!
//! ```rust,ignore
//! let query = DataGridQuery::new(users::Entity::find(), "users", db.get_database_backend())
//!     .columns(columns)
//!     .filters(request.filter_state()?)
//!     .search(request.search().unwrap_or_default())
//!     .relations(Relations::new().with_def("orders", &users::Relation::Orders.def())?)
//!     .relation_search(RelationSearchMap::new().direct("orders", ["status"]))
//!     .build(SchemaColumnCache::global(), &db)
//!     .await?;
//! ```

use sea_orm::{DatabaseBackend, QueryFilter, QueryOrder};

use crate::database::{ColumnSource, SchemaColumnCache};
use crate::errors::GridError;
use crate::filtering::{
    FilterState, NumberFormats, RelationSearchMap, Relations, SearchScope, apply_sorting,
    compile_filters, compile_search,
};
use crate::models::ColumnDefinition;

/// Inputs of one grid request, applied to a base query.
#[derive(Debug, Clone)]
pub struct DataGridQuery<Q> {
    query: Q,
    table: String,
    backend: DatabaseBackend,
    columns: Vec<ColumnDefinition>,
    search: String,
    filters: FilterState,
    relations: Relations,
    relation_search: RelationSearchMap,
    number_formats: NumberFormats,
}

impl<Q> DataGridQuery<Q> {
    pub fn new(query: Q, table: impl Into<String>, backend: DatabaseBackend) -> Self {
        Self {
            query,
            table: table.into(),
            backend,
            columns: Vec::new(),
            search: String::new(),
            filters: FilterState::new(),
            relations: Relations::new(),
            relation_search: RelationSearchMap::new(),
            number_formats: NumberFormats::new(),
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: FilterState) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn relations(mut self, relations: Relations) -> Self {
        self.relations = relations;
        self
    }

    #[must_use]
    pub fn relation_search(mut self, relation_search: RelationSearchMap) -> Self {
        self.relation_search = relation_search;
        self
    }

    #[must_use]
    pub fn number_formats(mut self, number_formats: NumberFormats) -> Self {
        self.number_formats = number_formats;
        self
    }

    /// Whether the search term is non-blank, i.e. whether building needs the schema.
    #[must_use]
    pub fn has_search(&self) -> bool {
        !self.search.trim().is_empty()
    }

    /// The base query, untouched.
    pub fn into_inner(self) -> Q {
        self.query
    }
}

impl<Q: QueryOrder> DataGridQuery<Q> {
    /// Order by a sortable column, see [`apply_sorting`].
    #[must_use]
    pub fn sort(mut self, field: Option<&str>, direction: &str) -> Self {
        self.query = apply_sorting(self.query, field, direction, &self.columns);
        self
    }
}

impl<Q: QueryFilter> DataGridQuery<Q> {
    /// Apply filters and search, with the base table's columns already known.
    ///
    /// # Errors
    ///
    /// Any [`GridError`] raised while compiling filters or search.
    pub fn build_with_columns(self, table_columns: &[String]) -> Result<Q, GridError> {
        let query = compile_filters(self.query, &self.filters, &self.number_formats, self.backend)?;
        let scope = SearchScope::new(&self.table, self.backend, &self.columns, &self.search)
            .with_relations(&self.relations, &self.relation_search);
        compile_search(query, &scope, table_columns)
    }

    /// Apply filters and search. The schema is only consulted when there is a
    /// search term.
    ///
    /// # Errors
    ///
    /// Compilation errors, or the schema lookup's database error.
    pub async fn build(
        self,
        cache: &SchemaColumnCache,
        source: &dyn ColumnSource,
    ) -> Result<Q, GridError> {
        if !self.has_search() {
            return self.build_with_columns(&[]);
        }
        let table_columns = cache.get_or_populate(&self.table, source).await?;
        self.build_with_columns(&table_columns)
    }
}
