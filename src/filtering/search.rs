//! Auto-search across searchable columns.
//!
//! A search term becomes one OR group holding a case-insensitive "contains"
//! match for every searchable column the base table actually has, one match per
//! raw search expression, and one correlated `EXISTS` per searched relation.

use sea_orm::{
    Condition, DatabaseBackend, QueryFilter,
    sea_query::{Alias, Expr},
};
use tracing::debug;

use super::fields::FieldPath;
use super::operators::{contains_pattern, like_ci};
use super::relations::{RelationLink, RelationSearch, RelationSearchMap, Relations};
use crate::errors::GridError;
use crate::models::ColumnDefinition;

static NO_RELATIONS: Relations = Relations::new();
static NO_RELATION_SEARCH: RelationSearchMap = RelationSearchMap::new();

/// Everything the search compiler reads for one request.
#[derive(Debug, Clone, Copy)]
pub struct SearchScope<'a> {
    pub table: &'a str,
    pub backend: DatabaseBackend,
    pub columns: &'a [ColumnDefinition],
    pub term: &'a str,
    pub relation_search: &'a RelationSearchMap,
    pub relations: &'a Relations,
}

impl<'a> SearchScope<'a> {
    #[must_use]
    pub fn new(
        table: &'a str,
        backend: DatabaseBackend,
        columns: &'a [ColumnDefinition],
        term: &'a str,
    ) -> Self {
        Self {
            table,
            backend,
            columns,
            term,
            relation_search: &NO_RELATION_SEARCH,
            relations: &NO_RELATIONS,
        }
    }

    /// Also search inside related tables.
    #[must_use]
    pub fn with_relations(
        mut self,
        relations: &'a Relations,
        relation_search: &'a RelationSearchMap,
    ) -> Self {
        self.relations = relations;
        self.relation_search = relation_search;
        self
    }
}

/// Build the search OR group; `None` when the term is blank or nothing is searchable.
///
/// `table_columns` is the live column list of the base table. Columns missing
/// from it are left out of the direct matches without error.
///
/// # Errors
///
/// [`GridError::UnknownRelation`] when the relation search names a relation
/// without a registered link.
pub fn build_search_condition(
    scope: &SearchScope<'_>,
    table_columns: &[String],
) -> Result<Option<Condition>, GridError> {
    let term = scope.term.trim();
    if term.is_empty() {
        return Ok(None);
    }
    let pattern = contains_pattern(term);
    let mut any = Condition::any();

    for column in scope.columns {
        if !column.searchable || column.handled_externally {
            continue;
        }

        let field = column.search_field();
        if !field.is_empty() {
            let path = FieldPath::parse(field);
            let on_base_table = path.table().is_none_or(|table| table == scope.table);
            if on_base_table && table_columns.iter().any(|c| c == path.column()) {
                any = any.add(like_ci(
                    scope.backend,
                    path.qualified_expr(scope.table),
                    pattern.clone(),
                ));
            } else {
                debug!(table = scope.table, field, "column not in schema, skipped by search");
            }
        }

        if let Some(raw) = column.searchable_raw.as_deref().filter(|r| !r.trim().is_empty()) {
            any = any.add(like_ci(
                scope.backend,
                Expr::expr(Expr::cust(format!("({raw})"))),
                pattern.clone(),
            ));
        }
    }

    for (relation, search) in scope.relation_search.iter() {
        let link = scope.relations.get(relation)?;
        let exists = match search {
            RelationSearch::Direct(columns) => {
                let inner = columns_match(link, columns, scope.backend, &pattern);
                if inner.is_empty() {
                    continue;
                }
                link.exists(scope.table, inner)
            }
            RelationSearch::Nested { relation: nested, columns } => {
                let nested_link = scope.relations.get(&FieldPath::join(relation, nested))?;
                let inner = columns_match(nested_link, columns, scope.backend, &pattern);
                if inner.is_empty() {
                    continue;
                }
                link.exists(
                    scope.table,
                    Condition::all().add(nested_link.exists(&link.table, inner)),
                )
            }
        };
        any = any.add(exists);
    }

    Ok((!any.is_empty()).then_some(any))
}

fn columns_match(
    link: &RelationLink,
    columns: &[String],
    backend: DatabaseBackend,
    pattern: &str,
) -> Condition {
    columns.iter().fold(Condition::any(), |condition, column| {
        condition.add(like_ci(
            backend,
            Expr::col((Alias::new(link.table.as_str()), Alias::new(column.as_str()))),
            pattern.to_string(),
        ))
    })
}

/// Narrow `query` to rows matching the search term, independent of any filters.
///
/// # Errors
///
/// See [`build_search_condition`].
pub fn compile_search<Q: QueryFilter>(
    query: Q,
    scope: &SearchScope<'_>,
    table_columns: &[String],
) -> Result<Q, GridError> {
    Ok(match build_search_condition(scope, table_columns)? {
        Some(condition) => query.filter(condition),
        None => query,
    })
}
