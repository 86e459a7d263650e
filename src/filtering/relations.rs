//! Relation-scoped search support.
//!
//! A [`RelationLink`] tells the search compiler how a related table correlates with
//! its parent so that a match inside the relation can be expressed as
//! `EXISTS (SELECT 1 FROM related WHERE related.fk = parent.pk AND ...)`.
//! Links live in a [`Relations`] registry keyed by relation path (`orders`,
//! `orders.items`), and a [`RelationSearchMap`] names which related columns take
//! part in the grid search.

use sea_orm::{
    Condition, Identity, RelationDef,
    sea_query::{Alias, DynIden, Expr, Iden, Query, SimpleExpr, TableRef},
};
use serde::{Deserialize, Serialize, de};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::errors::GridError;

/// Correlation between a related table and its parent: `table.column = parent.parent_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    pub table: String,
    pub column: String,
    pub parent_column: String,
}

fn iden_name(iden: &DynIden) -> String {
    Iden::to_string(&**iden)
}

impl RelationLink {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            parent_column: parent_column.into(),
        }
    }

    /// Derive a link from a sea-orm relation, e.g. `users::Relation::Orders.def()`.
    ///
    /// # Errors
    ///
    /// [`GridError::UnsupportedRelation`] for composite keys or non-table targets.
    pub fn from_def(def: &RelationDef) -> Result<Self, GridError> {
        let table = match &def.to_tbl {
            TableRef::Table(table) | TableRef::SchemaTable(_, table) => iden_name(table),
            other => {
                return Err(GridError::UnsupportedRelation(format!(
                    "relation target {other:?} is not a plain table"
                )));
            }
        };
        let (Identity::Unary(column), Identity::Unary(parent_column)) = (&def.to_col, &def.from_col)
        else {
            return Err(GridError::UnsupportedRelation(format!(
                "relation to '{table}' uses a composite key"
            )));
        };

        Ok(Self {
            table,
            column: iden_name(column),
            parent_column: iden_name(parent_column),
        })
    }

    /// Correlated `EXISTS` sub-query over this relation, filtered by `inner`.
    #[must_use]
    pub fn exists(&self, parent_table: &str, inner: Condition) -> SimpleExpr {
        let correlation = Expr::col((Alias::new(self.table.as_str()), Alias::new(self.column.as_str())))
            .equals((Alias::new(parent_table), Alias::new(self.parent_column.as_str())));

        Expr::exists(
            Query::select()
                .expr(Expr::val(1))
                .from(Alias::new(self.table.as_str()))
                .cond_where(Condition::all().add(correlation).add(inner))
                .to_owned(),
        )
    }
}

/// Registry of relation links by path.
#[derive(Debug, Clone, Default)]
pub struct Relations(BTreeMap<String, RelationLink>);

impl Relations {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, path: impl Into<String>, link: RelationLink) -> Self {
        self.0.insert(path.into(), link);
        self
    }

    /// Register a sea-orm relation under `path`.
    ///
    /// # Errors
    ///
    /// See [`RelationLink::from_def`].
    pub fn with_def(self, path: impl Into<String>, def: &RelationDef) -> Result<Self, GridError> {
        Ok(self.with(path, RelationLink::from_def(def)?))
    }

    /// # Errors
    ///
    /// [`GridError::UnknownRelation`] when nothing is registered under `path`.
    pub fn get(&self, path: &str) -> Result<&RelationLink, GridError> {
        self.0
            .get(path)
            .ok_or_else(|| GridError::UnknownRelation(path.to_string()))
    }
}

/// Columns searched inside one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationSearch {
    /// Columns on the related table itself
    Direct(Vec<String>),
    /// Columns on a relation of the related table
    Nested { relation: String, columns: Vec<String> },
}

/// Relations taking part in the grid search, in declaration order.
///
/// JSON form: `{"orders": "status"}`, `{"orders": ["status", "code"]}` or
/// `{"orders": {"items": ["sku"]}}`. A list of such objects is accepted too and
/// is what serializing produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationSearchMap(Vec<(String, RelationSearch)>);

impl RelationSearchMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn direct<I, S>(mut self, relation: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push((
            relation.into(),
            RelationSearch::Direct(columns.into_iter().map(Into::into).collect()),
        ));
        self
    }

    #[must_use]
    pub fn nested<I, S>(
        mut self,
        relation: impl Into<String>,
        nested: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push((
            relation.into(),
            RelationSearch::Nested {
                relation: nested.into(),
                columns: columns.into_iter().map(Into::into).collect(),
            },
        ));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationSearch)> {
        self.0.iter().map(|(relation, search)| (relation.as_str(), search))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelationSearchRepr {
    Column(String),
    Columns(Vec<String>),
    Nested(Map<String, Value>),
}

impl RelationSearchMap {
    fn push_json<E: de::Error>(mut self, relation: String, value: Value) -> Result<Self, E> {
        let repr: RelationSearchRepr = serde_json::from_value(value).map_err(|e| {
            E::custom(format!("relation search for '{relation}' is malformed: {e}"))
        })?;
        Ok(match repr {
            RelationSearchRepr::Column(column) => self.direct(relation, [column]),
            RelationSearchRepr::Columns(columns) => self.direct(relation, columns),
            RelationSearchRepr::Nested(nested) => {
                for (inner, columns) in nested {
                    let columns: Vec<String> = serde_json::from_value(columns).map_err(|e| {
                        E::custom(format!("relation search for '{relation}.{inner}' is malformed: {e}"))
                    })?;
                    self = self.nested(relation.clone(), inner, columns);
                }
                self
            }
        })
    }
}

/// Reads the object form, or a list of such objects when one relation carries
/// several entries. Entries keep the order they are written in.
impl<'de> Deserialize<'de> for RelationSearchMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let objects = match Value::deserialize(deserializer)? {
            Value::Object(object) => vec![object],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(object) => Ok(object),
                    other => Err(de::Error::custom(format!(
                        "expected a relation search object, got {other}"
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Value::Null => Vec::new(),
            other => {
                return Err(de::Error::custom(format!(
                    "expected a relation search object, got {other}"
                )));
            }
        };

        objects
            .into_iter()
            .flatten()
            .try_fold(Self::new(), |map, (relation, value)| map.push_json(relation, value))
    }
}

/// Written as a list of single-entry objects, so a relation can hold both a
/// direct and a nested entry.
impl Serialize for RelationSearchMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|(relation, search)| match search {
            RelationSearch::Direct(columns) => json!({ relation.as_str(): columns }),
            RelationSearch::Nested { relation: inner, columns } => {
                json!({ relation.as_str(): { inner.as_str(): columns } })
            }
        }))
    }
}
