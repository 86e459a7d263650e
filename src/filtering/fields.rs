//! Dot-path field resolution.
//!
//! A grid field is either a plain column (`name`) or a `table.column` path
//! (`orders.status`). Only the first two segments are significant.

use sea_orm::sea_query::{Alias, Expr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    table: Option<String>,
    column: String,
}

impl FieldPath {
    /// Split a field identifier on its first dot.
    ///
    /// - `"name"` -> no table, column `name`
    /// - `"orders.status"` -> table `orders`, column `status`
    /// - `"orders.status.code"` -> table `orders`, column `status`
    #[must_use]
    pub fn parse(field: &str) -> Self {
        match field.split_once('.') {
            Some((table, rest)) => Self {
                table: Some(table.to_string()),
                column: rest.split('.').next().unwrap_or_default().to_string(),
            },
            None => Self {
                table: None,
                column: field.to_string(),
            },
        }
    }

    /// Append a relation key to a field, as done for relation-scoped filter values.
    #[must_use]
    pub fn join(field: &str, key: &str) -> String {
        format!("{field}.{key}")
    }

    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// `(table, column)`, with the table defaulting to `base_table`.
    #[must_use]
    pub fn resolve<'a>(&'a self, base_table: &'a str) -> (&'a str, &'a str) {
        (self.table.as_deref().unwrap_or(base_table), &self.column)
    }

    /// Column reference exactly as written: qualified only when the path is dotted.
    #[must_use]
    pub fn expr(&self) -> Expr {
        match &self.table {
            Some(table) => Expr::col((Alias::new(table.as_str()), Alias::new(self.column.as_str()))),
            None => Expr::col(Alias::new(self.column.as_str())),
        }
    }

    /// Column reference always qualified, defaulting to `base_table`.
    #[must_use]
    pub fn qualified_expr(&self, base_table: &str) -> Expr {
        let (table, column) = self.resolve(base_table);
        Expr::col((Alias::new(table), Alias::new(column)))
    }
}
