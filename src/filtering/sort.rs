use sea_orm::{
    QueryOrder,
    sea_query::{Order, SimpleExpr},
};

use super::fields::FieldPath;
use crate::models::ColumnDefinition;

/// Convert sort order string to Order enum
fn parse_order(sort_order: &str) -> Order {
    if sort_order.trim().eq_ignore_ascii_case("asc") {
        Order::Asc
    } else {
        Order::Desc
    }
}

/// Find a sortable column by field name
fn find_sortable<'a>(field: &str, columns: &'a [ColumnDefinition]) -> Option<&'a ColumnDefinition> {
    columns
        .iter()
        .find(|column| column.sortable && (column.field == field || column.search_field() == field))
}

/// Order `query` by `field` when it names a sortable column; otherwise leave it unsorted.
///
/// Dotted fields are table-qualified, plain fields are left unqualified.
pub fn apply_sorting<Q: QueryOrder>(
    query: Q,
    field: Option<&str>,
    direction: &str,
    columns: &[ColumnDefinition],
) -> Q {
    let Some(column) = field.and_then(|field| find_sortable(field.trim(), columns)) else {
        return query;
    };

    let path = FieldPath::parse(column.search_field());
    query.order_by(SimpleExpr::from(path.expr()), parse_order(direction))
}
