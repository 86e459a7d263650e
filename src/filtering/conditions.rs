//! Filter state compilation.
//!
//! Every [`Filter`] becomes at most one predicate. Predicates are grouped per
//! [`FilterKind`], in [`FilterKind::ALL`] order, and all groups are AND-combined.

use sea_orm::{Condition, DatabaseBackend, QueryFilter};
use tracing::debug;
use uuid::Uuid;

use super::fields::FieldPath;
use super::operators::{contains_pattern, like_ci};
use super::state::{Filter, FilterKind, FilterState};
use super::values::{DateRange, NumberFormats, NumberPredicate, NumberRange, parse_boolean};
use crate::errors::GridError;

/// Build the combined filter condition. An empty condition means "no filtering".
///
/// # Errors
///
/// [`GridError::InvalidFilter`] for unparsable dates or malformed formatted numbers.
pub fn build_filter_condition(
    state: &FilterState,
    formats: &NumberFormats,
    backend: DatabaseBackend,
) -> Result<Condition, GridError> {
    let mut condition = Condition::all();

    for kind in FilterKind::ALL {
        let mut group = Condition::all();
        for filter in state.of_kind(kind) {
            match filter_predicate(filter, state, formats, backend)? {
                Some(predicate) => group = group.add(predicate),
                None => debug!(kind = %kind, field = filter.field(), "filter adds no predicate"),
            }
        }
        if !group.is_empty() {
            condition = condition.add(group);
        }
    }

    Ok(condition)
}

/// Narrow `query` by the filter state.
///
/// ```rust,ignore
/// let state = FilterState::from_json(&json!({"boolean": {"active": "true"}}))?;
/// let query = compile_filters(users::Entity::find(), &state, &NumberFormats::new(), db.get_database_backend())?;
/// ```
///
/// # Errors
///
/// See [`build_filter_condition`].
pub fn compile_filters<Q: QueryFilter>(
    query: Q,
    state: &FilterState,
    formats: &NumberFormats,
    backend: DatabaseBackend,
) -> Result<Q, GridError> {
    let condition = build_filter_condition(state, formats, backend)?;
    if condition.is_empty() {
        return Ok(query);
    }
    Ok(query.filter(condition))
}

fn filter_predicate(
    filter: &Filter,
    state: &FilterState,
    formats: &NumberFormats,
    backend: DatabaseBackend,
) -> Result<Option<Condition>, GridError> {
    let path = FieldPath::parse(filter.field());

    let predicate = match filter {
        Filter::Datetime { field, value } => DateRange::parse(value)
            .map_err(|message| GridError::invalid_filter(FilterKind::Datetime, field, message))?
            .map(|range| path.expr().between(range.start, range.end)),
        Filter::MultiSelect { values, .. } => {
            if values.is_empty() || values.iter().any(String::is_empty) {
                None
            } else {
                Some(path.expr().is_in(values.iter().cloned()))
            }
        }
        Filter::Select { value, .. } => {
            let value = value.trim();
            if value.is_empty() {
                None
            } else if let Ok(uuid) = Uuid::parse_str(value) {
                Some(path.expr().eq(uuid))
            } else {
                Some(path.expr().eq(value))
            }
        }
        Filter::Boolean { value, .. } => parse_boolean(value).map(|flag| path.expr().eq(flag)),
        Filter::InputText { field, value } => {
            return Ok(state.text_operator(field).and_then(|operator| {
                operator.predicate(&path, value.as_deref().unwrap_or_default(), backend)
            }));
        }
        Filter::ContainsText { value, .. } => value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| like_ci(backend, path.expr(), contains_pattern(v))),
        Filter::Number { field, range } => {
            return number_predicate(&path, field, range, formats);
        }
    };

    Ok(predicate.map(|expr| Condition::all().add(expr)))
}

fn number_predicate(
    path: &FieldPath,
    field: &str,
    range: &NumberRange,
    formats: &NumberFormats,
) -> Result<Option<Condition>, GridError> {
    let normalized = range
        .normalize(formats.get(field))
        .map_err(|message| GridError::invalid_filter(FilterKind::Number, field, message))?;

    Ok(normalized.map(|predicate| {
        let expr = match predicate {
            NumberPredicate::AtLeast(start) => path.expr().gte(sea_orm::Value::from(start)),
            NumberPredicate::AtMost(end) => path.expr().lte(sea_orm::Value::from(end)),
            NumberPredicate::Between(start, end) => path
                .expr()
                .between(sea_orm::Value::from(start), sea_orm::Value::from(end)),
        };
        Condition::all().add(expr)
    }))
}
