//! Typed filter state.
//!
//! The grid runtime keeps its filters as a nested object keyed by filter kind and
//! field:
//!
//! ```json
//! {
//!   "datetime":     { "created_at": "2024-01-01 to 2024-01-31" },
//!   "multi_select": { "status": ["paid", "shipped"] },
//!   "select":       { "category": { "name": "Books" } },
//!   "boolean":      { "active": "true" },
//!   "input_text":   { "email": "example.com" },
//!   "input_text_options": { "email": "ends_with" },
//!   "contains_text": { "notes": "urgent" },
//!   "number":       { "price": { "start": "1,000", "end": "5,000" } }
//! }
//! ```
//!
//! [`FilterState::from_json`] checks every entry against its kind and resolves
//! relation-scoped values once, producing a list of [`Filter`]s.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::operators::TextOperator;
use super::values::{FilterValue, NumberRange};
use crate::errors::GridError;

const TEXT_OPTIONS_KEY: &str = "input_text_options";

/// The seven filter categories a grid can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKind {
    Datetime,
    MultiSelect,
    Select,
    Boolean,
    InputText,
    ContainsText,
    Number,
}

impl FilterKind {
    pub const ALL: [Self; 7] = [
        Self::Datetime,
        Self::MultiSelect,
        Self::Select,
        Self::Boolean,
        Self::InputText,
        Self::ContainsText,
        Self::Number,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Datetime => "datetime",
            Self::MultiSelect => "multi_select",
            Self::Select => "select",
            Self::Boolean => "boolean",
            Self::InputText => "input_text",
            Self::ContainsText => "contains_text",
            Self::Number => "number",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GridError::UnknownFilterKind(s.to_string()))
    }
}

/// One active filter, with its relation key already folded into `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Datetime { field: String, value: String },
    MultiSelect { field: String, values: Vec<String> },
    Select { field: String, value: String },
    Boolean { field: String, value: String },
    InputText { field: String, value: Option<String> },
    ContainsText { field: String, value: Option<String> },
    Number { field: String, range: NumberRange },
}

impl Filter {
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::Datetime { .. } => FilterKind::Datetime,
            Self::MultiSelect { .. } => FilterKind::MultiSelect,
            Self::Select { .. } => FilterKind::Select,
            Self::Boolean { .. } => FilterKind::Boolean,
            Self::InputText { .. } => FilterKind::InputText,
            Self::ContainsText { .. } => FilterKind::ContainsText,
            Self::Number { .. } => FilterKind::Number,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Datetime { field, .. }
            | Self::MultiSelect { field, .. }
            | Self::Select { field, .. }
            | Self::Boolean { field, .. }
            | Self::InputText { field, .. }
            | Self::ContainsText { field, .. }
            | Self::Number { field, .. } => field,
        }
    }

    pub fn datetime(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Datetime {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn multi_select<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MultiSelect {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn select(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Select {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn boolean(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Boolean {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn input_text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InputText {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    pub fn contains_text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ContainsText {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    pub fn number(field: impl Into<String>, start: Option<&str>, end: Option<&str>) -> Self {
        Self::Number {
            field: field.into(),
            range: NumberRange::new(start, end),
        }
    }

    fn from_raw(kind: FilterKind, field: &str, raw: &Value) -> Result<Self, GridError> {
        let invalid = |message: String| GridError::invalid_filter(kind, field, message);

        if kind == FilterKind::Number {
            let range: NumberRange = match raw {
                Value::Object(bounds) => NumberRange {
                    start: optional_scalar(bounds.get("start")).map_err(invalid)?,
                    end: optional_scalar(bounds.get("end")).map_err(invalid)?,
                },
                other => return Err(invalid(format!("expected start/end bounds, got {other}"))),
            };
            return Ok(Self::Number {
                field: field.to_string(),
                range,
            });
        }

        let (field, value) = FilterValue::from_json(raw).map_err(invalid)?.resolve(field);

        Ok(match (kind, value) {
            (FilterKind::MultiSelect, FilterValue::List(values)) => Self::MultiSelect { field, values },
            (FilterKind::MultiSelect, FilterValue::Null) => Self::MultiSelect {
                field,
                values: Vec::new(),
            },
            (FilterKind::Datetime, FilterValue::Scalar(value)) => Self::Datetime { field, value },
            (FilterKind::Datetime, FilterValue::Null) => Self::Datetime {
                field,
                value: String::new(),
            },
            (FilterKind::Select, FilterValue::Scalar(value)) => Self::Select { field, value },
            (FilterKind::Select, FilterValue::Null) => Self::Select {
                field,
                value: String::new(),
            },
            (FilterKind::Boolean, FilterValue::Scalar(value)) => Self::Boolean { field, value },
            (FilterKind::Boolean, FilterValue::Null) => Self::Boolean {
                field,
                value: String::new(),
            },
            (FilterKind::InputText, FilterValue::Scalar(value)) => Self::InputText {
                field,
                value: Some(value),
            },
            (FilterKind::InputText, FilterValue::Null) => Self::InputText { field, value: None },
            (FilterKind::ContainsText, FilterValue::Scalar(value)) => Self::ContainsText {
                field,
                value: Some(value),
            },
            (FilterKind::ContainsText, FilterValue::Null) => Self::ContainsText { field, value: None },
            (_, FilterValue::RelationScoped { .. }) => {
                return Err(GridError::invalid_filter(
                    kind,
                    field,
                    "relation-scoped values cannot be nested",
                ));
            }
            (FilterKind::MultiSelect, FilterValue::Scalar(_)) => {
                return Err(GridError::invalid_filter(kind, field, "expected a list of values"));
            }
            (FilterKind::Number, _) | (_, FilterValue::List(_)) => {
                return Err(GridError::invalid_filter(kind, field, "expected a single value"));
            }
        })
    }

    fn raw_value(&self) -> Value {
        match self {
            Self::Datetime { value, .. } | Self::Select { value, .. } | Self::Boolean { value, .. } => {
                json!(value)
            }
            Self::MultiSelect { values, .. } => json!(values),
            Self::InputText { value, .. } | Self::ContainsText { value, .. } => json!(value),
            Self::Number { range, .. } => json!(range),
        }
    }
}

fn optional_scalar(value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(format!("expected a number bound, got {other}")),
    }
}

/// Every active filter of a grid plus per-field text operator overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    filters: Vec<Filter>,
    text_operators: BTreeMap<String, String>,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Override the comparison used by the `input_text` filter on `field`.
    #[must_use]
    pub fn with_text_operator(mut self, field: impl Into<String>, operator: impl Into<String>) -> Self {
        self.text_operators.insert(field.into(), operator.into());
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filters of one kind, in insertion order
    pub fn of_kind(&self, kind: FilterKind) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(move |filter| filter.kind() == kind)
    }

    /// Operator for the `input_text` filter on `field`.
    ///
    /// Unset fields use [`TextOperator::Contains`]; an unrecognised override yields `None`.
    #[must_use]
    pub fn text_operator(&self, field: &str) -> Option<TextOperator> {
        self.text_operators
            .get(field)
            .map_or(Some(TextOperator::Contains), |name| TextOperator::parse(name))
    }

    /// Decode the runtime's filter object.
    ///
    /// # Errors
    ///
    /// [`GridError::UnknownFilterKind`] for keys that are not a filter kind, and
    /// [`GridError::InvalidFilter`] for entries whose shape does not fit their kind.
    pub fn from_json(value: &Value) -> Result<Self, GridError> {
        let mut state = Self::new();
        let Value::Object(kinds) = value else {
            if value.is_null() {
                return Ok(state);
            }
            return Err(GridError::InvalidState(format!(
                "filters must be an object, got {value}"
            )));
        };

        for (kind_name, fields) in kinds {
            if kind_name == TEXT_OPTIONS_KEY {
                if let Value::Object(options) = fields {
                    for (field, operator) in options {
                        if let Some(operator) = operator.as_str() {
                            state.text_operators.insert(field.clone(), operator.to_string());
                        }
                    }
                }
                continue;
            }

            let kind = FilterKind::from_str(kind_name)?;
            match fields {
                Value::Object(fields) => {
                    for (field, raw) in fields {
                        state.filters.push(Filter::from_raw(kind, field, raw)?);
                    }
                }
                Value::Null => {}
                other => {
                    return Err(GridError::invalid_filter(
                        kind,
                        kind_name.as_str(),
                        format!("expected an object of fields, got {other}"),
                    ));
                }
            }
        }

        Ok(state)
    }

    /// Encode back into the runtime's shape, with relation keys already folded into fields.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut kinds = Map::new();
        for filter in &self.filters {
            let entry = kinds
                .entry(filter.kind().as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = entry {
                fields.insert(filter.field().to_string(), filter.raw_value());
            }
        }
        if !self.text_operators.is_empty() {
            kinds.insert(TEXT_OPTIONS_KEY.to_string(), json!(self.text_operators));
        }
        Value::Object(kinds)
    }
}

impl TryFrom<&Value> for FilterState {
    type Error = GridError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}
