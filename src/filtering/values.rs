//! Filter value normalisation.
//!
//! Raw values arrive from the grid's reactive state as strings, lists of strings,
//! or a single-key object that scopes the value to a relation
//! (`{"category": {"name": "Books"}}`). [`FilterValue::resolve`] folds the relation
//! key into the field path once, so the compiler only ever sees plain values.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::fields::FieldPath;

/// Raw value of a single filter field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Null,
    Scalar(String),
    List(Vec<String>),
    RelationScoped { key: String, inner: Box<FilterValue> },
}

impl FilterValue {
    /// Decode a JSON value. Objects must carry at least one key; only the first written
    /// key is honoured.
    ///
    /// # Errors
    ///
    /// Returns a message describing the offending shape.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Ok(Self::Scalar(scalar_to_string(value)?))
            }
            Value::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(map) => {
                let (key, inner) = map
                    .iter()
                    .next()
                    .ok_or_else(|| "relation-scoped value has no key".to_string())?;
                Ok(Self::RelationScoped {
                    key: key.clone(),
                    inner: Box::new(Self::from_json(inner)?),
                })
            }
        }
    }

    /// Fold a relation key into `field`, returning the field path and the inner value.
    #[must_use]
    pub fn resolve(self, field: &str) -> (String, Self) {
        match self {
            Self::RelationScoped { key, inner } => (FieldPath::join(field, &key), *inner),
            other => (field.to_string(), other),
        }
    }
}

fn scalar_to_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(format!("expected a scalar, got {value}")),
    }
}

/// Interpretation of a boolean filter value. `"all"` and blank mean "no filter".
#[must_use]
pub fn parse_boolean(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() || value == "all" {
        return None;
    }
    Some(value == "true" || value == "1")
}

/// Inclusive timestamp interval covering whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Parse `"<date>"` or `"<date> to <date>"`.
    ///
    /// A single date covers that whole day; two dates span from the start of the
    /// first to the end of the second. Blank input, or more than two segments,
    /// yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a message when a segment is not a recognisable date.
    pub fn parse(value: &str) -> Result<Option<Self>, String> {
        let segments: Vec<&str> = value
            .split("to")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [day] => {
                let day = parse_date(day)?;
                Ok(Some(Self {
                    start: start_of_day(day),
                    end: end_of_day(day),
                }))
            }
            [from, until] => Ok(Some(Self {
                start: start_of_day(parse_date(from)?),
                end: end_of_day(parse_date(until)?),
            })),
            _ => Ok(None),
        }
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(input)
        .map(|datetime| datetime.date_naive())
        .map_err(|_| format!("'{input}' is not a date"))
}

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    start_of_day(day) + Duration::days(1) - Duration::microseconds(1)
}

/// Locale separators of a numeric range input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub thousands: String,
    pub decimal: String,
}

impl NumberFormat {
    #[must_use]
    pub fn new(thousands: impl Into<String>, decimal: impl Into<String>) -> Self {
        Self {
            thousands: thousands.into(),
            decimal: decimal.into(),
        }
    }

    /// Strip the thousands separator and turn the decimal separator into `.`.
    #[must_use]
    pub fn delocalize(&self, input: &str) -> String {
        let stripped = if self.thousands.is_empty() {
            input.to_string()
        } else {
            input.replace(&self.thousands, "")
        };
        if self.decimal.is_empty() {
            stripped
        } else {
            stripped.replace(&self.decimal, ".")
        }
    }
}

/// Per-field [`NumberFormat`]s. Fields without an entry are compared as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumberFormats(BTreeMap<String, NumberFormat>);

impl NumberFormats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, format: NumberFormat) -> Self {
        self.0.insert(field.into(), format);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&NumberFormat> {
        self.0.get(field)
    }
}

/// `start`/`end` bounds of a numeric range filter, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// A normalised bound, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberBound {
    Float(f64),
    Text(String),
}

impl NumberBound {
    /// Finite numbers bind as `f64`, anything else stays text.
    fn implicit(plain: String) -> Self {
        match plain.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Float(value),
            _ => Self::Text(plain),
        }
    }
}

impl From<NumberBound> for sea_orm::Value {
    fn from(bound: NumberBound) -> Self {
        match bound {
            NumberBound::Float(value) => value.into(),
            NumberBound::Text(value) => value.into(),
        }
    }
}

/// Comparison implied by which bounds are present.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberPredicate {
    AtLeast(NumberBound),
    AtMost(NumberBound),
    Between(NumberBound, NumberBound),
}

impl NumberRange {
    #[must_use]
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    fn bound(value: Option<&String>) -> Option<&str> {
        value.map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    /// Normalise the range against an optional locale format.
    ///
    /// A lone bound with a configured format must be a number. Everything else
    /// is de-localised when a format exists and bound as a number when it reads
    /// as one, falling back to text otherwise.
    ///
    /// # Errors
    ///
    /// Returns a message when a lone, formatted bound is not a number.
    pub fn normalize(
        &self,
        format: Option<&NumberFormat>,
    ) -> Result<Option<NumberPredicate>, String> {
        let single = |raw: &str| -> Result<NumberBound, String> {
            match format {
                Some(format) => {
                    let plain = format.delocalize(raw);
                    plain
                        .parse::<f64>()
                        .map(NumberBound::Float)
                        .map_err(|_| format!("'{raw}' is not a number"))
                }
                None => Ok(NumberBound::implicit(raw.to_string())),
            }
        };
        let dual = |raw: &str| -> NumberBound {
            NumberBound::implicit(format.map_or_else(|| raw.to_string(), |f| f.delocalize(raw)))
        };

        Ok(
            match (Self::bound(self.start.as_ref()), Self::bound(self.end.as_ref())) {
                (Some(start), None) => Some(NumberPredicate::AtLeast(single(start)?)),
                (None, Some(end)) => Some(NumberPredicate::AtMost(single(end)?)),
                (Some(start), Some(end)) => Some(NumberPredicate::Between(dual(start), dual(end))),
                (None, None) => None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_scoped_value_folds_key() {
        let value = FilterValue::from_json(&json!({"name": "Books"})).unwrap();
        let (field, inner) = value.resolve("category");
        assert_eq!(field, "category.name");
        assert_eq!(inner, FilterValue::Scalar("Books".to_string()));
    }

    #[test]
    fn test_plain_values_keep_field() {
        let (field, inner) = FilterValue::from_json(&json!(["a", 2, true]))
            .unwrap()
            .resolve("status");
        assert_eq!(field, "status");
        assert_eq!(
            inner,
            FilterValue::List(vec!["a".into(), "2".into(), "true".into()])
        );
    }

    #[test]
    fn test_relation_scoped_value_uses_first_written_key() {
        let value: Value = serde_json::from_str(r#"{"zeta": "a", "alpha": "b"}"#).unwrap();
        let (field, inner) = FilterValue::from_json(&value).unwrap().resolve("tags");
        assert_eq!(field, "tags.zeta");
        assert_eq!(inner, FilterValue::Scalar("a".to_string()));
    }

    #[test]
    fn test_empty_object_is_rejected() {
        assert!(FilterValue::from_json(&json!({})).is_err());
        assert!(FilterValue::from_json(&json!([["nested"]])).is_err());
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_boolean("all"), None);
        assert_eq!(parse_boolean(""), None);
        assert_eq!(parse_boolean("true"), Some(true));
        assert_eq!(parse_boolean("1"), Some(true));
        assert_eq!(parse_boolean("false"), Some(false));
        assert_eq!(parse_boolean("yes"), Some(false));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::parse("2024-03-10").unwrap().unwrap();
        assert_eq!(range.start.to_string(), "2024-03-10 00:00:00");
        assert_eq!(range.end.to_string(), "2024-03-10 23:59:59.999999");
    }

    #[test]
    fn test_two_day_range() {
        let range = DateRange::parse("2024-03-10 to 2024-03-12").unwrap().unwrap();
        assert_eq!(range.start.to_string(), "2024-03-10 00:00:00");
        assert_eq!(range.end.to_string(), "2024-03-12 23:59:59.999999");
    }

    #[test]
    fn test_datetime_segments_use_their_day() {
        let range = DateRange::parse("2024-03-10T15:30:00+02:00").unwrap().unwrap();
        assert_eq!(range.start.to_string(), "2024-03-10 00:00:00");

        let range = DateRange::parse("2024-03-10 08:15:00").unwrap().unwrap();
        assert_eq!(range.end.to_string(), "2024-03-10 23:59:59.999999");
    }

    #[test]
    fn test_date_range_edge_cases() {
        assert_eq!(DateRange::parse("").unwrap(), None);
        assert_eq!(DateRange::parse("  to  ").unwrap(), None);
        assert!(DateRange::parse("yesterday").is_err());
    }

    #[test]
    fn test_delocalize() {
        let us = NumberFormat::new(",", ".");
        assert_eq!(us.delocalize("1,234.5"), "1234.5");

        let de = NumberFormat::new(".", ",");
        assert_eq!(de.delocalize("1.234,5"), "1234.5");
    }

    #[test]
    fn test_single_bound_with_format_is_cast() {
        let format = NumberFormat::new(",", ".");
        let range = NumberRange::new(Some("1,234.5"), None);
        assert_eq!(
            range.normalize(Some(&format)).unwrap(),
            Some(NumberPredicate::AtLeast(NumberBound::Float(1234.5)))
        );

        let range = NumberRange::new(None, Some("10"));
        assert_eq!(
            range.normalize(Some(&format)).unwrap(),
            Some(NumberPredicate::AtMost(NumberBound::Float(10.0)))
        );
    }

    #[test]
    fn test_single_bound_without_format_is_implicit() {
        let range = NumberRange::new(Some("10"), None);
        assert_eq!(
            range.normalize(None).unwrap(),
            Some(NumberPredicate::AtLeast(NumberBound::Float(10.0)))
        );

        let range = NumberRange::new(Some("1,234.5"), None);
        assert_eq!(
            range.normalize(None).unwrap(),
            Some(NumberPredicate::AtLeast(NumberBound::Text("1,234.5".into())))
        );

        let range = NumberRange::new(None, Some("inf"));
        assert_eq!(
            range.normalize(None).unwrap(),
            Some(NumberPredicate::AtMost(NumberBound::Text("inf".into())))
        );
    }

    #[test]
    fn test_both_bounds_are_delocalized_and_never_rejected() {
        let format = NumberFormat::new(".", ",");
        let range = NumberRange::new(Some("1.000,5"), Some("2.000"));
        assert_eq!(
            range.normalize(Some(&format)).unwrap(),
            Some(NumberPredicate::Between(
                NumberBound::Float(1000.5),
                NumberBound::Float(2000.0)
            ))
        );

        let range = NumberRange::new(Some("low"), Some("2.000"));
        assert_eq!(
            range.normalize(Some(&format)).unwrap(),
            Some(NumberPredicate::Between(
                NumberBound::Text("low".into()),
                NumberBound::Float(2000.0)
            ))
        );
    }

    #[test]
    fn test_blank_bounds_are_absent() {
        let range = NumberRange::new(Some(" "), Some(""));
        assert_eq!(range.normalize(None).unwrap(), None);
        assert!(NumberRange::new(Some("abc"), None)
            .normalize(Some(&NumberFormat::new(",", ".")))
            .is_err());
    }
}
