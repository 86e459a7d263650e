//! Grid UI state persistence.
//!
//! Column visibility, filters and the search term can survive page loads in a
//! cookie named `pg:<table>`. Which parts are kept is chosen per grid; the part
//! that just changed is always written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::errors::GridError;
use crate::filtering::FilterState;
use crate::models::ColumnDefinition;

const COOKIE_PREFIX: &str = "pg:";
const COOKIE_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistItem {
    Columns,
    Filters,
    Search,
}

/// Label and state of a filter shown in the grid's filter bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledFilter {
    pub label: String,
    pub disabled: bool,
}

/// The live state of one grid, as persisted and restored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSnapshot {
    pub columns: Vec<ColumnDefinition>,
    pub filters: FilterState,
    /// Filters applied by the caller, kept opaque
    pub filters_handled_externally: Value,
    pub enabled_filters: BTreeMap<String, EnabledFilter>,
    pub search: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedState {
    columns: Option<BTreeMap<String, bool>>,
    filters: Option<Value>,
    filters_handled_externally: Option<Value>,
    enabled_filters: Option<BTreeMap<String, EnabledFilter>>,
    search: Option<String>,
}

/// Cookie to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePersistence {
    table_name: String,
    items: BTreeSet<PersistItem>,
}

impl StatePersistence {
    pub fn new(table_name: impl Into<String>, items: impl IntoIterator<Item = PersistItem>) -> Self {
        Self {
            table_name: table_name.into(),
            items: items.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> String {
        format!("{COOKIE_PREFIX}{}", self.table_name)
    }

    #[must_use]
    pub fn persists(&self, item: PersistItem) -> bool {
        self.items.contains(&item)
    }

    /// Cookie holding the persisted parts of `snapshot`, plus `changed`.
    /// `None` when this grid persists nothing.
    #[must_use]
    pub fn capture(&self, snapshot: &GridSnapshot, changed: Option<PersistItem>) -> Option<PersistedCookie> {
        if self.items.is_empty() {
            return None;
        }
        let wanted = |item| self.persists(item) || changed == Some(item);

        let mut state = Map::new();
        if wanted(PersistItem::Columns) {
            let columns: Map<String, Value> = snapshot
                .columns
                .iter()
                .map(|column| (column.field.clone(), Value::Bool(column.hidden)))
                .collect();
            state.insert("columns".to_string(), Value::Object(columns));
        }
        if wanted(PersistItem::Filters) {
            let enabled: Map<String, Value> = snapshot
                .enabled_filters
                .iter()
                .map(|(field, filter)| {
                    (field.clone(), json!({"label": filter.label, "disabled": filter.disabled}))
                })
                .collect();
            state.insert("filters".to_string(), snapshot.filters.to_json());
            state.insert(
                "filtersHandledExternally".to_string(),
                snapshot.filters_handled_externally.clone(),
            );
            state.insert("enabledFilters".to_string(), Value::Object(enabled));
        }
        if wanted(PersistItem::Search) {
            state.insert("search".to_string(), Value::String(snapshot.search.clone()));
        }

        Some(PersistedCookie {
            name: self.cookie_name(),
            value: Value::Object(state).to_string(),
            max_age: COOKIE_MAX_AGE,
        })
    }

    /// Apply a persisted cookie to `snapshot`. Absent cookies and unpersisted
    /// parts leave it unchanged; `force_hidden` columns never change visibility.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidState`] for a cookie that is not a persisted state, or
    /// any error decoding its filters.
    pub fn restore(&self, cookie: Option<&str>, snapshot: &mut GridSnapshot) -> Result<(), GridError> {
        if self.items.is_empty() {
            return Ok(());
        }
        let Some(cookie) = cookie else {
            return Ok(());
        };
        let state: PersistedState = serde_json::from_str(cookie)
            .map_err(|e| GridError::InvalidState(format!("persisted grid state is malformed: {e}")))?;

        if let (true, Some(hidden)) = (self.persists(PersistItem::Columns), &state.columns) {
            for column in snapshot.columns.iter_mut().filter(|c| !c.force_hidden) {
                if let Some(&flag) = hidden.get(&column.field) {
                    column.hidden = flag;
                }
            }
        }

        if self.persists(PersistItem::Filters)
            && (state.filters.is_some() || state.filters_handled_externally.is_some())
        {
            snapshot.filters = FilterState::from_json(state.filters.as_ref().unwrap_or(&Value::Null))?;
            snapshot.filters_handled_externally = state.filters_handled_externally.unwrap_or(Value::Null);
            snapshot.enabled_filters = state.enabled_filters.unwrap_or_default();
        }

        if let (true, Some(search)) = (self.persists(PersistItem::Search), state.search) {
            snapshot.search = search;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::Filter;

    fn snapshot() -> GridSnapshot {
        GridSnapshot {
            columns: vec![
                ColumnDefinition::new("Name", "name"),
                ColumnDefinition::new("Email", "email").hidden(),
                ColumnDefinition::new("Secret", "secret").force_hidden(),
            ],
            filters: FilterState::new().with(Filter::boolean("active", "true")),
            filters_handled_externally: Value::Null,
            enabled_filters: BTreeMap::from([(
                "active".to_string(),
                EnabledFilter { label: "Active".to_string(), disabled: false },
            )]),
            search: "ann".to_string(),
        }
    }

    #[test]
    fn test_nothing_persisted_means_no_cookie() {
        let persistence = StatePersistence::new("users", std::iter::empty());
        assert!(persistence.capture(&snapshot(), Some(PersistItem::Search)).is_none());
    }

    #[test]
    fn test_capture_persisted_items_and_changed_item() {
        let persistence = StatePersistence::new("users", [PersistItem::Columns]);
        let cookie = persistence.capture(&snapshot(), Some(PersistItem::Search)).unwrap();

        assert_eq!(cookie.name, "pg:users");
        assert_eq!(cookie.max_age, Duration::from_secs(31_536_000));
        let value: Value = serde_json::from_str(&cookie.value).unwrap();
        assert_eq!(value["columns"], json!({"name": false, "email": true, "secret": true}));
        assert_eq!(value["search"], json!("ann"));
        assert!(value.get("filters").is_none());
    }

    #[test]
    fn test_restore_round_trip() {
        let persistence =
            StatePersistence::new("users", [PersistItem::Columns, PersistItem::Filters, PersistItem::Search]);
        let cookie = persistence.capture(&snapshot(), None).unwrap();

        let mut restored = GridSnapshot {
            columns: vec![
                ColumnDefinition::new("Name", "name").hidden(),
                ColumnDefinition::new("Email", "email"),
                ColumnDefinition::new("Secret", "secret").force_hidden(),
            ],
            ..GridSnapshot::default()
        };
        persistence.restore(Some(&cookie.value), &mut restored).unwrap();

        assert!(!restored.columns[0].hidden);
        assert!(restored.columns[1].hidden);
        assert_eq!(restored.filters, snapshot().filters);
        assert_eq!(restored.enabled_filters, snapshot().enabled_filters);
        assert_eq!(restored.search, "ann");
    }

    #[test]
    fn test_force_hidden_is_never_restored() {
        let persistence = StatePersistence::new("users", [PersistItem::Columns]);
        let mut state = snapshot();
        persistence
            .restore(Some(r#"{"columns": {"secret": false, "email": false}}"#), &mut state)
            .unwrap();

        assert!(state.columns[2].hidden);
        assert!(!state.columns[1].hidden);
    }

    #[test]
    fn test_restore_skips_unpersisted_items() {
        let persistence = StatePersistence::new("users", [PersistItem::Columns]);
        let mut state = snapshot();
        persistence
            .restore(Some(r#"{"search": "bob", "filters": {}}"#), &mut state)
            .unwrap();

        assert_eq!(state.search, "ann");
        assert!(!state.filters.is_empty());

        persistence.restore(None, &mut state).unwrap();
        assert_eq!(state, snapshot());
    }

    #[test]
    fn test_malformed_cookie() {
        let persistence = StatePersistence::new("users", [PersistItem::Search]);
        let mut state = snapshot();
        assert!(matches!(
            persistence.restore(Some("not json"), &mut state),
            Err(GridError::InvalidState(_))
        ));
    }
}
