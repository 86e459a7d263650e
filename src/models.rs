use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::errors::GridError;
use crate::filtering::FilterState;

/// One displayable, filterable grid column.
///
/// `field` may be dotted (`orders.status`) to point at a related table. When
/// `data_field` is set it takes precedence over `field` for search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDefinition {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub searchable: bool,
    /// Search for this column is done by the caller; auto-search skips it
    pub handled_externally: bool,
    /// Trusted SQL expression matched against the search term in addition to the column.
    /// It is embedded verbatim and must never carry user input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_raw: Option<String>,
    pub sortable: bool,
    pub hidden: bool,
    /// Hidden regardless of persisted state
    pub force_hidden: bool,
}

impl ColumnDefinition {
    #[must_use]
    pub fn new(title: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn data_field(mut self, data_field: impl Into<String>) -> Self {
        self.data_field = Some(data_field.into());
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    #[must_use]
    pub fn handled_externally(mut self) -> Self {
        self.handled_externally = true;
        self
    }

    #[must_use]
    pub fn searchable_raw(mut self, sql: impl Into<String>) -> Self {
        self.searchable = true;
        self.searchable_raw = Some(sql.into());
        self
    }

    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn force_hidden(mut self) -> Self {
        self.hidden = true;
        self.force_hidden = true;
        self
    }

    /// Field used by search and sort: `data_field` when set and non-blank, else `field`.
    #[must_use]
    pub fn search_field(&self) -> &str {
        self.data_field
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.field)
    }
}

/// Query parameters for searching, filtering and sorting a grid.
///
/// # Filtering
/// The `filters` parameter is a JSON object keyed by filter kind and field:
/// ```json
/// {"boolean": {"active": "true"}, "input_text": {"email": "example.com"}, "input_text_options": {"email": "ends_with"}}
/// ```
///
/// # Sorting
/// `sort` names a sortable column, `order` is `asc` or `desc`.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct GridRequest {
    /// Free-text search across all searchable columns.
    #[param(example = "shipped")]
    pub search: Option<String>,
    /// JSON-encoded filter state.
    #[param(example = json!({
        "multi_select": {"status": ["paid", "shipped"]},
        "number": {"score": {"start": "10"}}
    }))]
    pub filters: Option<String>,
    /// Column to sort by.
    #[param(example = "created_at")]
    pub sort: Option<String>,
    /// Sort direction, `asc` or `desc`.
    #[param(example = "desc")]
    pub order: Option<String>,
}

impl GridRequest {
    /// Parse the `filters` parameter. Missing or blank means no filters.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidState`] when the parameter is not JSON, or any error
    /// from [`FilterState::from_json`].
    pub fn filter_state(&self) -> Result<FilterState, GridError> {
        match self.filters.as_deref().map(str::trim) {
            None | Some("") => Ok(FilterState::new()),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| GridError::InvalidState(format!("filters are not valid JSON: {e}")))?;
                FilterState::from_json(&value)
            }
        }
    }

    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
