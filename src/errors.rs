//! # Error Handling
//!
//! Every fallible operation in this crate returns [`GridError`]. Filter input that
//! cannot be compiled (a value of the wrong shape, an unparsable date, an unknown
//! filter kind) is reported as a client error; misconfiguration and database
//! failures are reported as internal errors whose details are logged through
//! `tracing` and never sent to the client.
//!
//! Decisions that merely add no predicate (an unknown text operator, a column that
//! is not in the live schema, an empty multi-select) are not errors.
//!
//! ```rust,ignore
//! async fn grid(State(db): State<DatabaseConnection>, Query(req): Query<GridRequest>)
//!     -> Result<Json<Vec<users::Model>>, GridError>
//! {
//!     let filters = req.filter_state()?;
//!     let rows = UserGrid::fetch_all(&db, &filters, req.search()).await?;
//!     Ok(Json(rows))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

use crate::filtering::FilterKind;

#[derive(Debug)]
pub enum GridError {
    /// 400 - a filter value does not fit the shape its kind requires
    InvalidFilter {
        kind: FilterKind,
        field: String,
        message: String,
    },

    /// 400 - the filter state names a kind this crate does not compile
    UnknownFilterKind(String),

    /// 400 - a persisted grid state could not be decoded
    InvalidState(String),

    /// 500 - a relation search names a relation missing from the registry
    UnknownRelation(String),

    /// 500 - a sea-orm relation that cannot be expressed as a single-column link
    UnsupportedRelation(String),

    /// 500 - propagated unchanged from the database layer
    Database(DbErr),
}

impl GridError {
    pub fn invalid_filter(
        kind: FilterKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidFilter {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFilter { .. } | Self::UnknownFilterKind(_) | Self::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownRelation(_) | Self::UnsupportedRelation(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the user of the grid
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFilter {
                kind,
                field,
                message,
            } => format!("Invalid {kind} filter on '{field}': {message}"),
            Self::UnknownFilterKind(kind) => format!("Unknown filter kind '{kind}'"),
            Self::InvalidState(_) => "Stored grid state could not be restored".to_string(),
            Self::UnknownRelation(_) | Self::UnsupportedRelation(_) => {
                "The grid is misconfigured".to_string()
            }
            Self::Database(_) => "A database error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database(err) => {
                tracing::error!(error = ?err, "Database error while building grid query");
            }
            Self::UnknownRelation(path) => {
                tracing::error!(relation = %path, "Relation search names an unregistered relation");
            }
            Self::UnsupportedRelation(details) => {
                tracing::error!(details = %details, "Relation cannot be used for grid search");
            }
            Self::InvalidState(details) => {
                tracing::debug!(details = %details, "Discarding undecodable grid state");
            }
            _ => {
                tracing::debug!(error = %self.user_message(), "Grid request rejected");
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState(details) => write!(f, "invalid grid state: {details}"),
            Self::UnknownRelation(path) => write!(f, "unknown relation '{path}'"),
            Self::UnsupportedRelation(details) => write!(f, "unsupported relation: {details}"),
            Self::Database(err) => write!(f, "database error: {err}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for GridError {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}
