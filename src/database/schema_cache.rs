/*!
# Schema Column Cache

Live column lists per table, used by auto-search to skip columns the table does
not have. Entries expire after a fixed window (ten minutes by default); there is
no other invalidation.
*/

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::trace;

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

static GLOBAL_CACHE: LazyLock<SchemaColumnCache> = LazyLock::new(SchemaColumnCache::new);

/// Anything that can list a table's columns.
#[async_trait]
pub trait ColumnSource: Send + Sync {
    /// # Errors
    ///
    /// Propagates the underlying database error.
    async fn list_columns(&self, table: &str) -> Result<Vec<String>, DbErr>;
}

/// Quote SQL identifier (double quotes for Postgres/SQLite, backticks for MySQL)
fn quote_identifier(identifier: &str, backend: DatabaseBackend) -> String {
    match backend {
        DatabaseBackend::MySql => format!("`{}`", identifier.replace('`', "``")),
        DatabaseBackend::Postgres | DatabaseBackend::Sqlite => {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }
}

#[async_trait]
impl ColumnSource for DatabaseConnection {
    async fn list_columns(&self, table: &str) -> Result<Vec<String>, DbErr> {
        let backend = self.get_database_backend();
        let (statement, name_column) = match backend {
            DatabaseBackend::Postgres => (
                Statement::from_sql_and_values(
                    backend,
                    r"
                    SELECT column_name
                    FROM information_schema.columns
                    WHERE table_name = $1
                    AND table_schema = current_schema()
                    ORDER BY ordinal_position
                    ",
                    [table.into()],
                ),
                "column_name",
            ),
            DatabaseBackend::MySql => (
                Statement::from_sql_and_values(
                    backend,
                    r"
                    SELECT COLUMN_NAME AS column_name
                    FROM information_schema.columns
                    WHERE TABLE_NAME = ?
                    AND TABLE_SCHEMA = DATABASE()
                    ORDER BY ORDINAL_POSITION
                    ",
                    [table.into()],
                ),
                "column_name",
            ),
            DatabaseBackend::Sqlite => (
                // PRAGMA takes no bind parameters
                Statement::from_string(
                    backend,
                    format!("PRAGMA table_info({})", quote_identifier(table, backend)),
                ),
                "name",
            ),
        };

        let rows = self.query_all(statement).await?;
        rows.iter()
            .map(|row| row.try_get::<String>("", name_column))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CachedColumns {
    columns: Arc<[String]>,
    fetched_at: Instant,
}

/// TTL cache of table column lists, shared across requests.
///
/// Two requests populating the same table at once both hit the source; the
/// later write wins.
#[derive(Debug)]
pub struct SchemaColumnCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedColumns>>,
}

impl Default for SchemaColumnCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaColumnCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide cache with the default TTL.
    pub fn global() -> &'static Self {
        &GLOBAL_CACHE
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached columns of `table` if the entry is younger than the TTL.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<Arc<[String]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(table)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.columns))
    }

    pub fn insert(&self, table: impl Into<String>, columns: Vec<String>) -> Arc<[String]> {
        let columns: Arc<[String]> = columns.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            table.into(),
            CachedColumns {
                columns: Arc::clone(&columns),
                fetched_at: Instant::now(),
            },
        );
        columns
    }

    /// Cached columns of `table`, asking `source` when missing or expired.
    ///
    /// # Errors
    ///
    /// Propagates errors from the source; nothing is cached in that case.
    pub async fn get_or_populate(
        &self,
        table: &str,
        source: &dyn ColumnSource,
    ) -> Result<Arc<[String]>, DbErr> {
        if let Some(columns) = self.get(table) {
            trace!(table, "schema cache hit");
            return Ok(columns);
        }

        let columns = source.list_columns(table).await?;
        trace!(table, count = columns.len(), "schema cache populated");
        Ok(self.insert(table, columns))
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
