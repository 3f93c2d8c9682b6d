//! SQLite connection pool.
//!
//! Every connection handed out by the pool has the pragmas from
//! [`DatabaseSettings`] applied when it is acquired.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::models::config::DatabaseSettings;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Pragmas run on each freshly acquired connection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SqlitePragmas {
    write_ahead_log: bool,
    busy_timeout: Duration,
}

impl SqlitePragmas {
    fn from_settings(settings: &DatabaseSettings) -> Self {
        Self {
            write_ahead_log: settings.write_ahead_log,
            busy_timeout: Duration::from_millis(settings.busy_timeout_ms),
        }
    }

    /// Foreign keys are always enforced; soft deletes and merges rely on them.
    fn batch(&self) -> String {
        let mut sql = String::from("PRAGMA foreign_keys = ON;");
        if self.write_ahead_log {
            sql.push_str(" PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;");
        }
        sql.push_str(&format!(
            " PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ));
        sql
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&self.batch())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build the pool for `database_url`, sized and tuned by `settings`.
pub fn establish_connection_pool(
    database_url: &str,
    settings: &DatabaseSettings,
) -> Result<DbPool, PoolError> {
    log::debug!(
        "Opening SQLite pool at {database_url} with {} connections",
        settings.max_connections
    );
    Pool::builder()
        .max_size(settings.max_connections.max(1))
        .connection_customizer(Box::new(SqlitePragmas::from_settings(settings)))
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection, PoolError> {
    pool.get()
        .inspect_err(|err| log::error!("No database connection available: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragmas_follow_settings() {
        let settings = DatabaseSettings {
            max_connections: 4,
            busy_timeout_ms: 1_500,
            write_ahead_log: false,
        };

        let batch = SqlitePragmas::from_settings(&settings).batch();

        assert!(batch.contains("foreign_keys = ON"));
        assert!(batch.contains("busy_timeout = 1500"));
        assert!(!batch.contains("journal_mode"));
    }

    #[test]
    fn wal_is_on_by_default() {
        let batch = SqlitePragmas::from_settings(&DatabaseSettings::default()).batch();

        assert!(batch.contains("journal_mode = WAL"));
        assert!(batch.contains("busy_timeout = 30000"));
    }
}
