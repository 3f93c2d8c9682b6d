#![allow(dead_code)]

use chrono::Utc;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::TempDir;

use teamcrm::db::{DbPool, establish_connection_pool};
use teamcrm::models::config::DatabaseSettings;
use teamcrm::domain::auth::AuthenticatedUser;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// A migrated SQLite database living in its own temporary directory.
///
/// The directory, and with it the database and its WAL files, is removed
/// when the value is dropped.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(name);
        let pool = establish_connection_pool(&path.to_string_lossy(), &DatabaseSettings::default())
            .expect("create pool");

        let mut conn = pool.get().expect("get connection");
        run_migrations(&mut conn);

        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

fn run_migrations(conn: &mut SqliteConnection) {
    conn.run_pending_migrations(MIGRATIONS)
        .expect("run migrations");
}

/// Claims of a caller in team `hub_id` holding `roles`.
pub fn user(hub_id: i32, email: &str, roles: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        sub: email.to_string(),
        email: email.to_string(),
        hub_id,
        name: email.split('@').next().unwrap_or(email).to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    }
}

pub fn admin(hub_id: i32) -> AuthenticatedUser {
    user(hub_id, "admin@example.com", &["crm", "crm_admin"])
}
