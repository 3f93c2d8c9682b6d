use diesel::prelude::*;
use diesel::sql_types::BigInt;

use teamcrm::db::establish_connection_pool;
use teamcrm::models::config::DatabaseSettings;

mod common;

#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = BigInt)]
    timeout: i64,
}

#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = BigInt)]
    foreign_keys: i64,
}

#[test]
fn test_pool_connects_to_migrated_database() {
    let test_db = common::TestDb::new("test_db_connect.db");
    assert!(test_db.pool().get().is_ok());
}

#[test]
fn test_pool_applies_configured_pragmas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_db_pragmas.db");
    let settings = DatabaseSettings {
        max_connections: 2,
        busy_timeout_ms: 1_234,
        write_ahead_log: false,
    };

    let pool = establish_connection_pool(&path.to_string_lossy(), &settings).unwrap();
    assert_eq!(pool.max_size(), 2);

    let mut conn = pool.get().unwrap();
    let busy = diesel::sql_query("PRAGMA busy_timeout")
        .get_result::<BusyTimeout>(&mut conn)
        .unwrap();
    assert_eq!(busy.timeout, 1_234);

    let fk = diesel::sql_query("PRAGMA foreign_keys")
        .get_result::<ForeignKeys>(&mut conn)
        .unwrap();
    assert_eq!(fk.foreign_keys, 1);
}
