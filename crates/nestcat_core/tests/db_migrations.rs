use nestcat_core::db::migrations::latest_version;
use nestcat_core::db::{open_db, open_db_in_memory, open_db_with_config, DbError};
use nestcat_core::{CoreConfig, SqliteTreeStore, TreeStore, ROOT_CATEGORY_ID};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "documents");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn first_migration_seeds_single_root_category() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTreeStore::try_new(&conn).unwrap();

    let root = store.get(ROOT_CATEGORY_ID).unwrap().unwrap();
    assert_eq!(root.parent_id, None);
    assert_eq!((root.lft, root.rgt, root.depth), (1, 2, 0));
    assert_eq!((root.children_count, root.amount), (0, 0));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nestcat.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let roots: i64 = conn_second
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_id IS NULL;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(roots, 1);
}

#[test]
fn open_db_with_config_uses_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = CoreConfig {
        db_path: Some(path.clone()),
        busy_timeout_ms: 100,
        ..CoreConfig::default()
    };

    let conn = open_db_with_config(&config).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_database_without_root_category_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rootless.db");

    let conn = open_db(&path).unwrap();
    conn.execute("DELETE FROM categories WHERE id = ?1;", [ROOT_CATEGORY_ID])
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::MissingRootCategory));
    assert!(err.to_string().contains("no root row"));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing table {table_name}");
}
