use rusqlite::Connection;
use tablefire_core::db::migrations::latest_version;
use tablefire_core::db::{open_db, open_db_in_memory, DbError};

const EXPECTED_TABLES: [&str; 10] = [
    "staff",
    "sessions",
    "dining_tables",
    "menu_items",
    "orders",
    "order_items",
    "invoices",
    "notifications",
    "audit_log",
    "change_log",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in EXPECTED_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tablefire.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "orders");
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
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO orders (id, table_id, server_id, status)
         VALUES ('o-1', 'missing-table', 'missing-staff', 'pending');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn only_one_open_order_per_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO staff (id, email, full_name, role, password_salt, password_digest)
             VALUES ('s-1', 'a@b.c', 'A', 'server', 'salt', 'digest');
         INSERT INTO dining_tables (id, table_number) VALUES ('t-1', 1);
         INSERT INTO orders (id, table_id, server_id, status)
             VALUES ('o-1', 't-1', 's-1', 'billed');
         INSERT INTO orders (id, table_id, server_id, status)
             VALUES ('o-2', 't-1', 's-1', 'pending');",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO orders (id, table_id, server_id, status)
         VALUES ('o-3', 't-1', 's-1', 'in_progress');",
        [],
    );
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
