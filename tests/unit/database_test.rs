//! Unit tests for the database layer: migrations and schema constraints.

use rusqlite::params;
use smartmarks::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use smartmarks::database::Database;
use tempfile::TempDir;

fn table_names(db: &Database) -> Vec<String> {
    let conn = db.connection();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
    let names: Vec<String> = rows.map(|r| r.unwrap()).collect();
    names
}

#[test]
fn test_in_memory_database_has_all_tables() {
    let db = Database::open_in_memory().unwrap();
    let tables = table_names(&db);
    for expected in [
        "auth_codes",
        "bookmark_versions",
        "bookmarks",
        "schema_version",
        "sessions",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(get_schema_version(&db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    run_all(&conn).unwrap();
    run_all(&conn).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, CURRENT_SCHEMA_VERSION as i64);
}

#[test]
fn test_file_database_persists_across_opens() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("smartmarks.db");
    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO users (id, email, full_name, created_at) VALUES ('u1', 'a@b.c', NULL, 0)",
                [],
            )
            .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let email: String = db
        .connection()
        .query_row("SELECT email FROM users WHERE id = 'u1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(email, "a@b.c");
}

#[test]
fn test_bookmark_requires_existing_user() {
    let db = Database::open_in_memory().unwrap();
    let result = db.connection().execute(
        "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params!["b1", "Title", "https://x.example", "ghost", 1],
    );
    assert!(result.is_err(), "foreign key to users must be enforced");
}

#[test]
fn test_bookmark_rejects_empty_title() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    conn.execute(
        "INSERT INTO users (id, email, full_name, created_at) VALUES ('u1', 'a@b.c', NULL, 0)",
        [],
    )
    .unwrap();
    let result = conn.execute(
        "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES ('b1', '', 'https://x', 'u1', 1)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn test_bookmark_writes_bump_owner_version() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    conn.execute_batch(
        "INSERT INTO users (id, email, full_name, created_at) VALUES ('u1', 'a@b.c', NULL, 0);
         INSERT INTO users (id, email, full_name, created_at) VALUES ('u2', 'd@e.f', NULL, 0);",
    )
    .unwrap();
    let version = |user: &str| -> i64 {
        conn.query_row(
            "SELECT COALESCE((SELECT version FROM bookmark_versions WHERE user_id = ?1), 0)",
            params![user],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(version("u1"), 0);

    conn.execute(
        "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES ('b1', 'T', 'https://x', 'u1', 1)",
        [],
    )
    .unwrap();
    assert_eq!(version("u1"), 1);

    conn.execute("DELETE FROM bookmarks WHERE id = 'b1'", []).unwrap();
    assert_eq!(version("u1"), 2);
    assert_eq!(version("u2"), 0, "other users are unaffected");
}
