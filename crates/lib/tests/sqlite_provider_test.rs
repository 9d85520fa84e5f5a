//! # SQLite Provider Tests
//!
//! These tests exercise the `Storage` contract through `SqliteProvider`: query
//! results come back as a column-labelled frame, and database errors reach the
//! caller unchanged. Each test uses its own in-memory database.

mod common;

use crate::common::setup_tracing;
use serde_json::json;
use sqlchat::providers::db::{sqlite::SqliteProvider, storage::Storage};
use sqlchat::ChatError;

#[tokio::test]
async fn test_query_returns_labelled_frame() {
    setup_tracing();

    let provider = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create SqliteProvider");
    provider
        .initialize_with_data(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL);
             INSERT INTO users (id, name, score) VALUES (1, 'Alice', 9.5);
             INSERT INTO users (id, name, score) VALUES (2, 'Bob', NULL);",
        )
        .await
        .expect("Failed to initialize database with test data");

    let df = provider
        .run_sql("SELECT id, name, score FROM users ORDER BY id ASC")
        .await
        .expect("Failed to execute query");

    assert_eq!(df.columns, vec!["id", "name", "score"]);
    assert_eq!(
        df.rows,
        vec![
            vec![json!(1), json!("Alice"), json!(9.5)],
            vec![json!(2), json!("Bob"), json!(null)],
        ]
    );
    assert_eq!(df.numeric_columns(), vec![0, 2]);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    setup_tracing();

    let provider = SqliteProvider::new(":memory:").await.unwrap();
    provider
        .initialize_with_data("CREATE TABLE t (a INTEGER, b TEXT);")
        .await
        .unwrap();

    let df = provider.run_sql("SELECT a, b FROM t").await.unwrap();
    assert!(df.is_empty());
    assert_eq!(df.columns, vec!["a", "b"]);
}

/// Verifies that each in-memory provider instance is isolated, and that the
/// database error is propagated rather than swallowed.
#[tokio::test]
async fn test_missing_table_error_propagates() {
    setup_tracing();

    let provider1 = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create provider 1");
    provider1
        .initialize_with_data("CREATE TABLE t1 (id INTEGER); INSERT INTO t1 (id) VALUES (1);")
        .await
        .expect("Failed to initialize provider 1");

    let provider2 = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create provider 2");

    let result = provider2.run_sql("SELECT * FROM t1").await;
    match result {
        Err(ChatError::StorageQueryFailed(msg)) => {
            assert!(
                msg.contains("no such table: t1"),
                "Expected 'no such table' error, but got: {msg}"
            );
        }
        other => panic!("Expected StorageQueryFailed, but got {other:?}"),
    }
}

#[tokio::test]
async fn test_clones_share_the_database() {
    setup_tracing();

    let provider = SqliteProvider::new(":memory:").await.unwrap();
    let clone = provider.clone();
    provider
        .initialize_with_data("CREATE TABLE shared (v TEXT); INSERT INTO shared VALUES ('x');")
        .await
        .unwrap();

    let df = clone.run_sql("SELECT v FROM shared").await.unwrap();
    assert_eq!(df.rows, vec![vec![json!("x")]]);
}
