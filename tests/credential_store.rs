//! Credential store behaviour against a real SQLite file.
//!
//! Each test gets its own temporary database so runs are independent.

use std::sync::Arc;

use gateway::store::{ExportOutcome, SqliteStore, StoreError, TokenStore};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&dir.path().join("tokens.db"))
        .await
        .expect("store should open")
}

#[tokio::test]
async fn test_issue_then_validate_for_many_pairs() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let pairs = [("alice", "notebook"), ("alice", "ci"), ("bob", "notebook"), ("carol", "agent")];
    for (user, api_name) in pairs {
        let token = store.issue(user, api_name, None).await.unwrap();
        assert!(store.validate(&token).await.unwrap(), "{}/{} should validate", user, api_name);
        assert_eq!(store.resolve_owner(&token).await.unwrap().as_deref(), Some(user));
    }
    assert_eq!(store.list().await.unwrap().len(), pairs.len());
}

#[tokio::test]
async fn test_concurrent_issue_same_pair_has_one_winner() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir).await);

    let (a, b) = tokio::join!(
        {
            let store = store.clone();
            async move { store.issue("alice", "notebook", None).await }
        },
        {
            let store = store.clone();
            async move { store.issue("alice", "notebook", None).await }
        }
    );

    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(StoreError::DuplicateCredential { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_issue_across_tasks() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir).await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.issue("dave", "shared", None).await
        }));
    }

    let mut successes = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => successes += 1,
            Err(StoreError::DuplicateCredential { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_missing_does_not_change_count() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.issue("alice", "notebook", None).await.unwrap();

    let err = store.revoke("bob", "notebook").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let token = {
        let store = open_store(&dir).await;
        store.issue("alice", "notebook", None).await.unwrap()
    };

    let reopened = open_store(&dir).await;
    assert!(reopened.validate(&token).await.unwrap());
    assert_eq!(reopened.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_round_trip_matches_list() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.issue("alice", "notebook", None).await.unwrap();
    store.issue("bob", "ci", None).await.unwrap();
    store
        .issue("carol", "agent", Some("2031-06-01T00:00:00Z".parse().unwrap()))
        .await
        .unwrap();

    let dest = dir.path().join("export.csv");
    let outcome = store.export(&dest).await.unwrap();
    assert_eq!(outcome, ExportOutcome::Written(3));

    let text = std::fs::read_to_string(&dest).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("User ID,User,API KEY Name,Created At,Expires At")
    );

    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
    let listed = store.list().await.unwrap();
    assert_eq!(rows.len(), listed.len());

    for row in &rows {
        assert_eq!(row.len(), 5);
        assert!(listed
            .iter()
            .any(|r| r.user_id == row[0] && r.user == row[1] && r.api_name == row[2]));
    }
    assert_eq!(rows[0][4], "");
    assert!(rows[2][4].starts_with("2031-06-01T00:00:00"));

    for r in &listed {
        assert!(!text.contains(&r.token), "secrets must not be exported");
    }
}

#[tokio::test]
async fn test_export_with_no_users_is_reported_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let dest = dir.path().join("empty.csv");
    let outcome = store.export(&dest).await.unwrap();
    assert_eq!(outcome, ExportOutcome::Empty);
    assert_eq!(outcome.rows(), 0);

    let text = std::fs::read_to_string(&dest).unwrap();
    assert_eq!(text.lines().count(), 1);
}
