//! # Orchestrator Cache Tests
//!
//! These tests drive the `Orchestrator` with mock adapters and a paused Tokio
//! clock. They verify that one assistant is shared per expiry window, that results
//! are keyed by their arguments, and that failures are never cached.

mod common;

use crate::common::{sales_frame, setup_tracing, CountingFactory, MockAiProvider};
use sqlchat::{CachePolicy, CacheSettings, ChatError, Orchestrator, TrainingPlanItemKind};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(factory: &CountingFactory) -> Orchestrator {
    Orchestrator::new(Arc::new(factory.clone()), CacheSettings::default())
}

#[tokio::test(start_paused = true)]
async fn test_assistant_is_shared_within_the_hour() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);

    let first = orchestrator.setup_assistant().await.unwrap();
    let second = orchestrator.setup_assistant().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    tokio::time::advance(Duration::from_secs(59 * 60)).await;
    let third = orchestrator.setup_assistant().await.unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(factory.builds(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_assistant_is_rebuilt_after_expiry() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);

    let first = orchestrator.setup_assistant().await.unwrap();
    tokio::time::advance(Duration::from_secs(60 * 60 + 1)).await;
    let second = orchestrator.setup_assistant().await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(factory.builds(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_setup_builds_once() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);

    let (a, b) = tokio::join!(orchestrator.setup_assistant(), orchestrator.setup_assistant());
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(factory.builds(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_generate_sql_is_cached_per_question() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "SELECT COUNT(*) FROM sales;".to_string(),
        "SELECT region FROM sales;".to_string(),
    ]);
    let factory = CountingFactory::new(ai.clone());
    let orchestrator = orchestrator(&factory);

    let first = orchestrator.generate_sql("How many sales?").await.unwrap();
    let again = orchestrator.generate_sql("How many sales?").await.unwrap();
    assert_eq!(first, "SELECT COUNT(*) FROM sales;");
    assert_eq!(first, again);
    assert_eq!(ai.calls().len(), 1);

    let other = orchestrator.generate_sql("Which regions?").await.unwrap();
    assert_eq!(other, "SELECT region FROM sales;");
    assert_eq!(ai.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_results_survive_assistant_rebuild() {
    setup_tracing();
    let ai = MockAiProvider::new(vec!["A short summary.".to_string()]);
    let factory = CountingFactory::new(ai.clone());
    let orchestrator = orchestrator(&factory);
    let df = sales_frame();

    orchestrator.generate_summary("Totals?", &df).await.unwrap();
    tokio::time::advance(Duration::from_secs(2 * 60 * 60)).await;
    let summary = orchestrator.generate_summary("Totals?", &df).await.unwrap();

    assert_eq!(summary, "A short summary.");
    assert_eq!(ai.calls().len(), 1);
    assert_eq!(factory.builds(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_ttl_policy_expires_entries() {
    setup_tracing();
    let ai = MockAiProvider::new(vec!["first".to_string(), "second".to_string()]);
    let factory = CountingFactory::new(ai.clone());
    let orchestrator = Orchestrator::new(
        Arc::new(factory.clone()),
        CacheSettings {
            assistant_ttl: Duration::from_secs(3600),
            result_policy: CachePolicy::ttl(Duration::from_secs(60)),
        },
    );
    let df = sales_frame();

    assert_eq!(orchestrator.generate_summary("q", &df).await.unwrap(), "first");
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(orchestrator.generate_summary("q", &df).await.unwrap(), "second");
}

#[tokio::test(start_paused = true)]
async fn test_frame_argument_is_part_of_the_key() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);

    let df = sales_frame();
    let single = df.head(1);

    assert!(orchestrator.should_generate_chart("q", "sql", &df).await.unwrap());
    assert!(!orchestrator
        .should_generate_chart("q", "sql", &single)
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_failed_calls_are_not_cached() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);
    let sql = "SELECT * FROM missing_table;";

    for _ in 0..2 {
        match orchestrator.run_sql(sql).await {
            Err(ChatError::StorageQueryFailed(msg)) => assert!(msg.contains("missing_table")),
            other => panic!("expected StorageQueryFailed, got {other:?}"),
        }
    }

    let attempts = factory
        .storage
        .executed()
        .into_iter()
        .filter(|executed| executed == sql)
        .count();
    assert_eq!(attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_forces_recomputation() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "1. Which region sold most?".to_string(),
        "1. Which region sold least?".to_string(),
    ]);
    let factory = CountingFactory::new(ai.clone());
    let orchestrator = orchestrator(&factory);
    let df = sales_frame();

    let before = orchestrator.generate_followup("q", "sql", &df).await.unwrap();
    orchestrator.clear_cache().await;
    let after = orchestrator.generate_followup("q", "sql", &df).await.unwrap();

    assert_eq!(before, vec!["Which region sold most?"]);
    assert_eq!(after, vec!["Which region sold least?"]);
    assert_eq!(ai.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_training_plan_is_pending_until_applied() {
    setup_tracing();
    let factory = CountingFactory::new(MockAiProvider::new(vec![]));
    let orchestrator = orchestrator(&factory);

    let plan = orchestrator
        .pending_plan()
        .await
        .unwrap()
        .expect("setup should compute a plan");
    assert_eq!(plan.len(), 2);
    assert!(plan
        .items
        .iter()
        .all(|item| item.kind == TrainingPlanItemKind::InformationSchema));
    assert!(factory.store.added().is_empty());

    let ids = orchestrator.train_pending_plan().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(factory.store.added().len(), 2);
    assert!(orchestrator.pending_plan().await.unwrap().is_none());

    let again = orchestrator.train_pending_plan().await.unwrap();
    assert!(again.is_empty());
}
