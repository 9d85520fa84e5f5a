//! # Assistant Logic Tests
//!
//! These tests check how `SqlAssistant` composes prompts from retrieved context,
//! how it handles the intermediate-SQL round trip, and how training material is
//! routed to the knowledge store. All adapters are mocks.

mod common;

use crate::common::{
    build_assistant, information_schema_frame, sales_frame, setup_tracing, MockAiProvider,
    MockKnowledgeStore, MockStorageProvider,
};
use serde_json::json;
use sqlchat::{ChatError, DataFrame, QuestionSql, Role, TrainingPlanItemKind, TrainingRequest};

fn store_with_context() -> MockKnowledgeStore {
    MockKnowledgeStore {
        question_sql: vec![QuestionSql {
            question: "How many sales are there?".to_string(),
            sql: "SELECT COUNT(*) FROM sales;".to_string(),
        }],
        ddl: vec!["CREATE TABLE sales (id INT, region TEXT, amount NUMERIC)".to_string()],
        documentation: vec!["Amounts are in euros.".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sql_prompt_includes_context_and_examples() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![]);
    let store = store_with_context();
    let assistant = build_assistant(&ai, &store, &MockStorageProvider::default());

    let context = assistant.retrieve_context("Total by region?").await.unwrap();
    let messages = assistant.get_sql_prompt("Total by region?", &context);

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.starts_with("You are a PostgreSQL expert."));
    assert!(messages[0].content.contains("===Tables \nCREATE TABLE sales"));
    assert!(messages[0].content.contains("===Additional Context \n\nAmounts are in euros."));
    assert!(messages[0].content.contains("===Response Guidelines"));
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "How many sales are there?");
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[2].content, "SELECT COUNT(*) FROM sales;");
    assert_eq!(messages[3].content, "Total by region?");
}

#[tokio::test]
async fn test_context_beyond_token_budget_is_dropped() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![]);
    let store = MockKnowledgeStore {
        ddl: vec!["x".repeat(80_000)],
        ..Default::default()
    };
    let assistant = build_assistant(&ai, &store, &MockStorageProvider::default());

    let context = assistant.retrieve_context("q").await.unwrap();
    let messages = assistant.get_sql_prompt("q", &context);
    assert!(!messages[0].content.contains("xxxx"));
    assert!(!messages[0].content.contains("===Tables"));
    assert!(messages[0].content.contains("===Response Guidelines"));
}

#[tokio::test]
async fn test_generate_sql_extracts_statement() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "Here you go:\n```sql\nSELECT region, SUM(amount) FROM sales GROUP BY region;\n```"
            .to_string(),
    ]);
    let assistant = build_assistant(&ai, &store_with_context(), &MockStorageProvider::default());

    let sql = assistant.generate_sql("Total by region?", true).await.unwrap();
    assert_eq!(sql, "SELECT region, SUM(amount) FROM sales GROUP BY region;");

    let calls = ai.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("system: You are a PostgreSQL expert."));
    assert!(calls[0].ends_with("user: Total by region?"));
}

#[tokio::test]
async fn test_intermediate_sql_is_run_and_fed_back() {
    setup_tracing();
    let intermediate = "SELECT DISTINCT region FROM sales;";
    let ai = MockAiProvider::new(vec![
        format!("-- intermediate_sql\n{intermediate}"),
        "SELECT SUM(amount) FROM sales WHERE region = 'North';".to_string(),
    ]);
    let storage = MockStorageProvider::default().with_frame(
        intermediate,
        DataFrame::new(
            vec!["region".into()],
            vec![vec![json!("North")], vec![json!("South")]],
        ),
    );
    let assistant = build_assistant(&ai, &MockKnowledgeStore::default(), &storage);

    let sql = assistant
        .generate_sql("How much did North sell?", true)
        .await
        .unwrap();

    assert_eq!(sql, "SELECT SUM(amount) FROM sales WHERE region = 'North';");
    assert_eq!(storage.executed(), vec![intermediate]);
    let calls = ai.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].contains(&format!(
        "results of the intermediate SQL query {intermediate}"
    )));
    assert!(calls[1].contains("| region |\n|:---|\n| North |\n| South |"));
}

#[tokio::test]
async fn test_intermediate_sql_ignored_without_data_access() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "-- intermediate_sql\nSELECT DISTINCT region FROM sales;".to_string(),
    ]);
    let storage = MockStorageProvider::default();
    let assistant = build_assistant(&ai, &MockKnowledgeStore::default(), &storage);

    let sql = assistant.generate_sql("q", false).await.unwrap();
    assert_eq!(sql, "SELECT DISTINCT region FROM sales;");
    assert!(storage.executed().is_empty());
    assert_eq!(ai.calls().len(), 1);
}

#[tokio::test]
async fn test_is_sql_valid_accepts_only_reads() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    assert!(assistant.is_sql_valid("SELECT * FROM sales"));
    assert!(assistant.is_sql_valid("with t as (select 1) select * from t"));
    assert!(!assistant.is_sql_valid("DELETE FROM sales"));
    assert!(!assistant.is_sql_valid("I cannot answer that."));
}

#[tokio::test]
async fn test_training_plan_groups_by_table() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    let plan = assistant.get_training_plan_generic(&information_schema_frame());

    assert_eq!(plan.len(), 2);
    let names: Vec<&str> = plan.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "sales"]);
    let sales = &plan.items[1];
    assert_eq!(sales.kind, TrainingPlanItemKind::InformationSchema);
    assert_eq!(sales.group, "shop.public");
    assert!(sales
        .value
        .starts_with("The following columns are in the sales table in the shop database:"));
    assert!(sales.value.contains("| amount |"));
    assert!(!sales.value.contains("customers"));
}

#[tokio::test]
async fn test_training_plan_requires_schema_columns() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );
    assert!(assistant.get_training_plan_generic(&sales_frame()).is_empty());
}

#[tokio::test]
async fn test_train_routes_material_to_store() {
    setup_tracing();
    let ai = MockAiProvider::new(vec!["How many customers signed up?".to_string()]);
    let store = MockKnowledgeStore::default();
    let assistant = build_assistant(&ai, &store, &MockStorageProvider::default());

    let doc_id = assistant
        .train(TrainingRequest {
            documentation: Some("Fiscal year starts in April.".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(doc_id.ends_with("-doc"));

    let sql_id = assistant
        .train(TrainingRequest {
            sql: Some("SELECT COUNT(*) FROM customers;".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(sql_id.ends_with("-sql"));
    assert_eq!(ai.calls().len(), 1, "a question should be generated for bare SQL");

    assistant
        .train(TrainingRequest {
            ddl: Some("CREATE TABLE customers (id INT)".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let added = store.added();
    assert_eq!(added.len(), 3);
    assert_eq!(added[0], ("doc".to_string(), "Fiscal year starts in April.".to_string()));
    assert_eq!(added[1].0, "sql");
    assert!(added[1].1.contains("How many customers signed up?"));
    assert_eq!(added[2].0, "ddl");
}

#[tokio::test]
async fn test_empty_training_request_is_rejected() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    let result = assistant
        .train(TrainingRequest {
            sql: Some("   ".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(ChatError::InvalidTrainingRequest(_))));
}

#[tokio::test]
async fn test_remove_unknown_training_id() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    assert!(assistant.remove_training_data("abc-sql").await.is_ok());
    assert!(matches!(
        assistant.remove_training_data("abc").await,
        Err(ChatError::UnknownTrainingId(id)) if id == "abc"
    ));
}

#[tokio::test]
async fn test_followup_questions_are_cleaned() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "1. Which region sold the most?\n\n2) What was the average sale?\n   \nHow many sales per month?"
            .to_string(),
    ]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    let questions = assistant
        .generate_followup_questions("Totals?", "SELECT 1;", &sales_frame(), 3)
        .await
        .unwrap();

    assert_eq!(
        questions,
        vec![
            "Which region sold the most?",
            "What was the average sale?",
            "How many sales per month?"
        ]
    );
    assert!(ai.calls()[0].contains("Generate a list of 3 followup questions"));
}

#[tokio::test]
async fn test_plotly_code_is_extracted_and_sanitized() {
    setup_tracing();
    let ai = MockAiProvider::new(vec![
        "```python\nimport plotly.express as px\nfig = px.bar(df, x='region', y='total')\nfig.show()\n```"
            .to_string(),
    ]);
    let assistant = build_assistant(
        &ai,
        &MockKnowledgeStore::default(),
        &MockStorageProvider::default(),
    );

    let code = assistant
        .generate_plotly_code("Totals?", "SELECT region, total FROM t;", &sales_frame())
        .await
        .unwrap();

    assert_eq!(
        code,
        "import plotly.express as px\nfig = px.bar(df, x='region', y='total')"
    );
    let prompt = &ai.calls()[0];
    assert!(prompt.contains("region: object\ntotal: float64"));

    let figure = assistant
        .get_plotly_figure(&code, &sales_frame(), false)
        .expect("a figure for non-empty data");
    assert_eq!(figure.data[0]["type"], "bar");
}

#[tokio::test]
async fn test_generate_questions_lists_stored_examples() {
    let ai = MockAiProvider::new(vec![]);
    let assistant = build_assistant(&ai, &store_with_context(), &MockStorageProvider::default());

    let questions = assistant.generate_questions().await.unwrap();
    assert_eq!(questions, vec!["How many sales are there?"]);
    assert!(ai.calls().is_empty());
}
