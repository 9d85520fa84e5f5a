use dotenvy::dotenv;
use sqlchat::{
    AppConfig, CacheSettings, CloudAssistantFactory, CloudSqlConfig, EmbeddingConfig, Orchestrator,
    VectorStoreConfig, VertexConfig,
};
use std::{env, sync::Arc};

fn var(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging and load .env file
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} '<question>'", args[0]);
        eprintln!();
        eprintln!("Example: {} 'What were total sales by region last month?'", args[0]);
        return Ok(());
    }
    let question = &args[1];

    // --- Configuration from environment variables ---
    let project_id = var("PROJECT_ID");
    let config = AppConfig {
        project_id: project_id.clone(),
        vertex: VertexConfig {
            project: project_id,
            location: var("VERTEX_LOCATION"),
            model_name: var("VERTEX_MODEL_NAME"),
            tuned_model_id: var("VERTEX_TUNED_MODEL_ID"),
            api_url: env::var("VERTEX_API_URL").ok(),
            access_token: env::var("VERTEX_ACCESS_TOKEN").ok(),
        },
        cloud_sql: CloudSqlConfig {
            instance_connection_name: var("INSTANCE_CONNECTION_NAME"),
            db_user: var("DB_USER"),
            db_pass: var("DB_PASS"),
            db_name: var("DB_NAME"),
            host: env::var("DB_HOST").ok(),
            ..Default::default()
        },
        vector_store: VectorStoreConfig {
            url: env::var("QDRANT_HOST").ok(),
            api_key: env::var("QDRANT_API_KEY").ok(),
        },
        embedding: EmbeddingConfig {
            api_url: var("EMBEDDINGS_API_URL"),
            model_name: var("EMBEDDINGS_MODEL"),
            api_key: env::var("AI_API_KEY").ok(),
        },
        ..Default::default()
    };

    let factory = CloudAssistantFactory::new(config)?;
    let orchestrator = Orchestrator::new(Arc::new(factory), CacheSettings::default());

    let sql = orchestrator.generate_sql(question).await?;
    println!("--- Generated SQL ---");
    println!("{sql}");

    if !orchestrator.is_sql_valid(&sql).await? {
        println!("\nThe model did not produce a runnable query.");
        return Ok(());
    }

    let df = orchestrator.run_sql(&sql).await?;
    println!("\n--- Result ---");
    println!("{}", df.to_markdown());

    let summary = orchestrator.generate_summary(question, &df).await?;
    println!("\n--- Summary ---");
    println!("{summary}");

    Ok(())
}
