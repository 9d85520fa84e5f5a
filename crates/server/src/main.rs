#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlchat_server::start().await
}
