#[tokio::main]
async fn main() -> anyhow::Result<()> {
    upload_ai_cli::run().await
}
