use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    doctree_cli::main_entry().await
}
