use anyhow::Result;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    seeker::cli::run().await
}
