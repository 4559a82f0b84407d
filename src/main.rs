use anyhow::Result;
use resort_reservations::{serve, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting resort reservation API");

    serve(config).await
}
