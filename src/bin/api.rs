use market_companion::{agent::Agent, api::start_server, config::AdvisorConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Loads .env as well
    let config = AdvisorConfig::from_env()?;

    info!("Smart Financial Advisor - API Server");
    info!("Port: {}", config.port);
    info!("Model: {}", config.model);
    match config.max_iterations {
        Some(max) => info!("Tool rounds per query: {}", max),
        None => info!("Tool rounds per query: unbounded"),
    }

    let agent = Arc::new(Agent::from_config(&config)?);

    info!("Agent initialized");
    info!("Starting API server...");

    start_server(agent, config.port).await?;

    Ok(())
}
