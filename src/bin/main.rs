use clap::Parser;
use market_companion::{agent::Agent, config::AdvisorConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Ask the financial advisor a single question
#[derive(Debug, Parser)]
#[command(name = "advisor", version)]
struct Cli {
    /// Question about quotes, news, financials or price history
    #[arg(required = true)]
    query: Vec<String>,

    /// Maximum tool rounds before giving up (0 = unbounded)
    #[arg(long, env = "AGENT_MAX_ITERATIONS")]
    max_iterations: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AdvisorConfig::from_env()?;
    if let Some(max) = cli.max_iterations {
        config.max_iterations = (max > 0).then_some(max);
    }

    let agent = Agent::from_config(&config)?;
    let query = cli.query.join(" ");

    info!(model = %config.model, "Running advisor query");

    match agent.respond(&query).await {
        Ok(response) => {
            println!("{}", response.output);
            println!("\nProcessing time: {}", response.processing_time);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Advisor query failed");
            Err(e.into())
        }
    }
}
