use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blueprint_pipeline::api::{self, AppState};
use blueprint_pipeline::config::Config;
use blueprint_pipeline::gateway::GeminiGateway;
use blueprint_pipeline::orchestrator::Orchestrator;
use blueprint_pipeline::registry::{self, DEFAULT_AGENT};
use blueprint_pipeline::research::TavilyResearch;

const DEFAULT_PORT: u16 = 8000;

#[derive(Parser)]
#[command(name = "itbp")]
#[command(about = "Turn a product idea into a project blueprint, one reviewed phase at a time")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Agent definition to run
        #[arg(short, long, default_value = DEFAULT_AGENT)]
        agent: String,
    },
    /// List the available agent definitions
    Agents,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "blueprint_pipeline=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, agent: &str) -> anyhow::Result<()> {
    let agent = registry::find_agent(agent).with_context(|| {
        let known: Vec<&str> = registry::agents().iter().map(|a| a.name).collect();
        format!("unknown agent {agent:?} (available: {})", known.join(", "))
    })?;
    let config = Config::from_env()?;

    let gateway = GeminiGateway::from_config(&config)?;
    let research = TavilyResearch::from_config(&config)?;
    if !research.has_key() {
        tracing::warn!("TAVILY_API_KEY is not set; the research phase will run without findings");
    }
    tracing::info!(model = gateway.model(), agent = agent.name, "Starting pipeline server");

    let orchestrator = Orchestrator::new(Arc::new(gateway), Arc::new(research));
    let app = api::create_router(AppState::new(orchestrator, agent));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Pipeline server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, agent }) => serve(port, &agent).await?,
        Some(Commands::Agents) => {
            for agent in registry::agents() {
                println!("{:<16} {}", agent.name, agent.description);
            }
        }
        None => serve(DEFAULT_PORT, DEFAULT_AGENT).await?,
    }

    Ok(())
}
