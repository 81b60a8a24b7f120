use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flightdeck_agent::config::AppConfig;
use flightdeck_agent::llm::{self, prompt};
use flightdeck_agent::server::{self, AppState};
use flightdeck_agent::CockpitAgent;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("flightdeck-agent v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    let backend = llm::init_backend(&config.model).await;
    let instruction = prompt::load_instruction(config.system_prompt_path.as_deref());

    let agent = CockpitAgent::new(backend)
        .with_instruction(instruction)
        .with_timeout(config.model_timeout);
    let state = AppState::new(agent);

    server::run(state, &config.bind_addr, &config.cors_origins).await
}
