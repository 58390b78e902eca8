//! Aerochain: streaming chat relay in front of Google and OpenAI-compatible models.

use std::sync::Arc;

use aerochain_chat::ProviderConfig;
use aerochain_core::AerochainConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;
mod verify;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up credentials from a local .env, if any
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "--verify" | "verify" => {
                let url = args
                    .get(2)
                    .map(String::as_str)
                    .unwrap_or(verify::DEFAULT_VERIFY_URL);
                let passed = verify::run(url).await?;
                std::process::exit(if passed { 0 } else { 1 });
            }
            "--help" | "-h" | "help" => {
                println!("Aerochain - streaming chat relay");
                println!();
                println!("Usage: aerochain [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  verify [url]             Send a test message to a running server");
                println!("  help                     Show this help message");
                println!();
                println!("Environment:");
                println!("  GOOGLE_API_KEY           Use Google (takes precedence)");
                println!("  OPENAI_API_KEY           Use an OpenAI-compatible endpoint");
                println!("  OPENAI_BASE_URL          Custom OpenAI-compatible base URL");
                println!("  HOST, PORT               Listen address (default 0.0.0.0:8000)");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'aerochain help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let config = AerochainConfig::from_env()?;
    let providers = ProviderConfig::from_env();

    let summary = providers.summary();
    match (&summary.provider, &summary.model) {
        (Some(provider), Some(model)) => info!("Using provider {} with model {}", provider, model),
        _ => warn!("No LLM provider configured; chat requests will stream a failure chunk"),
    }
    if config.redact_errors {
        info!("Provider error detail is redacted from responses");
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(&config, providers));

    // Build router
    let app = routes::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Aerochain server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
