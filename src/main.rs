//! atchat - chat with a language model about workspace files
//!
#![doc = "atchat - chat with a language model about workspace files"]
#![doc = "Main entry point for the atchat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use atchat::cli::{Cli, Commands};
use atchat::commands;
use atchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Logs go to stderr; stdout carries replies and the serve channel
    init_tracing(cli.verbose, cli.json_logs);

    let config_path = cli.config.as_deref().unwrap_or("config/atchat.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    let root = cli.workspace_root()?;

    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config, root).await?;
            Ok(())
        }
        Commands::Ask { prompt } => {
            tracing::debug!("Sending one-shot prompt");
            commands::ask::run_ask(config, root, prompt).await?;
            Ok(())
        }
        Commands::Search { query, json } => {
            commands::search::run_search(config, root, query, json).await?;
            Ok(())
        }
        Commands::Serve { theme } => {
            commands::serve::run_serve(config, root, theme).await?;
            Ok(())
        }
        Commands::Auth { delete } => {
            tracing::info!("Starting credential setup");
            commands::auth::authenticate(config, delete).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_level = if verbose { "atchat=debug" } else { "atchat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
