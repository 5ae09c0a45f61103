use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use ashley::chat::{self, Conversation};
use ashley::config::Settings;
use ashley::constants::DEFAULT_PORT;
use ashley::web_server;

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the Ashley web chat server.
    Start {
        #[arg(long, env = "ASHLEY_PORT", default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
    },
    /// Chat with Ashley in the terminal.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for HF_API_KEY and overrides)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,ashley=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    info!("Ashley starting with command: {:?}", cli.command);

    // A missing credential stops us here, before any message is accepted.
    let settings = Settings::from_env().context("Failed to load configuration")?;
    let conversation = Arc::new(Conversation::from_settings(&settings));

    match cli.command {
        Commands::Start { port } => {
            info!("Starting Ashley web server on port {}...", port);

            let web_conversation = conversation.clone();
            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, web_conversation).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat => {
            chat::run_terminal_chat(conversation)
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
