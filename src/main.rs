use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use flux_chat::config::{GatewayConfig, PollPolicy, ServerConfig};
use flux_chat::{chat, constants, gateway::Gateway, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Provider settings shared by `serve` and `generate`.
#[derive(clap::Args, Debug)]
struct ProviderArgs {
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true, help = "Replicate API token.")]
    api_token: Option<String>,
    #[arg(long, default_value_t = constants::REPLICATE_API_BASE.clone(), help = "Replicate API base URL.")]
    api_base: String,
    #[arg(long, default_value_t = constants::POLL_INTERVAL_MS, help = "Delay between status polls, in milliseconds.")]
    poll_interval_ms: u64,
    #[arg(long, default_value_t = constants::DEFAULT_POLL_TIMEOUT_SECS, help = "Give up on a prediction after this many seconds.")]
    poll_timeout_secs: u64,
}

impl ProviderArgs {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig::new(self.api_token)
            .with_api_base(self.api_base)
            .with_poll(PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                timeout: Duration::from_secs(self.poll_timeout_secs),
            })
    }
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the web server.
    Serve {
        #[arg(long, env = "FLUX_CHAT_PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding the page templates.")]
        templates_dir: PathBuf,
        #[arg(long, default_value = "static", help = "Directory holding static assets.")]
        static_dir: PathBuf,
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Chat with a running server from the terminal.
    Chat {
        #[arg(long, default_value = "http://127.0.0.1:3000", help = "Base URL of the flux-chat server.")]
        server: String,
    },
    /// Generate a single image and print the result as JSON.
    Generate {
        #[arg(help = "Text prompt describing the image.")]
        prompt: String,
        #[command(flatten)]
        provider: ProviderArgs,
    },
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for REPLICATE_API_TOKEN and friends)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,flux_chat=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            templates_dir,
            static_dir,
            provider,
        } => {
            info!("Starting flux-chat web server on port {}...", port);
            let mut config = ServerConfig::new(port, provider.into_config());
            config.templates_dir = templates_dir;
            config.static_dir = static_dir;
            web_server::start_web_server(config)
                .await
                .context("Web server failed")?;
            info!("Shutdown complete.");
        }
        Commands::Chat { server } => {
            let conversation = chat::run_chat(&server)
                .await
                .context("Chat session failed")?;
            info!(
                "Chat session finished with {} transcript entries.",
                conversation.transcript().len()
            );
        }
        Commands::Generate { prompt, provider } => {
            let gateway = Gateway::new(provider.into_config());
            match gateway.generate(&prompt).await {
                Ok(image_url) => {
                    let body = serde_json::json!({ "imageUrl": image_url });
                    println!("{}", body);
                }
                Err(e) => {
                    error!("Image generation error: {}", e);
                    anyhow::bail!("{}", e);
                }
            }
        }
    }

    Ok(())
}
