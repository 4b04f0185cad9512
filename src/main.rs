//! ajax-gateway
//!
//! Local request-forwarding gateway for a browser-based query workbench.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                    AJAX GATEWAY                        │
//!                         │                                                        │
//!   Browser /service      │  ┌────────┐   ┌──────────┐   ┌──────────┐              │
//!   ──────────────────────┼─▶│  http  │──▶│ forward  │──▶│ resolver │              │
//!                         │  │ server │   │ c_timeout│   │  chain   │              │
//!                         │  └────────┘   └────┬─────┘   └────┬─────┘              │
//!                         │                    │              ▼                     │
//!                         │                    │        ┌──────────┐               │
//!                         │                    │        │ routing  │               │
//!                         │                    │        │ registry │               │
//!                         │                    │        └────┬─────┘               │
//!                         │                    ▼             ▼                     │
//!   Browser response      │               ┌─────────────────────┐                  │   Upstream
//!   ◀─────────────────────┼───────────────│ client pool (per ep)│──────────────────┼──▶ endpoint
//!                         │               └─────────────────────┘                  │
//!                         │                                                        │
//!                         │  config (snapshot + reload gate) · templates · storage │
//!                         │  observability · lifecycle                             │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ajax_gateway::config::{ConfigSource, FileConfigSource};
use ajax_gateway::forward::url::extract_timeout_override;
use ajax_gateway::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "ajax-gateway")]
#[command(about = "Local request-forwarding gateway", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = "settings.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (default)
    Serve {
        /// Listen address, overrides `server.bind_address`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Validate the settings file and list the endpoints
    Check,
    /// Show where a URL would be forwarded
    Route {
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            lifecycle::run(StartupOptions {
                config_path: cli.config,
                bind,
            })
            .await?;
        }
        Commands::Check => {
            let snapshot = FileConfigSource::new(&cli.config).build(0)?;
            println!("Settings OK: {}", cli.config.display());
            println!("Default timeout: {}", snapshot.default_timeout);
            for endpoint in snapshot.registry.endpoints() {
                println!("  {}", endpoint);
            }
            println!("  {}", snapshot.registry.fallback());
            println!("Resolver rules: {}", snapshot.resolver.rules().len());
        }
        Commands::Route { url } => {
            let snapshot = FileConfigSource::new(&cli.config).build(0)?;
            let (url, override_millis) = extract_timeout_override(&url)?;
            let resolved = snapshot.resolver.resolve_url(&url);
            let endpoint = snapshot.registry.select_for(&resolved);
            let timeout = match override_millis {
                Some(millis) => endpoint.timeout().with_call(millis),
                None => endpoint.timeout(),
            };
            println!("URL:      {}", resolved);
            println!("Endpoint: {}", endpoint.name());
            println!("Timeout:  {}", timeout);
        }
    }

    Ok(())
}
