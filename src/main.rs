//! Discord Channel Auto-responder - main entry point

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use discord_responder::commands::{self, send::SendOptions};
use discord_responder::{metrics, Config};

#[derive(Parser)]
#[command(name = "discord_responder")]
#[command(about = "Discord Channel Auto-responder", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start auto-reply sessions for every configured channel
    Run,

    /// Validate the token and show the acting identity
    Whoami,

    /// Send a single message, optionally self-deleting
    Send {
        /// Target channel id
        channel: String,

        /// Message text
        message: String,

        /// Thread the message onto an existing message id
        #[arg(long)]
        reply_to: Option<String>,

        /// Delete the message after this many seconds
        #[arg(long)]
        delete_after: Option<u64>,

        /// Delete right away instead of waiting out the delay
        #[arg(long, default_value_t = false)]
        delete_immediately: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("discord_responder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = &cli.metrics_addr {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => metrics::spawn_metrics_server(addr),
            Err(err) => warn!("Invalid metrics address {}: {}", addr, err),
        }
    }

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    match cli.command {
        Commands::Run => commands::run_sessions(config).await?,
        Commands::Whoami => commands::whoami_run(&config).await?,
        Commands::Send {
            channel,
            message,
            reply_to,
            delete_after,
            delete_immediately,
        } => {
            let options = SendOptions {
                reply_to,
                delete_after,
                delete_immediately,
            };
            commands::send_run(&config, &channel, &message, &options).await?;
        }
    }

    Ok(())
}
