//! Guest pass daemon: entry point for running the service.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use guestpass_node::{
    init_logging, GatewayMode, GuestPassService, LogFormat, ServiceConfig, StorageBackend,
};

#[derive(Parser)]
#[command(name = "guestpassd", about = "Building guest pass service")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "GUESTPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GUESTPASS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "GUESTPASS_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address, e.g. "0.0.0.0:8080".
        #[arg(long, env = "GUESTPASS_BIND")]
        bind: Option<SocketAddr>,

        /// Directory of the LMDB store.
        #[arg(long, env = "GUESTPASS_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Keep everything in memory (lost on exit).
        #[arg(long)]
        memory: bool,

        /// Replace external gateways with in-process stand-ins.
        #[arg(long)]
        null_gateways: bool,

        /// Answer cross-origin requests.
        #[arg(long, env = "GUESTPASS_CORS")]
        cors: bool,
    },

    /// Print the effective configuration as TOML.
    Config,

    /// Print a fresh random secret for a token key or the wallet QR hash.
    Keygen {
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Serve {
            bind,
            data_dir,
            memory,
            null_gateways,
            cors,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(data_dir) = data_dir {
                config.storage.data_dir = data_dir;
            }
            if memory {
                config.storage.backend = StorageBackend::Memory;
            }
            if null_gateways {
                config.gateways.mode = GatewayMode::Null;
            }
            config.server.cors |= cors;

            let format: LogFormat = config.logging.format.parse()?;
            init_logging(format, &config.logging.level)?;

            tracing::info!(
                bind = %config.server.bind,
                storage = ?config.storage.backend,
                gateways = ?config.gateways.mode,
                "starting guest pass service"
            );
            let service = GuestPassService::new(config)?;
            service.run().await?;
            tracing::info!("guest pass daemon exited cleanly");
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Keygen { bytes } => {
            let secret = guestpass_crypto::generate_secret(bytes)
                .map_err(|e| anyhow::anyhow!("no system randomness: {e}"))?;
            println!("hex:{}", hex::encode(secret));
        }
    }

    Ok(())
}
