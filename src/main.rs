//! pushgate CLI - VAPID web push gateway.
//!
//! This is the main binary entry point. See the `pushgate` library for
//! the core functionality.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mimalloc::MiMalloc;
use pushgate::{persistence, server, Config, DispatchGateway};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "pushgate")]
#[command(version)]
#[command(about = "Register browser push endpoints and deliver notifications to them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway (port from $PORT or --port)
    Serve {
        #[command(flatten)]
        files: FileArgs,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides $PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Subscriber identity for the VAPID `sub` claim (email or https URL)
        subscriber: Option<String>,
    },
    /// Print the VAPID public key, generating the key pair if needed
    PublicKey {
        #[command(flatten)]
        files: FileArgs,
    },
}

#[derive(Args)]
struct FileArgs {
    /// Filename for the subscription database
    #[arg(long)]
    db: Option<PathBuf>,
    /// Filename for the VAPID credentials
    #[arg(long)]
    creds: Option<PathBuf>,
}

impl FileArgs {
    fn apply(self, config: &mut Config) {
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(creds) = self.creds {
            config.creds_path = creds;
        }
    }
}

/// Phase one builds the gateway or fails; phase two serves.
fn run_serve(config: &Config) -> Result<()> {
    config.validate_for_serve()?;
    let addr = config.bind_addr()?;

    let gateway = DispatchGateway::initialize(config)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        server::serve(listener, gateway.clone(), server::shutdown_signal()).await
    });

    // Close the store even when serving failed.
    let closed = gateway.close();
    served?;
    closed?;

    log::info!("Shutdown complete");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve {
            files,
            host,
            port,
            subscriber,
        } => {
            files.apply(&mut config);
            if let Some(host) = host {
                config.host = host;
            }
            if port.is_some() {
                config.port = port;
            }
            if let Some(subscriber) = subscriber {
                config.subscriber = subscriber;
            }
            run_serve(&config)?;
        }
        Commands::PublicKey { files } => {
            files.apply(&mut config);
            let keys = persistence::load_or_generate_vapid_keys(&config.creds_path)?;
            println!("{}", keys.public_key_base64url());
        }
    }

    Ok(())
}
