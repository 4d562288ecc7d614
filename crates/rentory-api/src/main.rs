//! Main entry point for the Rentory API

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use rentory_api::{config::Config, server::Server};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rentory-api", about = "Rentory rental inventory API", version, author)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long)]
    gen_config: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.gen_config {
        let example_config = Config::generate_example()?;
        println!("{example_config}");
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    rentory_common::logging::init_logging(
        &args.verbosity,
        "rentory_api=info,rentory_inventory=info,tower_http=info",
        config.server.log_format,
    )?;

    info!("Starting Rentory API v{}", rentory_api::VERSION);
    info!(
        "Configuration loaded, binding to {}",
        config.server.bind_address
    );

    let server = Server::new(config).await?;

    info!("Rentory API initialized successfully");

    match server.run().await {
        Ok(()) => {
            info!("Rentory API shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Rentory API error: {}", e);
            Err(e.into())
        }
    }
}
