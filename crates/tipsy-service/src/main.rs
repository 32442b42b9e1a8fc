//! Main entry point for the TipsyDot client.
//!
//! Loads the configuration, resolves the active network, wallets and
//! contract adapters, then runs a single command: a contract read or write,
//! the approve-then-donate flow, an XCM reserve transfer or the live chain
//! monitor.

use clap::Parser;
use std::path::PathBuf;
use tipsy_config::{Config, NetworkRegistry};

mod commands;
mod context;

use commands::Command;
use context::AppContext;

/// Command-line arguments for the TipsyDot client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tipsy");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.app.id);

	// TIPSY_* variables override the registry endpoints.
	let context = AppContext::new(config, &NetworkRegistry::from_env())?;
	commands::run(args.command, &context).await?;

	tracing::info!("Stopped tipsy");
	Ok(())
}
