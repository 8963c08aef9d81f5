//! Try-On CLI - drive the try-on core from a terminal.
//!
//! Every invocation opens the studio over a data directory, runs one
//! command, and closes the store again.

mod commands;
mod offline;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tryon_core::config::PathsConfig;
use tryon_core::{DynImageGenerator, GeminiClient, TryOnStudio};

use commands::Command;
use offline::OfflineGenerator;

#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(about = "Virtual try-on: wardrobe, model picture and outfit renders")]
struct Args {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PathsConfig::APP_DIR_NAME)
}

/// The hosted model client, or an offline stand-in when the command never
/// generates anything.
fn generator_for(command: &Command) -> Result<DynImageGenerator> {
    match GeminiClient::from_env() {
        Ok(client) => Ok(Arc::new(client)),
        Err(e) if !command.needs_generation() => {
            debug!("Running offline: {}", e);
            Ok(Arc::new(OfflineGenerator::new(e.to_string())))
        }
        Err(e) => {
            warn!("Image generation is not configured");
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    debug!("Data directory: {}", data_dir.display());

    let studio = TryOnStudio::builder(&data_dir)
        .auto_create_dirs(true)
        .with_generator(generator_for(&args.command)?)
        .build()
        .await?;

    let result = commands::run(&studio, args.command).await;
    studio.close()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["tryon", "poses", "--debug", "--data-dir", "/tmp/x"])
            .unwrap();
        assert!(args.debug);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(args.command, Command::Poses));
    }
}
