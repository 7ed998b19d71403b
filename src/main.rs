//! garden-guide: botanical garden guide and pattern game from the terminal

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use garden_guide::cli::{execute_command, Commands};
use garden_guide::Config;

#[derive(Parser)]
#[command(name = "garden-guide")]
#[command(about = "Botanical garden guide and pattern game")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "garden-guide.toml")]
    config: String,

    /// Data directory (overrides config file)
    #[arg(short, long, env = "GARDEN_GUIDE_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("garden_guide=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(Path::new(&cli.config))?;

    // Apply CLI overrides
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = PathBuf::from(data_dir);
    }

    info!(data_dir = %config.storage.data_dir.display(), "Using cache directory");

    match execute_command(&config, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
