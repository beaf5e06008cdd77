use bundlelog::cli::run::{RunArgs, TrimArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bundlelog")]
#[command(about = "Merge a diagnostic bundle's logs into one time-ordered view", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, normalize, sort and trim (the default)
    Run(RunArgs),
    /// Trim an existing sorted log to a time window
    Trim(TrimArgs),
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bundlelog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = bundlelog::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run(args)) => {
            bundlelog::cli::run::run(config_path, args).await?;
        }
        None => {
            // Default behavior is to run
            bundlelog::cli::run::run(config_path, RunArgs::default()).await?;
        }
        Some(Commands::Trim(args)) => {
            bundlelog::cli::run::trim(config_path, args)?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                bundlelog::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                bundlelog::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
