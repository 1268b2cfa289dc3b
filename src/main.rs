//! scenecast - Record a rendered scene and keep the takes in a media library
//!
//! Entry point for the scenecast CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scenecast::cli::{Cli, Commands};
use scenecast::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        scenecast::cli::completions::print(*shell);
        return Ok(());
    }

    // Load configuration only for runtime commands.
    let settings = Settings::load()?;

    // Initialize logging
    let fallback = if cli.verbose {
        "debug"
    } else {
        settings.general.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // `config` must keep working with a broken file so it can be repaired
    if !matches!(cli.command, Commands::Config(_)) {
        settings.validate()?;
    }

    // Execute command
    match cli.command {
        Commands::Record {
            autostop,
            fps,
            no_display,
        } => {
            scenecast::cli::commands::record(&settings, autostop, fps, no_display).await?;
        }
        Commands::Snapshot => {
            scenecast::cli::commands::snapshot(&settings).await?;
        }
        Commands::Library(library_cmd) => {
            scenecast::cli::commands::library_command(&settings, library_cmd)?;
        }
        Commands::Config(config_cmd) => {
            scenecast::cli::commands::config_command(&settings, config_cmd)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
