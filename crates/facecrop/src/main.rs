//! Facecrop CLI - batch-crop photos to an aspect ratio while keeping faces in frame.
//!
//! # Usage
//!
//! ```bash
//! # Square crops of everything in ./photos, written to ./output
//! facecrop crop
//!
//! # 4:5 portraits with the detected faces drawn in
//! facecrop crop --input-dir shoot/ --output-dir shoot-4x5/ --ratio 4:5 --show-faces
//!
//! # Fetch the face detection model
//! facecrop models download
//!
//! # View configuration
//! facecrop config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Facecrop - face-aware batch cropping to a fixed aspect ratio.
#[derive(Parser, Debug)]
#[command(name = "facecrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Crop every photo in a directory to an aspect ratio, keeping faces in frame
    Crop(cli::crop::CropArgs),

    /// Manage the face detection model (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config warnings go straight to stderr.
    let config = match facecrop_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `facecrop config path`."
            );
            facecrop_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("facecrop v{}", facecrop_core::VERSION);

    match cli.command {
        Commands::Crop(args) => cli::crop::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn crop_flags_parse() {
        let cli = Cli::try_parse_from([
            "facecrop",
            "-v",
            "crop",
            "--ratio",
            "16:9",
            "--show-faces",
            "--workers",
            "3",
            "--orientation",
            "restore",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Crop(args) = cli.command else {
            panic!("expected the crop command");
        };
        assert_eq!(args.ratio.as_deref(), Some("16:9"));
        assert!(args.show_faces);
        assert_eq!(args.workers, Some(3));
    }
}
