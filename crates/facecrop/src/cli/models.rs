//! The `facecrop models` command for managing the face detection model.

use clap::{Args, Subcommand};
use facecrop_core::Config;
use std::path::{Path, PathBuf};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the YuNet face detection model
    Download {
        /// Download again even if the model is already installed
        #[arg(long)]
        force: bool,
    },

    /// List installed models
    List,

    /// Show model directory path
    Path,
}

/// YuNet face detector from the OpenCV model zoo.
const YUNET_URL: &str = "https://github.com/opencv/opencv_zoo/raw/main/models/face_detection_yunet/face_detection_yunet_2023mar.onnx";

/// Anything smaller is an error page, not the model.
const MIN_MODEL_BYTES: u64 = 100 * 1024;

/// Whether the configured model file is on disk.
pub struct InstalledModel {
    pub path: PathBuf,
    pub size: Option<u64>,
}

impl InstalledModel {
    pub fn is_ready(&self) -> bool {
        self.size.is_some()
    }
}

/// Check the configured model file.
pub fn check_installed(config: &Config) -> InstalledModel {
    let path = config.model_path();
    let size = std::fs::metadata(&path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len());
    InstalledModel { path, size }
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    match args.command {
        ModelsCommand::Download { force } => {
            let installed = check_installed(&config);
            if installed.is_ready() && !force {
                tracing::info!("Model already exists at {:?}", installed.path);
                return Ok(());
            }

            std::fs::create_dir_all(config.model_dir())?;
            tracing::info!("Downloading YuNet face detector...");
            tracing::info!("  Source: {}", YUNET_URL);
            tracing::info!("  Destination: {:?}", installed.path);

            let client = reqwest::Client::new();
            download_file(&client, YUNET_URL, &installed.path).await?;

            let file_size = std::fs::metadata(&installed.path)?.len();
            tracing::info!("  Complete ({:.1} KB)", file_size as f64 / 1024.0);
        }

        ModelsCommand::List => {
            let installed = check_installed(&config);
            println!("Installed models:");
            println!("  Directory: {}\n", config.model_dir().display());

            let status = match installed.size {
                Some(size) => format!("ready ({:.1} KB)", size as f64 / 1024.0),
                None => "not installed".to_string(),
            };
            println!("  Face detection:");
            println!("    - {:40} {}", config.detection.model_file, status);

            if !installed.is_ready() {
                println!("\nRun `facecrop models download` to install it.");
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Stream a URL to `dest` via a `.part` file renamed into place when complete.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    if let Some(size) = response.content_length() {
        tracing::info!("  Size: {:.1} KB", size as f64 / 1024.0);
    }

    let part = partial_path(dest);
    let mut file = tokio::fs::File::create(&part).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                anyhow::bail!("Download interrupted: {e}");
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    if let Err(e) = check_download_size(downloaded) {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
    }

    tokio::fs::rename(&part, dest).await?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn check_download_size(downloaded: u64) -> anyhow::Result<()> {
    if downloaded < MIN_MODEL_BYTES {
        anyhow::bail!(
            "Downloaded file is only {downloaded} bytes, expected the ONNX model.\n\
             Partial file removed. Try downloading again."
        );
    }
    Ok(())
}
