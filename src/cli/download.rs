use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::models::config::MonitorConfig;
use crate::services::file_downloader::{self, FileDownloader};
use crate::utils::error::{NetmonError, Result};

/// Download the network layout file
#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// URL to download (default: layout.url from the configuration)
    #[arg(long)]
    pub url: Option<String>,

    /// Destination file (default: layout.file from the configuration)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Configuration file to use
    #[arg(long, default_value = "netmon.toml")]
    pub config: PathBuf,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

impl DownloadCommand {
    /// Execute the download command
    pub async fn run(&self) -> Result<()> {
        let config = MonitorConfig::load_or_default(&self.config)?;
        let url = self.url.clone().unwrap_or_else(|| config.layout.url.clone());
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| config.layout.file.clone());

        let downloader = FileDownloader::from_config(&config.tls);
        let bytes = downloader.download_file(&url, &output).await?;

        // Reject truncated or error-page downloads up front
        file_downloader::parse_json_file(&output)?;

        if self.json {
            let response = json!({
                "status": "success",
                "url": url,
                "path": output.display().to_string(),
                "bytes": bytes,
            });
            let json_output = serde_json::to_string_pretty(&response).map_err(|e| {
                NetmonError::Validation(format!("Failed to serialize JSON response: {}", e))
            })?;
            println!("{}", json_output);
        } else {
            println!("✓ Downloaded {} ({} bytes)", url, bytes);
            println!("  saved to {}", output.display());
        }

        Ok(())
    }
}
