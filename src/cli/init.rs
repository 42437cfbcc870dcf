use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::models::config::MonitorConfig;
use crate::utils::error::{NetmonError, Result};

/// Write a starter configuration file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Where to write the configuration file
    #[arg(long, default_value = "netmon.toml")]
    pub path: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// JSON response format for the init command
#[derive(Debug, Serialize, Deserialize)]
pub struct InitResponse {
    pub status: String,
    pub config_path: String,
}

impl InitCommand {
    /// Execute the init command
    pub async fn run(&self) -> Result<()> {
        if self.path.exists() && !self.force {
            return Err(NetmonError::Validation(format!(
                "'{}' already exists (use --force to overwrite)",
                self.path.display()
            )));
        }

        let config = MonitorConfig::default();
        config.save(&self.path)?;

        if self.json {
            let response = InitResponse {
                status: "created".to_string(),
                config_path: self.path.display().to_string(),
            };
            let json_output = serde_json::to_string_pretty(&response).map_err(|e| {
                NetmonError::Validation(format!("Failed to serialize JSON response: {}", e))
            })?;
            println!("{}", json_output);
        } else {
            println!("✓ Wrote {}", self.path.display());
            println!("  Fill in [auth] login and passcode before running 'netmon monitor'");
        }

        Ok(())
    }
}
