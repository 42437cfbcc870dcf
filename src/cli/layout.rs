use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::models::config::MonitorConfig;
use crate::models::layout::NetworkLayout;
use crate::models::transport_network::TransportNetwork;
use crate::utils::error::{NetmonError, Result};

/// Parse a network layout file and summarize it
#[derive(Debug, Args)]
pub struct LayoutCommand {
    /// Layout file to parse (default: layout.file from the configuration)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Configuration file to use
    #[arg(long, default_value = "netmon.toml")]
    pub config: PathBuf,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

impl LayoutCommand {
    /// Execute the layout command
    pub async fn run(&self) -> Result<()> {
        let config = MonitorConfig::load_or_default(&self.config)?;
        let file = self.file.clone().unwrap_or_else(|| config.layout.file.clone());

        let layout = NetworkLayout::from_file(&file)?;
        layout.validate().map_err(NetmonError::Validation)?;
        let network = TransportNetwork::from_layout(&layout)?;

        if self.json {
            let response = json!({
                "status": "success",
                "path": file.display().to_string(),
                "stations": network.station_count(),
                "lines": network.line_count(),
                "routes": network.route_count(),
                "travel_times": layout.travel_times.len(),
            });
            let json_output = serde_json::to_string_pretty(&response).map_err(|e| {
                NetmonError::Validation(format!("Failed to serialize JSON response: {}", e))
            })?;
            println!("{}", json_output);
        } else {
            println!("✓ Loaded network layout from {}", file.display());
            println!("  Stations:     {}", network.station_count());
            println!("  Lines:        {}", network.line_count());
            println!("  Routes:       {}", network.route_count());
            println!("  Travel times: {}", layout.travel_times.len());
        }

        Ok(())
    }
}
