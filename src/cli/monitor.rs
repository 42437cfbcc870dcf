use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::models::config::MonitorConfig;
use crate::models::layout::NetworkLayout;
use crate::models::passenger_event::PassengerEvent;
use crate::models::transport_network::TransportNetwork;
use crate::services::file_downloader::FileDownloader;
use crate::services::stomp_client::{StompClient, StompSession};
use crate::utils::error::{NetmonError, Result};

/// How many stations the final report lists
const BUSIEST_STATIONS_SHOWN: usize = 10;

/// Stream passenger events and keep per-station counts
#[derive(Debug, Args)]
pub struct MonitorCommand {
    /// Stop after this many recorded events
    #[arg(long)]
    pub max_events: Option<u64>,

    /// Re-download the layout file even if a local copy exists
    #[arg(long)]
    pub refresh: bool,

    /// Configuration file to use
    #[arg(long, default_value = "netmon.toml")]
    pub config: PathBuf,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Tally of one monitoring run
struct MonitorOutcome {
    recorded: u64,
    skipped: u64,
}

impl MonitorCommand {
    /// Execute the monitor command
    pub async fn run(&self) -> Result<()> {
        let config = MonitorConfig::load_or_default(&self.config)?;
        config.require_credentials()?;

        let mut network = self.prepare_network(&config).await?;

        let client = StompClient::from_config(&config);
        let mut session = client.connect().await?;
        let destination = &config.server.stomp_destination;
        session.subscribe(destination).await?;
        if !self.json {
            println!("Monitoring {} (press Ctrl-C to stop)", destination);
        }

        let outcome = self.record_events(&mut session, &mut network).await?;
        session.disconnect().await?;

        self.report(&network, &outcome)
    }

    /// Make sure a layout file is on disk, then build the network from it
    async fn prepare_network(&self, config: &MonitorConfig) -> Result<TransportNetwork> {
        let layout_path = &config.layout.file;
        if self.refresh || !layout_path.exists() {
            let downloader = FileDownloader::from_config(&config.tls);
            let bytes = downloader
                .download_file(&config.layout.url, layout_path)
                .await?;
            log::info!(
                "Downloaded layout to {} ({} bytes)",
                layout_path.display(),
                bytes
            );
        }

        let layout = NetworkLayout::from_file(layout_path)?;
        layout.validate().map_err(NetmonError::Validation)?;
        let network = TransportNetwork::from_layout(&layout)?;

        if !self.json {
            println!(
                "✓ Network ready: {} stations, {} lines, {} routes",
                network.station_count(),
                network.line_count(),
                network.route_count()
            );
        }
        Ok(network)
    }

    /// Consume MESSAGE frames until interrupted, the feed closes or the
    /// event budget is spent. Malformed events and events for unknown
    /// stations are skipped, not fatal.
    async fn record_events(
        &self,
        session: &mut StompSession,
        network: &mut TransportNetwork,
    ) -> Result<MonitorOutcome> {
        let mut recorded: u64 = 0;
        let mut skipped: u64 = 0;

        loop {
            if let Some(limit) = self.max_events {
                if recorded >= limit {
                    break;
                }
            }

            let frame = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupted, disconnecting");
                    break;
                }
                frame = session.next_message() => frame?,
            };
            let Some(frame) = frame else {
                log::warn!("Feed closed the connection");
                break;
            };

            match PassengerEvent::from_json(&frame.body) {
                Ok(event) => match network.record_passenger_event(&event) {
                    Ok(()) => {
                        recorded += 1;
                        log::debug!(
                            "{:?} event at {} ({} recorded)",
                            event.kind,
                            event.station_id,
                            recorded
                        );
                    }
                    Err(e) => {
                        skipped += 1;
                        log::warn!("Skipping event: {}", e);
                    }
                },
                Err(e) => {
                    skipped += 1;
                    log::warn!("Skipping malformed event: {}", e);
                }
            }
        }

        Ok(MonitorOutcome { recorded, skipped })
    }

    /// Print the final per-station report
    fn report(&self, network: &TransportNetwork, outcome: &MonitorOutcome) -> Result<()> {
        let busiest = busiest_stations(network, BUSIEST_STATIONS_SHOWN);

        if self.json {
            let stations: Vec<serde_json::Value> = busiest
                .iter()
                .map(|(id, name, count)| {
                    json!({
                        "station_id": id,
                        "name": name,
                        "passenger_count": count,
                    })
                })
                .collect();
            let response = json!({
                "status": "success",
                "events_recorded": outcome.recorded,
                "events_skipped": outcome.skipped,
                "busiest_stations": stations,
            });
            let json_output = serde_json::to_string_pretty(&response).map_err(|e| {
                NetmonError::Validation(format!("Failed to serialize JSON response: {}", e))
            })?;
            println!("{}", json_output);
        } else {
            println!(
                "✓ Recorded {} passenger events ({} skipped)",
                outcome.recorded, outcome.skipped
            );
            if !busiest.is_empty() {
                println!("Busiest stations:");
                for (id, name, count) in &busiest {
                    println!("  {:>5}  {} ({})", format!("{:+}", count), name, id);
                }
            }
        }

        Ok(())
    }
}

/// Stations with a non-zero net count, most crowded first
fn busiest_stations(network: &TransportNetwork, limit: usize) -> Vec<(String, String, i64)> {
    let mut counts: Vec<(String, i64)> = network
        .passenger_counts()
        .into_iter()
        .filter(|(_, count)| *count != 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);

    counts
        .into_iter()
        .map(|(id, count)| {
            let name = network
                .station_name(&id)
                .unwrap_or(id.as_str())
                .to_string();
            (id, name, count)
        })
        .collect()
}
