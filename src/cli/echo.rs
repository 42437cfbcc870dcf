use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::models::config::MonitorConfig;
use crate::services::websocket_client::WebSocketClient;
use crate::utils::error::{NetmonError, Result};

/// Message sent when none is given on the command line
pub const DEFAULT_ECHO_MESSAGE: &str = "hello there";

/// Check connectivity by round-tripping a message through the echo endpoint
#[derive(Debug, Args)]
pub struct EchoCommand {
    /// Message to send (default: "hello there")
    #[arg(long)]
    pub message: Option<String>,

    /// Configuration file to use
    #[arg(long, default_value = "netmon.toml")]
    pub config: PathBuf,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

impl EchoCommand {
    /// Execute the echo command
    pub async fn run(&self) -> Result<()> {
        let config = MonitorConfig::load_or_default(&self.config)?;
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| DEFAULT_ECHO_MESSAGE.to_string());

        let client = WebSocketClient::from_config(
            &config.server,
            &config.tls,
            &config.server.echo_endpoint,
        );
        let url = client.url();

        let received = round_trip(&client, &message).await?;
        check_echo(&message, received.as_deref())?;

        if self.json {
            let response = json!({
                "status": "success",
                "url": url,
                "message": message,
            });
            let json_output = serde_json::to_string_pretty(&response).map_err(|e| {
                NetmonError::Validation(format!("Failed to serialize JSON response: {}", e))
            })?;
            println!("{}", json_output);
        } else {
            println!("✓ Echo round-trip through {}", url);
            println!("OK!");
        }

        Ok(())
    }
}

/// Connect, send one message, wait for the reply and close
async fn round_trip(client: &WebSocketClient, message: &str) -> Result<Option<String>> {
    let mut session = client.connect().await?;
    session.send(message).await?;
    let received = session.receive().await?;
    session.close().await?;
    Ok(received)
}

/// The echo test passes only when the server sends the exact message back
fn check_echo(sent: &str, received: Option<&str>) -> Result<()> {
    match received {
        Some(echo) if echo == sent => Ok(()),
        Some(echo) => Err(NetmonError::Validation(format!(
            "Test failed: sent '{}' but received '{}'",
            sent, echo
        ))),
        None => Err(NetmonError::Validation(
            "Test failed: connection closed before the echo arrived".to_string(),
        )),
    }
}
