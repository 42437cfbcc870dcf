// Common error types for netmon

use crate::models::config::ConfigError;
use crate::models::layout::LayoutError;
use crate::models::stomp_frame::StompFrameError;
use crate::models::transport_network::TransportNetworkError;
use crate::services::file_downloader::DownloadError;
use crate::services::stomp_client::StompError;
use crate::services::websocket_client::WebSocketError;

/// Top-level error type, aggregating every module's failures
#[derive(Debug, thiserror::Error)]
pub enum NetmonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Network(#[from] TransportNetworkError),

    #[error(transparent)]
    Frame(#[from] StompFrameError),

    #[error(transparent)]
    WebSocket(#[from] WebSocketError),

    #[error(transparent)]
    Stomp(#[from] StompError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Command-level misuse or a failed check
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, NetmonError>;

/// An error dressed up for the terminal: message, optional hint and the
/// process exit code
pub struct UserError {
    pub exit_code: i32,
    message: String,
    hint: Option<String>,
}

impl UserError {
    pub fn from_netmon_error(err: &NetmonError) -> Self {
        let (exit_code, hint) = match err {
            NetmonError::Config(_) => (
                2,
                Some("check your netmon.toml (run 'netmon init' to write a template)".to_string()),
            ),
            NetmonError::Layout(_) => (
                2,
                Some("the layout file may be stale; re-run 'netmon download'".to_string()),
            ),
            NetmonError::Stomp(StompError::Rejected { .. }) => (
                1,
                Some("verify auth.login and auth.passcode in netmon.toml".to_string()),
            ),
            _ => (1, None),
        };
        Self {
            exit_code,
            message: err.to_string(),
            hint,
        }
    }

    pub fn print(&self) {
        eprintln!("Error: {}", self.message);
        if let Some(hint) = &self.hint {
            eprintln!("  hint: {}", hint);
        }
    }
}
