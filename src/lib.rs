// netmon - live transport network monitor
// Core library functionality

pub mod cli;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use models::transport_network::{Line, Route, Station, TransportNetwork};
pub use services::file_downloader::FileDownloader;
pub use services::stomp_client::{StompClient, StompSession};
pub use services::websocket_client::{WebSocketClient, WebSocketSession};
