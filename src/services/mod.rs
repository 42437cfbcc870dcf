// Services module for network clients
pub mod file_downloader;
pub mod stomp_client;
pub mod websocket_client;
