use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::CertificateDer;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};

use crate::models::config::{ServerConfig, TlsConfig};

/// Default connect timeout, matching the feed server's handshake budget
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors produced by the WebSocket transport
#[derive(Debug, thiserror::Error)]
pub enum WebSocketError {
    /// CA bundle file could not be read
    #[error("Failed to read CA certificate file '{path}': {source}")]
    CaCertRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CA bundle file contained no usable certificates
    #[error("No usable certificates found in CA file '{path}'")]
    CaCertInvalid { path: String },

    /// Connection attempt did not complete in time
    #[error("Timed out after {seconds}s connecting to {url}")]
    ConnectTimeout { url: String, seconds: u64 },

    /// Sent or received on a session that is already closed
    #[error("WebSocket connection is closed")]
    Closed,

    /// Transport or handshake failure reported by the protocol stack
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// WebSocket client for one server endpoint.
///
/// The client holds connection settings only; [`WebSocketClient::connect`]
/// performs the TCP/TLS/WebSocket handshakes and hands back a live
/// [`WebSocketSession`].
#[derive(Debug, Clone)]
pub struct WebSocketClient {
    host: String,
    port: u16,
    endpoint: String,
    use_tls: bool,
    ca_cert_file: Option<PathBuf>,
    connect_timeout: Duration,
}

impl WebSocketClient {
    /// Create a client for `host:port` with TLS enabled
    pub fn new(host: &str, port: u16, endpoint: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            endpoint: endpoint.to_string(),
            use_tls: true,
            ca_cert_file: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Build a client from configuration, pointed at one of the server's
    /// endpoints
    pub fn from_config(server: &ServerConfig, tls: &TlsConfig, endpoint: &str) -> Self {
        let mut client = Self::new(&server.host, server.port, endpoint)
            .with_tls(server.use_tls)
            .with_connect_timeout(Duration::from_secs(server.connect_timeout_secs));
        if let Some(path) = &tls.ca_cert_file {
            client = client.with_ca_cert_file(path);
        }
        client
    }

    /// Enable or disable TLS (for test servers speaking plain `ws://`)
    #[must_use]
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Verify the server against a PEM bundle instead of the built-in roots
    #[must_use]
    pub fn with_ca_cert_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ca_cert_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The URL this client connects to
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.endpoint)
    }

    /// Resolve, connect and run the WebSocket handshake.
    ///
    /// The whole sequence shares one timeout; a server that accepts TCP but
    /// stalls the upgrade still fails within the budget.
    pub async fn connect(&self) -> Result<WebSocketSession, WebSocketError> {
        let url = self.url();
        log::debug!("Connecting to {}", url);

        let connector = match &self.ca_cert_file {
            Some(path) if self.use_tls => Some(build_tls_connector(path)?),
            _ => None,
        };

        let attempt = connect_async_tls_with_config(url.as_str(), None, false, connector);
        let (stream, response) = tokio::time::timeout(self.connect_timeout, attempt)
            .await
            .map_err(|_| WebSocketError::ConnectTimeout {
                url: url.clone(),
                seconds: self.connect_timeout.as_secs(),
            })??;

        log::debug!("Connected to {} (HTTP {})", url, response.status());
        Ok(WebSocketSession {
            stream,
            closed: false,
        })
    }
}

/// Build a rustls connector trusting only the certificates in `path`
fn build_tls_connector(path: &Path) -> Result<Connector, WebSocketError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| WebSocketError::CaCertRead {
        path: display.clone(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| WebSocketError::CaCertRead {
            path: display.clone(),
            source,
        })?;

    let mut roots = rustls::RootCertStore::empty();
    let (added, _ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(WebSocketError::CaCertInvalid { path: display });
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(config)))
}

/// A live WebSocket connection carrying text messages.
///
/// Control frames are handled internally; [`WebSocketSession::receive`]
/// yields text payloads until the peer closes, then `None`. After a local
/// [`WebSocketSession::close`] the session reports a quiet shutdown instead
/// of surfacing the teardown as an error.
#[derive(Debug)]
pub struct WebSocketSession {
    stream: WsStream,
    closed: bool,
}

impl WebSocketSession {
    /// Send one text message
    pub async fn send(&mut self, message: &str) -> Result<(), WebSocketError> {
        if self.closed {
            return Err(WebSocketError::Closed);
        }
        self.stream
            .send(Message::Text(message.to_string()))
            .await?;
        Ok(())
    }

    /// Receive the next text message, or `None` once the connection is
    /// closed by either side
    pub async fn receive(&mut self) -> Result<Option<String>, WebSocketError> {
        if self.closed {
            return Ok(None);
        }
        while let Some(next) = self.stream.next().await {
            match next {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => {
                    log::debug!("Ignoring binary frame ({} bytes)", bytes.len());
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    log::debug!("Server closed the connection: {:?}", frame);
                    self.closed = true;
                    return Ok(None);
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.closed = true;
                    return Ok(None);
                }
                Err(e) => {
                    if self.closed {
                        return Ok(None);
                    }
                    return Err(e.into());
                }
            }
        }
        self.closed = true;
        Ok(None)
    }

    /// Close the connection. Safe to call more than once; teardown noise
    /// from the peer is not reported as an error.
    pub async fn close(&mut self) -> Result<(), WebSocketError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the session has been closed by either side
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
