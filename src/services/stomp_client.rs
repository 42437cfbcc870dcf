use std::collections::VecDeque;

use crate::models::config::MonitorConfig;
use crate::models::stomp_frame::{StompCommand, StompFrame, StompFrameError};
use crate::services::websocket_client::{WebSocketClient, WebSocketError, WebSocketSession};

/// Errors produced by the STOMP layer
#[derive(Debug, thiserror::Error)]
pub enum StompError {
    /// Failure in the underlying WebSocket transport
    #[error(transparent)]
    WebSocket(#[from] WebSocketError),

    /// Server sent a frame this client could not parse
    #[error("Malformed STOMP frame from server: {0}")]
    Frame(#[from] StompFrameError),

    /// Server answered with an ERROR frame
    #[error("Server rejected the request: {message}")]
    Rejected { message: String },

    /// Server sent a frame that makes no sense at this point of the session
    #[error("Expected a {expected} frame, received {received}")]
    UnexpectedFrame {
        expected: &'static str,
        received: String,
    },

    /// Server acknowledged a different receipt than the one requested
    #[error("Receipt mismatch: expected '{expected}', received '{received}'")]
    ReceiptMismatch { expected: String, received: String },

    /// Connection ended while waiting for a reply
    #[error("Connection closed while waiting for a {waiting_for} frame")]
    ConnectionLost { waiting_for: &'static str },
}

/// STOMP 1.2 client over a WebSocket transport.
///
/// Holds the handshake parameters; [`StompClient::connect`] opens the
/// WebSocket, performs the STOMP handshake and returns a live
/// [`StompSession`].
#[derive(Debug, Clone)]
pub struct StompClient {
    transport: WebSocketClient,
    stomp_host: String,
    login: String,
    passcode: String,
}

impl StompClient {
    /// Create a client speaking to `stomp_host` over the given transport
    pub fn new(transport: WebSocketClient, stomp_host: &str) -> Self {
        Self {
            transport,
            stomp_host: stomp_host.to_string(),
            login: String::new(),
            passcode: String::new(),
        }
    }

    /// Build a client for the configured feed server
    pub fn from_config(config: &MonitorConfig) -> Self {
        let transport = WebSocketClient::from_config(
            &config.server,
            &config.tls,
            &config.server.stomp_endpoint,
        );
        Self::new(transport, &config.server.stomp_host)
            .with_credentials(&config.auth.login, &config.auth.passcode)
    }

    /// Set the login and passcode sent in the handshake
    #[must_use]
    pub fn with_credentials(mut self, login: &str, passcode: &str) -> Self {
        self.login = login.to_string();
        self.passcode = passcode.to_string();
        self
    }

    /// Open the transport and perform the STOMP handshake.
    ///
    /// Fails with [`StompError::Rejected`] when the server answers the
    /// handshake with an ERROR frame, for example on bad credentials.
    pub async fn connect(&self) -> Result<StompSession, StompError> {
        let mut ws = self.transport.connect().await?;

        let handshake = StompFrame::connect(&self.stomp_host, &self.login, &self.passcode);
        ws.send(&handshake.encode()).await?;

        let mut session = StompSession {
            ws,
            session_id: None,
            pending: VecDeque::new(),
            next_id: 0,
        };

        let reply = session
            .next_frame()
            .await?
            .ok_or(StompError::ConnectionLost {
                waiting_for: "CONNECTED",
            })?;
        match reply.command {
            StompCommand::Connected => {
                session.session_id = reply.header("session").map(ToString::to_string);
                log::debug!(
                    "STOMP session established (version {}, session {:?})",
                    reply.header("version").unwrap_or("unknown"),
                    session.session_id
                );
                Ok(session)
            }
            StompCommand::Error => Err(StompError::Rejected {
                message: rejection_message(&reply),
            }),
            other => Err(StompError::UnexpectedFrame {
                expected: "CONNECTED",
                received: other.to_string(),
            }),
        }
    }
}

/// An established STOMP session.
///
/// Subscriptions are confirmed with receipts before the call returns;
/// MESSAGE frames that race ahead of a receipt are buffered and handed out
/// by [`StompSession::next_message`] in arrival order.
#[derive(Debug)]
pub struct StompSession {
    ws: WebSocketSession,
    session_id: Option<String>,
    pending: VecDeque<StompFrame>,
    next_id: u64,
}

impl StompSession {
    /// Session identifier assigned by the server, when it sent one
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Subscribe to a destination and wait for the server's receipt.
    ///
    /// Returns the subscription identifier; MESSAGE frames for this
    /// subscription carry it in their `subscription` header.
    pub async fn subscribe(&mut self, destination: &str) -> Result<String, StompError> {
        let subscription_id = self.fresh_id("sub");
        let receipt_id = self.fresh_id("receipt");

        let frame = StompFrame::subscribe(destination, &subscription_id)
            .with_header("receipt", &receipt_id);
        self.ws.send(&frame.encode()).await?;
        log::debug!(
            "Subscribed to {} (id {}, awaiting receipt {})",
            destination,
            subscription_id,
            receipt_id
        );

        loop {
            let reply = self
                .next_frame()
                .await?
                .ok_or(StompError::ConnectionLost {
                    waiting_for: "RECEIPT",
                })?;
            match reply.command {
                StompCommand::Receipt => {
                    let received = reply.header("receipt-id").unwrap_or("").to_string();
                    if received != receipt_id {
                        return Err(StompError::ReceiptMismatch {
                            expected: receipt_id,
                            received,
                        });
                    }
                    return Ok(subscription_id);
                }
                StompCommand::Message => self.pending.push_back(reply),
                StompCommand::Error => {
                    return Err(StompError::Rejected {
                        message: rejection_message(&reply),
                    })
                }
                other => {
                    return Err(StompError::UnexpectedFrame {
                        expected: "RECEIPT",
                        received: other.to_string(),
                    })
                }
            }
        }
    }

    /// Wait for the next MESSAGE frame, or `None` once the server closes
    /// the session
    pub async fn next_message(&mut self) -> Result<Option<StompFrame>, StompError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        loop {
            let Some(frame) = self.next_frame().await? else {
                return Ok(None);
            };
            match frame.command {
                StompCommand::Message => return Ok(Some(frame)),
                StompCommand::Error => {
                    return Err(StompError::Rejected {
                        message: rejection_message(&frame),
                    })
                }
                StompCommand::Receipt => {
                    log::debug!(
                        "Ignoring stray receipt {:?}",
                        frame.header("receipt-id").unwrap_or("")
                    );
                }
                other => {
                    return Err(StompError::UnexpectedFrame {
                        expected: "MESSAGE",
                        received: other.to_string(),
                    })
                }
            }
        }
    }

    /// Send DISCONNECT, wait briefly for the receipt and close the
    /// transport. Teardown is lenient: a connection that drops before the
    /// receipt arrives still counts as disconnected.
    pub async fn disconnect(mut self) -> Result<(), StompError> {
        let receipt_id = self.fresh_id("receipt");
        let frame = StompFrame::disconnect(&receipt_id);

        if self.ws.send(&frame.encode()).await.is_ok() {
            loop {
                match self.next_frame().await {
                    Ok(Some(reply)) if reply.command == StompCommand::Receipt => {
                        if reply.header("receipt-id") != Some(receipt_id.as_str()) {
                            log::debug!(
                                "Disconnect receipt mismatch: expected {}, got {:?}",
                                receipt_id,
                                reply.header("receipt-id")
                            );
                        }
                        break;
                    }
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => break,
                }
            }
        }

        self.ws.close().await?;
        Ok(())
    }

    /// Read frames off the wire, skipping heartbeats, until a full frame or
    /// end of stream
    async fn next_frame(&mut self) -> Result<Option<StompFrame>, StompError> {
        loop {
            match self.ws.receive().await? {
                Some(text) => {
                    // bare EOLs between frames are heartbeats
                    if text.trim_matches(|c| c == '\r' || c == '\n').is_empty() {
                        continue;
                    }
                    return Ok(Some(StompFrame::parse(&text)?));
                }
                None => return Ok(None),
            }
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("{}-{}", prefix, id)
    }
}

/// Best human-readable account of an ERROR frame: the `message` header
/// when present, otherwise the body
fn rejection_message(frame: &StompFrame) -> String {
    if let Some(message) = frame.header("message") {
        return message.to_string();
    }
    let body = frame.body.trim();
    if body.is_empty() {
        "server sent an ERROR frame with no explanation".to_string()
    } else {
        body.to_string()
    }
}
