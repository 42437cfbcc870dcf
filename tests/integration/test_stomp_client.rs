// STOMP sessions against a local mock feed server

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use netmon::models::passenger_event::{PassengerEvent, PassengerEventKind};
use netmon::models::stomp_frame::{StompCommand, StompFrame};
use netmon::services::stomp_client::{StompClient, StompError};
use netmon::services::websocket_client::WebSocketClient;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Scripted behavior for one mock feed connection
#[derive(Clone, Default)]
struct MockFeed {
    reject_auth: bool,
    events: Vec<String>,
    message_before_receipt: bool,
    close_after_events: bool,
}

impl MockFeed {
    async fn spawn(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                self.run(stream).await;
            }
        });
        addr
    }

    async fn run(self, stream: TcpStream) {
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };

        let Some(handshake) = read_frame(&mut ws).await else {
            return;
        };
        let authorized = matches!(
            handshake.command,
            StompCommand::Stomp | StompCommand::Connect
        ) && !self.reject_auth
            && handshake.header("login") == Some("riker")
            && handshake.header("passcode") == Some("picard");
        if !authorized {
            let error = StompFrame::new(StompCommand::Error)
                .with_header("message", "ValidationInvalidAuth")
                .with_body("Access denied");
            ws.send(Message::Text(error.encode())).await.ok();
            ws.close(None).await.ok();
            return;
        }
        ws.send(Message::Text(
            "CONNECTED\nversion:1.2\nsession:sess-42\n\n\0".to_string(),
        ))
        .await
        .ok();

        while let Some(frame) = read_frame(&mut ws).await {
            match frame.command {
                StompCommand::Subscribe => {
                    let subscription = frame.header("id").unwrap_or("sub-0").to_string();
                    let destination =
                        frame.header("destination").unwrap_or("/passengers").to_string();
                    let receipt = frame.header("receipt").map(ToString::to_string);

                    let deliveries: Vec<StompFrame> = self
                        .events
                        .iter()
                        .enumerate()
                        .map(|(i, body)| {
                            StompFrame::new(StompCommand::Message)
                                .with_header("destination", &destination)
                                .with_header("message-id", &format!("msg-{}", i))
                                .with_header("subscription", &subscription)
                                .with_body(body)
                        })
                        .collect();

                    if self.message_before_receipt {
                        send_frames(&mut ws, &deliveries).await;
                        send_receipt(&mut ws, receipt.as_deref()).await;
                    } else {
                        send_receipt(&mut ws, receipt.as_deref()).await;
                        send_frames(&mut ws, &deliveries).await;
                    }

                    if self.close_after_events {
                        ws.close(None).await.ok();
                        while let Some(Ok(_)) = ws.next().await {}
                        return;
                    }
                }
                StompCommand::Disconnect => {
                    send_receipt(&mut ws, frame.header("receipt")).await;
                }
                _ => {}
            }
        }
    }
}

async fn read_frame(ws: &mut WebSocketStream<TcpStream>) -> Option<StompFrame> {
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => return StompFrame::parse(&text).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_frames(ws: &mut WebSocketStream<TcpStream>, frames: &[StompFrame]) {
    for frame in frames {
        ws.send(Message::Text(frame.encode())).await.ok();
    }
}

async fn send_receipt(ws: &mut WebSocketStream<TcpStream>, receipt: Option<&str>) {
    if let Some(receipt) = receipt {
        let frame = StompFrame::new(StompCommand::Receipt).with_header("receipt-id", receipt);
        ws.send(Message::Text(frame.encode())).await.ok();
    }
}

fn feed_client(addr: SocketAddr) -> StompClient {
    let transport = WebSocketClient::new("127.0.0.1", addr.port(), "/network-events")
        .with_tls(false)
        .with_connect_timeout(Duration::from_secs(2));
    StompClient::new(transport, "transportforlondon.com").with_credentials("riker", "picard")
}

fn event_json(station: &str, kind: &str) -> String {
    format!(
        r#"{{"datetime":"2020-11-01T07:18:50.234Z","passenger_event":"{}","station_id":"{}"}}"#,
        kind, station
    )
}

#[tokio::test]
async fn test_stomp_session_happy_path() {
    let feed = MockFeed {
        events: vec![
            event_json("station_000", "in"),
            event_json("station_001", "out"),
        ],
        ..MockFeed::default()
    };
    let addr = feed.spawn().await;

    let client = feed_client(addr);
    let mut session = client.connect().await.unwrap();
    assert_eq!(session.session_id(), Some("sess-42"));

    let subscription = session.subscribe("/passengers").await.unwrap();

    let first = session.next_message().await.unwrap().unwrap();
    assert_eq!(first.command, StompCommand::Message);
    assert_eq!(first.header("subscription"), Some(subscription.as_str()));
    assert_eq!(first.header("destination"), Some("/passengers"));

    let event = PassengerEvent::from_json(&first.body).unwrap();
    assert_eq!(event.station_id, "station_000");
    assert_eq!(event.kind, PassengerEventKind::In);

    let second = session.next_message().await.unwrap().unwrap();
    let event = PassengerEvent::from_json(&second.body).unwrap();
    assert_eq!(event.station_id, "station_001");
    assert_eq!(event.kind, PassengerEventKind::Out);

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_rejected_credentials() {
    let feed = MockFeed {
        reject_auth: true,
        ..MockFeed::default()
    };
    let addr = feed.spawn().await;

    let client = feed_client(addr);
    let err = client.connect().await.unwrap_err();

    match err {
        StompError::Rejected { message } => {
            assert!(message.contains("ValidationInvalidAuth"));
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_passcode_is_rejected() {
    let feed = MockFeed::default();
    let addr = feed.spawn().await;

    let transport = WebSocketClient::new("127.0.0.1", addr.port(), "/network-events")
        .with_tls(false)
        .with_connect_timeout(Duration::from_secs(2));
    let client = StompClient::new(transport, "transportforlondon.com")
        .with_credentials("riker", "wrong");

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, StompError::Rejected { .. }));
}

#[tokio::test]
async fn test_message_before_receipt_is_buffered() {
    let feed = MockFeed {
        events: vec![event_json("station_000", "in")],
        message_before_receipt: true,
        ..MockFeed::default()
    };
    let addr = feed.spawn().await;

    let client = feed_client(addr);
    let mut session = client.connect().await.unwrap();

    // subscribe succeeds even though a MESSAGE raced ahead of the receipt
    session.subscribe("/passengers").await.unwrap();

    let buffered = session.next_message().await.unwrap().unwrap();
    let event = PassengerEvent::from_json(&buffered.body).unwrap();
    assert_eq!(event.station_id, "station_000");

    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_feed_close_yields_none() {
    let feed = MockFeed {
        events: vec![event_json("station_000", "in")],
        close_after_events: true,
        ..MockFeed::default()
    };
    let addr = feed.spawn().await;

    let client = feed_client(addr);
    let mut session = client.connect().await.unwrap();
    session.subscribe("/passengers").await.unwrap();

    assert!(session.next_message().await.unwrap().is_some());
    assert_eq!(session.next_message().await.unwrap(), None);
}
