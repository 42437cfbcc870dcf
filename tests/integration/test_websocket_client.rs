// WebSocket transport against local servers

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use netmon::services::websocket_client::{WebSocketClient, WebSocketError};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// Echo server: sends every text and binary frame straight back
async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(_) | Message::Binary(_) => {
                            if ws.send(message).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });
    addr
}

fn local_client(addr: SocketAddr, endpoint: &str) -> WebSocketClient {
    WebSocketClient::new("127.0.0.1", addr.port(), endpoint)
        .with_tls(false)
        .with_connect_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_echo_round_trip() {
    let addr = spawn_echo_server().await;
    let client = local_client(addr, "/echo");

    let mut session = client.connect().await.unwrap();
    session.send("hello world").await.unwrap();
    let received = session.receive().await.unwrap();
    assert_eq!(received.as_deref(), Some("hello world"));

    session.close().await.unwrap();
    assert!(session.is_closed());
    // a closed session reports a quiet end of stream, not an error
    assert_eq!(session.receive().await.unwrap(), None);
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let addr = spawn_echo_server().await;
    let client = local_client(addr, "/echo");

    let mut session = client.connect().await.unwrap();
    session.send("first").await.unwrap();
    session.send("second").await.unwrap();

    assert_eq!(session.receive().await.unwrap().as_deref(), Some("first"));
    assert_eq!(session.receive().await.unwrap().as_deref(), Some("second"));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_send_after_close_fails() {
    let addr = spawn_echo_server().await;
    let client = local_client(addr, "/echo");

    let mut session = client.connect().await.unwrap();
    session.close().await.unwrap();

    let err = session.send("too late").await.unwrap_err();
    assert!(matches!(err, WebSocketError::Closed));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let addr = spawn_echo_server().await;
    let client = local_client(addr, "/echo");

    let mut session = client.connect().await.unwrap();
    session.close().await.unwrap();
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_receive_returns_none_after_server_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.ok();
        // drain until the client's close reply, so the handshake completes
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = local_client(addr, "/");
    let mut session = client.connect().await.unwrap();

    assert_eq!(session.receive().await.unwrap(), None);
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_binary_frames_are_skipped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        ws.send(Message::Text("after binary".to_string()))
            .await
            .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = local_client(addr, "/");
    let mut session = client.connect().await.unwrap();

    // the binary frame is logged and dropped, the text frame comes through
    assert_eq!(
        session.receive().await.unwrap().as_deref(),
        Some("after binary")
    );
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_unresolvable_host_fails_to_connect() {
    let client = WebSocketClient::new("some.echo-server.invalid", 443, "/")
        .with_connect_timeout(Duration::from_secs(2));

    assert!(client.connect().await.is_err());
}

#[tokio::test]
async fn test_connect_times_out_on_silent_server() {
    // a TCP listener that never answers the WebSocket upgrade
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        // hold the socket open without responding
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = WebSocketClient::new("127.0.0.1", addr.port(), "/")
        .with_tls(false)
        .with_connect_timeout(Duration::from_millis(300));

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, WebSocketError::ConnectTimeout { .. }));
}
