// Contract test for `netmon monitor`
//
// A STOMP-speaking WebSocket server runs on the test runtime and feeds a
// fixed batch of passenger events, so the whole pipeline from handshake to
// the busiest-stations report is exercised against the real binary.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use assert_cmd::Command;
use futures_util::{SinkExt, StreamExt};
use netmon::models::stomp_frame::{StompCommand, StompFrame};
use predicates::prelude::*;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const LAYOUT_JSON: &str = include_str!("../fixtures/network-layout.json");

type ServerStream = WebSocketStream<TcpStream>;

/// Start a mock feed on the runtime. Handshakes with riker/picard unless
/// `reject_auth` is set, then publishes `events` on the first subscription.
fn spawn_feed(rt: &Runtime, reject_auth: bool, events: Vec<String>) -> SocketAddr {
    rt.block_on(async move {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let events = events.clone();
                tokio::spawn(async move {
                    serve(stream, reject_auth, events).await;
                });
            }
        });
        addr
    })
}

async fn serve(stream: TcpStream, reject_auth: bool, events: Vec<String>) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    let Some(handshake) = read_frame(&mut ws).await else {
        return;
    };
    let authorized = matches!(
        handshake.command,
        StompCommand::Stomp | StompCommand::Connect
    ) && handshake.header("login") == Some("riker")
        && handshake.header("passcode") == Some("picard")
        && !reject_auth;
    if !authorized {
        let error = StompFrame::new(StompCommand::Error)
            .with_header("message", "ValidationInvalidAuth")
            .with_body("Access denied to /network-events");
        let _ = ws.send(Message::Text(error.encode())).await;
        let _ = ws.close(None).await;
        return;
    }

    let connected = StompFrame::new(StompCommand::Connected)
        .with_header("version", "1.2")
        .with_header("session", "sess-9");
    if ws.send(Message::Text(connected.encode())).await.is_err() {
        return;
    }

    while let Some(frame) = read_frame(&mut ws).await {
        match frame.command {
            StompCommand::Subscribe => {
                if let Some(receipt) = frame.header("receipt") {
                    send_receipt(&mut ws, receipt).await;
                }
                let destination = frame
                    .header("destination")
                    .unwrap_or("/passengers")
                    .to_string();
                let subscription = frame.header("id").unwrap_or("sub-0").to_string();
                for (index, body) in events.iter().enumerate() {
                    let message = StompFrame::new(StompCommand::Message)
                        .with_header("destination", &destination)
                        .with_header("message-id", &format!("msg-{}", index))
                        .with_header("subscription", &subscription)
                        .with_body(body);
                    if ws.send(Message::Text(message.encode())).await.is_err() {
                        return;
                    }
                }
            }
            StompCommand::Disconnect => {
                if let Some(receipt) = frame.header("receipt") {
                    send_receipt(&mut ws, receipt).await;
                }
                break;
            }
            _ => {}
        }
    }
    let _ = ws.close(None).await;
}

async fn read_frame(ws: &mut ServerStream) -> Option<StompFrame> {
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => return StompFrame::parse(&text).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_receipt(ws: &mut ServerStream, receipt_id: &str) {
    let receipt = StompFrame::new(StompCommand::Receipt).with_header("receipt-id", receipt_id);
    let _ = ws.send(Message::Text(receipt.encode())).await;
}

/// Drop a layout file and a netmon.toml pointing at the mock feed into `dir`
fn write_monitor_files(dir: &Path, port: u16) {
    fs::write(dir.join("network-layout.json"), LAYOUT_JSON).unwrap();
    let config = format!(
        "[server]\nhost = \"127.0.0.1\"\nport = {}\nuse_tls = false\n\n\
         [auth]\nlogin = \"riker\"\npasscode = \"picard\"\n",
        port
    );
    fs::write(dir.join("netmon.toml"), config).unwrap();
}

fn event_json(station: &str, kind: &str) -> String {
    serde_json::json!({
        "datetime": "2020-11-01T07:18:50.234000Z",
        "passenger_event": kind,
        "station_id": station,
    })
    .to_string()
}

#[test]
fn test_monitor_records_events_and_reports() {
    let rt = Runtime::new().unwrap();
    let events = vec![
        event_json("station_001", "in"),
        event_json("station_001", "in"),
    ];
    let addr = spawn_feed(&rt, false, events);

    let temp_dir = TempDir::new().unwrap();
    write_monitor_files(temp_dir.path(), addr.port());

    let mut cmd = Command::cargo_bin("netmon").unwrap();
    cmd.current_dir(temp_dir.path())
        .args(["monitor", "--max-events", "2"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "✓ Network ready: 4 stations, 2 lines, 3 routes",
        ))
        .stdout(predicate::str::contains("Monitoring /passengers"))
        .stdout(predicate::str::contains(
            "✓ Recorded 2 passenger events (0 skipped)",
        ))
        .stdout(predicate::str::contains("Busiest stations:"))
        .stdout(predicate::str::contains("Beta (station_001)"))
        .stdout(predicate::str::contains("+2"));
}

#[test]
fn test_monitor_skips_malformed_events() {
    let rt = Runtime::new().unwrap();
    let events = vec![
        event_json("station_001", "in"),
        "this is not an event".to_string(),
        event_json("station_000", "out"),
    ];
    let addr = spawn_feed(&rt, false, events);

    let temp_dir = TempDir::new().unwrap();
    write_monitor_files(temp_dir.path(), addr.port());

    let mut cmd = Command::cargo_bin("netmon").unwrap();
    cmd.current_dir(temp_dir.path())
        .args(["monitor", "--max-events", "2"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "✓ Recorded 2 passenger events (1 skipped)",
        ))
        .stdout(predicate::str::contains("Beta (station_001)"))
        .stdout(predicate::str::contains("Alpha (station_000)"));
}

#[test]
fn test_monitor_json_output() {
    let rt = Runtime::new().unwrap();
    let events = vec![
        event_json("station_002", "in"),
        event_json("station_002", "in"),
        event_json("station_003", "out"),
    ];
    let addr = spawn_feed(&rt, false, events);

    let temp_dir = TempDir::new().unwrap();
    write_monitor_files(temp_dir.path(), addr.port());

    let mut cmd = Command::cargo_bin("netmon").unwrap();
    cmd.current_dir(temp_dir.path())
        .args(["monitor", "--max-events", "3", "--json"]);

    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["events_recorded"], 3);
    assert_eq!(json["events_skipped"], 0);
    assert_eq!(json["busiest_stations"][0]["station_id"], "station_002");
    assert_eq!(json["busiest_stations"][0]["name"], "Gamma");
    assert_eq!(json["busiest_stations"][0]["passenger_count"], 2);
    assert_eq!(json["busiest_stations"][1]["passenger_count"], -1);
}

#[test]
fn test_monitor_rejects_bad_credentials() {
    let rt = Runtime::new().unwrap();
    let addr = spawn_feed(&rt, true, Vec::new());

    let temp_dir = TempDir::new().unwrap();
    write_monitor_files(temp_dir.path(), addr.port());

    let mut cmd = Command::cargo_bin("netmon").unwrap();
    cmd.current_dir(temp_dir.path()).arg("monitor");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ValidationInvalidAuth"))
        .stderr(predicate::str::contains("passcode"));
}

#[test]
fn test_monitor_requires_credentials() {
    // no netmon.toml at all: defaults have empty credentials
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("netmon").unwrap();
    cmd.current_dir(temp_dir.path()).arg("monitor");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("auth.login"))
        .stderr(predicate::str::contains("netmon.toml"));
}
