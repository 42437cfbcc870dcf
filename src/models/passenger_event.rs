use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a passenger movement at a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerEventKind {
    /// Passenger entered the station
    In,
    /// Passenger left the station
    Out,
}

/// A single passenger event as published on the live feed.
///
/// The feed delivers one JSON object per STOMP MESSAGE frame:
/// `{"datetime": "...", "passenger_event": "in", "station_id": "station_042"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEvent {
    /// Station the event occurred at
    pub station_id: String,
    /// Whether the passenger entered or left
    #[serde(rename = "passenger_event")]
    pub kind: PassengerEventKind,
    /// When the event occurred, as reported by the feed
    #[serde(rename = "datetime")]
    pub timestamp: DateTime<Utc>,
}

impl PassengerEvent {
    /// Parse an event from a STOMP message body
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
