use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors produced while loading a network layout file
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Layout file could not be read
    #[error("Failed to read layout file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Layout content is not the expected JSON document
    #[error("Invalid layout JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A station entry in the layout file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Unique station identifier
    pub station_id: String,
    /// Human-readable station name
    pub name: String,
}

/// A route entry in the layout file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Unique route identifier
    pub route_id: String,
    /// Direction of travel (e.g. "inbound", "outbound")
    pub direction: String,
    /// Line this route belongs to
    pub line_id: String,
    /// First station on the route
    pub start_station_id: String,
    /// Last station on the route
    pub end_station_id: String,
    /// Ordered station ids served by the route
    pub route_stops: Vec<String>,
}

/// A line entry in the layout file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Unique line identifier
    pub line_id: String,
    /// Human-readable line name
    pub name: String,
    /// Routes operating on this line
    pub routes: Vec<RouteRecord>,
}

/// A travel time entry in the layout file, in minutes between two
/// adjacent stations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTimeRecord {
    /// One end of the adjacent station pair
    pub start_station_id: String,
    /// Other end of the adjacent station pair
    pub end_station_id: String,
    /// Travel time in minutes
    pub travel_time: u32,
}

/// Parsed network layout file: the full description of stations, lines
/// and travel times published by the network operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLayout {
    /// All stations in the network
    pub stations: Vec<StationRecord>,
    /// All lines (and their routes) in the network
    pub lines: Vec<LineRecord>,
    /// Travel times between adjacent stations
    pub travel_times: Vec<TravelTimeRecord>,
}

impl NetworkLayout {
    /// Load a layout from a JSON file on disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse a layout from a JSON string
    pub fn from_json(content: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Convert an already-parsed JSON document into a layout
    pub fn from_value(value: serde_json::Value) -> Result<Self, LayoutError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Total number of routes across all lines
    pub fn route_count(&self) -> usize {
        self.lines.iter().map(|line| line.routes.len()).sum()
    }

    /// Cheap structural sanity check: a published layout always carries at
    /// least one station, line and travel time
    pub fn validate(&self) -> Result<(), String> {
        if self.stations.is_empty() {
            return Err("Layout contains no stations".to_string());
        }
        if self.lines.is_empty() {
            return Err("Layout contains no lines".to_string());
        }
        if self.travel_times.is_empty() {
            return Err("Layout contains no travel times".to_string());
        }
        for station in &self.stations {
            if station.station_id.is_empty() {
                return Err("Layout contains a station with an empty id".to_string());
            }
        }
        for line in &self.lines {
            if line.line_id.is_empty() {
                return Err("Layout contains a line with an empty id".to_string());
            }
            for route in &line.routes {
                if route.route_stops.len() < 2 {
                    return Err(format!(
                        "Route '{}' has fewer than two stops",
                        route.route_id
                    ));
                }
            }
        }
        Ok(())
    }
}
