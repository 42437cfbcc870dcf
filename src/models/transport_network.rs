use std::collections::HashMap;

use crate::models::layout::NetworkLayout;
use crate::models::passenger_event::{PassengerEvent, PassengerEventKind};

/// Identifier for stations, lines and routes (e.g. "station_042", "line_001")
pub type Id = String;

/// Errors produced by transport network construction and queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportNetworkError {
    /// Station with this id was already added
    #[error("Station '{0}' already exists")]
    DuplicateStation(Id),

    /// Line with this id was already added
    #[error("Line '{0}' already exists")]
    DuplicateLine(Id),

    /// Route with this id was already added (routes are globally unique)
    #[error("Route '{0}' already exists")]
    DuplicateRoute(Id),

    /// Referenced station has not been added to the network
    #[error("Station '{0}' not found")]
    UnknownStation(Id),

    /// A route declares a line id different from the line that carries it
    #[error("Route '{0}' does not belong to line '{1}'")]
    RouteLineMismatch(Id, Id),

    /// Travel times can only be recorded between adjacent stations
    #[error("Stations '{0}' and '{1}' are not adjacent")]
    NotAdjacent(Id, Id),
}

/// A station in the transport network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Unique station identifier
    pub id: Id,
    /// Human-readable station name
    pub name: String,
}

/// A single service pattern on a line, visiting stations in a fixed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Unique route identifier
    pub id: Id,
    /// Direction of travel (e.g. "inbound", "outbound")
    pub direction: String,
    /// Line this route belongs to
    pub line_id: Id,
    /// First station on the route
    pub start_station_id: Id,
    /// Last station on the route
    pub end_station_id: Id,
    /// Ordered list of stations served by the route
    pub stops: Vec<Id>,
}

/// A named line grouping one or more routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Unique line identifier
    pub id: Id,
    /// Human-readable line name
    pub name: String,
    /// Routes operating on this line
    pub routes: Vec<Route>,
}

/// Outgoing connection from one station to the next along a route
#[derive(Debug, Clone)]
struct GraphEdge {
    /// Line the edge belongs to
    line_id: Id,
    /// Route the edge belongs to
    route_id: Id,
    /// Destination station of the edge
    next_station_id: Id,
}

/// Per-station node: identity, live passenger count, outgoing edges
#[derive(Debug, Clone)]
struct GraphNode {
    /// Station name, kept for reporting
    name: String,
    /// Net passengers currently at the station (events in minus events out)
    passenger_count: i64,
    /// Outgoing edges to adjacent stations
    edges: Vec<GraphEdge>,
}

/// In-memory model of the transport network.
///
/// Stations form the nodes of a directed graph; adding a line materializes
/// an edge between each pair of consecutive stops on each of its routes.
/// Travel times are recorded per unordered station pair and only between
/// adjacent stations.
#[derive(Debug, Clone, Default)]
pub struct TransportNetwork {
    /// Station graph, keyed by station id
    stations: HashMap<Id, GraphNode>,
    /// Lines, keyed by line id
    lines: HashMap<Id, Line>,
    /// Routes, keyed by route id (unique across lines)
    routes: HashMap<Id, Route>,
    /// Travel time in minutes per unordered adjacent station pair
    travel_times: HashMap<(Id, Id), u32>,
}

impl TransportNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete network from a parsed layout file: stations first,
    /// then lines, then travel times
    pub fn from_layout(layout: &NetworkLayout) -> Result<Self, TransportNetworkError> {
        let mut network = Self::new();

        for station in &layout.stations {
            network.add_station(Station {
                id: station.station_id.clone(),
                name: station.name.clone(),
            })?;
        }

        for line in &layout.lines {
            let routes = line
                .routes
                .iter()
                .map(|route| Route {
                    id: route.route_id.clone(),
                    direction: route.direction.clone(),
                    line_id: route.line_id.clone(),
                    start_station_id: route.start_station_id.clone(),
                    end_station_id: route.end_station_id.clone(),
                    stops: route.route_stops.clone(),
                })
                .collect();

            network.add_line(Line {
                id: line.line_id.clone(),
                name: line.name.clone(),
                routes,
            })?;
        }

        for record in &layout.travel_times {
            network.set_travel_time(
                &record.start_station_id,
                &record.end_station_id,
                record.travel_time,
            )?;
        }

        Ok(network)
    }

    /// Add a station to the network
    pub fn add_station(&mut self, station: Station) -> Result<(), TransportNetworkError> {
        if self.stations.contains_key(&station.id) {
            return Err(TransportNetworkError::DuplicateStation(station.id));
        }

        self.stations.insert(
            station.id,
            GraphNode {
                name: station.name,
                passenger_count: 0,
                edges: Vec::new(),
            },
        );
        Ok(())
    }

    /// Add a line and all of its routes.
    ///
    /// The whole line is validated before the network is touched, so a
    /// rejected line never leaves partial edges behind.
    pub fn add_line(&mut self, line: Line) -> Result<(), TransportNetworkError> {
        if self.lines.contains_key(&line.id) {
            return Err(TransportNetworkError::DuplicateLine(line.id));
        }

        for route in &line.routes {
            if self.routes.contains_key(&route.id) {
                return Err(TransportNetworkError::DuplicateRoute(route.id.clone()));
            }
            if route.line_id != line.id {
                return Err(TransportNetworkError::RouteLineMismatch(
                    route.id.clone(),
                    line.id.clone(),
                ));
            }
            for stop in &route.stops {
                if !self.stations.contains_key(stop) {
                    return Err(TransportNetworkError::UnknownStation(stop.clone()));
                }
            }
        }

        for route in &line.routes {
            for pair in route.stops.windows(2) {
                let node = self
                    .stations
                    .get_mut(&pair[0])
                    .ok_or_else(|| TransportNetworkError::UnknownStation(pair[0].clone()))?;
                node.edges.push(GraphEdge {
                    line_id: line.id.clone(),
                    route_id: route.id.clone(),
                    next_station_id: pair[1].clone(),
                });
            }
            self.routes.insert(route.id.clone(), route.clone());
        }

        self.lines.insert(line.id.clone(), line);
        Ok(())
    }

    /// Record a passenger entering or leaving a station.
    ///
    /// Counts are signed: an Out event without a matching In drives the
    /// station negative, which the feed can legitimately produce right
    /// after startup.
    pub fn record_passenger_event(
        &mut self,
        event: &PassengerEvent,
    ) -> Result<(), TransportNetworkError> {
        let node = self
            .stations
            .get_mut(&event.station_id)
            .ok_or_else(|| TransportNetworkError::UnknownStation(event.station_id.clone()))?;

        match event.kind {
            PassengerEventKind::In => node.passenger_count += 1,
            PassengerEventKind::Out => node.passenger_count -= 1,
        }
        Ok(())
    }

    /// Net passenger count at a station
    pub fn passenger_count(&self, station: &str) -> Result<i64, TransportNetworkError> {
        self.stations
            .get(station)
            .map(|node| node.passenger_count)
            .ok_or_else(|| TransportNetworkError::UnknownStation(station.to_string()))
    }

    /// Ids of all routes whose stop list includes the station, in sorted
    /// order. Unknown stations serve no routes.
    pub fn routes_serving_station(&self, station: &str) -> Vec<Id> {
        if !self.stations.contains_key(station) {
            return Vec::new();
        }

        let mut serving: Vec<Id> = self
            .routes
            .values()
            .filter(|route| route.stops.iter().any(|stop| stop == station))
            .map(|route| route.id.clone())
            .collect();
        serving.sort();
        serving
    }

    /// Record the travel time between two adjacent stations. The value is
    /// direction-independent.
    pub fn set_travel_time(
        &mut self,
        station_a: &str,
        station_b: &str,
        minutes: u32,
    ) -> Result<(), TransportNetworkError> {
        if !self.stations.contains_key(station_a) {
            return Err(TransportNetworkError::UnknownStation(station_a.to_string()));
        }
        if !self.stations.contains_key(station_b) {
            return Err(TransportNetworkError::UnknownStation(station_b.to_string()));
        }
        if !self.are_adjacent(station_a, station_b) {
            return Err(TransportNetworkError::NotAdjacent(
                station_a.to_string(),
                station_b.to_string(),
            ));
        }

        self.travel_times
            .insert(Self::travel_time_key(station_a, station_b), minutes);
        Ok(())
    }

    /// Travel time between two stations, 0 when the pair is the same
    /// station or no time has been recorded
    pub fn travel_time(&self, station_a: &str, station_b: &str) -> u32 {
        if station_a == station_b {
            return 0;
        }
        self.travel_times
            .get(&Self::travel_time_key(station_a, station_b))
            .copied()
            .unwrap_or(0)
    }

    /// Total travel time between two stations along a specific route:
    /// the sum of adjacent travel times from `station_a` to `station_b`
    /// following the route's stop order. Returns 0 when the line or route
    /// is unknown, either station is not on the route, or `station_b` does
    /// not come after `station_a`.
    pub fn route_travel_time(
        &self,
        line: &str,
        route: &str,
        station_a: &str,
        station_b: &str,
    ) -> u32 {
        if station_a == station_b {
            return 0;
        }
        if !self.lines.contains_key(line) {
            return 0;
        }
        let Some(route) = self.routes.get(route) else {
            return 0;
        };
        if route.line_id != line {
            return 0;
        }

        let position_a = route.stops.iter().position(|stop| stop == station_a);
        let position_b = route.stops.iter().position(|stop| stop == station_b);
        match (position_a, position_b) {
            (Some(a), Some(b)) if a < b => route.stops[a..=b]
                .windows(2)
                .map(|pair| self.travel_time(&pair[0], &pair[1]))
                .sum(),
            _ => 0,
        }
    }

    /// Name of a station, if it exists
    pub fn station_name(&self, station: &str) -> Option<&str> {
        self.stations.get(station).map(|node| node.name.as_str())
    }

    /// Number of stations in the network
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Number of lines in the network
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of routes in the network
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Current passenger count per station, sorted by station id
    pub fn passenger_counts(&self) -> Vec<(Id, i64)> {
        let mut counts: Vec<(Id, i64)> = self
            .stations
            .iter()
            .map(|(id, node)| (id.clone(), node.passenger_count))
            .collect();
        counts.sort();
        counts
    }

    /// Whether an edge exists between the two stations, in either direction
    fn are_adjacent(&self, station_a: &str, station_b: &str) -> bool {
        let forward = self.stations.get(station_a).is_some_and(|node| {
            node.edges.iter().any(|edge| edge.next_station_id == station_b)
        });
        if forward {
            return true;
        }
        self.stations.get(station_b).is_some_and(|node| {
            node.edges.iter().any(|edge| edge.next_station_id == station_a)
        })
    }

    /// Normalized key for the direction-independent travel time table
    fn travel_time_key(station_a: &str, station_b: &str) -> (Id, Id) {
        if station_a <= station_b {
            (station_a.to_string(), station_b.to_string())
        } else {
            (station_b.to_string(), station_a.to_string())
        }
    }
}
