// Models module for data structures
pub mod config;
pub mod layout;
pub mod passenger_event;
pub mod stomp_frame;
pub mod transport_network;
