// CLI module for command-line interface

pub mod download;
pub mod echo;
pub mod init;
pub mod layout;
pub mod monitor;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::error::Result;

use self::download::DownloadCommand;
use self::echo::EchoCommand;
use self::init::InitCommand;
use self::layout::LayoutCommand;
use self::monitor::MonitorCommand;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "netmon")]
#[command(about = "Live monitor for a transport network's passenger feed")]
#[command(long_about = r#"netmon watches a live transport network: it downloads the published
network layout, connects to the passenger event feed over STOMP and keeps
per-station passenger counts.

Features:
  • WebSocket feed transport with TLS verification
  • STOMP 1.2 sessions with receipt-confirmed subscriptions
  • Network layout download, parsing and validation
  • Live per-station passenger counts and a busiest-stations report

Examples:
  netmon init                       Write a starter netmon.toml
  netmon echo                       Round-trip a message through the echo endpoint
  netmon download                   Fetch the network layout file
  netmon layout --json              Summarize a layout file as JSON
  netmon monitor --max-events 100   Record 100 events and report"#)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// All available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter configuration file
    #[command(long_about = r#"Write a starter netmon.toml with the default feed settings.

The generated file points at the public test feed; fill in [auth] login and
passcode before running 'netmon monitor'.

Examples:
  netmon init                       Create netmon.toml in the current directory
  netmon init --path conf/netmon.toml  Create it somewhere else
  netmon init --force               Overwrite an existing file"#)]
    Init {
        /// Where to write the configuration file
        #[arg(long, default_value = "netmon.toml")]
        path: PathBuf,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,

        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Check connectivity by round-tripping a message through the echo endpoint
    #[command(long_about = r#"Connect to the server's echo endpoint, send one message and verify the
server sends the same message back. Prints OK! and exits 0 on success.

Examples:
  netmon echo                       Round-trip the default message
  netmon echo --message "ping"      Round-trip a custom message
  netmon echo --config feed.toml    Use a different configuration file"#)]
    Echo {
        /// Message to send (default: "hello there")
        #[arg(long)]
        message: Option<String>,

        /// Configuration file to use
        #[arg(long, default_value = "netmon.toml")]
        config: PathBuf,

        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Download the network layout file
    #[command(long_about = r#"Download the published network layout file over HTTPS, following
redirects and verifying the server certificate.

The URL and destination default to the [layout] section of netmon.toml.

Examples:
  netmon download                   Fetch the configured layout URL
  netmon download --url https://example.com/layout.json --output layout.json
  netmon download --json            Machine-readable result"#)]
    Download {
        /// URL to download (default: layout.url from the configuration)
        #[arg(long)]
        url: Option<String>,

        /// Destination file (default: layout.file from the configuration)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Configuration file to use
        #[arg(long, default_value = "netmon.toml")]
        config: PathBuf,

        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Parse a network layout file and summarize it
    #[command(long_about = r#"Parse a network layout file, validate it and build the in-memory
network model, then report what it contains.

Examples:
  netmon layout                     Summarize the configured layout file
  netmon layout --file layout.json  Summarize a specific file
  netmon layout --json              Machine-readable summary"#)]
    Layout {
        /// Layout file to parse (default: layout.file from the configuration)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Configuration file to use
        #[arg(long, default_value = "netmon.toml")]
        config: PathBuf,

        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Stream passenger events and keep per-station counts
    #[command(long_about = r#"Connect to the passenger event feed, subscribe to the configured
destination and update per-station passenger counts as events arrive.
Stops on Ctrl-C or after --max-events recorded events, then prints a
busiest-stations report.

Requires [auth] credentials in the configuration file. The network layout
is downloaded first unless a local copy already exists.

Examples:
  netmon monitor                    Monitor until interrupted
  netmon monitor --max-events 100   Stop after 100 recorded events
  netmon monitor --refresh          Re-download the layout file first
  netmon monitor --json             Machine-readable final report"#)]
    Monitor {
        /// Stop after this many recorded events
        #[arg(long)]
        max_events: Option<u64>,

        /// Re-download the layout file even if a local copy exists
        #[arg(long)]
        refresh: bool,

        /// Configuration file to use
        #[arg(long, default_value = "netmon.toml")]
        config: PathBuf,

        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

/// CLI command dispatcher
pub struct CliDispatcher;

impl CliDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands) -> Result<()> {
        match command {
            Commands::Init { path, force, json } => {
                let cmd = InitCommand { path, force, json };
                cmd.run().await
            }

            Commands::Echo {
                message,
                config,
                json,
            } => {
                let cmd = EchoCommand {
                    message,
                    config,
                    json,
                };
                cmd.run().await
            }

            Commands::Download {
                url,
                output,
                config,
                json,
            } => {
                let cmd = DownloadCommand {
                    url,
                    output,
                    config,
                    json,
                };
                cmd.run().await
            }

            Commands::Layout { file, config, json } => {
                let cmd = LayoutCommand { file, config, json };
                cmd.run().await
            }

            Commands::Monitor {
                max_events,
                refresh,
                config,
                json,
            } => {
                let cmd = MonitorCommand {
                    max_events,
                    refresh,
                    config,
                    json,
                };
                cmd.run().await
            }
        }
    }
}
