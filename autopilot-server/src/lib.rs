//! # Autopilot Server
//!
//! NMEA 0183 autopilot command server.
//!
//! This crate wires [`autopilot_core`] into a running process that:
//! - Accepts autopilot commands over HTTP (engage, disengage, adjust heading)
//! - Broadcasts APB/BOD/BWC/BWR/HSC/XTE sentences every second while engaged
//! - Delivers sentences on a named event channel and/or over UDP
//! - Keeps a small SignalK-style vessel store for measured and commanded headings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    autopilot-server                     │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────┐  │
//! │  │ REST API    │  │ AutopilotService│  │ TokioTimer  │  │
//! │  │ (axum)      │─▶│ (single owner)  │◀─│ (1 s ticks) │  │
//! │  └──────┬──────┘  └───────┬─────────┘  └─────────────┘  │
//! │         │                 │                             │
//! │         ▼                 ▼                             │
//! │  ┌─────────────┐  ┌─────────────────────────────────┐   │
//! │  │ SharedStore │  │ Outputs (event channel, UDP)    │   │
//! │  └─────────────┘  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `POST /plugins/nmea0183-autopilot/command` | Send a command (`{"action":..,"value":..}`) |
//! | `GET /plugins/nmea0183-autopilot/status` | Engagement state and targets |
//! | `POST /signalk/v1/api/delta` | Feed a SignalK delta (e.g. measured heading) |
//! | `GET /signalk/v1/api/vessels/self/{path}` | Read a vessel value |

use clap::Parser;
use std::path::PathBuf;

pub mod config;
pub mod service;
pub mod signalk;
pub mod timer;
pub mod transport;
pub mod web;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin id, used in command responses and as the delta source
pub const PLUGIN_ID: &str = "nmea0183-autopilot";

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 3300)]
    pub port: u16,

    /// Plugin configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write emitted sentences to stdout
    #[arg(long, default_value_t = false)]
    pub output: bool,
}
