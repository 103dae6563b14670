//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::simulator::Scenario;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.listen`)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Frames retained per equipment (overrides `buffer.capacity`)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Also run the simulator against the in-process buffer
    #[arg(short, long)]
    pub simulate: bool,

    /// Scenario for the embedded simulator
    #[arg(long, value_enum, requires = "simulate")]
    pub scenario: Option<Scenario>,
}

/// Simulate command arguments.
#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Scenario to drive (overrides `simulator.scenario`)
    #[arg(short, long, value_enum)]
    pub scenario: Option<Scenario>,

    /// Run length in seconds (overrides `simulator.duration_secs`)
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Tick interval in milliseconds (overrides `simulator.tick_interval_ms`)
    #[arg(long, value_name = "MS")]
    pub tick: Option<u64>,

    /// Seed for reproducible noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Base URL of a running server; frames stay in-process when omitted
    #[arg(short, long, value_name = "URL")]
    pub target: Option<String>,

    /// Equipment ids to drive instead of the configured fleet
    #[arg(short, long = "equipment", value_name = "ID")]
    pub equipment: Vec<String>,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Sixteen hex characters
    pub payload: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Encode command arguments.
#[derive(Debug, Args)]
pub struct EncodeCommand {
    /// Engine speed
    #[arg(long, allow_negative_numbers = true)]
    pub rpm: f64,

    /// Coolant temperature in °C
    #[arg(long, allow_negative_numbers = true)]
    pub coolant: f64,

    /// Oil pressure in PSI
    #[arg(long, allow_negative_numbers = true)]
    pub oil: f64,

    /// Fuel level in percent
    #[arg(long, allow_negative_numbers = true)]
    pub fuel: f64,
}

/// Fault command arguments.
#[derive(Debug, Args)]
pub struct FaultCommand {
    /// The fault code, e.g. `P0520`
    pub code: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Faults command arguments.
#[derive(Debug, Args)]
pub struct FaultsCommand {
    /// Search codes and descriptions; lists everything when omitted
    pub query: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
