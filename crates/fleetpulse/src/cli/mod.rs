//! Command-line interface for fleetpulse.
//!
//! This module provides the CLI structure for the `fleetpulse` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DecodeCommand, EncodeCommand, FaultCommand, FaultsCommand, OutputFormat,
    ServeCommand, SimulateCommand,
};

/// fleetpulse - Real-time diagnostic telemetry for heavy equipment
///
/// Ingests binary sensor frames per machine, keeps a rolling history, derives
/// threshold alerts and resolves fault codes.
#[derive(Debug, Parser)]
#[command(name = "fleetpulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the telemetry HTTP server
    Serve(ServeCommand),

    /// Drive simulated equipment
    Simulate(SimulateCommand),

    /// Decode a sensor payload
    Decode(DecodeCommand),

    /// Encode physical readings into a sensor payload
    Encode(EncodeCommand),

    /// Explain a fault code
    Fault(FaultCommand),

    /// List or search known fault codes
    Faults(FaultsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
