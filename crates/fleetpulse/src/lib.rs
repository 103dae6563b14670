//! `fleetpulse` - Real-time diagnostic telemetry for heavy equipment
//!
//! This library accepts periodic eight-byte sensor frames per machine, decodes
//! them into physical readings, keeps a bounded rolling history per machine,
//! derives threshold alerts and resolves fault codes. A simulator drives
//! synthetic equipment through the same ingestion contract as a real gateway.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod alerts;
pub mod buffer;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod faults;
pub mod frame;
pub mod ingest;
pub mod logging;
pub mod server;
pub mod simulator;

pub use alerts::{Alert, Severity, Signal};
pub use buffer::{BufferStats, TelemetryBuffer};
pub use config::Config;
pub use error::{Error, Result};
pub use faults::{FaultCode, FaultCodeResolver};
pub use frame::{DecodedReading, DiagnosticFrame};
pub use ingest::{IngestReceipt, IngestRequest, InterpretedFrame, TelemetryService};
pub use logging::init_logging;
pub use simulator::{Scenario, SimulationSummary, SimulatorHandle, TelemetrySimulator};
