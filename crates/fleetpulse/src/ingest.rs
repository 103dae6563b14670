//! Ingestion boundary.
//!
//! This module validates incoming frames, stores them in the
//! [`TelemetryBuffer`], and answers read queries with optional interpretation
//! (decoded reading plus alerts). Equipment ids are opaque keys and are never
//! checked against a registry.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::alerts::{self, Alert};
use crate::buffer::{BufferStats, TelemetryBuffer};
use crate::error::{Error, Result};
use crate::frame::{DecodedReading, DiagnosticFrame};

/// A frame as submitted by a sensor gateway or the simulator.
///
/// Every field is optional on the wire so that missing fields surface as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Equipment the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,

    /// CAN arbitration id or other protocol id.
    #[serde(default, alias = "protocolId", skip_serializing_if = "Option::is_none")]
    pub can_id: Option<String>,

    /// Sixteen hex characters.
    #[serde(default, alias = "payload", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Sample time; defaults to the time of ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IngestRequest {
    /// Build the request that reproduces an existing frame.
    #[must_use]
    pub fn from_frame(frame: &DiagnosticFrame) -> Self {
        Self {
            equipment_id: Some(frame.equipment_id().to_string()),
            can_id: Some(frame.protocol_id().to_string()),
            data: Some(frame.payload().to_string()),
            timestamp: Some(frame.timestamp()),
        }
    }

    /// Validate the request and turn it into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a required field is missing or
    /// malformed.
    pub fn into_frame(self) -> Result<DiagnosticFrame> {
        let equipment_id = required("equipmentId", self.equipment_id)?;
        let can_id = required("canId", self.can_id)?.trim().to_string();
        if !protocol_id_pattern().is_match(&can_id) {
            return Err(Error::validation(
                "canId",
                format!("'{can_id}' is not a hexadecimal arbitration id"),
            ));
        }
        let data = required("data", self.data)?;
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);

        DiagnosticFrame::new(equipment_id, can_id, data.trim(), timestamp).map_err(|e| match e {
            Error::MalformedFrame { reason, .. } => Error::validation("data", reason),
            other => other,
        })
    }
}

/// The value as received, provided it is not blank.
fn required(field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::validation(field, "missing or empty")),
    }
}

fn protocol_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:0[xX])?[0-9A-Fa-f]{1,8}$").expect("Invalid regex pattern")
    })
}

/// What a successful ingest returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    /// Id assigned to the stored frame.
    pub frame_id: Uuid,
    /// The decoded reading.
    pub reading: DecodedReading,
    /// Alerts derived from the reading.
    pub alerts: Vec<Alert>,
}

/// A stored frame paired with its interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedFrame {
    /// The stored frame.
    pub frame: DiagnosticFrame,
    /// The decoded reading, or `None` if the payload could not be decoded.
    pub reading: Option<DecodedReading>,
    /// Alerts derived from the reading.
    pub alerts: Vec<Alert>,
}

impl InterpretedFrame {
    /// Decode and evaluate a frame. A bad payload is logged and yields no reading.
    #[must_use]
    pub fn interpret(frame: DiagnosticFrame) -> Self {
        match frame.decode() {
            Ok(reading) => Self {
                alerts: alerts::evaluate(&reading),
                reading: Some(reading),
                frame,
            },
            Err(e) => {
                warn!(frame = %frame.id(), error = %e, "skipping undecodable frame");
                Self {
                    frame,
                    reading: None,
                    alerts: Vec::new(),
                }
            }
        }
    }
}

/// The telemetry core: validation in front of a shared [`TelemetryBuffer`].
#[derive(Debug, Clone)]
pub struct TelemetryService {
    buffer: Arc<TelemetryBuffer>,
}

impl TelemetryService {
    /// Create a service over a fresh buffer of the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_buffer(Arc::new(TelemetryBuffer::new(capacity)))
    }

    /// Create a service over an existing buffer.
    #[must_use]
    pub fn with_buffer(buffer: Arc<TelemetryBuffer>) -> Self {
        Self { buffer }
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &Arc<TelemetryBuffer> {
        &self.buffer
    }

    /// Validate and store a submitted frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the request is rejected. Nothing is
    /// stored in that case.
    pub fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt> {
        let frame = request.into_frame().map_err(|e| {
            warn!(error = %e, "rejected frame");
            e
        })?;
        self.ingest_frame(frame)
    }

    /// Store an already-built frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] only if the frame's payload does not
    /// decode, which a constructed frame guarantees it does.
    pub fn ingest_frame(&self, frame: DiagnosticFrame) -> Result<IngestReceipt> {
        let reading = frame.decode()?;
        let frame_id = frame.id();
        debug!(equipment = %frame.equipment_id(), frame = %frame_id, "ingesting frame");
        self.buffer.ingest(frame);
        Ok(IngestReceipt {
            frame_id,
            alerts: alerts::evaluate(&reading),
            reading,
        })
    }

    /// The most recent frame for an equipment id.
    #[must_use]
    pub fn latest(&self, equipment_id: &str) -> Option<DiagnosticFrame> {
        self.buffer.latest(equipment_id)
    }

    /// The most recent frame, decoded and evaluated.
    #[must_use]
    pub fn latest_interpreted(&self, equipment_id: &str) -> Option<InterpretedFrame> {
        self.latest(equipment_id).map(InterpretedFrame::interpret)
    }

    /// Up to `count` most recent frames, oldest first. Non-positive counts
    /// yield an empty list.
    #[must_use]
    pub fn recent(&self, equipment_id: &str, count: i64) -> Vec<DiagnosticFrame> {
        let count = usize::try_from(count).unwrap_or(0);
        self.buffer.recent(equipment_id, count)
    }

    /// Like [`Self::recent`], with each frame decoded and evaluated.
    #[must_use]
    pub fn recent_interpreted(&self, equipment_id: &str, count: i64) -> Vec<InterpretedFrame> {
        self.recent(equipment_id, count)
            .into_iter()
            .map(InterpretedFrame::interpret)
            .collect()
    }

    /// Equipment ids with a history.
    #[must_use]
    pub fn equipment_ids(&self) -> Vec<String> {
        self.buffer.equipment_ids()
    }

    /// Buffer statistics.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }
}
