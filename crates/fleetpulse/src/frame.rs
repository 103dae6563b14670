//! Core telemetry types for fleetpulse.
//!
//! This module defines the fundamental data structures for representing
//! sensor frames received from equipment and the readings decoded from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec;
use crate::error::Result;

/// A single sensor payload sample tagged with equipment and time.
///
/// Frames are immutable once created. The payload is guaranteed to be exactly
/// eight bytes, stored as sixteen uppercase hex characters; the only way to
/// build a frame is through a constructor that enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticFrame {
    id: Uuid,
    equipment_id: String,
    timestamp: DateTime<Utc>,
    protocol_id: String,
    payload: String,
}

impl DiagnosticFrame {
    /// Create a frame from a hex payload.
    ///
    /// The payload may be in either case; it is stored uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedFrame`] if `payload` is not sixteen hex
    /// characters.
    pub fn new(
        equipment_id: impl Into<String>,
        protocol_id: impl Into<String>,
        payload: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let payload = codec::normalize_payload(payload)?;
        Ok(Self {
            id: Uuid::new_v4(),
            equipment_id: equipment_id.into(),
            timestamp,
            protocol_id: protocol_id.into(),
            payload,
        })
    }

    /// Create a frame from raw payload bytes. Infallible since the length is
    /// fixed by the type.
    #[must_use]
    pub fn from_bytes(
        equipment_id: impl Into<String>,
        protocol_id: impl Into<String>,
        bytes: [u8; codec::PAYLOAD_LEN],
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            equipment_id: equipment_id.into(),
            timestamp,
            protocol_id: protocol_id.into(),
            payload: hex::encode_upper(bytes),
        }
    }

    /// Opaque identifier assigned at creation.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Equipment this frame belongs to.
    #[must_use]
    pub fn equipment_id(&self) -> &str {
        &self.equipment_id
    }

    /// When the sample was taken.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Bus-level protocol identifier, e.g. a CAN arbitration id like `0x0CF00400`.
    #[must_use]
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// The payload as sixteen uppercase hex characters.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decode this frame's payload into physical units.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedFrame`] if the payload cannot be decoded.
    pub fn decode(&self) -> Result<DecodedReading> {
        codec::decode(&self.payload)
    }
}

/// Physical readings decoded from a frame payload.
///
/// Never stored; computed on demand, so decoding the same frame twice always
/// yields the same reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedReading {
    /// Engine speed in revolutions per minute.
    pub rpm: f64,
    /// Engine coolant temperature in degrees Celsius.
    pub coolant_temp_c: f64,
    /// Engine oil pressure in PSI.
    pub oil_pressure_psi: f64,
    /// Fuel level in percent.
    pub fuel_level_pct: f64,
}

impl DecodedReading {
    /// Create a reading from its four signals.
    #[must_use]
    pub fn new(rpm: f64, coolant_temp_c: f64, oil_pressure_psi: f64, fuel_level_pct: f64) -> Self {
        Self {
            rpm,
            coolant_temp_c,
            oil_pressure_psi,
            fuel_level_pct,
        }
    }
}

impl std::fmt::Display for DecodedReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RPM: {:.0} | Coolant: {:.1}°C | Oil: {:.1} PSI | Fuel: {:.0}%",
            self.rpm, self.coolant_temp_c, self.oil_pressure_psi, self.fuel_level_pct
        )
    }
}
