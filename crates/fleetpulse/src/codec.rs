//! Sensor payload codec.
//!
//! Frames carry a fixed eight-byte payload laid out as follows:
//!
//! | Bytes | Signal | Scaling |
//! |---|---|---|
//! | 0-1 | engine speed | big-endian, 0.125 RPM per bit |
//! | 2 | coolant temperature | 1 °C per bit, offset -40 °C |
//! | 3 | oil pressure | 4 PSI per bit |
//! | 4 | fuel level | 1 % per bit |
//! | 5-7 | reserved | zero |
//!
//! On the wire the payload is sixteen uppercase hex characters.

use crate::error::{Error, Result};
use crate::frame::DecodedReading;

/// Payload length in bytes.
pub const PAYLOAD_LEN: usize = 8;

/// Payload length in hex characters.
pub const PAYLOAD_HEX_LEN: usize = PAYLOAD_LEN * 2;

/// Engine speed resolution in RPM per bit.
pub const RPM_RESOLUTION: f64 = 0.125;

/// Offset added to coolant temperature before encoding.
pub const COOLANT_OFFSET_C: f64 = 40.0;

/// Oil pressure resolution in PSI per bit.
pub const OIL_PRESSURE_RESOLUTION_PSI: f64 = 4.0;

/// Encode physical readings into a hex payload.
///
/// Out-of-range values are clamped to what the field can carry.
#[must_use]
pub fn encode(rpm: f64, coolant_temp_c: f64, oil_pressure_psi: f64, fuel_level_pct: f64) -> String {
    hex::encode_upper(encode_bytes(
        rpm,
        coolant_temp_c,
        oil_pressure_psi,
        fuel_level_pct,
    ))
}

/// Encode a decoded reading back into a hex payload.
#[must_use]
pub fn encode_reading(reading: &DecodedReading) -> String {
    encode(
        reading.rpm,
        reading.coolant_temp_c,
        reading.oil_pressure_psi,
        reading.fuel_level_pct,
    )
}

/// Encode physical readings into raw payload bytes.
#[must_use]
pub fn encode_bytes(
    rpm: f64,
    coolant_temp_c: f64,
    oil_pressure_psi: f64,
    fuel_level_pct: f64,
) -> [u8; PAYLOAD_LEN] {
    let rpm_raw = quantize(rpm / RPM_RESOLUTION, f64::from(u16::MAX)).to_be_bytes();
    [
        rpm_raw[0],
        rpm_raw[1],
        quantize_byte(coolant_temp_c + COOLANT_OFFSET_C),
        quantize_byte(oil_pressure_psi / OIL_PRESSURE_RESOLUTION_PSI),
        quantize_byte(fuel_level_pct),
        0,
        0,
        0,
    ]
}

/// Decode a hex payload into physical readings.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] if `payload` is not sixteen hex characters.
/// Callers on the ingestion path should log and skip the frame.
pub fn decode(payload: &str) -> Result<DecodedReading> {
    parse_payload(payload).map(|bytes| decode_bytes(&bytes))
}

/// Decode raw payload bytes into physical readings.
#[must_use]
pub fn decode_bytes(bytes: &[u8; PAYLOAD_LEN]) -> DecodedReading {
    let rpm_raw = u16::from_be_bytes([bytes[0], bytes[1]]);
    DecodedReading {
        rpm: f64::from(rpm_raw) * RPM_RESOLUTION,
        coolant_temp_c: f64::from(bytes[2]) - COOLANT_OFFSET_C,
        oil_pressure_psi: f64::from(bytes[3]) * OIL_PRESSURE_RESOLUTION_PSI,
        fuel_level_pct: f64::from(bytes[4]),
    }
}

/// Parse a hex payload into raw bytes.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] on wrong length or non-hex characters.
pub fn parse_payload(payload: &str) -> Result<[u8; PAYLOAD_LEN]> {
    if payload.len() != PAYLOAD_HEX_LEN {
        return Err(Error::malformed_frame(
            payload,
            format!(
                "expected {PAYLOAD_HEX_LEN} hex characters, got {}",
                payload.len()
            ),
        ));
    }

    let mut bytes = [0u8; PAYLOAD_LEN];
    hex::decode_to_slice(payload, &mut bytes)
        .map_err(|e| Error::malformed_frame(payload, e.to_string()))?;
    Ok(bytes)
}

/// Validate a hex payload and return its canonical uppercase form.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] if the payload cannot be parsed.
pub fn normalize_payload(payload: &str) -> Result<String> {
    parse_payload(payload).map(hex::encode_upper)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(value: f64, max: f64) -> u16 {
    // NaN saturates to zero on the cast.
    value.round().clamp(0.0, max) as u16
}

#[allow(clippy::cast_possible_truncation)]
fn quantize_byte(value: f64) -> u8 {
    quantize(value, f64::from(u8::MAX)) as u8
}
