//! Threshold alerts derived from decoded readings.

use serde::{Deserialize, Serialize};

use crate::frame::DecodedReading;

/// Coolant temperature at which a warning is raised, in °C.
pub const COOLANT_WARNING_C: f64 = 100.0;
/// Coolant temperature at which a critical alert is raised, in °C.
pub const COOLANT_CRITICAL_C: f64 = 105.0;
/// Oil pressure at or below which a warning is raised, in PSI.
pub const OIL_PRESSURE_WARNING_PSI: f64 = 25.0;
/// Oil pressure at or below which a critical alert is raised, in PSI.
pub const OIL_PRESSURE_CRITICAL_PSI: f64 = 15.0;
/// Engine speed at which a warning is raised.
pub const RPM_WARNING: f64 = 2000.0;
/// Engine speed at which a critical alert is raised.
pub const RPM_CRITICAL: f64 = 2200.0;

/// How serious an alert or fault is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Needs attention soon.
    Warning,
    /// Needs attention now.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// The physical signal an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Engine coolant temperature.
    CoolantTemp,
    /// Engine oil pressure.
    OilPressure,
    /// Engine speed.
    Rpm,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CoolantTemp => write!(f, "coolant_temp"),
            Self::OilPressure => write!(f, "oil_pressure"),
            Self::Rpm => write!(f, "rpm"),
        }
    }
}

/// A threshold breach on one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// How serious the breach is.
    pub severity: Severity,
    /// Which signal breached.
    pub signal: Signal,
    /// Human-readable description.
    pub message: String,
}

/// Classify a reading against the fixed threshold table.
///
/// Emits at most one alert per signal, at the highest severity breached.
/// Critical alerts sort ahead of warnings; within a severity the order is
/// coolant, oil pressure, RPM.
#[must_use]
pub fn evaluate(reading: &DecodedReading) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let coolant = reading.coolant_temp_c;
    if coolant >= COOLANT_CRITICAL_C {
        alerts.push(Alert {
            severity: Severity::Critical,
            signal: Signal::CoolantTemp,
            message: format!("Coolant overheat: {coolant:.0}°C (limit {COOLANT_CRITICAL_C:.0}°C)"),
        });
    } else if coolant >= COOLANT_WARNING_C {
        alerts.push(Alert {
            severity: Severity::Warning,
            signal: Signal::CoolantTemp,
            message: format!("Coolant overheat risk: {coolant:.0}°C"),
        });
    }

    let oil = reading.oil_pressure_psi;
    if oil <= OIL_PRESSURE_CRITICAL_PSI {
        alerts.push(Alert {
            severity: Severity::Critical,
            signal: Signal::OilPressure,
            message: format!(
                "Oil pressure critically low: {oil:.0} PSI (limit {OIL_PRESSURE_CRITICAL_PSI:.0} PSI)"
            ),
        });
    } else if oil <= OIL_PRESSURE_WARNING_PSI {
        alerts.push(Alert {
            severity: Severity::Warning,
            signal: Signal::OilPressure,
            message: format!("Low oil pressure: {oil:.0} PSI"),
        });
    }

    let rpm = reading.rpm;
    if rpm >= RPM_CRITICAL {
        alerts.push(Alert {
            severity: Severity::Critical,
            signal: Signal::Rpm,
            message: format!("Engine overspeed: {rpm:.0} RPM (limit {RPM_CRITICAL:.0} RPM)"),
        });
    } else if rpm >= RPM_WARNING {
        alerts.push(Alert {
            severity: Severity::Warning,
            signal: Signal::Rpm,
            message: format!("High engine speed: {rpm:.0} RPM"),
        });
    }

    // Stable, so signal order survives within each severity.
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

/// The most severe level in a set of alerts, if any.
#[must_use]
pub fn highest_severity(alerts: &[Alert]) -> Option<Severity> {
    alerts.iter().map(|a| a.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(rpm: f64, coolant: f64, oil: f64) -> DecodedReading {
        DecodedReading::new(rpm, coolant, oil, 80.0)
    }

    #[test]
    fn test_nominal_reading_has_no_alerts() {
        assert!(evaluate(&reading(1600.0, 90.0, 60.0)).is_empty());
    }

    #[test]
    fn test_coolant_thresholds() {
        let warn = evaluate(&reading(1600.0, 100.0, 60.0));
        assert_eq!(warn.len(), 1);
        assert_eq!(warn[0].severity, Severity::Warning);
        assert_eq!(warn[0].signal, Signal::CoolantTemp);

        let crit = evaluate(&reading(1600.0, 105.0, 60.0));
        assert_eq!(crit.len(), 1);
        assert_eq!(crit[0].severity, Severity::Critical);
        assert!(crit[0].message.contains("105"));

        assert!(evaluate(&reading(1600.0, 99.0, 60.0)).is_empty());
    }

    #[test]
    fn test_oil_pressure_thresholds() {
        let warn = evaluate(&reading(1600.0, 90.0, 25.0));
        assert_eq!(warn[0].severity, Severity::Warning);
        assert_eq!(warn[0].signal, Signal::OilPressure);

        let crit = evaluate(&reading(1600.0, 90.0, 12.0));
        assert_eq!(crit[0].severity, Severity::Critical);

        assert!(evaluate(&reading(1600.0, 90.0, 28.0)).is_empty());
    }

    #[test]
    fn test_rpm_thresholds() {
        let warn = evaluate(&reading(2000.0, 90.0, 60.0));
        assert_eq!(warn[0].severity, Severity::Warning);
        assert_eq!(warn[0].signal, Signal::Rpm);

        let crit = evaluate(&reading(2200.0, 90.0, 60.0));
        assert_eq!(crit[0].severity, Severity::Critical);
    }

    #[test]
    fn test_critical_does_not_suppress_other_signals() {
        let alerts = evaluate(&reading(2050.0, 110.0, 20.0));
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].signal, Signal::CoolantTemp);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].signal, Signal::OilPressure);
        assert_eq!(alerts[1].severity, Severity::Warning);
        assert_eq!(alerts[2].signal, Signal::Rpm);
        assert_eq!(alerts[2].severity, Severity::Warning);
    }

    #[test]
    fn test_critical_sorts_first() {
        let alerts = evaluate(&reading(2300.0, 101.0, 60.0));
        assert_eq!(alerts[0].signal, Signal::Rpm);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].signal, Signal::CoolantTemp);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let r = reading(2300.0, 120.0, 8.0);
        assert_eq!(evaluate(&r), evaluate(&r));
    }

    #[test]
    fn test_highest_severity() {
        assert_eq!(highest_severity(&[]), None);
        let alerts = evaluate(&reading(2050.0, 110.0, 60.0));
        assert_eq!(highest_severity(&alerts), Some(Severity::Critical));
    }

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Signal::OilPressure.to_string(), "oil_pressure");
    }

    #[test]
    fn test_alert_serialization() {
        let alerts = evaluate(&reading(1600.0, 110.0, 60.0));
        let json = serde_json::to_value(&alerts[0]).unwrap();
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["signal"], "coolant_temp");
    }
}
