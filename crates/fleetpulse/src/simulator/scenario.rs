//! Scenario target trajectories.
//!
//! A scenario maps elapsed seconds since an equipment unit started to the
//! operating phase and the targets its signals should track. Targets are pure
//! functions of time so that a run is reproducible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Named target-trajectory profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Idle, ramp, varied-load cycling, settle.
    #[default]
    Normal,
    /// Ramp, forced thermal excursion above 105 °C, partial cooldown.
    Overheat,
    /// Ramp, oil pressure driven below 18 PSI, recovery.
    LowPressure,
}

/// Operating phase within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Engine started, idling.
    Idle,
    /// Climbing to operating RPM.
    RampUp,
    /// Alternating light, medium and heavy load.
    LoadCycle,
    /// Back to a steady idle after work.
    Settle,
    /// Forced coolant overheat.
    ThermalExcursion,
    /// Load reduced; coolant eases back but stays above the critical limit.
    Cooldown,
    /// Oil pressure falling.
    PressureDrop,
    /// Oil pressure restored.
    Recovery,
}

/// Signal targets at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Targets {
    /// Phase the targets belong to.
    pub phase: Phase,
    /// Target engine speed.
    pub rpm: f64,
    /// Target coolant temperature.
    pub coolant_temp_c: f64,
    /// Target oil pressure. `None` follows the RPM-driven baseline.
    pub oil_pressure_psi: Option<f64>,
}

impl Targets {
    fn new(phase: Phase, rpm: f64, coolant_temp_c: f64) -> Self {
        Self {
            phase,
            rpm,
            coolant_temp_c,
            oil_pressure_psi: None,
        }
    }

    fn with_oil(mut self, oil_pressure_psi: f64) -> Self {
        self.oil_pressure_psi = Some(oil_pressure_psi);
        self
    }
}

/// Length of one light/medium/heavy load cycle.
const LOAD_CYCLE_SECS: f64 = 15.0;

impl Scenario {
    /// All scenarios.
    pub const ALL: [Scenario; 3] = [Self::Normal, Self::Overheat, Self::LowPressure];

    /// Targets at `elapsed` seconds after the unit started.
    #[must_use]
    pub fn targets(self, elapsed: f64) -> Targets {
        match self {
            Self::Normal => normal(elapsed),
            Self::Overheat => overheat(elapsed),
            Self::LowPressure => low_pressure(elapsed),
        }
    }

    /// Kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Overheat => "overheat",
            Self::LowPressure => "low-pressure",
        }
    }
}

fn ramp(from: f64, to: f64, start: f64, end: f64, elapsed: f64) -> f64 {
    let t = ((elapsed - start) / (end - start)).clamp(0.0, 1.0);
    from + (to - from) * t
}

fn normal(elapsed: f64) -> Targets {
    if elapsed < 10.0 {
        Targets::new(Phase::Idle, 800.0, 60.0)
    } else if elapsed < 30.0 {
        Targets::new(Phase::RampUp, ramp(1200.0, 2000.0, 10.0, 30.0, elapsed), 90.0)
    } else if elapsed < 90.0 {
        let cycle = (elapsed - 30.0) % LOAD_CYCLE_SECS;
        let rpm = if cycle < 5.0 {
            1300.0
        } else if cycle < 10.0 {
            1900.0
        } else {
            2150.0
        };
        Targets::new(Phase::LoadCycle, rpm, 90.0)
    } else {
        Targets::new(Phase::Settle, 900.0, 88.0)
    }
}

fn overheat(elapsed: f64) -> Targets {
    if elapsed < 8.0 {
        Targets::new(Phase::Idle, 800.0, 60.0)
    } else if elapsed < 20.0 {
        Targets::new(Phase::RampUp, ramp(1200.0, 2000.0, 8.0, 20.0, elapsed), 92.0)
    } else if elapsed < 60.0 {
        Targets::new(Phase::ThermalExcursion, 2300.0, 118.0).with_oil(60.0)
    } else {
        // load drops but the cooling fault persists, so coolant stays critical
        Targets::new(Phase::Cooldown, 900.0, 108.0).with_oil(50.0)
    }
}

fn low_pressure(elapsed: f64) -> Targets {
    if elapsed < 10.0 {
        Targets::new(Phase::Idle, 800.0, 60.0)
    } else if elapsed < 25.0 {
        Targets::new(Phase::RampUp, ramp(1200.0, 1800.0, 10.0, 25.0, elapsed), 90.0)
    } else if elapsed < 70.0 {
        Targets::new(Phase::PressureDrop, 1600.0, 90.0).with_oil(12.0)
    } else {
        Targets::new(Phase::Recovery, 1000.0, 88.0).with_oil(60.0)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation("scenario", format!("unknown scenario '{s}'")))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RampUp => "ramp-up",
            Self::LoadCycle => "load-cycle",
            Self::Settle => "settle",
            Self::ThermalExcursion => "thermal-excursion",
            Self::Cooldown => "cooldown",
            Self::PressureDrop => "pressure-drop",
            Self::Recovery => "recovery",
        };
        f.write_str(name)
    }
}
