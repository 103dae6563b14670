//! Per-equipment simulator state.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::scenario::{Phase, Scenario, Targets};
use crate::frame::DecodedReading;

/// Jitter standard deviations applied to each emitted reading.
const RPM_JITTER: f64 = 8.0;
const COOLANT_JITTER_C: f64 = 0.15;
const OIL_JITTER_PSI: f64 = 0.5;

/// Fuel burned per minute of operation, in percent.
const FUEL_BURN_PCT_PER_MIN: f64 = 1.0;

/// Cold-start signal values.
const START_COOLANT_C: f64 = 20.0;
const START_FUEL_PCT: f64 = 100.0;

/// Oil pressure the pump delivers at a given engine speed.
///
/// Rises with RPM up to 1000, then holds at normal running pressure.
#[must_use]
pub fn oil_baseline(rpm: f64) -> f64 {
    if rpm < 600.0 {
        5.0 + (rpm.max(0.0) / 600.0) * 15.0
    } else if rpm < 1000.0 {
        20.0 + ((rpm - 600.0) / 400.0) * 20.0
    } else {
        65.0
    }
}

/// Smoothed signal state of one simulated engine.
///
/// Owned by a single simulator and mutated once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorState {
    scenario: Scenario,
    phase: Phase,
    rpm: f64,
    coolant_temp_c: f64,
    oil_pressure_psi: f64,
    fuel_level_pct: f64,
    target: Targets,
}

impl SimulatorState {
    /// Cold engine at rest.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        let target = scenario.targets(0.0);
        Self {
            scenario,
            phase: target.phase,
            rpm: 0.0,
            coolant_temp_c: START_COOLANT_C,
            oil_pressure_psi: 0.0,
            fuel_level_pct: START_FUEL_PCT,
            target,
        }
    }

    /// Scenario driving this state.
    #[must_use]
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Targets in effect after the last advance.
    #[must_use]
    pub fn target(&self) -> Targets {
        self.target
    }

    /// Move every signal a `smoothing` fraction of the way to its target at
    /// `elapsed` seconds.
    pub fn advance(&mut self, elapsed: f64, smoothing: f64) {
        let target = self.scenario.targets(elapsed);
        self.phase = target.phase;
        self.target = target;

        self.rpm += (target.rpm - self.rpm) * smoothing;
        self.coolant_temp_c += (target.coolant_temp_c - self.coolant_temp_c) * smoothing;
        let oil_target = target
            .oil_pressure_psi
            .unwrap_or_else(|| oil_baseline(self.rpm));
        self.oil_pressure_psi += (oil_target - self.oil_pressure_psi) * smoothing;
        self.fuel_level_pct = (START_FUEL_PCT - elapsed / 60.0 * FUEL_BURN_PCT_PER_MIN).max(0.0);
    }

    /// Smoothed values without jitter.
    #[must_use]
    pub fn smoothed(&self) -> DecodedReading {
        DecodedReading::new(
            self.rpm,
            self.coolant_temp_c,
            self.oil_pressure_psi,
            self.fuel_level_pct,
        )
    }

    /// Current values with independent sensor jitter.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DecodedReading {
        let mut jitter = |sigma: f64| -> f64 {
            let z: f64 = StandardNormal.sample(&mut *rng);
            z * sigma
        };
        DecodedReading::new(
            (self.rpm + jitter(RPM_JITTER)).max(0.0),
            self.coolant_temp_c + jitter(COOLANT_JITTER_C),
            (self.oil_pressure_psi + jitter(OIL_JITTER_PSI)).max(0.0),
            self.fuel_level_pct,
        )
    }
}
