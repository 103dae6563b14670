//! Telemetry simulator.
//!
//! Synthesizes physically plausible frames for a fleet of equipment under a
//! named [`Scenario`] and submits them to a [`FrameSink`] once per tick.
//!
//! Time inside the simulator is simulated: tick `n` happens `n * tick_interval`
//! after the run started, regardless of wall-clock jitter. Together with a
//! fixed seed this makes a run reproducible frame for frame. Each unit starts
//! `stagger` after the previous one and emits nothing before that.

mod scenario;
mod sink;
mod state;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::{EquipmentConfig, SimulatorConfig};
use crate::frame::DiagnosticFrame;

pub use scenario::{Phase, Scenario, Targets};
pub use sink::{BufferSink, FrameSink, HttpSink, INGEST_PATH};
pub use state::{oil_baseline, SimulatorState};

/// Submission errors logged individually before the rest are only counted.
const LOGGED_ERRORS: u64 = 3;

/// A cloneable handle used to stop a running simulation from another task.
///
/// Stopping interrupts a run even while it waits on a slow sink.
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    stop_signal: Arc<watch::Sender<bool>>,
}

impl Default for SimulatorHandle {
    fn default() -> Self {
        let (stop_signal, _) = watch::channel(false);
        Self {
            stop_signal: Arc::new(stop_signal),
        }
    }
}

impl SimulatorHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the simulation to stop.
    pub fn stop(&self) {
        self.stop_signal.send_replace(true);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        *self.stop_signal.borrow()
    }

    /// Reset the stop signal.
    pub fn reset(&self) {
        self.stop_signal.send_replace(false);
    }

    /// Resolves once the stop signal has been sent.
    pub async fn stopped(&self) {
        let mut rx = self.stop_signal.subscribe();
        // the sender lives as long as self, so this only returns once stopped
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

/// Counters flushed when a run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Frames the sink accepted.
    pub frames_sent: u64,
    /// Frames the sink rejected or failed to deliver.
    pub errors: u64,
    /// Wall-clock run time.
    pub elapsed: Duration,
    /// Simulated time covered.
    pub simulated: Duration,
    /// Whether the run was stopped before its configured duration.
    pub interrupted: bool,
    /// Equipment ids driven.
    pub equipment: Vec<String>,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames sent, {} errors, {:.1}s simulated across {} equipment{}",
            self.frames_sent,
            self.errors,
            self.simulated.as_secs_f64(),
            self.equipment.len(),
            if self.interrupted { " (interrupted)" } else { "" }
        )
    }
}

/// One simulated unit.
#[derive(Debug, Clone)]
struct EquipmentUnit {
    config: EquipmentConfig,
    start_offset: Duration,
    state: SimulatorState,
}

/// Drives a fleet of simulated equipment.
#[derive(Debug)]
pub struct TelemetrySimulator {
    units: Vec<EquipmentUnit>,
    scenario: Scenario,
    smoothing: f64,
    tick_interval: Duration,
    duration: Duration,
    status_every: u64,
    seed: u64,
    rng: StdRng,
    tick: u64,
}

impl TelemetrySimulator {
    /// Build a simulator from configuration.
    ///
    /// An unset seed is drawn at random; [`Self::seed`] reports it so a run can
    /// be repeated.
    #[must_use]
    pub fn new(config: &SimulatorConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let stagger = Duration::from_millis(config.stagger_ms);
        let units = config
            .equipment
            .iter()
            .zip(0u32..)
            .map(|(equipment, index)| EquipmentUnit {
                config: equipment.clone(),
                start_offset: stagger * index,
                state: SimulatorState::new(config.scenario),
            })
            .collect();

        Self {
            units,
            scenario: config.scenario,
            smoothing: config.smoothing_factor,
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            duration: Duration::from_secs(config.duration_secs),
            status_every: config.status_every,
            seed,
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
        }
    }

    /// Override the run length.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Scenario driving every unit.
    #[must_use]
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Seed of the noise generator.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Equipment ids in start order.
    #[must_use]
    pub fn equipment_ids(&self) -> Vec<String> {
        self.units.iter().map(|u| u.config.id.clone()).collect()
    }

    /// Start schedule as `(equipment, offset)` pairs.
    #[must_use]
    pub fn schedule(&self) -> Vec<(&EquipmentConfig, Duration)> {
        self.units
            .iter()
            .map(|u| (&u.config, u.start_offset))
            .collect()
    }

    /// Simulated time of the next tick.
    #[must_use]
    pub fn simulated_elapsed(&self) -> Duration {
        self.tick_interval * u32::try_from(self.tick).unwrap_or(u32::MAX)
    }

    /// Whether the configured duration has been covered.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.simulated_elapsed() >= self.duration
    }

    /// Smoothed state of one unit.
    #[must_use]
    pub fn state(&self, equipment_id: &str) -> Option<&SimulatorState> {
        self.units
            .iter()
            .find(|u| u.config.id == equipment_id)
            .map(|u| &u.state)
    }

    /// Advance every started unit by one tick and return their frames.
    pub fn step(&mut self) -> Vec<DiagnosticFrame> {
        let now = self.simulated_elapsed();
        let smoothing = self.smoothing;
        let rng = &mut self.rng;

        let frames = self
            .units
            .iter_mut()
            .filter_map(|unit| {
                let elapsed = now.checked_sub(unit.start_offset)?;
                unit.state.advance(elapsed.as_secs_f64(), smoothing);
                let reading = unit.state.sample(&mut *rng);
                Some(DiagnosticFrame::from_bytes(
                    unit.config.id.clone(),
                    unit.config.protocol_id.clone(),
                    codec::encode_bytes(
                        reading.rpm,
                        reading.coolant_temp_c,
                        reading.oil_pressure_psi,
                        reading.fuel_level_pct,
                    ),
                    Utc::now(),
                ))
            })
            .collect();

        self.tick += 1;
        frames
    }

    /// Return every unit to a cold start and rewind the noise generator.
    pub fn reset(&mut self) {
        for unit in &mut self.units {
            unit.state = SimulatorState::new(self.scenario);
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        self.tick = 0;
    }

    /// Run until the configured duration is covered or `handle` is stopped.
    ///
    /// Submission errors never abort the run; they are counted and the first
    /// few are logged. A stop abandons any submission still in flight.
    pub async fn run(&mut self, sink: &dyn FrameSink, handle: &SimulatorHandle) -> SimulationSummary {
        info!(
            scenario = %self.scenario,
            seed = self.seed,
            equipment = self.units.len(),
            target = %sink.describe(),
            "simulation started"
        );

        let started = Instant::now();
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut frames_sent = 0u64;
        let mut errors = 0u64;

        'ticks: while !self.is_finished() && !handle.should_stop() {
            tokio::select! {
                _ = interval.tick() => {}
                () = handle.stopped() => break,
            }

            let simulated = self.simulated_elapsed();
            for frame in self.step() {
                let result = tokio::select! {
                    result = sink.submit(&frame) => result,
                    () = handle.stopped() => break 'ticks,
                };
                match result {
                    Ok(()) => {
                        frames_sent += 1;
                        if self.status_every > 0 && frames_sent % self.status_every == 0 {
                            self.log_status(&frame, simulated);
                        }
                    }
                    Err(e) => {
                        errors += 1;
                        if errors <= LOGGED_ERRORS {
                            warn!(equipment = %frame.equipment_id(), error = %e, "failed to submit frame");
                        } else {
                            debug!(equipment = %frame.equipment_id(), error = %e, "failed to submit frame");
                        }
                    }
                }
            }
        }

        let summary = SimulationSummary {
            frames_sent,
            errors,
            elapsed: started.elapsed(),
            simulated: self.simulated_elapsed().min(self.duration),
            interrupted: !self.is_finished(),
            equipment: self.equipment_ids(),
        };
        info!(
            frames_sent = summary.frames_sent,
            errors = summary.errors,
            interrupted = summary.interrupted,
            "simulation finished"
        );
        summary
    }

    fn log_status(&self, frame: &DiagnosticFrame, simulated: Duration) {
        let phase = self
            .state(frame.equipment_id())
            .map_or_else(String::new, |s| s.phase().to_string());
        match frame.decode() {
            Ok(reading) => info!(
                "[{:.1}s] {} | {} | State: {}",
                simulated.as_secs_f64(),
                frame.equipment_id(),
                reading,
                phase
            ),
            Err(e) => warn!(equipment = %frame.equipment_id(), error = %e, "undecodable status frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{self, Severity, Signal};
    use crate::error::{Error, Result};
    use crate::ingest::TelemetryService;

    fn config(scenario: Scenario, equipment: &[&str]) -> SimulatorConfig {
        SimulatorConfig {
            scenario,
            seed: Some(42),
            stagger_ms: 0,
            equipment: equipment
                .iter()
                .map(|id| EquipmentConfig::new(*id, *id))
                .collect(),
            ..SimulatorConfig::default()
        }
    }

    /// Step until the given simulated second and return the last frame.
    fn frame_at(sim: &mut TelemetrySimulator, secs: u64) -> DiagnosticFrame {
        let mut last = None;
        while sim.simulated_elapsed() <= Duration::from_secs(secs) {
            last = sim.step().pop();
        }
        last.unwrap()
    }

    #[test]
    fn test_overheat_scenario_stays_critical_after_thirty_seconds() {
        let mut sim = TelemetrySimulator::new(&config(Scenario::Overheat, &["CAT320"]));
        let thirty = Duration::from_secs(30);
        let mut checked = 0;

        while !sim.is_finished() {
            let elapsed = sim.simulated_elapsed();
            let frame = sim.step().pop().unwrap();
            if elapsed < thirty {
                continue;
            }

            let reading = frame.decode().unwrap();
            assert!(reading.coolant_temp_c > 105.0, "at {elapsed:?}: {reading}");
            assert!(
                alerts::evaluate(&reading)
                    .iter()
                    .any(|a| a.signal == Signal::CoolantTemp && a.severity == Severity::Critical),
                "at {elapsed:?}: {reading}"
            );
            checked += 1;
        }

        // 30 s through the default 120 s at 4 ticks per second
        assert_eq!(checked, 360);
        assert_eq!(sim.state("CAT320").unwrap().phase(), Phase::Cooldown);
    }

    #[test]
    fn test_low_pressure_scenario_drops_oil() {
        let mut sim = TelemetrySimulator::new(&config(Scenario::LowPressure, &["CAT320"]));
        let reading = frame_at(&mut sim, 50).decode().unwrap();

        assert!(reading.oil_pressure_psi <= 18.0, "{reading}");
        assert!(alerts::evaluate(&reading)
            .iter()
            .any(|a| a.signal == Signal::OilPressure));
    }

    #[test]
    fn test_frames_carry_equipment_and_protocol() {
        let mut cfg = config(Scenario::Normal, &["CAT320"]);
        cfg.equipment[0].protocol_id = "0x18FEEE00".to_string();
        let mut sim = TelemetrySimulator::new(&cfg);

        let frames = sim.step();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].equipment_id(), "CAT320");
        assert_eq!(frames[0].protocol_id(), "0x18FEEE00");
    }

    #[test]
    fn test_stagger_delays_start() {
        let mut cfg = config(Scenario::Normal, &["A", "B", "C"]);
        cfg.stagger_ms = 500;
        cfg.tick_interval_ms = 250;
        let mut sim = TelemetrySimulator::new(&cfg);

        let counts: Vec<usize> = (0..5).map(|_| sim.step().len()).collect();
        // B starts at 500 ms (tick 2), C at 1000 ms (tick 4)
        assert_eq!(counts, vec![1, 1, 2, 2, 3]);

        let schedule: Vec<Duration> = sim.schedule().into_iter().map(|(_, d)| d).collect();
        assert_eq!(
            schedule,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_secs(1)
            ]
        );
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let cfg = config(Scenario::Normal, &["CAT320", "VOLVO240"]);
        let mut a = TelemetrySimulator::new(&cfg);
        let mut b = TelemetrySimulator::new(&cfg);

        for _ in 0..200 {
            let pa: Vec<String> = a.step().iter().map(|f| f.payload().to_string()).collect();
            let pb: Vec<String> = b.step().iter().map(|f| f.payload().to_string()).collect();
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn test_reset_restarts_fresh() {
        let cfg = config(Scenario::Overheat, &["CAT320"]);
        let mut sim = TelemetrySimulator::new(&cfg);
        let first: Vec<String> = (0..50)
            .flat_map(|_| sim.step())
            .map(|f| f.payload().to_string())
            .collect();

        sim.reset();
        assert_eq!(sim.simulated_elapsed(), Duration::ZERO);
        let second: Vec<String> = (0..50)
            .flat_map(|_| sim.step())
            .map(|f| f.payload().to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_finished() {
        let mut cfg = config(Scenario::Normal, &["CAT320"]);
        cfg.tick_interval_ms = 250;
        let mut sim = TelemetrySimulator::new(&cfg).with_duration(Duration::from_secs(1));
        let mut ticks = 0;
        while !sim.is_finished() {
            sim.step();
            ticks += 1;
        }
        assert_eq!(ticks, 4);
    }

    #[test]
    fn test_handle_stop_and_reset() {
        let handle = SimulatorHandle::new();
        let clone = handle.clone();
        assert!(!handle.should_stop());

        clone.stop();
        assert!(handle.should_stop());

        handle.reset();
        assert!(!clone.should_stop());
    }

    #[tokio::test]
    async fn test_run_submits_to_buffer() {
        let mut cfg = config(Scenario::Normal, &["CAT320", "KOMATSU350"]);
        cfg.tick_interval_ms = 1;
        let mut sim = TelemetrySimulator::new(&cfg).with_duration(Duration::from_millis(20));

        let service = TelemetryService::new(60);
        let sink = BufferSink::new(service.clone());
        let summary = sim.run(&sink, &SimulatorHandle::new()).await;

        assert_eq!(summary.frames_sent, 40);
        assert_eq!(summary.errors, 0);
        assert!(!summary.interrupted);
        assert_eq!(summary.equipment, vec!["CAT320", "KOMATSU350"]);
        assert_eq!(service.recent("CAT320", 100).len(), 20);
        assert_eq!(service.recent("KOMATSU350", 100).len(), 20);
    }

    #[tokio::test]
    async fn test_run_stops_on_signal() {
        let mut sim = TelemetrySimulator::new(&config(Scenario::Normal, &["CAT320"]));
        let handle = SimulatorHandle::new();
        handle.stop();

        let sink = BufferSink::new(TelemetryService::new(60));
        let summary = sim.run(&sink, &handle).await;
        assert_eq!(summary.frames_sent, 0);
        assert!(summary.interrupted);
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_stop() {
        let handle = SimulatorHandle::new();
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), handle.stopped())
            .await
            .unwrap();

        handle.reset();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_while_remote_target_hangs() {
        crate::logging::init_test_logging();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut cfg = config(Scenario::Normal, &["CAT320"]);
        cfg.tick_interval_ms = 10;
        let mut sim = TelemetrySimulator::new(&cfg);
        let sink = HttpSink::new(&format!("http://{addr}"), Duration::from_secs(60)).unwrap();

        let handle = SimulatorHandle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stopper.stop();
        });

        let summary = tokio::time::timeout(Duration::from_secs(5), sim.run(&sink, &handle))
            .await
            .expect("run should return promptly after stop");
        assert!(summary.interrupted);
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.equipment, vec!["CAT320"]);
    }

    struct FailingSink;

    #[async_trait::async_trait]
    impl FrameSink for FailingSink {
        async fn submit(&self, _frame: &DiagnosticFrame) -> Result<()> {
            Err(Error::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[tokio::test]
    async fn test_run_counts_errors() {
        let mut cfg = config(Scenario::Normal, &["CAT320"]);
        cfg.tick_interval_ms = 1;
        let mut sim = TelemetrySimulator::new(&cfg).with_duration(Duration::from_millis(10));

        let summary = sim.run(&FailingSink, &SimulatorHandle::new()).await;
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.errors, 10);
    }

    #[test]
    fn test_summary_display() {
        let summary = SimulationSummary {
            frames_sent: 12,
            errors: 1,
            elapsed: Duration::from_secs(3),
            simulated: Duration::from_secs(3),
            interrupted: true,
            equipment: vec!["CAT320".to_string()],
        };
        let text = summary.to_string();
        assert!(text.contains("12 frames sent"));
        assert!(text.contains("interrupted"));
    }
}
