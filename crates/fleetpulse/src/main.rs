//! `fleetpulse` - CLI for the fleetpulse telemetry pipeline
//!
//! This binary runs the ingestion server and the equipment simulator, and
//! offers offline tools for payloads and fault codes.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use fleetpulse::cli::{
    Cli, Command, ConfigCommand, DecodeCommand, EncodeCommand, FaultCommand, FaultsCommand,
    OutputFormat, ServeCommand, SimulateCommand,
};
use fleetpulse::config::EquipmentConfig;
use fleetpulse::server::{self, AppState};
use fleetpulse::simulator::{BufferSink, FrameSink, HttpSink};
use fleetpulse::{
    alerts, codec, init_logging, Alert, Config, FaultCode, FaultCodeResolver, SimulatorHandle,
    TelemetryService, TelemetrySimulator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    // Execute the command
    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd).await,
        Command::Simulate(cmd) => handle_simulate(config, cmd).await,
        Command::Decode(cmd) => handle_decode(&cmd),
        Command::Encode(cmd) => {
            handle_encode(&cmd);
            Ok(())
        }
        Command::Fault(cmd) => handle_fault(&cmd),
        Command::Faults(cmd) => handle_faults(&cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> Result<()> {
    if let Some(listen) = cmd.listen {
        config.server.listen = listen;
    }
    if let Some(capacity) = cmd.capacity {
        config.buffer.capacity = capacity;
    }
    if let Some(scenario) = cmd.scenario {
        config.simulator.scenario = scenario;
    }
    config.validate()?;

    let service = TelemetryService::new(config.buffer.capacity);
    let state = AppState::new(service.clone(), config.server.default_recent_count);
    let server = server::spawn(config.server.listen, state).await?;
    println!("Listening on http://{}", server.local_addr());

    let sim_handle = SimulatorHandle::new();
    let sim_task = cmd.simulate.then(|| {
        let mut simulator = TelemetrySimulator::new(&config.simulator);
        let sink = BufferSink::new(service.clone());
        let handle = sim_handle.clone();
        println!(
            "Simulating {} equipment ({} scenario, seed {})",
            config.simulator.equipment.len(),
            simulator.scenario(),
            simulator.seed()
        );
        tokio::spawn(async move { simulator.run(&sink, &handle).await })
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutdown requested");

    if let Some(task) = sim_task {
        sim_handle.stop();
        let summary = task.await.context("simulator task failed")?;
        println!("Simulator: {summary}");
    }
    server.shutdown().await?;

    let stats = service.stats();
    println!(
        "Buffered {} frames across {} equipment",
        stats.total_frames, stats.equipment_count
    );
    Ok(())
}

async fn handle_simulate(mut config: Config, cmd: SimulateCommand) -> Result<()> {
    let sim = &mut config.simulator;
    if let Some(scenario) = cmd.scenario {
        sim.scenario = scenario;
    }
    if let Some(duration) = cmd.duration {
        sim.duration_secs = duration;
    }
    if let Some(tick) = cmd.tick {
        sim.tick_interval_ms = tick;
    }
    if cmd.seed.is_some() {
        sim.seed = cmd.seed;
    }
    if cmd.target.is_some() {
        sim.target_url = cmd.target;
    }
    if !cmd.equipment.is_empty() {
        sim.equipment = cmd
            .equipment
            .iter()
            .map(|id| EquipmentConfig::new(id.as_str(), id.as_str()))
            .collect();
    }
    config.validate()?;

    let mut simulator = TelemetrySimulator::new(&config.simulator);
    let local = TelemetryService::new(config.buffer.capacity);
    let sink: Box<dyn FrameSink> = match &config.simulator.target_url {
        Some(url) => Box::new(HttpSink::new(url, config.request_timeout())?),
        None => Box::new(BufferSink::new(local.clone())),
    };

    println!("FleetPulse diagnostic simulator");
    println!("  Target:    {}", sink.describe());
    println!("  Scenario:  {}", simulator.scenario());
    println!("  Seed:      {}", simulator.seed());
    println!("  Duration:  {}s", config.simulator.duration_secs);
    println!("  Interval:  {}ms", config.simulator.tick_interval_ms);
    println!();
    println!("Equipment schedule:");
    for (equipment, offset) in simulator.schedule() {
        println!(
            "  [{:>4.1}s] {} ({})",
            offset.as_secs_f64(),
            equipment.name,
            equipment.id
        );
    }
    println!();

    let handle = SimulatorHandle::new();
    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let summary = simulator.run(sink.as_ref(), &handle).await;
    println!();
    println!("Simulation complete: {summary}");
    println!("  Wall time: {:.1}s", summary.elapsed.as_secs_f64());

    if config.simulator.target_url.is_none() {
        println!();
        println!("Latest readings:");
        for id in &summary.equipment {
            match local.latest_interpreted(id) {
                Some(frame) => match frame.reading {
                    Some(reading) => {
                        println!("  {id:<12} {reading}");
                        print_alerts("    ", &frame.alerts);
                    }
                    None => println!("  {id:<12} (undecodable)"),
                },
                None => println!("  {id:<12} (no frames)"),
            }
        }
    }

    if summary.errors > 0 {
        warn!(errors = summary.errors, "some frames were not delivered");
    }
    Ok(())
}

fn handle_decode(cmd: &DecodeCommand) -> Result<()> {
    let payload = codec::normalize_payload(&cmd.payload)?;
    let reading = codec::decode(&payload)?;
    let alerts = alerts::evaluate(&reading);

    if cmd.json {
        let output = serde_json::json!({
            "payload": payload,
            "reading": reading,
            "alerts": alerts,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Payload:  {payload}");
        println!("RPM:      {:.3}", reading.rpm);
        println!("Coolant:  {:.0} °C", reading.coolant_temp_c);
        println!("Oil:      {:.0} PSI", reading.oil_pressure_psi);
        println!("Fuel:     {:.0} %", reading.fuel_level_pct);
        if alerts.is_empty() {
            println!("Alerts:   none");
        } else {
            println!("Alerts:");
            print_alerts("  ", &alerts);
        }
    }
    Ok(())
}

fn handle_encode(cmd: &EncodeCommand) {
    println!("{}", codec::encode(cmd.rpm, cmd.coolant, cmd.oil, cmd.fuel));
}

fn handle_fault(cmd: &FaultCommand) -> Result<()> {
    let fault = FaultCodeResolver::new().resolve(&cmd.code);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&fault)?);
        return Ok(());
    }

    println!("{} - {}", fault.code, fault.description);
    println!("Severity:  {}", fault.severity);
    if fault.is_known() {
        println!("Component: {}", fault.component);
    }
    println!();
    println!("Possible causes:");
    for cause in &fault.possible_causes {
        println!("  - {cause}");
    }
    println!("Suggested fixes:");
    for (i, fix) in fault.suggested_fixes.iter().enumerate() {
        println!("  {}. {fix}", i + 1);
    }
    Ok(())
}

fn handle_faults(cmd: &FaultsCommand) -> Result<()> {
    let resolver = FaultCodeResolver::new();
    let faults = match &cmd.query {
        Some(query) => resolver.search(query),
        None => resolver.all(),
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&faults)?),
        OutputFormat::Plain => {
            for fault in &faults {
                println!("{} {}", fault.code, fault.description);
            }
        }
        OutputFormat::Table => print_fault_table(&faults),
    }
    Ok(())
}

fn print_fault_table(faults: &[FaultCode]) {
    if faults.is_empty() {
        println!("No matching fault codes.");
        return;
    }
    println!(
        "{:<12} {:<9} {:<13} DESCRIPTION",
        "CODE", "SEVERITY", "COMPONENT"
    );
    for fault in faults {
        println!(
            "{:<12} {:<9} {:<13} {}",
            fault.code,
            fault.severity.to_string(),
            fault.component,
            fault.description
        );
    }
}

fn print_alerts(indent: &str, alerts: &[Alert]) {
    for alert in alerts {
        println!("{indent}[{}] {}", alert.severity, alert.message);
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Buffer]");
                println!("  Capacity:           {}", config.buffer.capacity);
                println!();
                println!("[Server]");
                println!("  Listen:             {}", config.server.listen);
                println!(
                    "  Default recent:     {}",
                    config.server.default_recent_count
                );
                println!();
                let sim = &config.simulator;
                println!("[Simulator]");
                println!("  Scenario:           {}", sim.scenario);
                println!("  Tick interval (ms): {}", sim.tick_interval_ms);
                println!("  Duration (s):       {}", sim.duration_secs);
                println!("  Smoothing factor:   {}", sim.smoothing_factor);
                println!("  Stagger (ms):       {}", sim.stagger_ms);
                println!(
                    "  Seed:               {}",
                    sim.seed.map_or_else(|| "random".to_string(), |s| s.to_string())
                );
                println!(
                    "  Target:             {}",
                    sim.target_url.as_deref().unwrap_or("in-process")
                );
                println!("  Equipment:");
                for equipment in &sim.equipment {
                    println!(
                        "    {:<12} {:<12} {}",
                        equipment.id, equipment.protocol_id, equipment.name
                    );
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
