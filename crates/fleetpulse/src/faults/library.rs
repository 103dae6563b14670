//! Built-in fault code library.
//!
//! One canonical table of OBD-II style `P` codes and generic J1939 faults
//! seen on heavy equipment.

use crate::alerts::Severity;

/// A static fault code entry.
#[derive(Debug, Clone, Copy)]
pub struct FaultDefinition {
    /// The code as displayed by the controller, e.g. `P0520`.
    pub code: &'static str,
    /// Short human-readable description.
    pub description: &'static str,
    /// How serious the fault is.
    pub severity: Severity,
    /// Affected subsystem.
    pub component: &'static str,
    /// Likely causes, most likely first.
    pub possible_causes: &'static [&'static str],
    /// Suggested fixes, in the order to try them.
    pub suggested_fixes: &'static [&'static str],
}

/// Get all built-in fault definitions.
#[must_use]
pub fn builtin_fault_codes() -> &'static [FaultDefinition] {
    LIBRARY
}

const LIBRARY: &[FaultDefinition] = &[
    // Engine / powerplant
    FaultDefinition {
        code: "P0001",
        description: "Fuel Volume Regulator Control Circuit",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &["Fuel regulator fault", "Wiring issue", "Fuel pump problem"],
        suggested_fixes: &[
            "Check fuel regulator",
            "Inspect wiring connectors",
            "Test fuel pump operation",
        ],
    },
    FaultDefinition {
        code: "P0100",
        description: "Mass or Volume Air Flow Circuit",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &["MAF sensor dirty", "Air intake leak", "Sensor wiring issue"],
        suggested_fixes: &[
            "Clean MAF sensor",
            "Check for air leaks",
            "Verify sensor connections",
        ],
    },
    FaultDefinition {
        code: "P0101",
        description: "Mass or Volume Air Flow Circuit Range/Performance",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &[
            "Air filter clogged",
            "MAF sensor malfunction",
            "Intake manifold leak",
        ],
        suggested_fixes: &[
            "Replace air filter",
            "Check MAF sensor",
            "Inspect manifold gaskets",
        ],
    },
    FaultDefinition {
        code: "P0110",
        description: "Intake Air Temperature Sensor Circuit",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &["Sensor failure", "Wiring open/short", "PCM issue"],
        suggested_fixes: &[
            "Replace IAT sensor",
            "Check wiring harness",
            "Scan for PCM faults",
        ],
    },
    // Coolant temperature
    FaultDefinition {
        code: "P0115",
        description: "Engine Coolant Temperature Sensor Circuit",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &[
            "Thermostat stuck",
            "Temperature sensor failure",
            "Wiring issue",
        ],
        suggested_fixes: &[
            "Check thermostat operation",
            "Replace coolant temp sensor",
            "Inspect wiring connectors",
        ],
    },
    FaultDefinition {
        code: "P0118",
        description: "Engine Coolant Temperature Sensor Circuit High",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &[
            "Cooling system failure",
            "Radiator clogged",
            "Water pump failure",
        ],
        suggested_fixes: &[
            "Flush cooling system",
            "Clean radiator",
            "Inspect water pump",
        ],
    },
    // Fuel / ignition
    FaultDefinition {
        code: "P0300",
        description: "Random/Multiple Cylinder Misfire Detected",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &[
            "Spark plugs worn",
            "Fuel injector clogged",
            "Ignition coil failure",
        ],
        suggested_fixes: &[
            "Replace spark plugs",
            "Clean fuel injectors",
            "Test ignition coils",
        ],
    },
    FaultDefinition {
        code: "P0401",
        description: "EGR Flow Insufficient",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &["EGR valve stuck", "Carbon buildup", "Sensor fault"],
        suggested_fixes: &[
            "Clean EGR valve",
            "Remove carbon deposits",
            "Test EGR sensor",
        ],
    },
    // Emissions
    FaultDefinition {
        code: "P0480",
        description: "Diesel Particulate Filter Blockage",
        severity: Severity::Critical,
        component: "emissions",
        possible_causes: &[
            "Soot accumulation",
            "Regeneration failure",
            "DPF sensor fault",
        ],
        suggested_fixes: &[
            "Force DPF regeneration",
            "Check DPF pressure sensor",
            "Service filter if needed",
        ],
    },
    // Oil pressure
    FaultDefinition {
        code: "P0520",
        description: "Engine Oil Pressure Sensor/Switch Circuit",
        severity: Severity::Critical,
        component: "engine",
        possible_causes: &[
            "Low oil level",
            "Oil pump failure",
            "Sensor malfunction",
            "Clogged filter",
        ],
        suggested_fixes: &[
            "Check oil level immediately",
            "Inspect oil pump",
            "Replace oil pressure sensor",
            "Service oil filter",
        ],
    },
    FaultDefinition {
        code: "P0521",
        description: "Engine Oil Pressure Sensor/Switch Circuit Range/Performance",
        severity: Severity::Critical,
        component: "engine",
        possible_causes: &[
            "Low oil viscosity",
            "Worn bearings",
            "Sensor circuit fault",
        ],
        suggested_fixes: &[
            "Verify oil grade and level",
            "Inspect engine bearings",
            "Test sensor circuit",
        ],
    },
    // Electrical
    FaultDefinition {
        code: "P0622",
        description: "Generator/Alternator Control Circuit",
        severity: Severity::Warning,
        component: "electrical",
        possible_causes: &["Alternator failure", "Belt wear", "Wiring issue"],
        suggested_fixes: &[
            "Test alternator output",
            "Inspect serpentine belt",
            "Check wiring connections",
        ],
    },
    // Transmission
    FaultDefinition {
        code: "P0700",
        description: "Transmission Control System Malfunction",
        severity: Severity::Warning,
        component: "transmission",
        possible_causes: &[
            "Shift solenoid fault",
            "Transmission fluid low",
            "TCM fault",
        ],
        suggested_fixes: &[
            "Check transmission fluid level",
            "Inspect shift solenoids",
            "Scan transmission module",
        ],
    },
    FaultDefinition {
        code: "P0715",
        description: "Input/Turbine Shaft Speed Sensor Circuit",
        severity: Severity::Warning,
        component: "transmission",
        possible_causes: &["Speed sensor failure", "Wiring issue", "Sensor misalignment"],
        suggested_fixes: &[
            "Replace speed sensor",
            "Check wiring harness",
            "Verify sensor alignment",
        ],
    },
    // Generic J1939
    FaultDefinition {
        code: "J1939-F001",
        description: "Engine Oil Pressure Low",
        severity: Severity::Critical,
        component: "engine",
        possible_causes: &["Low oil level", "Pump failure", "Bearing wear"],
        suggested_fixes: &[
            "Top off oil immediately",
            "Inspect pump",
            "Check bearings for wear",
        ],
    },
    FaultDefinition {
        code: "J1939-F002",
        description: "Engine Coolant Temperature High",
        severity: Severity::Critical,
        component: "engine",
        possible_causes: &["Thermostat failed", "Radiator clogged", "Fan inoperative"],
        suggested_fixes: &[
            "Replace thermostat",
            "Flush cooling system",
            "Check fan operation",
        ],
    },
    FaultDefinition {
        code: "J1939-F003",
        description: "Engine Overspeed",
        severity: Severity::Warning,
        component: "engine",
        possible_causes: &["Governor failure", "Fuel control issue", "Sensor malfunction"],
        suggested_fixes: &["Check governor", "Inspect fuel control", "Test sensors"],
    },
];
