//! Fault code resolution.
//!
//! This module maps controller fault codes to human-readable diagnoses:
//!
//! - **Exact lookup**: case-insensitive match against the built-in library.
//!
//! - **Fuzzy fallback**: strips a known prefix (`J1939-F`, `P`) and returns the
//!   first library key containing the remainder. Keys are scanned in sorted
//!   order so the result never depends on hash iteration.
//!
//! - **Unknown codes**: resolve to a synthetic `info` entry rather than an error.
//!
//! # Example
//!
//! ```
//! use fleetpulse::faults::FaultCodeResolver;
//!
//! let resolver = FaultCodeResolver::new();
//! let fault = resolver.resolve("p0520");
//! assert_eq!(fault.code, "P0520");
//!
//! let fuzzy = resolver.resolve("0520");
//! assert_eq!(fuzzy.code, "P0520");
//! ```

mod library;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::alerts::Severity;

pub use library::{builtin_fault_codes, FaultDefinition};

/// Prefixes stripped before the fuzzy fallback, longest first.
const KNOWN_PREFIXES: [&str; 2] = ["J1939-F", "P"];

/// A resolved fault code with its diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultCode {
    /// The code, e.g. `P0520`.
    pub code: String,
    /// Short human-readable description.
    pub description: String,
    /// Likely causes, most likely first.
    pub possible_causes: Vec<String>,
    /// Suggested fixes, in the order to try them.
    pub suggested_fixes: Vec<String>,
    /// How serious the fault is.
    pub severity: Severity,
    /// Affected subsystem; empty for unknown codes.
    pub component: String,
}

impl FaultCode {
    /// Build the synthetic entry returned for codes not in the library.
    #[must_use]
    pub fn unknown(code: &str) -> Self {
        let description = if code.is_empty() {
            "Unknown fault code".to_string()
        } else {
            format!("Unknown fault code: {code}")
        };
        Self {
            code: code.to_string(),
            description,
            possible_causes: vec!["Unknown fault".to_string()],
            suggested_fixes: vec!["Contact service center".to_string()],
            severity: Severity::Info,
            component: String::new(),
        }
    }

    /// Whether this entry came from the library rather than the unknown fallback.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !self.component.is_empty()
    }
}

impl From<&FaultDefinition> for FaultCode {
    fn from(def: &FaultDefinition) -> Self {
        Self {
            code: def.code.to_string(),
            description: def.description.to_string(),
            possible_causes: def.possible_causes.iter().map(ToString::to_string).collect(),
            suggested_fixes: def.suggested_fixes.iter().map(ToString::to_string).collect(),
            severity: def.severity,
            component: def.component.to_string(),
        }
    }
}

/// Resolves fault codes against the built-in library.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct FaultCodeResolver {
    /// Entries keyed by uppercase code. Sorted, which fixes the fuzzy tie-break.
    library: BTreeMap<String, FaultCode>,
}

impl Default for FaultCodeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultCodeResolver {
    /// Create a resolver over the built-in library.
    #[must_use]
    pub fn new() -> Self {
        Self::with_definitions(builtin_fault_codes())
    }

    /// Create a resolver over a custom set of definitions.
    #[must_use]
    pub fn with_definitions(definitions: &[FaultDefinition]) -> Self {
        let library = definitions
            .iter()
            .map(|def| (def.code.to_uppercase(), FaultCode::from(def)))
            .collect();
        Self { library }
    }

    /// Number of entries in the library.
    #[must_use]
    pub fn len(&self) -> usize {
        self.library.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    /// Resolve a code to its diagnosis.
    ///
    /// Never fails: codes that match nothing resolve to [`FaultCode::unknown`].
    #[must_use]
    pub fn resolve(&self, code: &str) -> FaultCode {
        let code = code.trim();
        if code.is_empty() {
            return FaultCode::unknown("");
        }

        let upper = code.to_uppercase();
        if let Some(fault) = self.library.get(&upper) {
            trace!(code = %upper, "exact fault code match");
            return fault.clone();
        }

        let stripped = strip_known_prefix(&upper);
        if !stripped.is_empty() {
            if let Some((key, fault)) = self.library.iter().find(|(key, _)| key.contains(stripped)) {
                debug!(code = %code, matched = %key, "partial fault code match");
                return fault.clone();
            }
        }

        debug!(code = %code, "unknown fault code");
        FaultCode::unknown(code)
    }

    /// Search codes and descriptions for a case-insensitive substring.
    ///
    /// An empty query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<FaultCode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.library
            .values()
            .filter(|fault| {
                fault.code.to_lowercase().contains(&needle)
                    || fault.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// All library entries in code order.
    #[must_use]
    pub fn all(&self) -> Vec<FaultCode> {
        self.library.values().cloned().collect()
    }
}

fn strip_known_prefix(code: &str) -> &str {
    KNOWN_PREFIXES
        .iter()
        .find_map(|prefix| code.strip_prefix(prefix))
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_match() {
        let resolver = FaultCodeResolver::new();
        let fault = resolver.resolve("P0520");
        assert_eq!(fault.code, "P0520");
        assert_eq!(fault.severity, Severity::Critical);
        assert_eq!(fault.component, "engine");
        assert_eq!(fault.possible_causes[0], "Low oil level");
        assert!(fault.is_known());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = FaultCodeResolver::new();
        assert_eq!(resolver.resolve("j1939-f002").code, "J1939-F002");
        assert_eq!(resolver.resolve("p0118").code, "P0118");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let resolver = FaultCodeResolver::new();
        assert_eq!(resolver.resolve("  P0700 ").code, "P0700");
    }

    #[test]
    fn test_resolve_partial_match() {
        let resolver = FaultCodeResolver::new();
        assert_eq!(resolver.resolve("0520").code, "P0520");
        assert_eq!(resolver.resolve("F003").code, "J1939-F003");
    }

    #[test]
    fn test_resolve_partial_match_strips_prefix() {
        let resolver = FaultCodeResolver::new();
        // "P052" is not a key; stripping "P" leaves "052", first sorted key containing it
        assert_eq!(resolver.resolve("P052").code, "P0520");
        // "J1939-F00" strips to "00"; "J1939-F001" sorts before every P code
        assert_eq!(resolver.resolve("J1939-F00").code, "J1939-F001");
    }

    #[test]
    fn test_resolve_partial_match_is_deterministic_by_sorted_key() {
        let resolver = FaultCodeResolver::new();
        // "001" appears in both J1939-F001 and P0001; 'J' sorts before 'P'
        assert_eq!(resolver.resolve("001").code, "J1939-F001");
    }

    #[test]
    fn test_resolve_unknown() {
        let resolver = FaultCodeResolver::new();
        let fault = resolver.resolve("X9999");
        assert_eq!(fault.code, "X9999");
        assert_eq!(fault.description, "Unknown fault code: X9999");
        assert_eq!(fault.severity, Severity::Info);
        assert_eq!(fault.possible_causes, vec!["Unknown fault".to_string()]);
        assert_eq!(fault.suggested_fixes, vec!["Contact service center".to_string()]);
        assert!(!fault.is_known());
    }

    #[test]
    fn test_resolve_empty() {
        let resolver = FaultCodeResolver::new();
        let fault = resolver.resolve("");
        assert_eq!(fault.description, "Unknown fault code");
        assert_eq!(fault.severity, Severity::Info);

        let blank = resolver.resolve("   ");
        assert_eq!(blank, fault);
    }

    #[test]
    fn test_resolve_bare_prefix_is_unknown() {
        let resolver = FaultCodeResolver::new();
        assert!(!resolver.resolve("P").is_known());
        assert!(!resolver.resolve("J1939-F").is_known());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = FaultCodeResolver::new();
        for code in ["P0520", "0520", "nope", "", "f002"] {
            assert_eq!(resolver.resolve(code), resolver.resolve(code));
        }
    }

    #[test]
    fn test_search_by_description() {
        let resolver = FaultCodeResolver::new();
        let results = resolver.search("oil pressure");
        let codes: Vec<&str> = results.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["J1939-F001", "P0520", "P0521"]);
    }

    #[test]
    fn test_search_by_code() {
        let resolver = FaultCodeResolver::new();
        let results = resolver.search("p07");
        let codes: Vec<&str> = results.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["P0700", "P0715"]);
    }

    #[test]
    fn test_search_empty_query() {
        let resolver = FaultCodeResolver::new();
        assert!(resolver.search("").is_empty());
        assert!(resolver.search("  ").is_empty());
    }

    #[test]
    fn test_search_no_match() {
        let resolver = FaultCodeResolver::new();
        assert!(resolver.search("hydraulic").is_empty());
    }

    #[test]
    fn test_all_is_sorted() {
        let resolver = FaultCodeResolver::new();
        let all = resolver.all();
        assert_eq!(all.len(), builtin_fault_codes().len());
        assert_eq!(all.len(), resolver.len());
        let mut codes: Vec<String> = all.iter().map(|f| f.code.clone()).collect();
        let original = codes.clone();
        codes.sort();
        assert_eq!(codes, original);
    }

    #[test]
    fn test_with_definitions() {
        let resolver = FaultCodeResolver::with_definitions(&[]);
        assert!(resolver.is_empty());
        assert!(!resolver.resolve("P0520").is_known());
    }

    #[test]
    fn test_fault_code_serialization() {
        let resolver = FaultCodeResolver::new();
        let json = serde_json::to_value(resolver.resolve("P0480")).unwrap();
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["component"], "emissions");
        assert!(json["possibleCauses"].is_array());
        assert!(json["suggestedFixes"].is_array());
    }
}
