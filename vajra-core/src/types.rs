//! Shared severity and module vocabulary.
//!
//! Every alert, security event, and notification filter speaks in these
//! terms. `Severity` is rank-ordered: a LOWER rank number means a MORE
//! severe condition, so a severity "meets" a channel's minimum filter
//! when its rank is less than or equal to the configured rank.

use serde::{Deserialize, Serialize};

/// Alert/event severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Numeric rank: critical=0 .. info=4.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Whether this severity passes a `min_severity` filter.
    pub fn meets(self, min: Severity) -> bool {
        self.rank() <= min.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four scanning modules that feed the correlation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    /// Network/bot analysis
    Shield,
    /// Vendor scanning
    Scout,
    /// Employee risk scoring
    Sentry,
    /// Code scanning
    Aegis,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::Shield, Module::Scout, Module::Sentry, Module::Aegis];

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Shield => "shield",
            Module::Scout => "scout",
            Module::Sentry => "sentry",
            Module::Aegis => "aegis",
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rank_order() {
        assert_eq!(Severity::Critical.rank(), 0);
        assert_eq!(Severity::Info.rank(), 4);
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::Low < Severity::Info);
    }

    #[test]
    fn test_severity_meets_filter() {
        // Filter set to medium: critical/high/medium pass, low/info do not.
        assert!(Severity::Critical.meets(Severity::Medium));
        assert!(Severity::High.meets(Severity::Medium));
        assert!(Severity::Medium.meets(Severity::Medium));
        assert!(!Severity::Low.meets(Severity::Medium));
        assert!(!Severity::Info.meets(Severity::Medium));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Module::Aegis).unwrap(), "\"aegis\"");
        let s: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(s, Severity::Critical);
    }
}
