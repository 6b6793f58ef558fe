//! Index data model: metric snapshots in, composite index out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vajra_core::{Module, Severity};

/// Latest metrics pushed by the network/bot analysis module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShieldMetrics {
    pub blocked_threats: u64,
    pub requests_analyzed: u64,
    pub average_bot_score: f64,
    pub bunker_mode_activations: u32,
    pub ddos_attacks: u32,
}

/// Latest metrics pushed by the vendor scanning module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutMetrics {
    pub vendor_count: u32,
    pub average_vendor_score: f64,
    pub high_risk_vendors: u32,
    pub recent_breaches: u32,
    pub compliance_rate: f64,
}

/// Latest metrics pushed by the employee risk module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentryMetrics {
    pub employee_count: u32,
    pub average_security_score: f64,
    pub phish_prone_percentage: f64,
    pub training_completion: f64,
    pub mfa_adoption: f64,
    pub recent_phishing_clicks: u32,
}

/// Latest metrics pushed by the code scanning module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AegisMetrics {
    pub security_score: f64,
    pub critical_vulns: u32,
    pub high_vulns: u32,
    pub medium_vulns: u32,
    pub secrets_found: u32,
    pub outdated_deps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Grade {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

/// Direction of change. No historical window is kept, so every trend is
/// the `Stable` sentinel rather than a fabricated moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleScore {
    pub score: f64,
    pub weight: f64,
    pub status: ModuleStatus,
    pub trend: Trend,
    pub key_metrics: BTreeMap<String, String>,
    pub last_activity: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskSummary {
    /// Toxic combinations at critical priority.
    pub critical_issues: usize,
    /// Toxic combinations at high priority.
    pub high_issues: usize,
    /// Unhandled critical events.
    pub active_threats: usize,
    /// All unhandled events.
    pub pending_actions: usize,
}

/// A security event recorded against the index; feeds the risk summary
/// and the recent-events feed.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub id: String,
    pub module: Module,
    pub event_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub timestamp: i64,
    pub handled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopRecommendation {
    /// 1-based rank.
    pub priority: u32,
    pub module: Module,
    pub title: String,
    pub description: String,
    pub impact: String,
}

/// The composite index, recomputed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct VajraSecurityIndex {
    pub overall_score: u32,
    pub grade: Grade,
    pub trend: Trend,
    pub module_scores: BTreeMap<String, ModuleScore>,
    pub risk_summary: RiskSummary,
    pub recent_events: Vec<SecurityEvent>,
    pub recommendations: Vec<TopRecommendation>,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveSummary {
    pub headline: String,
    pub main_risk: Option<String>,
    pub key_metrics: Vec<KeyMetric>,
    pub action_items: Vec<String>,
}
