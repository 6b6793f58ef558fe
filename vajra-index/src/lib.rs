//! # Vajra Security Index (VSI)
//!
//! Rolls the latest metric snapshot from each scanning module (shield,
//! scout, sentry, aegis) and the graph's derived findings into one
//! weighted 0-100 composite score with a letter grade, per-module
//! status, and ranked recommendations.

pub mod calculator;
pub mod types;

pub use calculator::VsiCalculator;
pub use types::{
    AegisMetrics, ExecutiveSummary, Grade, ModuleScore, ModuleStatus, RiskSummary, ScoutMetrics,
    SecurityEvent, SentryMetrics, ShieldMetrics, TopRecommendation, Trend, VajraSecurityIndex,
};
