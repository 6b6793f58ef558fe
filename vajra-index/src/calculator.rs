//! # VSI calculator
//!
//! Holds the latest snapshot per module (no history), a bounded security
//! event log, and a handle to the security graph. `calculate()` never
//! fails: a module that has not reported yet scores the documented
//! placeholder (75, healthy).

use crate::types::*;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use vajra_core::{Module, Severity};
use vajra_graph::{Priority, SecurityGraph, ToxicCombination};

/// Fixed module weights; must sum to 1.0.
pub const MODULE_WEIGHTS: [(Module, f64); 4] = [
    (Module::Shield, 0.30),
    (Module::Scout, 0.25),
    (Module::Aegis, 0.25),
    (Module::Sentry, 0.20),
];

/// Score assigned to a module that has not reported a snapshot yet.
const PLACEHOLDER_SCORE: f64 = 75.0;
/// Event log trim: once past the high-water mark, keep the most recent.
const EVENT_LOG_HIGH_WATER: usize = 1000;
const EVENT_LOG_KEEP: usize = 500;

pub fn module_weight(module: Module) -> f64 {
    MODULE_WEIGHTS
        .iter()
        .find(|(m, _)| *m == module)
        .map(|(_, w)| *w)
        .expect("all modules weighted")
}

/// Weighted overall score, rounded to the nearest integer.
pub(crate) fn weighted_overall(scores: &[(f64, f64)]) -> u32 {
    scores.iter().map(|(score, weight)| score * weight).sum::<f64>().round() as u32
}

#[derive(Default)]
struct Snapshots {
    shield: Option<(ShieldMetrics, i64)>,
    scout: Option<(ScoutMetrics, i64)>,
    sentry: Option<(SentryMetrics, i64)>,
    aegis: Option<(AegisMetrics, i64)>,
}

/// Vajra Security Index calculator.
pub struct VsiCalculator {
    graph: Arc<SecurityGraph>,
    snapshots: RwLock<Snapshots>,
    events: RwLock<Vec<SecurityEvent>>,
    next_event_id: AtomicU64,
}

impl VsiCalculator {
    pub fn new(graph: Arc<SecurityGraph>) -> Self {
        let weight_sum: f64 = MODULE_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9, "module weights must sum to 1.0");
        Self {
            graph,
            snapshots: RwLock::new(Snapshots::default()),
            events: RwLock::new(Vec::new()),
            next_event_id: AtomicU64::new(1),
        }
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Replace the shield module's latest snapshot. Only the last value is
    /// retained.
    pub fn update_shield(&self, metrics: ShieldMetrics) {
        self.snapshots.write().shield = Some((metrics, chrono::Utc::now().timestamp()));
    }

    pub fn update_scout(&self, metrics: ScoutMetrics) {
        self.snapshots.write().scout = Some((metrics, chrono::Utc::now().timestamp()));
    }

    pub fn update_sentry(&self, metrics: SentryMetrics) {
        self.snapshots.write().sentry = Some((metrics, chrono::Utc::now().timestamp()));
    }

    pub fn update_aegis(&self, metrics: AegisMetrics) {
        self.snapshots.write().aegis = Some((metrics, chrono::Utc::now().timestamp()));
    }

    /// Record a security event against the index. The log is trimmed to
    /// the most recent entries once it grows past the high-water mark.
    pub fn record_event(
        &self,
        module: Module,
        event_type: &str,
        severity: Severity,
        title: &str,
        description: &str,
    ) -> SecurityEvent {
        let event = SecurityEvent {
            id: format!("EV-{}", self.next_event_id.fetch_add(1, Ordering::Relaxed)),
            module,
            event_type: event_type.to_string(),
            severity,
            title: title.to_string(),
            description: description.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            handled: false,
        };
        let mut events = self.events.write();
        events.push(event.clone());
        if events.len() > EVENT_LOG_HIGH_WATER {
            let drain = events.len() - EVENT_LOG_KEEP;
            events.drain(..drain);
        }
        event
    }

    /// Mark an event handled. `false` for unknown ids.
    pub fn handle_event(&self, event_id: &str) -> bool {
        let mut events = self.events.write();
        match events.iter_mut().find(|e| e.id == event_id) {
            Some(event) => {
                event.handled = true;
                true
            }
            None => false,
        }
    }

    // ── Scoring ──────────────────────────────────────────────────────────

    /// Score one module from its latest snapshot; the documented
    /// placeholder (75, healthy) when it has not reported yet.
    pub fn module_score(&self, module: Module) -> ModuleScore {
        let snapshots = self.snapshots.read();
        let mut score = PLACEHOLDER_SCORE;
        let mut status = ModuleStatus::Healthy;
        let mut key_metrics = BTreeMap::new();
        let mut last_activity = None;

        match module {
            Module::Shield => {
                if let Some((m, at)) = &snapshots.shield {
                    key_metrics.insert("Threats Blocked".into(), m.blocked_threats.to_string());
                    key_metrics
                        .insert("Avg Bot Score".into(), format!("{:.1}", m.average_bot_score));
                    score = (PLACEHOLDER_SCORE
                        + if m.blocked_threats > 100 { 15.0 } else { 0.0 })
                    .min(100.0);
                    if m.ddos_attacks > 0 {
                        score -= 10.0;
                        status = ModuleStatus::Warning;
                    }
                    last_activity = Some(*at);
                }
            }
            Module::Scout => {
                if let Some((m, at)) = &snapshots.scout {
                    score = m.average_vendor_score;
                    key_metrics.insert("Vendors".into(), m.vendor_count.to_string());
                    key_metrics.insert("High Risk".into(), m.high_risk_vendors.to_string());
                    key_metrics.insert("Compliance".into(), format!("{}%", m.compliance_rate));
                    if m.high_risk_vendors > 0 {
                        status = ModuleStatus::Warning;
                    }
                    if m.recent_breaches > 0 {
                        status = ModuleStatus::Critical;
                    }
                    last_activity = Some(*at);
                }
            }
            Module::Sentry => {
                if let Some((m, at)) = &snapshots.sentry {
                    score = m.average_security_score;
                    key_metrics.insert("Employees".into(), m.employee_count.to_string());
                    key_metrics.insert("Training".into(), format!("{}%", m.training_completion));
                    key_metrics.insert("MFA".into(), format!("{}%", m.mfa_adoption));
                    key_metrics
                        .insert("Phish-Prone".into(), format!("{}%", m.phish_prone_percentage));
                    if m.phish_prone_percentage > 30.0 {
                        status = ModuleStatus::Warning;
                    }
                    if m.recent_phishing_clicks > 5 {
                        status = ModuleStatus::Critical;
                    }
                    last_activity = Some(*at);
                }
            }
            Module::Aegis => {
                if let Some((m, at)) = &snapshots.aegis {
                    score = m.security_score;
                    key_metrics.insert("Critical".into(), m.critical_vulns.to_string());
                    key_metrics.insert("High".into(), m.high_vulns.to_string());
                    key_metrics.insert("Secrets".into(), m.secrets_found.to_string());
                    if m.critical_vulns > 0 {
                        status = ModuleStatus::Critical;
                    } else if m.high_vulns > 3 {
                        status = ModuleStatus::Warning;
                    }
                    last_activity = Some(*at);
                }
            }
        }

        ModuleScore {
            score,
            weight: module_weight(module),
            status,
            trend: Trend::Stable,
            key_metrics,
            last_activity,
        }
    }

    /// Recompute the full index. Never fails.
    pub fn calculate(&self) -> VajraSecurityIndex {
        let mut module_scores = BTreeMap::new();
        let mut weighted = Vec::new();
        for module in Module::ALL {
            let score = self.module_score(module);
            weighted.push((score.score, score.weight));
            module_scores.insert(module.as_str().to_string(), score);
        }
        let overall_score = weighted_overall(&weighted);

        let toxic = self.graph.find_toxic_combinations();
        let events = self.events.read();
        let risk_summary = RiskSummary {
            critical_issues: toxic.iter().filter(|t| t.priority == Priority::Critical).count(),
            high_issues: toxic.iter().filter(|t| t.priority == Priority::High).count(),
            active_threats: events
                .iter()
                .filter(|e| !e.handled && e.severity == Severity::Critical)
                .count(),
            pending_actions: events.iter().filter(|e| !e.handled).count(),
        };
        let recent_events: Vec<SecurityEvent> = events.iter().rev().take(10).cloned().collect();
        drop(events);

        let recommendations = self.build_recommendations(&module_scores, &toxic);
        debug!(overall = overall_score, toxic = toxic.len(), "VSI recomputed");

        VajraSecurityIndex {
            overall_score,
            grade: Grade::from_score(overall_score),
            trend: Trend::Stable,
            module_scores,
            risk_summary,
            recent_events,
            recommendations,
            last_updated: chrono::Utc::now().timestamp(),
        }
    }

    /// Executive rollup: banded headline, lead risk, and the top action
    /// items.
    pub fn executive_summary(&self) -> ExecutiveSummary {
        let vsi = self.calculate();

        let headline = if vsi.overall_score >= 80 {
            "Security posture is strong"
        } else if vsi.overall_score >= 60 {
            "Security posture needs attention"
        } else {
            "Critical security issues require immediate action"
        }
        .to_string();

        let main_risk = vsi.recommendations.first().map(|r| r.title.clone());
        let key_metrics = vec![
            KeyMetric {
                label: "Security Score".into(),
                value: format!("{}/100 ({:?})", vsi.overall_score, vsi.grade),
                trend: trend_arrow(vsi.trend).into(),
            },
            KeyMetric {
                label: "Active Threats".into(),
                value: vsi.risk_summary.active_threats.to_string(),
                trend: if vsi.risk_summary.active_threats > 0 { "up" } else { "flat" }.into(),
            },
            KeyMetric {
                label: "Pending Actions".into(),
                value: vsi.risk_summary.pending_actions.to_string(),
                trend: "flat".into(),
            },
        ];
        let action_items = vsi.recommendations.iter().take(5).map(|r| r.title.clone()).collect();

        ExecutiveSummary { headline, main_risk, key_metrics, action_items }
    }

    /// Top 3 toxic combinations first, then every module in critical
    /// status, in that fixed order.
    fn build_recommendations(
        &self,
        module_scores: &BTreeMap<String, ModuleScore>,
        toxic: &[ToxicCombination],
    ) -> Vec<TopRecommendation> {
        let mut recommendations = Vec::new();
        let mut rank = 1u32;

        for combination in toxic.iter().take(3) {
            recommendations.push(TopRecommendation {
                priority: rank,
                module: Module::Shield,
                title: format!("Fix: {}...", truncate(&combination.description, 50)),
                description: combination.description.clone(),
                impact: "Reduces attack surface significantly".into(),
            });
            rank += 1;
        }

        for module in Module::ALL {
            let critical = module_scores
                .get(module.as_str())
                .map(|s| s.status == ModuleStatus::Critical)
                .unwrap_or(false);
            if critical {
                recommendations.push(TopRecommendation {
                    priority: rank,
                    module,
                    title: format!("Critical issues in {}", module.as_str().to_uppercase()),
                    description: format!(
                        "{} module has critical issues that need immediate attention",
                        module.as_str().to_uppercase()
                    ),
                    impact: "Prevents potential compromise".into(),
                });
                rank += 1;
            }
        }

        recommendations
    }
}

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Improving => "up",
        Trend::Stable => "flat",
        Trend::Declining => "down",
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
