//! # Alert lifecycle manager
//!
//! Alerts are stored in an RwLock-guarded map and mutated only through
//! the lifecycle operations. All failure modes are signaled by return
//! value: transitions return `false` on invalid state or unknown ids and
//! delivery errors are captured into each alert's notification history.
//!
//! Dispatch is fire-and-forget: `raise` spawns one task per eligible
//! channel and returns immediately. `check_escalations` is a pure step
//! for an external scheduler; the caller must not run two sweeps
//! concurrently or an alert could cross the same threshold twice.

use crate::channels;
use crate::types::*;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vajra_core::config::AlertConfig;
use vajra_core::{Module, Severity};

pub struct AlertManager {
    alerts: Arc<RwLock<HashMap<String, Alert>>>,
    /// Dedup key -> creation time of the newest alert for that key.
    dedup_cache: RwLock<HashMap<String, i64>>,
    config: RwLock<AlertConfig>,
    client: reqwest::Client,
    next_id: AtomicU64,
    total_raised: AtomicU64,
    duplicates_coalesced: AtomicU64,
    escalations_fired: AtomicU64,
}

impl AlertManager {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            alerts: Arc::new(RwLock::new(HashMap::new())),
            dedup_cache: RwLock::new(HashMap::new()),
            config: RwLock::new(config),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            total_raised: AtomicU64::new(0),
            duplicates_coalesced: AtomicU64::new(0),
            escalations_fired: AtomicU64::new(0),
        }
    }

    /// Replace the active configuration.
    pub fn update_config(&self, config: AlertConfig) {
        *self.config.write() = config;
    }

    // ── Creation ─────────────────────────────────────────────────────────

    /// Create an alert and dispatch notifications asynchronously.
    ///
    /// If a pending alert with the same (module, type, title) was created
    /// within the dedup window, that alert is returned unchanged and
    /// nothing new is dispatched. The call returns before any dispatch
    /// completes.
    pub fn raise(
        &self,
        module: Module,
        severity: Severity,
        alert_type: &str,
        title: &str,
        description: &str,
        context: HashMap<String, serde_json::Value>,
    ) -> Alert {
        let now = chrono::Utc::now().timestamp();
        let key = Alert::dedup_key(module, alert_type, title);

        if self.within_dedup_window(&key, now) {
            if let Some(existing) = self.find_pending(module, alert_type, title) {
                self.duplicates_coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(id = %existing.id, key = %key, "Duplicate alert coalesced");
                return existing;
            }
        }

        let alert = Alert {
            id: format!("VJ-{:06}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            module,
            severity,
            alert_type: alert_type.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            context,
            status: AlertStatus::Pending,
            created_at: now,
            updated_at: now,
            acknowledged_at: None,
            resolved_at: None,
            acknowledged_by: None,
            resolved_by: None,
            resolution: None,
            escalation_level: 0,
            notifications_sent: Vec::new(),
        };
        self.total_raised.fetch_add(1, Ordering::Relaxed);
        info!(id = %alert.id, module = %module, severity = %severity, title = %title, "Alert raised");

        self.alerts.write().insert(alert.id.clone(), alert.clone());
        self.touch_dedup_cache(key, now);
        self.dispatch(&alert, None);
        alert
    }

    // ── Lifecycle transitions ────────────────────────────────────────────

    /// Pending -> acknowledged. `false` for any other state or unknown id.
    pub fn acknowledge(&self, alert_id: &str, acknowledged_by: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let mut alerts = self.alerts.write();
        match alerts.get_mut(alert_id) {
            Some(alert) if alert.status == AlertStatus::Pending => {
                alert.status = AlertStatus::Acknowledged;
                alert.acknowledged_at = Some(now);
                alert.acknowledged_by = Some(acknowledged_by.to_string());
                alert.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Any non-resolved state -> resolved.
    pub fn resolve(&self, alert_id: &str, resolved_by: &str, resolution: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let mut alerts = self.alerts.write();
        match alerts.get_mut(alert_id) {
            Some(alert) if alert.status != AlertStatus::Resolved => {
                alert.status = AlertStatus::Resolved;
                alert.resolved_at = Some(now);
                alert.resolved_by = Some(resolved_by.to_string());
                alert.resolution = Some(resolution.to_string());
                alert.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Any state -> dismissed. `false` only for unknown ids.
    pub fn dismiss(&self, alert_id: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let mut alerts = self.alerts.write();
        match alerts.get_mut(alert_id) {
            Some(alert) => {
                alert.status = AlertStatus::Dismissed;
                alert.updated_at = now;
                true
            }
            None => false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn get_alert(&self, alert_id: &str) -> Option<Alert> {
        self.alerts.read().get(alert_id).cloned()
    }

    /// Filtered listing, most severe first, newest first within a
    /// severity.
    pub fn get_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let alerts = self.alerts.read();
        let mut matched: Vec<Alert> = alerts
            .values()
            .filter(|a| filter.status.is_empty() || filter.status.contains(&a.status))
            .filter(|a| filter.severity.is_empty() || filter.severity.contains(&a.severity))
            .filter(|a| filter.module.is_empty() || filter.module.contains(&a.module))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Pending alert counts per severity; every severity is present.
    pub fn pending_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
        for severity in
            [Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info]
        {
            counts.insert(severity, 0);
        }
        for alert in self.alerts.read().values() {
            if alert.status == AlertStatus::Pending {
                *counts.entry(alert.severity).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn total_raised(&self) -> u64 {
        self.total_raised.load(Ordering::Relaxed)
    }

    pub fn duplicates_coalesced(&self) -> u64 {
        self.duplicates_coalesced.load(Ordering::Relaxed)
    }

    pub fn escalations_fired(&self) -> u64 {
        self.escalations_fired.load(Ordering::Relaxed)
    }

    // ── Escalation ───────────────────────────────────────────────────────

    /// Walk every pending alert through the ordered escalation levels and
    /// re-dispatch to each newly crossed level's channels. Returns the
    /// ids of alerts escalated this sweep. The level is a monotonic
    /// ratchet: it never decreases and never exceeds the number of
    /// configured levels.
    pub fn check_escalations(&self) -> Vec<String> {
        self.escalate_at(chrono::Utc::now().timestamp())
    }

    fn escalate_at(&self, now: i64) -> Vec<String> {
        let config = self.config.read().clone();
        if !config.escalation.enabled {
            return Vec::new();
        }

        let mut escalated = Vec::new();
        let mut redispatch: Vec<(Alert, Vec<ChannelKind>)> = Vec::new();
        {
            let mut alerts = self.alerts.write();
            for alert in alerts.values_mut() {
                if alert.status != AlertStatus::Pending {
                    continue;
                }
                let age_minutes = (now - alert.created_at) / 60;
                let mut bumped = false;
                for (index, level) in config.escalation.levels.iter().enumerate() {
                    if age_minutes >= level.after_minutes
                        && alert.escalation_level < index as u32 + 1
                    {
                        alert.escalation_level += 1;
                        bumped = true;
                        self.escalations_fired.fetch_add(1, Ordering::Relaxed);
                        let kinds: Vec<ChannelKind> = level
                            .notify_channels
                            .iter()
                            .filter_map(|name| ChannelKind::from_name(name))
                            .collect();
                        warn!(
                            id = %alert.id,
                            level = alert.escalation_level,
                            age_minutes = age_minutes,
                            "Alert escalated"
                        );
                        redispatch.push((alert.clone(), kinds));
                    }
                }
                if bumped {
                    escalated.push(alert.id.clone());
                }
            }
        }

        for (alert, kinds) in redispatch {
            self.dispatch(&alert, Some(&kinds));
        }
        escalated
    }

    // ── Internal ─────────────────────────────────────────────────────────

    fn within_dedup_window(&self, key: &str, now: i64) -> bool {
        let config = self.config.read();
        if !config.deduplication.enabled {
            return false;
        }
        let window = config.deduplication.window_seconds as i64;
        drop(config);
        self.dedup_cache.read().get(key).is_some_and(|last| now - last < window)
    }

    fn find_pending(&self, module: Module, alert_type: &str, title: &str) -> Option<Alert> {
        self.alerts
            .read()
            .values()
            .find(|a| {
                a.status == AlertStatus::Pending
                    && a.module == module
                    && a.alert_type == alert_type
                    && a.title == title
            })
            .cloned()
    }

    fn touch_dedup_cache(&self, key: String, now: i64) {
        let window = self.config.read().deduplication.window_seconds as i64;
        let mut cache = self.dedup_cache.write();
        cache.insert(key, now);
        cache.retain(|_, last| now - *last < window);
    }

    /// Spawn one delivery task per eligible channel. Each task records
    /// its own success or failure on the alert; nothing here blocks the
    /// caller, and a failing channel never affects its siblings.
    fn dispatch(&self, alert: &Alert, only: Option<&[ChannelKind]>) {
        let config = self.config.read();
        let targets = channels::eligible_targets(
            &config,
            alert.severity,
            only,
            channels::local_minutes_now(),
        );
        drop(config);

        for target in targets {
            let client = self.client.clone();
            let alerts = Arc::clone(&self.alerts);
            let alert = alert.clone();
            tokio::spawn(async move {
                let result = channels::deliver(&client, &target, &alert).await;
                let record = NotificationRecord {
                    channel: target.kind(),
                    sent_at: chrono::Utc::now().timestamp(),
                    success: result.is_ok(),
                    error: result.err(),
                };
                if let Some(ref error) = record.error {
                    warn!(id = %alert.id, channel = target.kind().as_str(), error = %error,
                        "Notification delivery failed");
                }
                if let Some(stored) = alerts.write().get_mut(&alert.id) {
                    stored.notifications_sent.push(record);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vajra_core::config::{EscalationLevel, SlackChannelConfig};

    fn manager() -> AlertManager {
        // Default config: dedup on, no channels, escalation off. No
        // channels means raise() never needs a runtime.
        AlertManager::new(AlertConfig::default())
    }

    fn raise_simple(mgr: &AlertManager, severity: Severity, title: &str) -> Alert {
        mgr.raise(Module::Shield, severity, "probe", title, "details", HashMap::new())
    }

    #[test]
    fn test_duplicate_within_window_returns_same_alert() {
        let mgr = manager();
        let first = raise_simple(&mgr, Severity::High, "Port scan");
        let second = raise_simple(&mgr, Severity::High, "Port scan");

        assert_eq!(first.id, second.id);
        assert_eq!(mgr.alert_count(), 1);
        assert_eq!(mgr.total_raised(), 1);
        assert_eq!(mgr.duplicates_coalesced(), 1);
    }

    #[test]
    fn test_different_key_is_not_deduplicated() {
        let mgr = manager();
        raise_simple(&mgr, Severity::High, "Port scan");
        mgr.raise(Module::Scout, Severity::High, "probe", "Port scan", "", HashMap::new());
        raise_simple(&mgr, Severity::High, "Credential stuffing");
        assert_eq!(mgr.alert_count(), 3);
    }

    #[test]
    fn test_dedup_disabled_stores_both() {
        let mut config = AlertConfig::default();
        config.deduplication.enabled = false;
        let mgr = AlertManager::new(config);
        let a = raise_simple(&mgr, Severity::High, "Port scan");
        let b = raise_simple(&mgr, Severity::High, "Port scan");
        assert_ne!(a.id, b.id);
        assert_eq!(mgr.alert_count(), 2);
    }

    #[test]
    fn test_resolved_alert_is_not_a_dedup_target() {
        let mgr = manager();
        let first = raise_simple(&mgr, Severity::High, "Port scan");
        assert!(mgr.resolve(&first.id, "ops", "firewall rule added"));
        // Same key, still inside the window, but no pending alert exists.
        let second = raise_simple(&mgr, Severity::High, "Port scan");
        assert_ne!(first.id, second.id);
        assert_eq!(mgr.alert_count(), 2);
    }

    #[test]
    fn test_acknowledge_only_from_pending() {
        let mgr = manager();
        let alert = raise_simple(&mgr, Severity::Medium, "Odd login");

        assert!(mgr.acknowledge(&alert.id, "analyst"));
        let stored = mgr.get_alert(&alert.id).unwrap();
        assert_eq!(stored.status, AlertStatus::Acknowledged);
        assert_eq!(stored.acknowledged_by.as_deref(), Some("analyst"));
        assert!(stored.acknowledged_at.is_some());

        // Second acknowledge fails; so does acknowledging unknown ids.
        assert!(!mgr.acknowledge(&alert.id, "analyst"));
        assert!(!mgr.acknowledge("VJ-999999", "analyst"));
    }

    #[test]
    fn test_resolve_from_any_non_resolved_status() {
        let mgr = manager();
        let a = raise_simple(&mgr, Severity::Medium, "a");
        let b = raise_simple(&mgr, Severity::Medium, "b");
        let c = raise_simple(&mgr, Severity::Medium, "c");

        assert!(mgr.resolve(&a.id, "ops", "patched"));
        assert!(mgr.acknowledge(&b.id, "ops") && mgr.resolve(&b.id, "ops", "patched"));
        assert!(mgr.dismiss(&c.id) && mgr.resolve(&c.id, "ops", "patched"));

        // Already resolved.
        assert!(!mgr.resolve(&a.id, "ops", "again"));
        let stored = mgr.get_alert(&a.id).unwrap();
        assert_eq!(stored.resolution.as_deref(), Some("patched"));
    }

    #[test]
    fn test_dismiss_from_any_status() {
        let mgr = manager();
        let alert = raise_simple(&mgr, Severity::Low, "noise");
        assert!(mgr.acknowledge(&alert.id, "ops"));
        assert!(mgr.dismiss(&alert.id));
        assert_eq!(mgr.get_alert(&alert.id).unwrap().status, AlertStatus::Dismissed);
        assert!(!mgr.dismiss("VJ-999999"));
    }

    #[test]
    fn test_get_alerts_filtering_and_order() {
        let mgr = manager();
        let low = raise_simple(&mgr, Severity::Low, "low");
        let critical = raise_simple(&mgr, Severity::Critical, "critical");
        let high = raise_simple(&mgr, Severity::High, "high");
        mgr.acknowledge(&high.id, "ops");

        let all = mgr.get_alerts(&AlertFilter::default());
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![critical.id.as_str(), high.id.as_str(), low.id.as_str()]);

        let pending_only = mgr.get_alerts(&AlertFilter {
            status: vec![AlertStatus::Pending],
            ..Default::default()
        });
        assert_eq!(pending_only.len(), 2);

        let limited = mgr.get_alerts(&AlertFilter { limit: Some(1), ..Default::default() });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].severity, Severity::Critical);
    }

    #[test]
    fn test_pending_counts_cover_every_severity() {
        let mgr = manager();
        raise_simple(&mgr, Severity::Critical, "c1");
        raise_simple(&mgr, Severity::Critical, "c2");
        let resolved = raise_simple(&mgr, Severity::High, "h1");
        mgr.resolve(&resolved.id, "ops", "done");

        let counts = mgr.pending_counts();
        assert_eq!(counts[&Severity::Critical], 2);
        assert_eq!(counts[&Severity::High], 0);
        assert_eq!(counts[&Severity::Info], 0);
        assert_eq!(counts.len(), 5);
    }

    fn escalating_manager(levels: Vec<EscalationLevel>) -> AlertManager {
        let mut config = AlertConfig::default();
        config.escalation.enabled = true;
        config.escalation.levels = levels;
        AlertManager::new(config)
    }

    #[test]
    fn test_escalation_ratchets_and_caps_at_level_count() {
        let mgr = escalating_manager(vec![
            EscalationLevel { after_minutes: 15, notify_channels: vec![] },
            EscalationLevel { after_minutes: 60, notify_channels: vec![] },
        ]);
        let alert = raise_simple(&mgr, Severity::Critical, "breach");
        let created = alert.created_at;

        // Too young: nothing happens.
        assert!(mgr.escalate_at(created + 5 * 60).is_empty());
        assert_eq!(mgr.get_alert(&alert.id).unwrap().escalation_level, 0);

        // Past the first threshold.
        assert_eq!(mgr.escalate_at(created + 20 * 60), vec![alert.id.clone()]);
        assert_eq!(mgr.get_alert(&alert.id).unwrap().escalation_level, 1);

        // Re-sweeping the same age does not re-escalate.
        assert!(mgr.escalate_at(created + 20 * 60).is_empty());
        assert_eq!(mgr.get_alert(&alert.id).unwrap().escalation_level, 1);

        // Past the second threshold, then capped forever.
        assert_eq!(mgr.escalate_at(created + 90 * 60), vec![alert.id.clone()]);
        for _ in 0..5 {
            assert!(mgr.escalate_at(created + 600 * 60).is_empty());
        }
        assert_eq!(mgr.get_alert(&alert.id).unwrap().escalation_level, 2);
    }

    #[test]
    fn test_escalation_skips_non_pending_alerts() {
        let mgr = escalating_manager(vec![EscalationLevel {
            after_minutes: 0,
            notify_channels: vec![],
        }]);
        let acked = raise_simple(&mgr, Severity::High, "acked");
        mgr.acknowledge(&acked.id, "ops");
        let pending = raise_simple(&mgr, Severity::High, "pending");

        let escalated = mgr.escalate_at(chrono::Utc::now().timestamp() + 60);
        assert_eq!(escalated, vec![pending.id.clone()]);
        assert_eq!(mgr.get_alert(&acked.id).unwrap().escalation_level, 0);
    }

    #[test]
    fn test_escalation_disabled_is_a_no_op() {
        let mgr = manager();
        raise_simple(&mgr, Severity::Critical, "breach");
        assert!(mgr.check_escalations().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_recorded_not_raised() {
        // A configured channel pointing at a closed port: delivery fails,
        // raise() still returns immediately and the failure lands in the
        // alert's notification history.
        let mut config = AlertConfig::default();
        config.channels.slack = Some(SlackChannelConfig {
            enabled: true,
            webhook_url: "http://127.0.0.1:9/unreachable".into(),
            channel: "#security".into(),
            min_severity: Severity::Info,
        });
        let mgr = AlertManager::new(config);
        let alert = raise_simple(&mgr, Severity::Critical, "unreachable channel");

        // Give the spawned delivery task time to fail and record.
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if !mgr.get_alert(&alert.id).unwrap().notifications_sent.is_empty() {
                break;
            }
        }
        let stored = mgr.get_alert(&alert.id).unwrap();
        assert_eq!(stored.notifications_sent.len(), 1);
        let record = &stored.notifications_sent[0];
        assert_eq!(record.channel, ChannelKind::Slack);
        assert!(!record.success);
        assert!(record.error.is_some());
        // The alert itself is untouched by the failure.
        assert_eq!(stored.status, AlertStatus::Pending);
    }
}
