//! # Config Loader — Loads and validates TOML configuration
//!
//! Reads `vajra.toml` (or a custom path) and deserializes into typed config
//! structs. Every section carries serde defaults, so a partial file (or no
//! file at all) yields a working configuration.

use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Top-level Vajra configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VajraConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Interval between escalation sweeps in the composition root.
    pub escalation_sweep_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { log_level: "info".into(), escalation_sweep_secs: 60 }
    }
}

/// Alert manager configuration: channels, deduplication, escalation,
/// quiet hours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub deduplication: DedupConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHoursConfig>,
}

/// Notification channel endpoints. Absent sections mean the channel is
/// not configured. Email is declared for config compatibility but needs
/// an external delivery service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackChannelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordChannelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookChannelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub webhook_url: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub webhook_url: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    /// Extra headers sent with every delivery.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dedup_window")]
    pub window_seconds: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { enabled: true, window_seconds: default_dedup_window() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Ordered thresholds. An alert pending longer than `after_minutes`
    /// is escalated to that level and re-dispatched to its channels.
    #[serde(default)]
    pub levels: Vec<EscalationLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub after_minutes: i64,
    /// Channel names ("slack", "discord", "webhook", "email").
    #[serde(default)]
    pub notify_channels: Vec<String>,
}

/// Local-time window during which dispatch is suppressed, wrap-around
/// aware ("22:00" to "08:00" spans midnight).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHoursConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
    /// Severities that are delivered even during quiet hours.
    #[serde(default)]
    pub except_severities: Vec<Severity>,
}

fn default_true() -> bool {
    true
}

fn default_min_severity() -> Severity {
    Severity::Info
}

fn default_dedup_window() -> u64 {
    300
}

impl VajraConfig {
    /// Load config from a TOML file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config: {}", e))?;
        let config: VajraConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        info!(
            path = %path.display(),
            channels = config.alerts.channels.configured_count(),
            escalation_levels = config.alerts.escalation.levels.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save current config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// Reject configurations that would misbehave at runtime.
    pub fn validate(&self) -> Result<(), String> {
        for level in &self.alerts.escalation.levels {
            if level.after_minutes < 0 {
                return Err("escalation after_minutes must be >= 0".into());
            }
        }
        if let Some(qh) = self.alerts.quiet_hours.as_ref() {
            for field in [qh.start.as_str(), qh.end.as_str()] {
                if parse_hhmm(field).is_none() {
                    return Err(format!("quiet hours time '{}' is not HH:MM", field));
                }
            }
        }
        Ok(())
    }
}

impl ChannelsConfig {
    pub fn configured_count(&self) -> usize {
        [
            self.slack.is_some(),
            self.discord.is_some(),
            self.webhook.is_some(),
            self.email.is_some(),
        ]
        .iter()
        .filter(|&&c| c)
        .count()
    }
}

/// Parse "HH:MM" into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VajraConfig::default();
        assert!(config.alerts.deduplication.enabled);
        assert_eq!(config.alerts.deduplication.window_seconds, 300);
        assert!(!config.alerts.escalation.enabled);
        assert_eq!(config.alerts.channels.configured_count(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_src = r##"
            [general]
            log_level = "debug"
            escalation_sweep_secs = 30

            [alerts.channels.slack]
            webhook_url = "https://hooks.slack.com/services/T0/B0/x"
            channel = "#security"
            min_severity = "high"

            [alerts.escalation]
            enabled = true
            levels = [
                { after_minutes = 15, notify_channels = ["slack"] },
                { after_minutes = 60, notify_channels = ["slack", "webhook"] },
            ]
        "##;
        let config: VajraConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.general.log_level, "debug");
        let slack = config.alerts.channels.slack.unwrap();
        assert!(slack.enabled);
        assert_eq!(slack.min_severity, Severity::High);
        assert_eq!(config.alerts.escalation.levels.len(), 2);
        assert_eq!(config.alerts.escalation.levels[1].after_minutes, 60);
        // Untouched sections fall back to defaults.
        assert!(config.alerts.deduplication.enabled);
        assert_eq!(config.alerts.deduplication.window_seconds, 300);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vajra.toml");

        let mut config = VajraConfig::default();
        config.alerts.quiet_hours = Some(QuietHoursConfig {
            enabled: true,
            start: "22:00".into(),
            end: "08:00".into(),
            except_severities: vec![Severity::Critical],
        });
        config.save(&path).unwrap();

        let reloaded = VajraConfig::load(&path).unwrap();
        let qh = reloaded.alerts.quiet_hours.unwrap();
        assert_eq!(qh.start, "22:00");
        assert_eq!(qh.except_severities, vec![Severity::Critical]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = VajraConfig::load("/nonexistent/vajra.toml").unwrap();
        assert_eq!(config.general.escalation_sweep_secs, 60);
    }

    #[test]
    fn test_validate_rejects_bad_quiet_hours() {
        let mut config = VajraConfig::default();
        config.alerts.quiet_hours = Some(QuietHoursConfig {
            enabled: true,
            start: "25:00".into(),
            end: "08:00".into(),
            except_severities: vec![],
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("22:00"), Some(22 * 60));
        assert_eq!(parse_hhmm("08:30"), Some(8 * 60 + 30));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("nope"), None);
    }
}
