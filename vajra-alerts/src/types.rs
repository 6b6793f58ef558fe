//! Alert data model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vajra_core::{Module, Severity};

/// Lifecycle: pending -> acknowledged | dismissed; pending/acknowledged
/// -> resolved. Alerts are never deleted; retention is an external
/// concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Resolved,
    Dismissed,
}

/// Notification transports. Email and SMS are declared for configuration
/// compatibility but need external delivery services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Slack,
    Discord,
    Webhook,
    Sms,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
            ChannelKind::Discord => "discord",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Sms => "sms",
        }
    }

    pub fn from_name(name: &str) -> Option<ChannelKind> {
        match name.to_ascii_lowercase().as_str() {
            "email" => Some(ChannelKind::Email),
            "slack" => Some(ChannelKind::Slack),
            "discord" => Some(ChannelKind::Discord),
            "webhook" => Some(ChannelKind::Webhook),
            "sms" => Some(ChannelKind::Sms),
            _ => None,
        }
    }
}

/// One delivery attempt, success or failure, recorded on the alert.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub channel: ChannelKind,
    pub sent_at: i64,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: String,
    pub module: Module,
    pub severity: Severity,
    pub alert_type: String,
    pub title: String,
    pub description: String,
    pub context: HashMap<String, serde_json::Value>,
    pub status: AlertStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub acknowledged_at: Option<i64>,
    pub resolved_at: Option<i64>,
    pub acknowledged_by: Option<String>,
    pub resolved_by: Option<String>,
    pub resolution: Option<String>,
    /// How many escalation thresholds this alert has crossed. Only ever
    /// increases.
    pub escalation_level: u32,
    pub notifications_sent: Vec<NotificationRecord>,
}

impl Alert {
    /// Deduplication key: identical (module, type, title) within the
    /// window coalesce into one alert.
    pub fn dedup_key(module: Module, alert_type: &str, title: &str) -> String {
        format!("{}:{}:{}", module, alert_type, title)
    }
}

/// Query filter for [`crate::AlertManager::get_alerts`]. Empty vectors
/// match everything.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Vec<AlertStatus>,
    pub severity: Vec<Severity>,
    pub module: Vec<Module>,
    pub limit: Option<usize>,
}
