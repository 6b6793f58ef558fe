//! # Notification channels
//!
//! Payload builders and delivery for Slack, Discord, and generic
//! webhooks. Payload shapes are wire contracts consumed by external
//! integrations; field names and the severity color mapping must not
//! drift.

use crate::types::{Alert, ChannelKind};
use chrono::{SecondsFormat, Timelike};
use serde_json::{json, Value};
use std::time::Duration;
use vajra_core::config::{
    parse_hhmm, AlertConfig, DiscordChannelConfig, SlackChannelConfig, WebhookChannelConfig,
};
use vajra_core::Severity;

/// Per-request delivery timeout.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity color, shared by Slack (hex string) and Discord (integer).
fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 0xdc3545,
        Severity::High => 0xfd7e14,
        Severity::Medium => 0xffc107,
        Severity::Low => 0x17a2b8,
        Severity::Info => 0x6c757d,
    }
}

fn severity_color_hex(severity: Severity) -> String {
    format!("#{:06x}", severity_color(severity))
}

fn iso8601(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Payloads ─────────────────────────────────────────────────────────────

pub fn slack_payload(alert: &Alert, config: &SlackChannelConfig) -> Value {
    json!({
        "channel": config.channel,
        "attachments": [{
            "color": severity_color_hex(alert.severity),
            "title": alert.title,
            "text": alert.description,
            "fields": [
                { "title": "Module", "value": alert.module.as_str().to_uppercase(), "short": true },
                { "title": "Severity", "value": alert.severity.as_str().to_uppercase(), "short": true },
                { "title": "Type", "value": alert.alert_type, "short": true },
            ],
            "footer": "Vajra Security Platform",
            "ts": alert.created_at,
        }],
    })
}

pub fn discord_payload(alert: &Alert) -> Value {
    json!({
        "embeds": [{
            "title": alert.title,
            "description": alert.description,
            "color": severity_color(alert.severity),
            "fields": [
                { "name": "Module", "value": alert.module.as_str().to_uppercase(), "inline": true },
                { "name": "Severity", "value": alert.severity.as_str().to_uppercase(), "inline": true },
                { "name": "Type", "value": alert.alert_type, "inline": true },
            ],
            "footer": { "text": "Vajra Security Platform" },
            "timestamp": iso8601(alert.created_at),
        }],
    })
}

pub fn webhook_payload(alert: &Alert) -> Value {
    json!({
        "alert": {
            "id": alert.id,
            "module": alert.module.as_str(),
            "severity": alert.severity.as_str(),
            "type": alert.alert_type,
            "title": alert.title,
            "description": alert.description,
            "context": alert.context,
            "createdAt": iso8601(alert.created_at),
        },
        "source": "vajra-security",
        "version": "1.0",
    })
}

// ── Eligibility ──────────────────────────────────────────────────────────

/// A concrete delivery target resolved from config.
#[derive(Debug, Clone)]
pub(crate) enum ChannelTarget {
    Slack(SlackChannelConfig),
    Discord(DiscordChannelConfig),
    Webhook(WebhookChannelConfig),
}

impl ChannelTarget {
    pub(crate) fn kind(&self) -> ChannelKind {
        match self {
            ChannelTarget::Slack(_) => ChannelKind::Slack,
            ChannelTarget::Discord(_) => ChannelKind::Discord,
            ChannelTarget::Webhook(_) => ChannelKind::Webhook,
        }
    }
}

/// Whether quiet hours currently suppress an alert of this severity.
/// `now_minutes` is local minutes since midnight; the window is
/// wrap-around aware ("22:00" to "08:00" spans midnight).
pub(crate) fn quiet_hours_suppressed(
    config: &AlertConfig,
    severity: Severity,
    now_minutes: u32,
) -> bool {
    let Some(quiet) = config.quiet_hours.as_ref() else {
        return false;
    };
    if !quiet.enabled || quiet.except_severities.contains(&severity) {
        return false;
    }
    let (Some(start), Some(end)) = (parse_hhmm(&quiet.start), parse_hhmm(&quiet.end)) else {
        return false;
    };
    if start > end {
        now_minutes >= start || now_minutes < end
    } else {
        now_minutes >= start && now_minutes < end
    }
}

pub(crate) fn local_minutes_now() -> u32 {
    let now = chrono::Local::now();
    now.hour() * 60 + now.minute()
}

/// Resolve which channels an alert goes to.
///
/// Initial dispatch (`only == None`) honors the per-channel `enabled` and
/// `min_severity` filters plus quiet hours. Escalation re-dispatch
/// (`only == Some(..)`) targets the named channels directly, honoring
/// only `enabled`: an escalating alert is past severity filtering.
pub(crate) fn eligible_targets(
    config: &AlertConfig,
    severity: Severity,
    only: Option<&[ChannelKind]>,
    now_minutes: u32,
) -> Vec<ChannelTarget> {
    let escalating = only.is_some();
    if !escalating && quiet_hours_suppressed(config, severity, now_minutes) {
        return Vec::new();
    }

    let wanted = |kind: ChannelKind| match only {
        Some(kinds) => kinds.contains(&kind),
        None => true,
    };

    let mut targets = Vec::new();
    if let Some(ref slack) = config.channels.slack {
        if wanted(ChannelKind::Slack)
            && slack.enabled
            && (escalating || severity.meets(slack.min_severity))
        {
            targets.push(ChannelTarget::Slack(slack.clone()));
        }
    }
    if let Some(ref discord) = config.channels.discord {
        if wanted(ChannelKind::Discord)
            && discord.enabled
            && (escalating || severity.meets(discord.min_severity))
        {
            targets.push(ChannelTarget::Discord(discord.clone()));
        }
    }
    if let Some(ref webhook) = config.channels.webhook {
        if wanted(ChannelKind::Webhook)
            && webhook.enabled
            && (escalating || severity.meets(webhook.min_severity))
        {
            targets.push(ChannelTarget::Webhook(webhook.clone()));
        }
    }
    // Email/SMS require external delivery services and are never
    // dispatched from here.
    targets
}

// ── Delivery ─────────────────────────────────────────────────────────────

/// Post the alert to one channel. Errors are returned as text for the
/// caller to record; they never propagate further.
pub(crate) async fn deliver(
    client: &reqwest::Client,
    target: &ChannelTarget,
    alert: &Alert,
) -> Result<(), String> {
    let mut request = match target {
        ChannelTarget::Slack(c) => client.post(&c.webhook_url).json(&slack_payload(alert, c)),
        ChannelTarget::Discord(c) => client.post(&c.webhook_url).json(&discord_payload(alert)),
        ChannelTarget::Webhook(c) => {
            let mut req = client.post(&c.url).json(&webhook_payload(alert));
            for (name, value) in &c.headers {
                req = req.header(name.as_str(), value.as_str());
            }
            req
        }
    };
    request = request.timeout(DISPATCH_TIMEOUT);

    let response = request.send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    Ok(())
}
