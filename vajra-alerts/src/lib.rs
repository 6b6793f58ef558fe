//! # Vajra Alert Manager
//!
//! Independent lifecycle manager for alerts raised by any scanning module
//! or by the risk aggregator: deduplication within a sliding window,
//! pending -> acknowledged/resolved/dismissed transitions, time-based
//! escalation as a pure step function, and fire-and-forget fan-out to
//! Slack/Discord/webhook channels where one channel's failure never
//! blocks the others.

pub mod channels;
pub mod manager;
pub mod types;

pub use manager::AlertManager;
pub use types::{Alert, AlertFilter, AlertStatus, ChannelKind, NotificationRecord};
