//! # Vajra Core — Shared vocabulary for the correlation engine
//!
//! Severity/module enums, error types, and TOML configuration used by the
//! security graph, the risk index, and the alert manager. Every other
//! Vajra crate links against this library.

pub mod config;
pub mod error;
pub mod types;

pub use config::VajraConfig;
pub use error::{VajraError, VajraResult};
pub use types::{Module, Severity};
