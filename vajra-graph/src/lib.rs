//! # Vajra Security Graph
//!
//! Unified knowledge graph connecting telemetry from every scanning
//! module. Entities (IPs, vendors, employees, assets, vulnerabilities,
//! endpoints) and their typed, weighted relationships are held in
//! O(1)-indexed in-memory maps behind a single writer lock, then mined
//! for derived risk signals:
//!
//! - attack paths from risky external IPs to a target asset
//! - toxic combinations (co-occurrence patterns that amplify risk)
//! - blast radius of a compromised entity

pub mod graph;
pub mod paths;
pub mod toxic;
pub mod types;

pub use graph::{GraphError, SecurityGraph};
pub use types::{
    AttackPath, AttackStep, BlastRadius, Entity, EntityType, GraphExport, GraphStats, Priority,
    RelationType, Relationship, ToxicCombination,
};
