//! Graph data model: entities, relationships, and derived findings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Kinds of tracked objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Ip,
    User,
    Device,
    Vendor,
    Employee,
    Asset,
    Vulnerability,
    Threat,
    CodeFile,
    ApiEndpoint,
    Domain,
}

impl EntityType {
    pub const ALL: [EntityType; 11] = [
        EntityType::Ip,
        EntityType::User,
        EntityType::Device,
        EntityType::Vendor,
        EntityType::Employee,
        EntityType::Asset,
        EntityType::Vulnerability,
        EntityType::Threat,
        EntityType::CodeFile,
        EntityType::ApiEndpoint,
        EntityType::Domain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Ip => "ip",
            EntityType::User => "user",
            EntityType::Device => "device",
            EntityType::Vendor => "vendor",
            EntityType::Employee => "employee",
            EntityType::Asset => "asset",
            EntityType::Vulnerability => "vulnerability",
            EntityType::Threat => "threat",
            EntityType::CodeFile => "code_file",
            EntityType::ApiEndpoint => "api_endpoint",
            EntityType::Domain => "domain",
        }
    }
}

/// Directed, typed edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Accessed,
    DependsOn,
    CommunicatesWith,
    HasVulnerability,
    Exploits,
    Owns,
    Manages,
    Triggered,
    Blocked,
    SimilarTo,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Accessed => "accessed",
            RelationType::DependsOn => "depends_on",
            RelationType::CommunicatesWith => "communicates_with",
            RelationType::HasVulnerability => "has_vulnerability",
            RelationType::Exploits => "exploits",
            RelationType::Owns => "owns",
            RelationType::Manages => "manages",
            RelationType::Triggered => "triggered",
            RelationType::Blocked => "blocked",
            RelationType::SimilarTo => "similar_to",
        }
    }
}

/// A graph node. Identity is a pure function of (type, name): re-upserting
/// the same pair always resolves to the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub properties: HashMap<String, serde_json::Value>,
    /// 0-100
    pub risk_score: f64,
    /// Unix seconds
    pub first_seen: i64,
    pub last_seen: i64,
    pub tags: BTreeSet<String>,
}

impl Entity {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Numeric property lookup, 0 when absent or non-numeric.
    pub fn property_i64(&self, key: &str) -> i64 {
        self.properties.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn property_bool(&self, key: &str) -> bool {
        self.properties.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

/// A directed, weighted edge. Re-adding the same (source, type, target)
/// triple overwrites the prior edge (last-write-wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// `{source_id}-{type}-{target_id}`
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub properties: HashMap<String, serde_json::Value>,
    /// >= 0
    pub weight: f64,
    pub created_at: i64,
}

/// One hop along an attack path.
#[derive(Debug, Clone, Serialize)]
pub struct AttackStep {
    pub entity: Entity,
    pub relationship: Relationship,
    /// Human-readable attacker action, e.g. "Exploit vulnerability in".
    pub action: String,
    pub risk_contribution: f64,
}

/// A derived path from a risky source to a target, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct AttackPath {
    pub id: String,
    pub steps: Vec<AttackStep>,
    pub total_risk: f64,
    pub description: String,
    pub mitigations: Vec<String>,
}

/// Priority of a toxic combination, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// A co-occurrence of entities judged to amplify risk beyond either part
/// alone.
#[derive(Debug, Clone, Serialize)]
pub struct ToxicCombination {
    pub entities: Vec<Entity>,
    pub risk: String,
    pub description: String,
    pub priority: Priority,
}

/// Result of an outward reachability sweep from one entity.
#[derive(Debug, Clone, Serialize)]
pub struct BlastRadius {
    pub affected_entities: Vec<Entity>,
    /// Mean risk score over the affected set, seed included.
    pub risk_score: f64,
    pub description: String,
}

/// Read-only counters for collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub entity_counts: BTreeMap<String, usize>,
    pub avg_risk_score: f64,
    pub high_risk_entities: usize,
}

/// Node/edge projection for a UI.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub risk: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub weight: f64,
}
