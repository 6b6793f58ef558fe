//! # Security Graph store
//!
//! Entity/relationship maps plus the secondary indices (per-type entity
//! index, source/target adjacency indices). Because a single mutation
//! touches the primary map AND one or more indices, ALL interior state
//! lives inside one `RwLock<GraphState>`: writers see the whole graph
//! atomically and the indices can never desynchronize from the maps.

use crate::types::*;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Entity not found: {id}")]
    EntityNotFound { id: String },
}

/// Whole-graph interior state, guarded as one unit.
#[derive(Default)]
pub(crate) struct GraphState {
    pub(crate) entities: HashMap<String, Entity>,
    pub(crate) relationships: HashMap<String, Relationship>,
    /// EntityType -> entity ids
    type_index: HashMap<EntityType, HashSet<String>>,
    /// entity id -> outgoing relationship ids
    outgoing_index: HashMap<String, HashSet<String>>,
    /// entity id -> incoming relationship ids
    incoming_index: HashMap<String, HashSet<String>>,
}

impl GraphState {
    pub(crate) fn outgoing_of(&self, entity_id: &str) -> Vec<&Relationship> {
        self.outgoing_index
            .get(entity_id)
            .map(|ids| ids.iter().filter_map(|id| self.relationships.get(id)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn incoming_of(&self, entity_id: &str) -> Vec<&Relationship> {
        self.incoming_index
            .get(entity_id)
            .map(|ids| ids.iter().filter_map(|id| self.relationships.get(id)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn entities_of_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.type_index
            .get(&entity_type)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }
}

/// The unified security knowledge graph.
pub struct SecurityGraph {
    pub(crate) state: RwLock<GraphState>,
    total_upserts: AtomicU64,
    pub(crate) next_path_id: AtomicU64,
}

impl SecurityGraph {
    pub fn new() -> Self {
        let mut state = GraphState::default();
        for entity_type in EntityType::ALL {
            state.type_index.insert(entity_type, HashSet::new());
        }
        Self {
            state: RwLock::new(state),
            total_upserts: AtomicU64::new(0),
            next_path_id: AtomicU64::new(1),
        }
    }

    /// Stable natural key: truncated SHA-256 over `type:name`, reproducible
    /// across processes and languages.
    pub fn entity_id(entity_type: EntityType, name: &str) -> String {
        let digest = Sha256::digest(format!("{}:{}", entity_type.as_str(), name).as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Add or update an entity. On update: tags are unioned, properties
    /// shallow-merged with new values winning, `risk_score` replaced only
    /// when supplied, `last_seen` refreshed. Always succeeds.
    pub fn upsert_entity(
        &self,
        entity_type: EntityType,
        name: &str,
        properties: HashMap<String, serde_json::Value>,
        risk_score: Option<f64>,
        tags: Vec<String>,
    ) -> Entity {
        let id = Self::entity_id(entity_type, name);
        let now = chrono::Utc::now().timestamp();
        self.total_upserts.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write();
        if let Some(existing) = state.entities.get_mut(&id) {
            existing.properties.extend(properties);
            if let Some(score) = risk_score {
                existing.risk_score = score;
            }
            existing.tags.extend(tags);
            existing.last_seen = now;
            return existing.clone();
        }

        let entity = Entity {
            id: id.clone(),
            entity_type,
            name: name.to_string(),
            properties,
            risk_score: risk_score.unwrap_or(0.0),
            first_seen: now,
            last_seen: now,
            tags: tags.into_iter().collect(),
        };
        debug!(id = %id, entity_type = entity_type.as_str(), name = %name, "Entity created");
        state.entities.insert(id.clone(), entity.clone());
        state.type_index.entry(entity_type).or_default().insert(id);
        entity
    }

    /// Add a directed relationship. Fails only when an endpoint entity is
    /// absent. Re-adding the same (source, type, target) triple overwrites
    /// the prior edge; whether weights should accumulate instead is an
    /// upstream ambiguity, so last-write-wins is preserved.
    pub fn add_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
        properties: HashMap<String, serde_json::Value>,
        weight: f64,
    ) -> Result<Relationship, GraphError> {
        let mut state = self.state.write();
        for endpoint in [source_id, target_id] {
            if !state.entities.contains_key(endpoint) {
                return Err(GraphError::EntityNotFound { id: endpoint.to_string() });
            }
        }

        let id = format!("{}-{}-{}", source_id, relation_type.as_str(), target_id);
        let relationship = Relationship {
            id: id.clone(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relation_type,
            properties,
            weight,
            created_at: chrono::Utc::now().timestamp(),
        };

        state.relationships.insert(id.clone(), relationship.clone());
        state.outgoing_index.entry(source_id.to_string()).or_default().insert(id.clone());
        state.incoming_index.entry(target_id.to_string()).or_default().insert(id);
        Ok(relationship)
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    /// Entity by id; `None` for unknown ids, never an error.
    pub fn entity(&self, id: &str) -> Option<Entity> {
        self.state.read().entities.get(id).cloned()
    }

    pub fn entities_by_type(&self, entity_type: EntityType) -> Vec<Entity> {
        self.state.read().entities_of_type(entity_type).into_iter().cloned().collect()
    }

    pub fn outgoing(&self, entity_id: &str) -> Vec<Relationship> {
        self.state.read().outgoing_of(entity_id).into_iter().cloned().collect()
    }

    pub fn incoming(&self, entity_id: &str) -> Vec<Relationship> {
        self.state.read().incoming_of(entity_id).into_iter().cloned().collect()
    }

    // ── Projections ──────────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        let state = self.state.read();
        let mut entity_counts = std::collections::BTreeMap::new();
        for (entity_type, ids) in &state.type_index {
            entity_counts.insert(entity_type.as_str().to_string(), ids.len());
        }

        let mut total_risk = 0.0;
        let mut high_risk = 0;
        for entity in state.entities.values() {
            total_risk += entity.risk_score;
            if entity.risk_score > 70.0 {
                high_risk += 1;
            }
        }

        GraphStats {
            total_entities: state.entities.len(),
            total_relationships: state.relationships.len(),
            entity_counts,
            avg_risk_score: if state.entities.is_empty() {
                0.0
            } else {
                total_risk / state.entities.len() as f64
            },
            high_risk_entities: high_risk,
        }
    }

    pub fn export_for_visualization(&self) -> GraphExport {
        let state = self.state.read();
        let nodes = state
            .entities
            .values()
            .map(|e| GraphNode {
                id: e.id.clone(),
                label: e.name.clone(),
                entity_type: e.entity_type,
                risk: e.risk_score,
            })
            .collect();
        let edges = state
            .relationships
            .values()
            .map(|r| GraphEdge {
                source: r.source_id.clone(),
                target: r.target_id.clone(),
                relation_type: r.relation_type,
                weight: r.weight,
            })
            .collect();
        GraphExport { nodes, edges }
    }

    pub fn total_upserts(&self) -> u64 {
        self.total_upserts.load(Ordering::Relaxed)
    }
}

impl Default for SecurityGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_upsert_is_idempotent_on_natural_key() {
        let graph = SecurityGraph::new();
        let first = graph.upsert_entity(
            EntityType::Ip,
            "1.2.3.4",
            props(&[("country", json!("NL"))]),
            Some(40.0),
            vec!["scanner".into()],
        );
        let second = graph.upsert_entity(
            EntityType::Ip,
            "1.2.3.4",
            props(&[("asn", json!(64496))]),
            Some(85.0),
            vec!["botnet".into()],
        );

        assert_eq!(first.id, second.id);
        assert_eq!(graph.stats().total_entities, 1);
        // Tags are the union of both calls.
        assert!(second.has_tag("scanner"));
        assert!(second.has_tag("botnet"));
        // Properties shallow-merge, risk score reflects the latest value.
        assert_eq!(second.property_i64("asn"), 64496);
        assert_eq!(second.properties["country"], json!("NL"));
        assert_eq!(second.risk_score, 85.0);
        assert_eq!(second.first_seen, first.first_seen);
    }

    #[test]
    fn test_upsert_without_risk_score_keeps_existing() {
        let graph = SecurityGraph::new();
        graph.upsert_entity(EntityType::Vendor, "Acme", HashMap::new(), Some(65.0), vec![]);
        let updated =
            graph.upsert_entity(EntityType::Vendor, "Acme", HashMap::new(), None, vec![]);
        assert_eq!(updated.risk_score, 65.0);
    }

    #[test]
    fn test_entity_id_is_stable_and_type_scoped() {
        let a = SecurityGraph::entity_id(EntityType::Ip, "10.0.0.1");
        let b = SecurityGraph::entity_id(EntityType::Ip, "10.0.0.1");
        let c = SecurityGraph::entity_id(EntityType::Device, "10.0.0.1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_add_relationship_requires_both_endpoints() {
        let graph = SecurityGraph::new();
        let ip = graph.upsert_entity(EntityType::Ip, "1.1.1.1", HashMap::new(), None, vec![]);

        let err = graph
            .add_relationship(&ip.id, "missing", RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap_err();
        assert_eq!(err, GraphError::EntityNotFound { id: "missing".into() });

        // Counts unchanged on failure.
        let stats = graph.stats();
        assert_eq!(stats.total_entities, 1);
        assert_eq!(stats.total_relationships, 0);
    }

    #[test]
    fn test_duplicate_relationship_is_last_write_wins() {
        let graph = SecurityGraph::new();
        let a = graph.upsert_entity(EntityType::User, "alice", HashMap::new(), None, vec![]);
        let b = graph.upsert_entity(EntityType::Asset, "db", HashMap::new(), None, vec![]);

        graph.add_relationship(&a.id, &b.id, RelationType::Accessed, HashMap::new(), 1.0).unwrap();
        graph.add_relationship(&a.id, &b.id, RelationType::Accessed, HashMap::new(), 3.0).unwrap();

        let out = graph.outgoing(&a.id);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].weight, 3.0);
        assert_eq!(graph.stats().total_relationships, 1);
    }

    #[test]
    fn test_adjacency_indices() {
        let graph = SecurityGraph::new();
        let a = graph.upsert_entity(EntityType::Ip, "9.9.9.9", HashMap::new(), None, vec![]);
        let b = graph.upsert_entity(EntityType::Device, "fw-1", HashMap::new(), None, vec![]);
        let rel = graph
            .add_relationship(&a.id, &b.id, RelationType::CommunicatesWith, HashMap::new(), 1.0)
            .unwrap();

        assert_eq!(graph.outgoing(&a.id)[0].id, rel.id);
        assert_eq!(graph.incoming(&b.id)[0].id, rel.id);
        assert!(graph.outgoing(&b.id).is_empty());
        assert!(graph.incoming("unknown").is_empty());
    }

    #[test]
    fn test_stats_and_export() {
        let graph = SecurityGraph::new();
        let a = graph.upsert_entity(EntityType::Ip, "8.8.8.8", HashMap::new(), Some(80.0), vec![]);
        let b = graph.upsert_entity(EntityType::Asset, "api", HashMap::new(), Some(20.0), vec![]);
        graph.add_relationship(&a.id, &b.id, RelationType::Accessed, HashMap::new(), 1.0).unwrap();

        let stats = graph.stats();
        assert_eq!(stats.total_entities, 2);
        assert_eq!(stats.total_relationships, 1);
        assert_eq!(stats.entity_counts["ip"], 1);
        assert_eq!(stats.avg_risk_score, 50.0);
        assert_eq!(stats.high_risk_entities, 1);

        let export = graph.export_for_visualization();
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.edges.len(), 1);
        assert_eq!(export.edges[0].source, a.id);
    }
}
