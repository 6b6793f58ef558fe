//! # Traversal — attack paths and blast radius
//!
//! Bounded breadth-first search over the adjacency indices. All traversal
//! runs under a single read lock so a sweep sees one consistent graph.
//!
//! Attack paths are ranked by `total_risk` descending; ties break on
//! fewer steps, then lexicographic first-hop entity id, so results are
//! deterministic for identical graphs.

use crate::graph::{GraphState, SecurityGraph};
use crate::types::*;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::Ordering;

/// Default hop bound for attack path discovery.
pub const DEFAULT_ATTACK_PATH_DEPTH: usize = 5;
/// Default level bound for blast radius sweeps.
pub const DEFAULT_BLAST_RADIUS_DEPTH: usize = 4;

/// Risk score above which an IP counts as a plausible attack source.
const RISKY_SOURCE_THRESHOLD: f64 = 50.0;

impl SecurityGraph {
    /// Find attack paths from every risky external IP to `target_id`.
    ///
    /// For each `ip` entity with risk score above 50, runs a bounded BFS
    /// toward the target; each discovered path is scored by summing
    /// `entity.risk_score * relationship.weight` per hop plus the target's
    /// own risk score.
    pub fn find_attack_paths(&self, target_id: &str, max_depth: usize) -> Vec<AttackPath> {
        let state = self.state.read();
        if !state.entities.contains_key(target_id) {
            return Vec::new();
        }

        let sources: Vec<String> = state
            .entities_of_type(EntityType::Ip)
            .into_iter()
            .filter(|e| e.risk_score > RISKY_SOURCE_THRESHOLD)
            .map(|e| e.id.clone())
            .collect();

        let mut paths = Vec::new();
        for source_id in sources {
            let node_ids = find_path(&state, &source_id, target_id, max_depth);
            if node_ids.is_empty() {
                continue;
            }
            let path = self.build_attack_path(&state, &node_ids);
            if path.total_risk > 0.0 {
                paths.push(path);
            }
        }

        paths.sort_by(|a, b| {
            b.total_risk
                .partial_cmp(&a.total_risk)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.steps.len().cmp(&b.steps.len()))
                .then_with(|| first_hop_id(a).cmp(first_hop_id(b)))
        });
        paths
    }

    /// Outward reachability from `entity_id`, bounded to
    /// [`DEFAULT_BLAST_RADIUS_DEPTH`] levels.
    pub fn blast_radius(&self, entity_id: &str) -> BlastRadius {
        self.blast_radius_bounded(entity_id, DEFAULT_BLAST_RADIUS_DEPTH)
    }

    /// Level-order sweep strictly along outgoing edges: level 0 is the
    /// seed itself, so `max_depth` levels reach entities up to
    /// `max_depth - 1` hops out. The affected set only grows as
    /// `max_depth` grows.
    pub fn blast_radius_bounded(&self, entity_id: &str, max_depth: usize) -> BlastRadius {
        let state = self.state.read();
        let mut visited: HashSet<String> = HashSet::new();
        let mut affected: Vec<String> = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::from([entity_id.to_string()]);
        let mut depth = 0;

        while !queue.is_empty() && depth < max_depth {
            for _ in 0..queue.len() {
                let Some(current) = queue.pop_front() else { break };
                if !visited.insert(current.clone()) {
                    continue;
                }
                affected.push(current.clone());
                for rel in state.outgoing_of(&current) {
                    if !visited.contains(&rel.target_id) {
                        queue.push_back(rel.target_id.clone());
                    }
                }
            }
            depth += 1;
        }

        let affected_entities: Vec<Entity> =
            affected.iter().filter_map(|id| state.entities.get(id).cloned()).collect();
        let total: f64 = affected_entities.iter().map(|e| e.risk_score).sum();
        let risk_score = total / affected_entities.len().max(1) as f64;
        let seed_name = state
            .entities
            .get(entity_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| entity_id.to_string());

        BlastRadius {
            description: format!(
                "Compromise of {} could affect {} entities",
                seed_name,
                affected_entities.len()
            ),
            affected_entities,
            risk_score,
        }
    }

    fn build_attack_path(&self, state: &GraphState, node_ids: &[String]) -> AttackPath {
        let mut steps = Vec::new();
        let mut total_risk = 0.0;

        for window in node_ids.windows(2) {
            let (from, to) = (&window[0], &window[1]);
            let entity = match state.entities.get(from) {
                Some(e) => e,
                None => continue,
            };
            let relationship =
                match state.outgoing_of(from).into_iter().find(|r| &r.target_id == to) {
                    Some(r) => r,
                    None => continue,
                };
            let risk_contribution = entity.risk_score * relationship.weight;
            total_risk += risk_contribution;
            steps.push(AttackStep {
                entity: entity.clone(),
                relationship: relationship.clone(),
                action: action_label(relationship.relation_type).to_string(),
                risk_contribution,
            });
        }

        // The target contributes its own risk score once.
        if let Some(last) = node_ids.last().and_then(|id| state.entities.get(id)) {
            total_risk += last.risk_score;
        }

        let id = format!("AP-{}", self.next_path_id.fetch_add(1, Ordering::Relaxed));
        AttackPath {
            id,
            description: describe_path(&steps),
            mitigations: suggest_mitigations(&steps),
            steps,
            total_risk,
        }
    }
}

/// BFS for a single path from `source` to `target`; returns the node id
/// chain (source first) or empty when unreachable within `max_depth`.
pub(crate) fn find_path(
    state: &GraphState,
    source: &str,
    target: &str,
    max_depth: usize,
) -> Vec<String> {
    if source == target {
        return vec![source.to_string()];
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, Vec<String>)> =
        VecDeque::from([(source.to_string(), vec![source.to_string()])]);

    while let Some((id, path)) = queue.pop_front() {
        if path.len() > max_depth {
            continue;
        }
        if !visited.insert(id.clone()) {
            continue;
        }

        for rel in state.outgoing_of(&id) {
            if rel.target_id == target {
                let mut found = path.clone();
                found.push(rel.target_id.clone());
                return found;
            }
            if !visited.contains(&rel.target_id) {
                let mut next = path.clone();
                next.push(rel.target_id.clone());
                queue.push_back((rel.target_id.clone(), next));
            }
        }
    }

    Vec::new()
}

pub(crate) fn has_path(state: &GraphState, source: &str, target: &str, max_depth: usize) -> bool {
    !find_path(state, source, target, max_depth).is_empty()
}

fn first_hop_id(path: &AttackPath) -> &str {
    path.steps.first().map(|s| s.entity.id.as_str()).unwrap_or("")
}

/// Attacker action phrasing per edge kind.
fn action_label(relation_type: RelationType) -> &'static str {
    match relation_type {
        RelationType::Accessed => "Gain access to",
        RelationType::DependsOn => "Exploit dependency",
        RelationType::CommunicatesWith => "Lateral movement to",
        RelationType::HasVulnerability => "Exploit vulnerability in",
        RelationType::Exploits => "Execute exploit against",
        RelationType::Owns => "Compromise owned",
        RelationType::Manages => "Abuse management access to",
        RelationType::Triggered => "Trigger action on",
        RelationType::Blocked => "Attempt blocked at",
        RelationType::SimilarTo => "Pivot to similar",
    }
}

fn describe_path(steps: &[AttackStep]) -> String {
    if steps.is_empty() {
        return "No attack path".to_string();
    }
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {} {}", i + 1, step.action, step.entity.name))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Deduplicated, order-preserving mitigation suggestions for a path.
fn suggest_mitigations(steps: &[AttackStep]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut mitigations = Vec::new();
    for step in steps {
        let suggestion = match step.relationship.relation_type {
            RelationType::HasVulnerability => {
                Some(format!("Patch vulnerability in {}", step.entity.name))
            }
            RelationType::Accessed => {
                Some(format!("Review access controls for {}", step.entity.name))
            }
            RelationType::CommunicatesWith => Some("Implement network segmentation".to_string()),
            RelationType::Exploits => {
                Some(format!("Enable exploit protection for {}", step.entity.name))
            }
            _ => None,
        };
        if let Some(m) = suggestion {
            if seen.insert(m.clone()) {
                mitigations.push(m);
            }
        }
    }
    mitigations
}
