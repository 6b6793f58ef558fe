//! # Toxic combinations
//!
//! Fixed co-occurrence heuristics over the graph. Three rules, swept in
//! order, results sorted most urgent first:
//!
//! 1. high-risk vendor with a path (<= 3 hops) to a database/PII asset
//! 2. severe vulnerability with a path (<= 2 hops) to an externally
//!    exposed API endpoint
//! 3. employee with repeated access violations holding an `accessed`
//!    edge to a sensitive/PII asset

use crate::graph::SecurityGraph;
use crate::paths::has_path;
use crate::types::*;

const VENDOR_RISK_THRESHOLD: f64 = 60.0;
const VULN_RISK_THRESHOLD: f64 = 70.0;
const VENDOR_PATH_DEPTH: usize = 3;
const VULN_PATH_DEPTH: usize = 2;
const VIOLATION_THRESHOLD: i64 = 2;
const SEVERE_VIOLATION_THRESHOLD: i64 = 5;

impl SecurityGraph {
    /// Sweep all three pattern rules. Sorted by priority
    /// (critical, high, medium, low).
    pub fn find_toxic_combinations(&self) -> Vec<ToxicCombination> {
        let state = self.state.read();
        let mut combinations = Vec::new();

        // Rule 1: high-risk vendor with a path to a sensitive data asset.
        let vendors: Vec<&Entity> = state
            .entities_of_type(EntityType::Vendor)
            .into_iter()
            .filter(|v| v.risk_score > VENDOR_RISK_THRESHOLD)
            .collect();
        let data_assets: Vec<&Entity> = state
            .entities_of_type(EntityType::Asset)
            .into_iter()
            .filter(|a| a.has_tag("database") || a.has_tag("pii"))
            .collect();
        for vendor in &vendors {
            for asset in &data_assets {
                if has_path(&state, &vendor.id, &asset.id, VENDOR_PATH_DEPTH) {
                    combinations.push(ToxicCombination {
                        entities: vec![(*vendor).clone(), (*asset).clone()],
                        risk: "Data breach via vendor".to_string(),
                        description: format!(
                            "High-risk vendor \"{}\" has access path to sensitive asset \"{}\"",
                            vendor.name, asset.name
                        ),
                        priority: Priority::High,
                    });
                }
            }
        }

        // Rule 2: exploitable vulnerability reachable from outside.
        let vulns: Vec<&Entity> = state
            .entities_of_type(EntityType::Vulnerability)
            .into_iter()
            .filter(|v| v.risk_score > VULN_RISK_THRESHOLD)
            .collect();
        let exposed: Vec<&Entity> = state
            .entities_of_type(EntityType::ApiEndpoint)
            .into_iter()
            .filter(|e| e.property_bool("is_public") || e.has_tag("external"))
            .collect();
        for vuln in &vulns {
            for endpoint in &exposed {
                if has_path(&state, &vuln.id, &endpoint.id, VULN_PATH_DEPTH) {
                    combinations.push(ToxicCombination {
                        entities: vec![(*vuln).clone(), (*endpoint).clone()],
                        risk: "Exploitable external vulnerability".to_string(),
                        description: format!(
                            "Critical vulnerability \"{}\" is reachable via public endpoint \"{}\"",
                            vuln.name, endpoint.name
                        ),
                        priority: Priority::Critical,
                    });
                }
            }
        }

        // Rule 3: insider with a violation history touching sensitive data.
        let flagged: Vec<&Entity> = state
            .entities_of_type(EntityType::Employee)
            .into_iter()
            .filter(|e| e.property_i64("violations") > VIOLATION_THRESHOLD)
            .collect();
        for employee in &flagged {
            let sensitive: Vec<Entity> = state
                .outgoing_of(&employee.id)
                .into_iter()
                .filter(|r| r.relation_type == RelationType::Accessed)
                .filter_map(|r| state.entities.get(&r.target_id))
                .filter(|a| a.has_tag("sensitive") || a.has_tag("pii"))
                .cloned()
                .collect();
            if sensitive.is_empty() {
                continue;
            }
            let violations = employee.property_i64("violations");
            let mut entities = vec![(*employee).clone()];
            entities.extend(sensitive);
            combinations.push(ToxicCombination {
                entities,
                risk: "Insider threat".to_string(),
                description: format!(
                    "Employee \"{}\" with {} violations accessing sensitive assets",
                    employee.name, violations
                ),
                priority: if violations > SEVERE_VIOLATION_THRESHOLD {
                    Priority::High
                } else {
                    Priority::Medium
                },
            });
        }

        combinations.sort_by_key(|c| c.priority);
        combinations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn props(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_vendor_with_database_access_is_toxic() {
        let graph = SecurityGraph::new();
        let vendor = graph.upsert_entity(
            EntityType::Vendor,
            "Acme Corp",
            HashMap::new(),
            Some(65.0),
            vec![],
        );
        let asset = graph.upsert_entity(
            EntityType::Asset,
            "CustomerDB",
            HashMap::new(),
            None,
            vec!["database".into()],
        );
        graph
            .add_relationship(&vendor.id, &asset.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();

        let combos = graph.find_toxic_combinations();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].priority, Priority::High);
        assert_eq!(combos[0].risk, "Data breach via vendor");
        let names: Vec<&str> = combos[0].entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Corp", "CustomerDB"]);
    }

    #[test]
    fn test_low_risk_vendor_is_not_toxic() {
        let graph = SecurityGraph::new();
        let vendor =
            graph.upsert_entity(EntityType::Vendor, "Benign", HashMap::new(), Some(30.0), vec![]);
        let asset = graph.upsert_entity(
            EntityType::Asset,
            "CustomerDB",
            HashMap::new(),
            None,
            vec!["database".into()],
        );
        graph
            .add_relationship(&vendor.id, &asset.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();
        assert!(graph.find_toxic_combinations().is_empty());
    }

    #[test]
    fn test_external_vulnerability_is_critical_and_sorted_first() {
        let graph = SecurityGraph::new();
        // High vendor combo...
        let vendor =
            graph.upsert_entity(EntityType::Vendor, "Acme", HashMap::new(), Some(70.0), vec![]);
        let db = graph.upsert_entity(
            EntityType::Asset,
            "pii-store",
            HashMap::new(),
            None,
            vec!["pii".into()],
        );
        graph
            .add_relationship(&vendor.id, &db.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();
        // ...plus a critical vulnerability combo.
        let vuln = graph.upsert_entity(
            EntityType::Vulnerability,
            "CVE-2024-0001",
            HashMap::new(),
            Some(90.0),
            vec![],
        );
        let api = graph.upsert_entity(
            EntityType::ApiEndpoint,
            "/v1/export",
            props(&[("is_public", json!(true))]),
            None,
            vec![],
        );
        graph
            .add_relationship(&vuln.id, &api.id, RelationType::Exploits, HashMap::new(), 1.0)
            .unwrap();

        let combos = graph.find_toxic_combinations();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0].priority, Priority::Critical);
        assert_eq!(combos[0].risk, "Exploitable external vulnerability");
        assert_eq!(combos[1].priority, Priority::High);
    }

    #[test]
    fn test_insider_priority_scales_with_violations() {
        let graph = SecurityGraph::new();
        let asset = graph.upsert_entity(
            EntityType::Asset,
            "payroll",
            HashMap::new(),
            None,
            vec!["sensitive".into()],
        );

        let mild = graph.upsert_entity(
            EntityType::Employee,
            "jan",
            props(&[("violations", json!(3))]),
            None,
            vec![],
        );
        graph
            .add_relationship(&mild.id, &asset.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();

        let severe = graph.upsert_entity(
            EntityType::Employee,
            "kim",
            props(&[("violations", json!(7))]),
            None,
            vec![],
        );
        graph
            .add_relationship(&severe.id, &asset.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();

        let combos = graph.find_toxic_combinations();
        assert_eq!(combos.len(), 2);
        // High (7 violations) sorts before medium (3 violations).
        assert_eq!(combos[0].priority, Priority::High);
        assert_eq!(combos[0].entities[0].name, "kim");
        assert_eq!(combos[1].priority, Priority::Medium);
        assert_eq!(combos[1].entities[0].name, "jan");
    }

    #[test]
    fn test_employee_without_sensitive_access_is_clean() {
        let graph = SecurityGraph::new();
        let wiki =
            graph.upsert_entity(EntityType::Asset, "wiki", HashMap::new(), None, vec![]);
        let emp = graph.upsert_entity(
            EntityType::Employee,
            "lee",
            props(&[("violations", json!(9))]),
            None,
            vec![],
        );
        graph
            .add_relationship(&emp.id, &wiki.id, RelationType::Accessed, HashMap::new(), 1.0)
            .unwrap();
        assert!(graph.find_toxic_combinations().is_empty());
    }
}
