use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vajra_alerts::AlertManager;
use vajra_core::{Module, Severity, VajraConfig};
use vajra_graph::{paths::DEFAULT_ATTACK_PATH_DEPTH, EntityType, RelationType, SecurityGraph};
use vajra_index::{
    AegisMetrics, ScoutMetrics, SentryMetrics, ShieldMetrics, VsiCalculator,
};

#[derive(Parser, Debug)]
#[command(name = "vajra", version, about = "Vajra: cross-module security correlation and alerting core")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "vajra.toml")]
    config: String,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Generate a default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Dry-run: load config, validate, print a report, exit
    #[arg(long)]
    dry_run: bool,

    /// Ingest a demo scenario and print the resulting index
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Generate Config ──────────────────────────────────────────────
    if cli.generate_config {
        let config = VajraConfig::default();
        config.save(&cli.config).map_err(|e| anyhow::anyhow!(e))?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    // ── Load Config ──────────────────────────────────────────────────
    let config = VajraConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        VajraConfig::default()
    });
    let log_level = cli.log_level.as_deref().unwrap_or(&config.general.log_level);

    // ── Tracing ──────────────────────────────────────────────────────
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Vajra correlation core v{}", env!("CARGO_PKG_VERSION"));

    // ── Core Components ──────────────────────────────────────────────
    // Explicit construction and wiring: the graph is shared with the
    // index, the alert manager stands alone. No module-level singletons.
    let graph = Arc::new(SecurityGraph::new());
    let index = Arc::new(VsiCalculator::new(graph.clone()));
    let alerts = Arc::new(AlertManager::new(config.alerts.clone()));
    info!(
        channels = config.alerts.channels.configured_count(),
        escalation = config.alerts.escalation.enabled,
        "Components initialized"
    );

    if cli.dry_run {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        info!("Dry-run complete. Configuration valid.");
        return Ok(());
    }

    // ── Escalation Sweep ─────────────────────────────────────────────
    // One ticker task owns all sweeps, so they can never overlap.
    if config.alerts.escalation.enabled && config.general.escalation_sweep_secs > 0 {
        let sweeper = alerts.clone();
        let interval = config.general.escalation_sweep_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
            loop {
                ticker.tick().await;
                let escalated = sweeper.check_escalations();
                if !escalated.is_empty() {
                    info!(count = escalated.len(), "Escalation sweep bumped alerts");
                }
            }
        });
        info!(interval_secs = interval, "Escalation sweep started");
    }

    if cli.demo {
        run_demo(&graph, &index, &alerts);
    }

    info!("Vajra running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // ── Shutdown ─────────────────────────────────────────────────────
    let stats = graph.stats();
    info!(
        entities = stats.total_entities,
        relationships = stats.total_relationships,
        alerts_raised = alerts.total_raised(),
        duplicates = alerts.duplicates_coalesced(),
        escalations = alerts.escalations_fired(),
        "Shutdown complete"
    );
    Ok(())
}

/// Seed a representative cross-module scenario and print what the
/// correlation core derives from it.
fn run_demo(graph: &SecurityGraph, index: &VsiCalculator, alerts: &AlertManager) {
    // Scanning collaborators push entities and relationships.
    let attacker = graph.upsert_entity(
        EntityType::Ip,
        "203.0.113.66",
        props(&[("country", "anonymous-proxy")]),
        Some(85.0),
        vec!["botnet".into()],
    );
    let gateway = graph.upsert_entity(
        EntityType::ApiEndpoint,
        "/v1/payments",
        HashMap::new(),
        Some(35.0),
        vec!["external".into()],
    );
    let vuln = graph.upsert_entity(
        EntityType::Vulnerability,
        "CVE-2025-31337",
        props(&[("cvss", "9.8")]),
        Some(92.0),
        vec![],
    );
    let vendor = graph.upsert_entity(
        EntityType::Vendor,
        "Acme Analytics",
        HashMap::new(),
        Some(68.0),
        vec![],
    );
    let database = graph.upsert_entity(
        EntityType::Asset,
        "customer-db",
        HashMap::new(),
        Some(55.0),
        vec!["database".into(), "pii".into()],
    );

    let _ = graph.add_relationship(&attacker.id, &gateway.id, RelationType::CommunicatesWith, HashMap::new(), 1.0);
    let _ = graph.add_relationship(&gateway.id, &database.id, RelationType::Accessed, HashMap::new(), 0.8);
    let _ = graph.add_relationship(&vuln.id, &gateway.id, RelationType::Exploits, HashMap::new(), 1.0);
    let _ = graph.add_relationship(&vendor.id, &database.id, RelationType::Accessed, HashMap::new(), 1.0);

    // Modules push their latest metric snapshots.
    index.update_shield(ShieldMetrics { blocked_threats: 140, requests_analyzed: 50_000, average_bot_score: 0.42, bunker_mode_activations: 0, ddos_attacks: 1 });
    index.update_scout(ScoutMetrics { vendor_count: 14, average_vendor_score: 71.0, high_risk_vendors: 1, recent_breaches: 0, compliance_rate: 86.0 });
    index.update_sentry(SentryMetrics { employee_count: 220, average_security_score: 78.0, phish_prone_percentage: 12.0, training_completion: 91.0, mfa_adoption: 88.0, recent_phishing_clicks: 1 });
    index.update_aegis(AegisMetrics { security_score: 74.0, critical_vulns: 1, high_vulns: 2, medium_vulns: 9, secrets_found: 0, outdated_deps: 12 });

    // What the core derives.
    let vsi = index.calculate();
    println!("VSI: {}/100 (grade {:?})", vsi.overall_score, vsi.grade);
    for (module, score) in &vsi.module_scores {
        println!("  {:<7} {:>5.1} ({:?})", module, score.score, score.status);
    }

    let summary = index.executive_summary();
    println!("{}", summary.headline);
    for item in &summary.action_items {
        println!("  - {}", item);
    }

    for combo in graph.find_toxic_combinations() {
        println!("toxic [{}] {}", combo.priority.as_str(), combo.description);
    }
    for path in graph.find_attack_paths(&database.id, DEFAULT_ATTACK_PATH_DEPTH) {
        println!("attack path (risk {:.0}): {}", path.total_risk, path.description);
    }
    let blast = graph.blast_radius(&attacker.id);
    println!("{}", blast.description);

    let alert = alerts.raise(
        Module::Aegis,
        Severity::Critical,
        "toxic_combination",
        "Exploitable external vulnerability",
        "CVE-2025-31337 is reachable via the public payments endpoint",
        HashMap::new(),
    );
    println!("alert {} raised ({} pending)", alert.id, alerts.pending_counts()[&Severity::Critical]);
}

fn props(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string()))).collect()
}
