//! Text rendering - ASCII-only terminal output for an investigation.

use crate::catalog::{CatalogIssue, ScenarioCatalog};
use crate::engine::Investigation;
use crate::probe::registry::ProbeRegistry;
use dbmedic_common::{Deduction, MedicError, Priority, ProbeResult};
use owo_colors::OwoColorize;
use std::fmt::Write;

const SEPARATOR: &str = "------------------------------------------------------------";

fn priority_tag(priority: Priority) -> String {
    match priority {
        Priority::High => "[HIGH]".bright_red().to_string(),
        Priority::Medium => "[MEDIUM]".yellow().to_string(),
        Priority::Low => "[LOW]".dimmed().to_string(),
    }
}

fn score_colored(value: u8) -> String {
    let text = format!("{}/100", value);
    if value >= 90 {
        text.bright_green().to_string()
    } else if value >= 70 {
        text.yellow().to_string()
    } else {
        text.bright_red().to_string()
    }
}

fn deduction_line(d: &Deduction) -> String {
    format!(
        "  -{:<3} {} {}",
        d.amount,
        d.reason,
        format!("({})", d.rule.explanation()).dimmed()
    )
}

/// Render an investigation for humans
pub fn render_investigation(inv: &Investigation) -> String {
    let mut out = String::new();
    let report = &inv.report;

    let _ = writeln!(out, "{}", SEPARATOR.dimmed());
    let _ = writeln!(out, "Run {}  {}", inv.run_id, inv.started_at.to_rfc3339());
    let _ = writeln!(out, "Trigger: {}", inv.trigger.summary());
    let _ = writeln!(
        out,
        "Scenario: {}{}",
        inv.classification.scenario.cyan(),
        if inv.classification.ambiguous { " (ambiguous)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Probes: {} of {} ({:.0}% reduction)",
        inv.selection.probes.len(),
        inv.selection.registry_size,
        inv.selection.reduction_ratio * 100.0
    );
    if let Some(reason) = &report.fallback_reason {
        let _ = writeln!(out, "{} {}", "[FALLBACK]".yellow(), reason);
    }
    let _ = writeln!(out, "{}", SEPARATOR.dimmed());

    let _ = writeln!(out, "Health: {} ({})", score_colored(inv.health.value), inv.health.band());
    for d in &inv.health.deductions {
        let _ = writeln!(out, "{}", deduction_line(d));
    }
    if !inv.health.unassessed_domains.is_empty() {
        let names: Vec<_> = inv.health.unassessed_domains.iter().map(|d| d.as_str()).collect();
        let _ = writeln!(out, "  {} {}", "not assessed:".dimmed(), names.join(", "));
    }

    let failures: Vec<MedicError> = report.results.values().filter_map(ProbeResult::failure).collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[DEGRADED] {} probes without usable data", failures.len());
        for failure in failures {
            let _ = writeln!(out, "  * [{}] {}", failure.code(), failure.red());
        }
    }

    let _ = writeln!(out);
    if inv.recommendations.is_empty() {
        let _ = writeln!(out, "No recommendations.");
    } else {
        let _ = writeln!(out, "[RECOMMENDATIONS]");
        for (i, rec) in inv.recommendations.iter().enumerate() {
            let _ = writeln!(out, "{:>2}. {} {} {}", i + 1, priority_tag(rec.priority), rec.kind.as_str(), rec.target);
            let _ = writeln!(out, "    {}", rec.rationale);
            let _ = writeln!(out, "    {}", rec.statement.dimmed());
        }
    }
    out
}

/// Registry listing for `dbmedicd probes`
pub fn render_probes(registry: &ProbeRegistry) -> String {
    let mut out = String::new();
    for spec in registry.list() {
        let _ = writeln!(
            out,
            "{:<18} {:<14} {:<6} {:<16} {}",
            spec.id,
            spec.data_plane.as_str(),
            spec.cost_tier.as_str(),
            spec.domain.as_str(),
            spec.description
        );
    }
    out
}

/// Catalog listing for `dbmedicd scenarios`
pub fn render_scenarios(catalog: &ScenarioCatalog, registry_size: usize, issues: &[CatalogIssue]) -> String {
    let mut out = String::new();
    for scenario in catalog.scenarios() {
        let reduction = if registry_size == 0 {
            0.0
        } else {
            100.0 * (1.0 - scenario.probes.len() as f64 / registry_size as f64)
        };
        let probes: Vec<_> = scenario.probes.iter().map(|p| p.as_str()).collect();
        let _ = writeln!(
            out,
            "{:<20} {:>3.0}%  {}",
            scenario.id.as_str(),
            reduction,
            probes.join(", ")
        );
    }
    let _ = writeln!(out, "{:<20} {:>3.0}%  (all {} probes)", "comprehensive", 0.0, registry_size);
    for issue in issues {
        let _ = writeln!(out, "{} {}", "[WARN]".yellow(), issue);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::probe::fake::FakeRegistryBuilder;

    #[test]
    fn test_render_probes_lists_every_probe() {
        let registry = FakeRegistryBuilder::standard().build().registry;
        let text = render_probes(&registry);
        assert_eq!(text.lines().count(), registry.count());
        assert!(text.lines().any(|l| l.starts_with("cpu ") && l.contains("cpu")));
    }

    #[test]
    fn test_render_scenarios_shows_reduction_and_issues() {
        let registry = FakeRegistryBuilder::standard().build().registry;
        let mut config = CatalogConfig::default();
        config.scenarios[0].probes.push("gpu_temperature".to_string());
        let (catalog, issues) = ScenarioCatalog::from_config(&config, &registry);

        let text = render_scenarios(&catalog, registry.count(), &issues);
        assert!(text.contains("(all 17 probes)"));
        assert!(text.contains("[WARN]"));
        assert!(text.contains("gpu_temperature"));
    }

    #[test]
    fn test_deduction_line_carries_rule_explanation() {
        let line = deduction_line(&Deduction {
            rule: dbmedic_common::DeductionRule::HighCpu,
            amount: 20,
            reason: "CPU utilization 85.0% exceeds 80%".to_string(),
        });
        assert!(line.starts_with("  -20  CPU utilization 85.0% exceeds 80%"));
        assert!(line.contains("(CPU utilization above threshold)"));
    }

    #[test]
    fn test_priority_tags() {
        assert!(priority_tag(Priority::High).contains("[HIGH]"));
        assert!(priority_tag(Priority::Low).contains("[LOW]"));
        assert!(score_colored(85).contains("85/100"));
    }
}
