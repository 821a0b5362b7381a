//! Health scorer - deterministic 0-100 score from report content.
//!
//! Starts at 100 and walks a fixed deduction table. Only payload values are
//! read; timestamps and latencies never influence the result.

use crate::config::ScoringConfig;
use dbmedic_common::{
    AggregatedReport, AlarmRecord, AlarmState, Deduction, DeductionRule, HealthScore, MetricDomain,
};

/// Score a report
pub fn score(report: &AggregatedReport, config: &ScoringConfig) -> HealthScore {
    let mut deductions = Vec::new();

    if let Some(cpu) = scalar(report, MetricDomain::Cpu) {
        if cpu > config.cpu_threshold_pct {
            deductions.push(Deduction {
                rule: DeductionRule::HighCpu,
                amount: config.cpu_deduction,
                reason: format!(
                    "CPU utilization {:.1}% exceeds {:.0}%",
                    cpu, config.cpu_threshold_pct
                ),
            });
        }
    }

    if let Some(connections) = scalar(report, MetricDomain::Connections) {
        if connections > config.connection_threshold {
            deductions.push(Deduction {
                rule: DeductionRule::ConnectionPressure,
                amount: config.connection_deduction,
                reason: format!(
                    "{:.0} active connections exceed {:.0}",
                    connections, config.connection_threshold
                ),
            });
        }
    }

    if let Some(hit) = scalar(report, MetricDomain::BufferCache) {
        if hit < config.cache_hit_threshold_pct {
            deductions.push(Deduction {
                rule: DeductionRule::LowCacheHitRatio,
                amount: config.cache_deduction,
                reason: format!(
                    "Buffer cache hit ratio {:.1}% below {:.0}%",
                    hit, config.cache_hit_threshold_pct
                ),
            });
        }
    }

    let firing = firing_alarms(report);
    if !firing.is_empty() {
        deductions.push(Deduction {
            rule: DeductionRule::ActiveAlarm,
            amount: config.active_alarm_deduction,
            reason: format!("Alarms in ALARM state: {}", firing.join(", ")),
        });
    }

    let mut missing = Vec::new();
    let mut unassessed = Vec::new();
    for domain in &config.required_domains {
        if !report.attempted(*domain) {
            unassessed.push(*domain);
        } else if report.payload(*domain).is_none() {
            missing.push(domain.as_str());
        }
    }
    if !missing.is_empty() {
        let raw = missing.len() as u32 * config.missing_domain_deduction as u32;
        let amount = raw.min(config.missing_domain_cap as u32) as u8;
        deductions.push(Deduction {
            rule: DeductionRule::MissingMetricDomain,
            amount,
            reason: format!("No usable data for: {}", missing.join(", ")),
        });
    }

    let total: u32 = deductions.iter().map(|d| d.amount as u32).sum();
    HealthScore {
        value: 100u32.saturating_sub(total) as u8,
        deductions,
        unassessed_domains: unassessed,
    }
}

fn scalar(report: &AggregatedReport, domain: MetricDomain) -> Option<f64> {
    report.payload(domain).and_then(|p| domain.scalar(p))
}

/// Names of alarms in ALARM state across usable alarm payloads
fn firing_alarms(report: &AggregatedReport) -> Vec<String> {
    report
        .ok_entries(MetricDomain::Alarms)
        .filter_map(|e| e.payload.as_array())
        .flatten()
        .filter_map(|row| serde_json::from_value::<AlarmRecord>(row.clone()).ok())
        .filter(|a| a.state == AlarmState::Alarm)
        .map(|a| a.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::probe::registry::standard_specs;
    use chrono::{Duration, Utc};
    use dbmedic_common::{ProbeResult, ScenarioId};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn report(entries: Vec<(&str, Option<Value>)>) -> AggregatedReport {
        let specs = standard_specs();
        let now = Utc::now();
        let results = entries
            .into_iter()
            .map(|(id, payload)| {
                let spec = specs.iter().find(|s| s.id == id).unwrap();
                let result = match payload {
                    Some(p) => ProbeResult::ok(spec, p, 10, now),
                    None => ProbeResult::error(spec, "down".to_string(), 10, now),
                };
                (id.to_string(), result)
            })
            .collect::<BTreeMap<_, _>>();
        aggregate(ScenarioId::new("test"), results, None)
    }

    #[test]
    fn test_healthy_is_100() {
        let r = report(vec![
            ("cpu", Some(json!({"cpu_utilization_pct": 30.0}))),
            ("connections", Some(json!({"active_connections": 10}))),
            ("buffer_cache", Some(json!({"buffer_cache_hit_pct": 99.0}))),
            ("alarms", Some(json!([]))),
        ]);
        let s = score(&r, &ScoringConfig::default());
        assert_eq!(s.value, 100);
        assert!(s.deductions.is_empty());
        assert!(s.unassessed_domains.is_empty());
    }

    #[test]
    fn test_boundaries_are_strict() {
        let r = report(vec![
            ("cpu", Some(json!({"cpu_utilization_pct": 80.0}))),
            ("connections", Some(json!({"active_connections": 100}))),
            ("buffer_cache", Some(json!({"buffer_cache_hit_pct": 90.0}))),
        ]);
        assert_eq!(score(&r, &ScoringConfig::default()).value, 100);
    }

    #[test]
    fn test_failed_required_domains_are_capped() {
        let r = report(vec![
            ("cpu", None),
            ("connections", None),
            ("buffer_cache", None),
            ("alarms", None),
            ("freeable_memory", Some(json!({"freeable_memory_bytes": 1}))),
        ]);
        let cfg = ScoringConfig {
            missing_domain_cap: 15,
            ..ScoringConfig::default()
        };
        let s = score(&r, &cfg);
        assert_eq!(s.deductions.len(), 1);
        assert_eq!(s.deductions[0].rule, DeductionRule::MissingMetricDomain);
        assert_eq!(s.deductions[0].amount, 15);
        assert_eq!(s.value, 85);
    }

    #[test]
    fn test_unattempted_domains_are_unassessed() {
        let r = report(vec![("cpu", Some(json!({"cpu_utilization_pct": 10.0})))]);
        let s = score(&r, &ScoringConfig::default());
        assert_eq!(s.value, 100);
        assert_eq!(
            s.unassessed_domains,
            vec![MetricDomain::Connections, MetricDomain::BufferCache, MetricDomain::Alarms]
        );
    }

    #[test]
    fn test_score_ignores_timing() {
        let mut r = report(vec![
            ("cpu", Some(json!({"cpu_utilization_pct": 95.0}))),
            ("alarms", Some(json!([{"name": "a", "state": "ALARM"}]))),
        ]);
        let first = score(&r, &ScoringConfig::default());

        for result in r.results.values_mut() {
            result.latency_ms = 9_999;
            result.timestamp = result.timestamp - Duration::days(3);
        }
        for entries in r.domains.values_mut() {
            for e in entries.iter_mut() {
                e.timestamp = e.timestamp + Duration::hours(7);
            }
        }
        assert_eq!(score(&r, &ScoringConfig::default()), first);
        assert_eq!(first.value, 65);
    }

    #[test]
    fn test_clamped_at_zero() {
        let r = report(vec![
            ("cpu", Some(json!({"cpu_utilization_pct": 99.0}))),
            ("connections", Some(json!({"active_connections": 500}))),
            ("buffer_cache", Some(json!({"buffer_cache_hit_pct": 10.0}))),
            ("alarms", Some(json!([{"name": "a", "state": "ALARM"}]))),
        ]);
        let cfg = ScoringConfig {
            cpu_deduction: 60,
            connection_deduction: 60,
            ..ScoringConfig::default()
        };
        assert_eq!(score(&r, &cfg).value, 0);
    }
}
