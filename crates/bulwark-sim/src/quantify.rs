//! Risk aggregation and quantification.
//!
//! Folds per-component profiles and the compromised set into one 0..=max
//! impact score and a flat findings report.

use std::collections::BTreeMap;

use serde::Serialize;

use bulwark_core::{Component, MitreTactic, Severity};

use crate::profile::NodeProfile;

/// One finding as reported to consumers, tagged with its component.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindingReport {
    pub component_id: String,
    pub rule_id: String,
    /// Finding message prefixed with the component name.
    pub description: String,
    pub severity: Severity,
    pub compliance_mappings: Vec<String>,
    pub mitre_tactic: Option<MitreTactic>,
    /// ATT&CK tactic id, e.g. `TA0001`.
    pub mitre_tactic_id: Option<&'static str>,
    pub mitre_technique: Option<String>,
    pub mitre_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_code: Option<String>,
}

/// Sum of every component's own score, compromised or not.
pub fn total_system_risk(profiles: &[NodeProfile]) -> u32 {
    profiles
        .iter()
        .fold(0u32, |acc, p| acc.saturating_add(p.score))
}

/// Fraction of components compromised. Zero for an empty diagram.
pub fn blast_radius_pct(compromised: usize, node_count: usize) -> f64 {
    compromised as f64 / node_count.max(1) as f64
}

/// Hard ceiling of the impact score. Configured maxima above it are ignored.
pub const IMPACT_SCORE_CEILING: u32 = 100;

/// `round_half_up(total × (1 + compromised / nodes))`, clamped to
/// `min(max, 100)`.
///
/// Evaluated as `(2·total·(n + c) + n) / 2n` so the rounding is exact.
pub fn impact_score(total_risk: u32, compromised: usize, node_count: usize, max: u32) -> u32 {
    if node_count == 0 {
        return 0;
    }
    let n = node_count as u128;
    let c = compromised as u128;
    let scaled = (2 * u128::from(total_risk) * (n + c) + n) / (2 * n);
    scaled.min(u128::from(max.min(IMPACT_SCORE_CEILING))) as u32
}

/// Flatten every component's findings into report entries, in node order.
pub fn findings_report(nodes: &[Component], profiles: &[NodeProfile]) -> Vec<FindingReport> {
    nodes
        .iter()
        .zip(profiles)
        .flat_map(|(node, profile)| {
            let name = node.display_name();
            profile.findings.iter().map(move |f| FindingReport {
                component_id: node.id.clone(),
                rule_id: f.rule_id.clone(),
                description: format!("[{name}] {}", f.message),
                severity: f.severity,
                compliance_mappings: f.compliance_mappings.clone(),
                mitre_tactic: Some(f.mitre_tactic),
                mitre_tactic_id: Some(f.mitre_tactic.id()),
                mitre_technique: Some(f.mitre_technique.clone()),
                mitre_id: Some(f.mitre_id.clone()),
                remediation_code: f.remediation_code.clone(),
            })
        })
        .collect()
}

/// Report entry counts keyed by severity.
pub fn count_by_severity(findings: &[FindingReport]) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
}
