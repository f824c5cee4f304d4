//! Node vulnerability profiler.
//!
//! Pure function from one component to its score, findings and sensitivity.
//! Formula: `score = round_half_up(Σ rule_delta × (1 + sensitivity × 0.1))`.

use serde::Serialize;

use bulwark_core::{Component, Finding};

use crate::config::SimulationConfig;
use crate::rules::{RULES, SENSITIVE_DATA};

/// Derived vulnerability profile of one component. Never cached.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeProfile {
    /// Sensitivity-weighted score.
    pub score: u32,
    /// Sum of rule deltas before weighting.
    pub raw_score: u32,
    pub findings: Vec<Finding>,
    pub sensitivity: u8,
}

/// Profile a single component against the rule table.
pub fn profile_component(component: &Component, config: &SimulationConfig) -> NodeProfile {
    let name = component.display_name();
    let settings = &component.configuration;

    let mut raw: u32 = 0;
    let mut findings = Vec::new();
    for rule in RULES.iter().filter(|r| r.applies(settings)) {
        raw += rule.delta;
        findings.push(rule.finding.render(name));
    }

    let sensitivity = settings.sensitivity_level();
    let score = weight_by_sensitivity(raw, sensitivity);

    if sensitivity >= config.elevated_sensitivity && score > 0 {
        findings.push(SENSITIVE_DATA.render_with(name, &[("level", sensitivity.to_string())]));
    }

    NodeProfile {
        score,
        raw_score: raw,
        findings,
        sensitivity,
    }
}

/// Apply the `1 + sensitivity × 0.1` multiplier with half-up rounding,
/// in integer arithmetic so results never depend on float representation.
pub fn weight_by_sensitivity(raw: u32, sensitivity: u8) -> u32 {
    let scaled = u64::from(raw) * (10 + u64::from(sensitivity));
    ((scaled + 5) / 10).min(u64::from(u32::MAX)) as u32
}
