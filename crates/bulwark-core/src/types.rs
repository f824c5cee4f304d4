//! Core domain types for Bulwark infrastructure diagrams.
//!
//! A diagram is a directed graph of components (servers, databases,
//! firewalls, ...) joined by network connections. These types are the
//! boundary shared with the diagram editor and the report consumers, so they
//! serialize in camelCase.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identifiers ───────────────────────────────────────────────────

/// Unique identifier for a diagram record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagramId(pub Uuid);

impl DiagramId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DiagramId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the project that owns one or more diagrams.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Configuration attribute keys ──────────────────────────────────

/// Well-known keys of the component configuration bag.
pub mod attr {
    pub const EXPOSURE: &str = "exposure";
    pub const COMPONENT_TYPE: &str = "componentType";
    pub const AUTH_TYPE: &str = "authType";
    pub const INPUT_VALIDATION: &str = "inputValidation";
    pub const ENCRYPTION_AT_REST: &str = "encryptionAtRest";
    pub const ENCRYPTION_IN_TRANSIT: &str = "encryptionInTransit";
    pub const AUDIT_LOGGING_ENABLED: &str = "auditLoggingEnabled";
    pub const DEFAULT_POLICY: &str = "defaultPolicy";
    pub const ENABLE_IDS: &str = "enableIDS";
    pub const INSTANCE_COUNT: &str = "instanceCount";
    pub const AUTO_SCALING: &str = "autoScaling";
    pub const SENSITIVITY_LEVEL: &str = "sensitivityLevel";
}

/// Exposure value that marks a component as reachable from the internet.
pub const EXPOSURE_PUBLIC: &str = "Public";

/// `componentType` value of the external network itself.
pub const COMPONENT_TYPE_INTERNET: &str = "internet";

/// Lowest and highest operator-assigned sensitivity levels.
pub const MIN_SENSITIVITY: u8 = 1;
pub const MAX_SENSITIVITY: u8 = 5;

// ── Components ────────────────────────────────────────────────────

/// Open attribute bag attached to every component.
///
/// Attributes are optional and loosely typed since they come straight from
/// editor forms. Accessors never fail: a missing or malformed value reads as
/// `None`, and each scoring rule decides what absence means.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ComponentConfig(pub serde_json::Map<String, serde_json::Value>);

impl ComponentConfig {
    /// Build from an arbitrary JSON value. Non-objects yield an empty bag.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Set an attribute, returning `self` for chaining.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// String attribute.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Boolean attribute. Accepts JSON booleans and the strings `"true"`/`"false"`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integer attribute. Numbers are truncated toward zero; strings are read
    /// up to the first non-digit (`"4"`, `" 3 "`, `"2 - medium"`).
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            serde_json::Value::String(s) => leading_integer(s),
            _ => None,
        }
    }

    /// The `exposure` attribute.
    pub fn exposure(&self) -> Option<&str> {
        self.text(attr::EXPOSURE)
    }

    /// The `componentType` attribute that drives rule selection.
    pub fn component_type(&self) -> Option<&str> {
        self.text(attr::COMPONENT_TYPE)
    }

    pub fn is_public(&self) -> bool {
        self.exposure() == Some(EXPOSURE_PUBLIC)
    }

    pub fn is_internet(&self) -> bool {
        self.component_type() == Some(COMPONENT_TYPE_INTERNET)
    }

    /// Operator-assigned sensitivity in `1..=5`. Missing or unparseable
    /// values read as 1; out-of-range values are clamped.
    pub fn sensitivity_level(&self) -> u8 {
        self.integer(attr::SENSITIVITY_LEVEL)
            .map(|level| level.clamp(MIN_SENSITIVITY as i64, MAX_SENSITIVITY as i64) as u8)
            .unwrap_or(MIN_SENSITIVITY)
    }
}

/// Parse an optional sign followed by digits at the start of `s`.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// A component (node) on the diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Unique within the diagram.
    pub id: String,
    /// Palette type: router, firewall, server, database, api, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub configuration: ComponentConfig,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, configuration: ComponentConfig) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: None,
            configuration,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Human-facing name: the label when present and non-blank, else the id.
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => &self.id,
        }
    }
}

/// A directed network connection (edge) between two components.
///
/// Either endpoint may name a component that does not exist; consumers must
/// tolerate that rather than reject the diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Editor-assigned edge id; older documents may omit it.
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Connection {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

// ── Diagram and Project ───────────────────────────────────────────

/// A diagram record: the component graph plus its persisted risk score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default)]
    pub id: DiagramId,
    #[serde(default)]
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Component>,
    #[serde(default)]
    pub edges: Vec<Connection>,
    /// Last persisted impact score, if the diagram was ever simulated.
    #[serde(default)]
    pub risk_score: Option<u32>,
    /// Optimistic-concurrency token, bumped on every committed write.
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Diagram {
    /// An empty diagram belonging to `project_id`.
    pub fn empty(project_id: ProjectId) -> Self {
        Self {
            id: DiagramId::new(),
            project_id,
            name: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            risk_score: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Give every edge without an id the positional id `edge-{index}`.
    pub fn fill_missing_edge_ids(&mut self) {
        for (i, edge) in self.edges.iter_mut().enumerate() {
            if edge.id.trim().is_empty() {
                edge.id = format!("edge-{i}");
            }
        }
    }
}

/// The project that owns diagrams and mirrors the latest diagram score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub risk_score: Option<u32>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            risk_score: None,
            updated_at: Utc::now(),
        }
    }
}

// ── Findings ──────────────────────────────────────────────────────

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// MITRE ATT&CK tactic (kill-chain phase) attached to a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MitreTactic {
    #[serde(rename = "Initial Access")]
    InitialAccess,
    #[serde(rename = "Execution")]
    Execution,
    #[serde(rename = "Defense Evasion")]
    DefenseEvasion,
    #[serde(rename = "Credential Access")]
    CredentialAccess,
    #[serde(rename = "Discovery")]
    Discovery,
    #[serde(rename = "Exfiltration")]
    Exfiltration,
    #[serde(rename = "Impact")]
    Impact,
}

impl MitreTactic {
    /// ATT&CK tactic identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Self::InitialAccess => "TA0001",
            Self::Execution => "TA0002",
            Self::DefenseEvasion => "TA0005",
            Self::CredentialAccess => "TA0006",
            Self::Discovery => "TA0007",
            Self::Exfiltration => "TA0010",
            Self::Impact => "TA0040",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialAccess => "Initial Access",
            Self::Execution => "Execution",
            Self::DefenseEvasion => "Defense Evasion",
            Self::CredentialAccess => "Credential Access",
            Self::Discovery => "Discovery",
            Self::Exfiltration => "Exfiltration",
            Self::Impact => "Impact",
        }
    }
}

impl fmt::Display for MitreTactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single vulnerability finding raised against one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Stable identifier of the rule that raised it.
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    pub mitre_tactic: MitreTactic,
    pub mitre_technique: String,
    pub mitre_id: String,
    /// Infrastructure-as-code snippet that fixes the issue, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_code: Option<String>,
    /// Framework control tags, e.g. `"SOC2 CC6.1"`.
    #[serde(default)]
    pub compliance_mappings: Vec<String>,
}
