//! Vulnerability rule table.
//!
//! Each rule pairs a predicate over a component's configuration with a score
//! delta and a finding template. Rules are independent and additive; the
//! profiler evaluates every rule against every component.

use serde::Serialize;

use bulwark_core::types::attr;
use bulwark_core::{ComponentConfig, Finding, MitreTactic, Severity};

/// Everything needed to raise a finding except the component it is about.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingTemplate {
    pub id: &'static str,
    pub severity: Severity,
    pub mitre_tactic: MitreTactic,
    pub mitre_technique: &'static str,
    pub mitre_id: &'static str,
    pub compliance_mappings: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_code: Option<&'static str>,
    /// Message with `{name}` (and for some templates `{level}`) placeholders.
    pub message: &'static str,
}

impl FindingTemplate {
    /// Render a finding for the named component.
    pub fn render(&self, component_name: &str) -> Finding {
        self.render_with(component_name, &[])
    }

    /// Render with extra `{key}` substitutions.
    pub fn render_with(&self, component_name: &str, vars: &[(&str, String)]) -> Finding {
        let mut message = self.message.replace("{name}", component_name);
        for (key, value) in vars {
            message = message.replace(&format!("{{{key}}}"), value);
        }

        Finding {
            rule_id: self.id.to_string(),
            message,
            severity: self.severity,
            mitre_tactic: self.mitre_tactic,
            mitre_technique: self.mitre_technique.to_string(),
            mitre_id: self.mitre_id.to_string(),
            remediation_code: self.remediation_code.map(str::to_string),
            compliance_mappings: self
                .compliance_mappings
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
        }
    }
}

/// A scoring rule: predicate, score delta, and the finding it raises.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub delta: u32,
    #[serde(flatten)]
    pub finding: FindingTemplate,
    #[serde(skip)]
    applies: fn(&ComponentConfig) -> bool,
}

impl Rule {
    pub fn id(&self) -> &'static str {
        self.finding.id
    }

    pub fn applies(&self, config: &ComponentConfig) -> bool {
        (self.applies)(config)
    }
}

// ── Predicates ────────────────────────────────────────────────────

fn is_type(config: &ComponentConfig, component_type: &str) -> bool {
    config.component_type() == Some(component_type)
}

fn public_exposure(config: &ComponentConfig) -> bool {
    config.is_public()
}

fn api_without_auth(config: &ComponentConfig) -> bool {
    is_type(config, "api") && config.text(attr::AUTH_TYPE) == Some("None")
}

fn api_without_input_validation(config: &ComponentConfig) -> bool {
    is_type(config, "api") && config.flag(attr::INPUT_VALIDATION) == Some(false)
}

fn db_unencrypted_at_rest(config: &ComponentConfig) -> bool {
    is_type(config, "db") && config.flag(attr::ENCRYPTION_AT_REST) != Some(true)
}

fn db_without_audit_logging(config: &ComponentConfig) -> bool {
    is_type(config, "db") && config.flag(attr::AUDIT_LOGGING_ENABLED) != Some(true)
}

fn unencrypted_in_transit(config: &ComponentConfig) -> bool {
    config.flag(attr::ENCRYPTION_IN_TRANSIT) == Some(false)
}

fn firewall_allow_all(config: &ComponentConfig) -> bool {
    is_type(config, "firewall")
        && config
            .text(attr::DEFAULT_POLICY)
            .is_some_and(|policy| policy.starts_with("Allow All"))
}

fn firewall_without_ids(config: &ComponentConfig) -> bool {
    is_type(config, "firewall") && config.flag(attr::ENABLE_IDS) == Some(false)
}

fn single_instance(config: &ComponentConfig) -> bool {
    config.integer(attr::INSTANCE_COUNT) == Some(1) && config.flag(attr::AUTO_SCALING) != Some(true)
}

// ── Remediation snippets ──────────────────────────────────────────

const REMEDIATE_API_AUTH: &str = r#"resource "aws_api_gateway_method" "secured" {
  authorization = "COGNITO_USER_POOLS"
  authorizer_id = aws_api_gateway_authorizer.main.id
}"#;

const REMEDIATE_INPUT_VALIDATION: &str = r#"resource "aws_api_gateway_request_validator" "strict" {
  name                        = "validate-body-and-params"
  rest_api_id                 = aws_api_gateway_rest_api.main.id
  validate_request_body       = true
  validate_request_parameters = true
}"#;

const REMEDIATE_ENCRYPTION_AT_REST: &str = r#"resource "aws_db_instance" "main" {
  storage_encrypted = true
  kms_key_id        = aws_kms_key.db.arn
}"#;

const REMEDIATE_FIREWALL_POLICY: &str = r#"resource "aws_network_acl_rule" "default_deny" {
  rule_number = 32766
  egress      = false
  protocol    = "-1"
  rule_action = "deny"
  cidr_block  = "0.0.0.0/0"
}"#;

// ── Table ─────────────────────────────────────────────────────────

/// The full rule table, in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        delta: 15,
        applies: public_exposure,
        finding: FindingTemplate {
            id: "public-exposure",
            severity: Severity::High,
            mitre_tactic: MitreTactic::InitialAccess,
            mitre_technique: "Exploit Public-Facing Application",
            mitre_id: "T1190",
            compliance_mappings: &["SOC2 CC6.6", "ISO27001 A.13.1.3", "NIST 800-53 SC-7"],
            remediation_code: None,
            message: "{name} is publicly exposed to the internet",
        },
    },
    Rule {
        delta: 25,
        applies: api_without_auth,
        finding: FindingTemplate {
            id: "api-no-auth",
            severity: Severity::Critical,
            mitre_tactic: MitreTactic::CredentialAccess,
            mitre_technique: "Exploit Public-Facing Application",
            mitre_id: "T1190",
            compliance_mappings: &["SOC2 CC6.1", "ISO27001 A.9.4.2", "PCI-DSS 8.2"],
            remediation_code: Some(REMEDIATE_API_AUTH),
            message: "{name} accepts API requests without authentication",
        },
    },
    Rule {
        delta: 10,
        applies: api_without_input_validation,
        finding: FindingTemplate {
            id: "api-no-input-validation",
            severity: Severity::High,
            mitre_tactic: MitreTactic::Execution,
            mitre_technique: "Command and Scripting Interpreter",
            mitre_id: "T1059",
            compliance_mappings: &["OWASP ASVS V5", "SOC2 CC7.1", "PCI-DSS 6.5.1"],
            remediation_code: Some(REMEDIATE_INPUT_VALIDATION),
            message: "{name} does not validate API input, allowing injection attacks",
        },
    },
    Rule {
        delta: 15,
        applies: db_unencrypted_at_rest,
        finding: FindingTemplate {
            id: "db-unencrypted-at-rest",
            severity: Severity::Critical,
            mitre_tactic: MitreTactic::Impact,
            mitre_technique: "Data Encrypted for Impact",
            mitre_id: "T1486",
            compliance_mappings: &[
                "SOC2 CC6.7",
                "PCI-DSS 3.4",
                "HIPAA 164.312(a)(2)(iv)",
                "GDPR Art.32",
            ],
            remediation_code: Some(REMEDIATE_ENCRYPTION_AT_REST),
            message: "{name} stores data without encryption at rest",
        },
    },
    Rule {
        delta: 5,
        applies: db_without_audit_logging,
        finding: FindingTemplate {
            id: "db-no-audit-logging",
            severity: Severity::Medium,
            mitre_tactic: MitreTactic::DefenseEvasion,
            mitre_technique: "Indicator Removal",
            mitre_id: "T1070",
            compliance_mappings: &["SOC2 CC7.2", "ISO27001 A.12.4.1", "PCI-DSS 10.2"],
            remediation_code: None,
            message: "{name} has audit logging disabled; attacker activity would go unrecorded",
        },
    },
    Rule {
        delta: 15,
        applies: unencrypted_in_transit,
        finding: FindingTemplate {
            id: "unencrypted-in-transit",
            severity: Severity::High,
            mitre_tactic: MitreTactic::CredentialAccess,
            mitre_technique: "Network Sniffing",
            mitre_id: "T1040",
            compliance_mappings: &["SOC2 CC6.7", "PCI-DSS 4.1", "HIPAA 164.312(e)(1)"],
            remediation_code: None,
            message: "{name} sends traffic without encryption in transit",
        },
    },
    Rule {
        delta: 30,
        applies: firewall_allow_all,
        finding: FindingTemplate {
            id: "firewall-allow-all",
            severity: Severity::Critical,
            mitre_tactic: MitreTactic::Discovery,
            mitre_technique: "Network Service Discovery",
            mitre_id: "T1046",
            compliance_mappings: &["SOC2 CC6.6", "PCI-DSS 1.2.1", "NIST 800-53 SC-7(5)"],
            remediation_code: Some(REMEDIATE_FIREWALL_POLICY),
            message: "{name} has a default Allow All policy",
        },
    },
    Rule {
        delta: 10,
        applies: firewall_without_ids,
        finding: FindingTemplate {
            id: "firewall-no-ids",
            severity: Severity::Medium,
            mitre_tactic: MitreTactic::DefenseEvasion,
            mitre_technique: "Impair Defenses",
            mitre_id: "T1562",
            compliance_mappings: &["SOC2 CC7.2", "PCI-DSS 11.4", "NIST 800-53 SI-4"],
            remediation_code: None,
            message: "{name} has intrusion detection disabled",
        },
    },
    Rule {
        delta: 5,
        applies: single_instance,
        finding: FindingTemplate {
            id: "single-instance",
            severity: Severity::Medium,
            mitre_tactic: MitreTactic::Impact,
            mitre_technique: "Endpoint Denial of Service",
            mitre_id: "T1499",
            compliance_mappings: &["SOC2 A1.2", "ISO27001 A.17.2.1"],
            remediation_code: None,
            message: "{name} runs as a single instance without auto scaling",
        },
    },
];

/// Raised on top of the rule table for sensitive components that already
/// carry risk. Adds no score.
pub static SENSITIVE_DATA: FindingTemplate = FindingTemplate {
    id: "sensitive-data",
    severity: Severity::High,
    mitre_tactic: MitreTactic::Exfiltration,
    mitre_technique: "Exfiltration Over C2 Channel",
    mitre_id: "T1041",
    compliance_mappings: &["GDPR Art.32", "SOC2 C1.1", "ISO27001 A.8.2.3"],
    remediation_code: None,
    message: "{name} holds sensitivity level {level} data; elevated risk due to sensitive data",
};

/// Look up a rule by id.
pub fn rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, serde_json::Value)]) -> ComponentConfig {
        pairs
            .iter()
            .fold(ComponentConfig::default(), |cfg, (k, v)| cfg.with(k, v.clone()))
    }

    fn fires(id: &str, cfg: &ComponentConfig) -> bool {
        rule(id).unwrap().applies(cfg)
    }

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<_> = RULES.iter().map(Rule::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), RULES.len());
    }

    #[test]
    fn public_exposure_requires_exact_value() {
        assert!(fires("public-exposure", &config(&[("exposure", "Public".into())])));
        assert!(!fires("public-exposure", &config(&[("exposure", "Internal".into())])));
        assert!(!fires("public-exposure", &ComponentConfig::default()));
    }

    #[test]
    fn api_rules_only_apply_to_apis() {
        let api = config(&[
            ("componentType", "api".into()),
            ("authType", "None".into()),
            ("inputValidation", false.into()),
        ]);
        assert!(fires("api-no-auth", &api));
        assert!(fires("api-no-input-validation", &api));

        let server = config(&[
            ("componentType", "server".into()),
            ("authType", "None".into()),
            ("inputValidation", false.into()),
        ]);
        assert!(!fires("api-no-auth", &server));
        assert!(!fires("api-no-input-validation", &server));
    }

    #[test]
    fn api_input_validation_needs_explicit_false() {
        let api = config(&[("componentType", "api".into())]);
        assert!(!fires("api-no-input-validation", &api));
    }

    #[test]
    fn db_rules_treat_absence_as_insecure() {
        let db = config(&[("componentType", "db".into())]);
        assert!(fires("db-unencrypted-at-rest", &db));
        assert!(fires("db-no-audit-logging", &db));

        let hardened = config(&[
            ("componentType", "db".into()),
            ("encryptionAtRest", true.into()),
            ("auditLoggingEnabled", "true".into()),
        ]);
        assert!(!fires("db-unencrypted-at-rest", &hardened));
        assert!(!fires("db-no-audit-logging", &hardened));
    }

    #[test]
    fn in_transit_needs_explicit_false() {
        assert!(fires("unencrypted-in-transit", &config(&[("encryptionInTransit", false.into())])));
        assert!(!fires("unencrypted-in-transit", &ComponentConfig::default()));
    }

    #[test]
    fn firewall_policy_matches_prefix() {
        let fw = config(&[
            ("componentType", "firewall".into()),
            ("defaultPolicy", "Allow All (Insecure)".into()),
        ]);
        assert!(fires("firewall-allow-all", &fw));

        let deny = config(&[
            ("componentType", "firewall".into()),
            ("defaultPolicy", "Deny All".into()),
        ]);
        assert!(!fires("firewall-allow-all", &deny));
    }

    #[test]
    fn single_instance_respects_autoscaling() {
        assert!(fires("single-instance", &config(&[("instanceCount", 1.into())])));
        assert!(fires("single-instance", &config(&[("instanceCount", "1".into())])));
        assert!(!fires(
            "single-instance",
            &config(&[("instanceCount", 1.into()), ("autoScaling", true.into())])
        ));
        assert!(!fires("single-instance", &config(&[("instanceCount", 3.into())])));
    }

    #[test]
    fn remediation_present_on_expected_rules() {
        let with_fix: Vec<_> = RULES
            .iter()
            .filter(|r| r.finding.remediation_code.is_some())
            .map(Rule::id)
            .collect();
        assert_eq!(
            with_fix,
            vec![
                "api-no-auth",
                "api-no-input-validation",
                "db-unencrypted-at-rest",
                "firewall-allow-all"
            ]
        );
    }

    #[test]
    fn render_substitutes_placeholders() {
        let finding = SENSITIVE_DATA.render_with("Customer DB", &[("level", "5".to_string())]);
        assert_eq!(
            finding.message,
            "Customer DB holds sensitivity level 5 data; elevated risk due to sensitive data"
        );
        assert_eq!(finding.mitre_id, "T1041");
        assert_eq!(finding.rule_id, "sensitive-data");
    }

    #[test]
    fn table_serializes_for_catalogue() {
        let json = serde_json::to_value(RULES).unwrap();
        assert_eq!(json[0]["id"], "public-exposure");
        assert_eq!(json[0]["delta"], 15);
        assert_eq!(json[0]["mitreTactic"], "Initial Access");
        assert!(json[0].get("applies").is_none());
    }
}
