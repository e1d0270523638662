use serde::{Deserialize, Serialize};

use crate::lifecycle::CaseStatus;

/// Feature flags controlling which optional integrations are active.
///
/// Loaded from `config.toml` at server startup. Every field defaults to
/// `false` so that a missing or incomplete config file disables all
/// optional features.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureFlags {
    #[serde(default)]
    pub telemetry: bool,
}

/// Tunables of the case workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Statuses in which new complainants may join a case.
    pub joinable_statuses: Vec<CaseStatus>,
    /// Statuses of crime-scene cases listed on the public endpoint.
    pub public_statuses: Vec<CaseStatus>,
    /// Whether complaint cases accept co-complainants at all.
    pub allow_complaint_join: bool,
    /// Days under pursuit after which a suspect reads as intensive pursuit.
    pub intensive_pursuit_days: i64,
    /// Reward paid per danger-score point.
    pub reward_unit: i64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            joinable_statuses: vec![
                CaseStatus::Open,
                CaseStatus::UnderInvestigation,
                CaseStatus::SuspectsIdentified,
                CaseStatus::ArrestApproved,
                CaseStatus::Interrogation,
            ],
            public_statuses: vec![CaseStatus::Open],
            allow_complaint_join: false,
            intensive_pursuit_days: 30,
            reward_unit: 20_000_000,
        }
    }
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_all_false() {
        let flags = FeatureFlags::default();
        assert!(!flags.telemetry);
    }

    #[test]
    fn deserialize_empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.workflow.public_statuses, vec![CaseStatus::Open]);
        assert!(!config.workflow.allow_complaint_join);
    }

    #[test]
    fn deserialize_partial_workflow_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            telemetry = true

            [workflow]
            joinable_statuses = ["open"]
            allow_complaint_join = true
            "#,
        )
        .unwrap();
        assert!(config.features.telemetry);
        assert_eq!(config.workflow.joinable_statuses, vec![CaseStatus::Open]);
        assert!(config.workflow.allow_complaint_join);
        assert_eq!(config.workflow.intensive_pursuit_days, 30);
        assert_eq!(config.workflow.reward_unit, 20_000_000);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
            [workflow]
            public_statuses = ["solved"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn default_joinable_statuses_stop_before_trial() {
        let workflow = WorkflowConfig::default();
        assert!(!workflow.joinable_statuses.contains(&CaseStatus::TrialPending));
        assert!(!workflow.joinable_statuses.contains(&CaseStatus::Closed));
        assert!(workflow.joinable_statuses.contains(&CaseStatus::Open));
    }
}
