//! Per-run configuration toggles supplied by the caller at submission.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default minimum quality score for a run to pass validation.
pub const DEFAULT_MIN_QUALITY_SCORE: i32 = 70;

/// Maximum length of a run name.
pub const MAX_RUN_NAME_LENGTH: usize = 200;

/// Target UI technology for the generated application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiFramework {
    #[default]
    FioriElements,
    Ui5Freestyle,
    React,
    None,
}

impl UiFramework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FioriElements => "fiori_elements",
            Self::Ui5Freestyle => "ui5_freestyle",
            Self::React => "react",
            Self::None => "none",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "fiori_elements" => Ok(Self::FioriElements),
            "ui5_freestyle" => Ok(Self::Ui5Freestyle),
            "react" => Ok(Self::React),
            "none" => Ok(Self::None),
            _ => Err(CoreError::Validation(format!(
                "Invalid ui_framework: '{s}'. Must be one of: fiori_elements, ui5_freestyle, react, none"
            ))),
        }
    }
}

impl std::fmt::Display for UiFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Display name; derived from the source when `None`.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Keep the generated project local; DEPLOY still runs and records it.
    pub skip_deployment: bool,
    /// Suppress the messaging-host notification after DEPLOY.
    pub skip_notification: bool,
    pub ui_framework: UiFramework,
    pub generate_sample_data: bool,
    /// Downgrade a source-control failure to a local-only deployment.
    pub tolerate_deploy_failure: bool,
    /// Also push a CI workflow file to the created repository.
    pub create_ci_workflow: bool,
    pub min_quality_score: i32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            skip_deployment: false,
            skip_notification: false,
            ui_framework: UiFramework::default(),
            generate_sample_data: false,
            tolerate_deploy_failure: true,
            create_ci_workflow: true,
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(CoreError::Validation(
                    "Run name must not be empty".to_string(),
                ));
            }
            if trimmed.len() > MAX_RUN_NAME_LENGTH {
                return Err(CoreError::Validation(format!(
                    "Run name exceeds maximum length of {MAX_RUN_NAME_LENGTH} characters"
                )));
            }
        }
        if !(0..=100).contains(&self.min_quality_score) {
            return Err(CoreError::Validation(format!(
                "min_quality_score must be within 0..=100, got {}",
                self.min_quality_score
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert!(!config.skip_deployment);
        assert!(config.tolerate_deploy_failure);
        assert_eq!(config.ui_framework, UiFramework::FioriElements);
        assert_eq!(config.min_quality_score, DEFAULT_MIN_QUALITY_SCORE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"skip_deployment": true, "ui_framework": "react"}"#).unwrap();
        assert!(config.skip_deployment);
        assert_eq!(config.ui_framework, UiFramework::React);
        assert!(config.create_ci_workflow);
    }

    #[test]
    fn blank_name_rejected() {
        let config = RunConfig {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_min_score_rejected() {
        let config = RunConfig {
            min_quality_score: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn ui_framework_roundtrip() {
        for s in ["fiori_elements", "ui5_freestyle", "react", "none"] {
            assert_eq!(UiFramework::from_str(s).unwrap().as_str(), s);
        }
        assert!(UiFramework::from_str("angular").is_err());
    }
}
