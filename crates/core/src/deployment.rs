//! DEPLOY stage output, the fixed commit message, and the IDE link template.

use serde::{Deserialize, Serialize};

/// Commit message used for the generated file set. Must not vary.
pub const COMMIT_MESSAGE: &str = "Initial commit: project generated by relift";

/// Deep-link template into the browser IDE.
pub const IDE_URL_TEMPLATE: &str = "https://vscode.dev/github/{owner}/{repo}";

/// Path of the CI workflow pushed alongside the generated files.
pub const CI_WORKFLOW_PATH: &str = ".github/workflows/ci.yml";

/// How the generated project ended up being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Pushed to a source-control repository.
    Remote,
    /// Source-control push failed and was tolerated.
    LocalOnly,
    /// Deployment disabled by the run configuration.
    Skipped,
}

/// Structured result of the DEPLOY stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub mode: DeploymentMode,
    pub repository_url: Option<String>,
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub ide_url: Option<String>,
    pub commit_message: Option<String>,
    pub ci_workflow: bool,
    pub notified: bool,
    /// Local project location, always set.
    pub local_path: String,
    /// Why the deployment is not remote, if it is not.
    pub reason: Option<String>,
}

impl DeploymentDescriptor {
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "mode": self.mode,
            "repository_url": self.repository_url,
            "ide_url": self.ide_url,
            "ci_workflow": self.ci_workflow,
            "notified": self.notified,
            "reason": self.reason,
        })
    }
}

/// Render [`IDE_URL_TEMPLATE`] for a repository.
pub fn ide_url(owner: &str, repo: &str) -> String {
    IDE_URL_TEMPLATE
        .replace("{owner}", owner)
        .replace("{repo}", repo)
}

/// Turn a project name into a repository slug: lower-case, ASCII
/// alphanumerics and single dashes only.
pub fn repository_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "relift-project".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ide_url_uses_fixed_template() {
        assert_eq!(
            ide_url("acme", "pricing-app"),
            "https://vscode.dev/github/acme/pricing-app"
        );
    }

    #[test]
    fn slug_normalizes_names() {
        assert_eq!(repository_slug("Z Pricing  Logic!"), "z-pricing-logic");
        assert_eq!(repository_slug("--"), "relift-project");
        assert_eq!(repository_slug("sd_orders"), "sd-orders");
    }
}
