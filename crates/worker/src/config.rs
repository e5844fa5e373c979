use std::path::PathBuf;
use std::time::Duration;

use relift_pipeline::context::{DEFAULT_REPOSITORY_OWNER, DEFAULT_WORK_DIR};
use relift_pipeline::PipelineSettings;
use relift_tools::build_tool::DEFAULT_BUILD_COMMAND;
use relift_tools::RetryPolicy;

/// Pipeline process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL URL; the in-memory gateway is used when unset.
    pub database_url: Option<String>,
    /// JSON provider manifest.
    pub providers_path: Option<PathBuf>,
    /// JSON hook registry.
    pub hooks_path: Option<PathBuf>,
    pub work_dir: PathBuf,
    pub repository_owner: String,
    pub build_command: String,
    pub build_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            providers_path: None,
            hooks_path: None,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            repository_owner: DEFAULT_REPOSITORY_OWNER.to_string(),
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            build_timeout_secs: 120,
            max_attempts: 3,
            retry_base_ms: 500,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default          |
    /// |-----------------------------|------------------|
    /// | `DATABASE_URL`              | unset (memory)   |
    /// | `RELIFT_PROVIDERS`          | unset            |
    /// | `RELIFT_HOOKS`              | unset            |
    /// | `RELIFT_WORK_DIR`           | `./relift-work`  |
    /// | `RELIFT_REPOSITORY_OWNER`   | `relift`         |
    /// | `RELIFT_BUILD_COMMAND`      | `cds`            |
    /// | `RELIFT_BUILD_TIMEOUT_SECS` | `120`            |
    /// | `RELIFT_MAX_ATTEMPTS`       | `3`              |
    /// | `RELIFT_RETRY_BASE_MS`      | `500`            |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            database_url: non_empty("DATABASE_URL"),
            providers_path: non_empty("RELIFT_PROVIDERS").map(PathBuf::from),
            hooks_path: non_empty("RELIFT_HOOKS").map(PathBuf::from),
            work_dir: non_empty("RELIFT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            repository_owner: non_empty("RELIFT_REPOSITORY_OWNER")
                .unwrap_or(defaults.repository_owner),
            build_command: non_empty("RELIFT_BUILD_COMMAND").unwrap_or(defaults.build_command),
            build_timeout_secs: non_empty("RELIFT_BUILD_TIMEOUT_SECS")
                .map(|v| {
                    v.parse()
                        .expect("RELIFT_BUILD_TIMEOUT_SECS must be a valid u64")
                })
                .unwrap_or(defaults.build_timeout_secs),
            max_attempts: non_empty("RELIFT_MAX_ATTEMPTS")
                .map(|v| v.parse().expect("RELIFT_MAX_ATTEMPTS must be a valid u32"))
                .unwrap_or(defaults.max_attempts),
            retry_base_ms: non_empty("RELIFT_RETRY_BASE_MS")
                .map(|v| v.parse().expect("RELIFT_RETRY_BASE_MS must be a valid u64"))
                .unwrap_or(defaults.retry_base_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_base_ms))
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            work_dir: self.work_dir.clone(),
            repository_owner: self.repository_owner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let config = WorkerConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.work_dir, PathBuf::from("./relift-work"));
        assert_eq!(config.build_command, "cds");
        assert_eq!(config.build_timeout(), Duration::from_secs(120));
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = WorkerConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }
}
