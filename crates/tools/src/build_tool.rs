//! The external build tool, invoked as an opaque process.
//!
//! Two operations: scaffold a project skeleton and build/validate a
//! project directory. Both return the exit code and captured output; a
//! non-zero exit is a result, not an error.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (4 MiB).
const MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

pub const DEFAULT_BUILD_COMMAND: &str = "cds";
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum BuildToolError {
    #[error("Failed to start build tool: {0}")]
    Io(#[from] std::io::Error),

    #[error("Build tool timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

/// Captured result of one build-tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl BuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Count `(errors, warnings)` reported in the output.
    pub fn diagnostics(&self) -> (u32, u32) {
        let mut errors = 0;
        let mut warnings = 0;
        for line in self.combined().lines() {
            match classify_line(line) {
                Some(Diagnostic::Error) => errors += 1,
                Some(Diagnostic::Warning) => warnings += 1,
                None => {}
            }
        }
        (errors, warnings)
    }

    /// Error lines, for the quality report's issue list.
    pub fn error_lines(&self) -> Vec<String> {
        self.combined()
            .lines()
            .filter(|l| classify_line(l) == Some(Diagnostic::Error))
            .map(|l| l.trim().to_string())
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Diagnostic {
    Error,
    Warning,
}

fn classify_line(line: &str) -> Option<Diagnostic> {
    let lower = line.trim().to_ascii_lowercase();
    let tagged = |tag: &str| {
        lower.starts_with(tag)
            || lower.starts_with(&format!("[{tag}]"))
            || lower.contains(&format!(" {tag}:"))
    };
    if tagged("error") {
        Some(Diagnostic::Error)
    } else if tagged("warning") || tagged("warn") {
        Some(Diagnostic::Warning)
    } else {
        None
    }
}

#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Scaffold a project skeleton in `dir`.
    async fn init_project(&self, dir: &Path, name: &str) -> Result<BuildOutput, BuildToolError>;

    /// Build/validate the project in `dir`.
    async fn build(&self, dir: &Path) -> Result<BuildOutput, BuildToolError>;
}

/// Runs a command-line build tool.
#[derive(Debug, Clone)]
pub struct ProcessBuildTool {
    pub command: String,
    pub init_args: Vec<String>,
    pub build_args: Vec<String>,
    pub timeout: Duration,
}

impl ProcessBuildTool {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            init_args: vec!["init".to_string()],
            build_args: vec!["build".to_string()],
            timeout,
        }
    }
}

impl Default for ProcessBuildTool {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_COMMAND, DEFAULT_BUILD_TIMEOUT)
    }
}

#[async_trait]
impl BuildTool for ProcessBuildTool {
    async fn init_project(&self, dir: &Path, name: &str) -> Result<BuildOutput, BuildToolError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.init_args).env("RELIFT_PROJECT_NAME", name);
        tracing::debug!(command = %self.command, dir = %dir.display(), "Scaffolding project");
        run_command(&mut cmd, dir, self.timeout).await
    }

    async fn build(&self, dir: &Path) -> Result<BuildOutput, BuildToolError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.build_args);
        tracing::debug!(command = %self.command, dir = %dir.display(), "Building project");
        run_command(&mut cmd, dir, self.timeout).await
    }
}

/// Spawn `cmd` in `dir`, capture stdout/stderr, and enforce `timeout`.
///
/// On timeout the child is killed (`kill_on_drop`).
pub async fn run_command(
    cmd: &mut Command,
    dir: &Path,
    timeout: Duration,
) -> Result<BuildOutput, BuildToolError> {
    cmd.current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();
            Ok(BuildOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Ok(Err(e)) => Err(BuildToolError::Io(e)),
        Err(_elapsed) => Err(BuildToolError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

/// Read an entire output stream, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn diagnostics_counted() {
        let output = BuildOutput {
            exit_code: 1,
            stdout: "[ERROR] srv/service.cds:3: Unknown entity\nbuilding...\nWARNING: unused import\n"
                .to_string(),
            stderr: "error: compilation failed\n[warn] deprecated syntax\n".to_string(),
            duration_ms: 0,
        };
        assert_eq!(output.diagnostics(), (2, 2));
        assert_eq!(output.error_lines().len(), 2);
    }

    #[test]
    fn clean_output_has_no_diagnostics() {
        let output = BuildOutput {
            stdout: "done > 0 errors found\nbuild completed".to_string(),
            ..Default::default()
        };
        assert_eq!(output.diagnostics(), (0, 0));
        assert!(output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo built; echo 'error: boom' >&2; exit 3"]);
        let out = run_command(&mut cmd, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "built");
        assert_eq!(out.diagnostics(), (1, 0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let mut cmd = Command::new("ls");
        let out = run_command(&mut cmd, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.stdout.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let result = run_command(&mut cmd, dir.path(), Duration::from_millis(100)).await;
        assert_matches!(result, Err(BuildToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_command_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ProcessBuildTool::new("relift-no-such-build-tool", Duration::from_secs(1));
        assert_matches!(tool.build(dir.path()).await, Err(BuildToolError::Io(_)));
    }
}
