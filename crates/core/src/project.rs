//! GENERATE stage output: the generated project descriptor.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Paths every generated project must contain, relative to its root.
pub const REQUIRED_PATHS: &[&str] = &[
    "package.json",
    "db/schema.cds",
    "srv/service.cds",
    "mta.yaml",
    "xs-security.json",
    "README.md",
];

/// Directories every generated project must contain.
pub const REQUIRED_DIRS: &[&str] = &["db", "srv"];

/// A single file in the generated file set, prior to being written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Forward-slash path relative to the project root.
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn line_count(&self) -> i64 {
        self.content.lines().count() as i64
    }
}

/// Structured result of the GENERATE stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProject {
    pub name: String,
    /// Absolute location of the work area holding the files.
    pub root: PathBuf,
    pub files: Vec<GeneratedFile>,
    pub ui_generated: bool,
    pub sample_data: bool,
    /// Build-tool output captured while scaffolding the skeleton.
    pub scaffold_log: String,
}

impl GeneratedProject {
    /// Total line count across every generated file.
    pub fn transformed_line_count(&self) -> i64 {
        self.files.iter().map(GeneratedFile::line_count).sum()
    }

    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "root": self.root.display().to_string(),
            "files": self.files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            "ui_generated": self.ui_generated,
            "sample_data": self.sample_data,
            "transformed_lines": self.transformed_line_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_line_count_sums_files() {
        let project = GeneratedProject {
            name: "demo".to_string(),
            root: PathBuf::from("/tmp/demo"),
            files: vec![
                GeneratedFile::new("a.cds", "one\ntwo\n"),
                GeneratedFile::new("b.cds", "three"),
            ],
            ui_generated: false,
            sample_data: false,
            scaffold_log: String::new(),
        };
        assert_eq!(project.transformed_line_count(), 3);
        assert!(project.file("a.cds").is_some());
        assert!(project.file("c.cds").is_none());
    }
}
