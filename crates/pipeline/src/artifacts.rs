//! Supporting files of a generated project and the work-area writer.
//!
//! Schema, service and UI sources come from generator providers; the files
//! rendered here (manifests, descriptors, docs, sample data) are fixed
//! templates filled from the plan.

use std::path::{Component, Path};

use serde_json::json;

use relift_core::analysis::AnalysisResult;
use relift_core::deployment::repository_slug;
use relift_core::plan::GenerationPlan;
use relift_core::project::GeneratedFile;

/// Rows written per entity when sample data is requested.
pub const SAMPLE_ROWS: usize = 3;

/// Manifests, descriptors and documentation for the project.
pub fn supporting_files(
    name: &str,
    plan: &GenerationPlan,
    analysis: &AnalysisResult,
) -> Vec<GeneratedFile> {
    vec![
        GeneratedFile::new("package.json", package_json(name, plan)),
        GeneratedFile::new("mta.yaml", mta_yaml(name)),
        GeneratedFile::new("xs-security.json", xs_security(name, plan)),
        GeneratedFile::new("README.md", readme(name, plan, analysis)),
        GeneratedFile::new("docs/DOCUMENTATION.md", documentation(plan, analysis)),
    ]
}

fn package_json(name: &str, plan: &GenerationPlan) -> String {
    let manifest = json!({
        "name": repository_slug(name),
        "version": "1.0.0",
        "description": format!("{} generated from legacy source", plan.service.name),
        "private": true,
        "dependencies": {
            "@sap/cds": "^8",
            "express": "^4"
        },
        "devDependencies": {
            "@cap-js/sqlite": "^1"
        },
        "scripts": {
            "start": "cds-serve",
            "watch": "cds watch",
            "build": "cds build --production"
        },
        "cds": {
            "requires": {
                "db": { "kind": "sqlite" },
                "auth": { "kind": "mocked" }
            }
        }
    });
    serde_json::to_string_pretty(&manifest).unwrap_or_default() + "\n"
}

fn mta_yaml(name: &str) -> String {
    let slug = repository_slug(name);
    format!(
        "_schema-version: \"3.1\"\n\
         ID: {slug}\n\
         version: 1.0.0\n\
         parameters:\n  enable-parallel-deployments: true\n\
         build-parameters:\n  before-all:\n    - builder: custom\n      commands:\n        - npm ci\n        - npx cds build --production\n\
         modules:\n  - name: {slug}-srv\n    type: nodejs\n    path: gen/srv\n    provides:\n      - name: srv-api\n        properties:\n          srv-url: ${{default-url}}\n    requires:\n      - name: {slug}-auth\n\
         resources:\n  - name: {slug}-auth\n    type: org.cloudfoundry.managed-service\n    parameters:\n      service: xsuaa\n      service-plan: application\n      path: ./xs-security.json\n"
    )
}

fn xs_security(name: &str, plan: &GenerationPlan) -> String {
    let app = repository_slug(name);
    let descriptor = json!({
        "xsappname": app,
        "tenant-mode": "dedicated",
        "scopes": [
            { "name": "$XSAPPNAME.Viewer", "description": format!("Read {}", plan.service.name) },
            { "name": "$XSAPPNAME.Editor", "description": format!("Maintain {}", plan.service.name) }
        ],
        "role-templates": [
            { "name": "Viewer", "scope-references": ["$XSAPPNAME.Viewer"] },
            { "name": "Editor", "scope-references": ["$XSAPPNAME.Viewer", "$XSAPPNAME.Editor"] }
        ]
    });
    serde_json::to_string_pretty(&descriptor).unwrap_or_default() + "\n"
}

fn readme(name: &str, plan: &GenerationPlan, analysis: &AnalysisResult) -> String {
    let mut out = format!("# {name}\n\n");
    out.push_str(&format!(
        "Generated `{}` exposing {} entities from module `{}`.\n\n",
        plan.service.name,
        plan.entities.len(),
        plan.module
    ));
    out.push_str("## Entities\n\n| Entity | Source table |\n|---|---|\n");
    for entity in &plan.entities {
        out.push_str(&format!("| {} | {} |\n", entity.name, entity.source_table));
    }
    out.push_str("\n## Getting started\n\n```sh\nnpm install\nnpx cds watch\n```\n");
    if !analysis.business_logic.is_empty() {
        out.push_str("\n## Preserved business logic\n\n");
        for statement in &analysis.business_logic {
            out.push_str(&format!("- {statement}\n"));
        }
    }
    if !plan.best_practices.is_empty() {
        out.push_str("\n## Best practices applied\n\n");
        for practice in &plan.best_practices {
            out.push_str(&format!("- {practice}\n"));
        }
    }
    out
}

fn documentation(plan: &GenerationPlan, analysis: &AnalysisResult) -> String {
    let mut out = String::from("# Technical documentation\n\n");
    if analysis.documentation.trim().is_empty() {
        out.push_str("No source documentation was produced.\n");
    } else {
        out.push_str(analysis.documentation.trim());
        out.push('\n');
    }
    out.push_str(&format!(
        "\n## Service `{}`\n\nNamespace: `{}`\n\nOperations:\n\n",
        plan.service.name, plan.namespace
    ));
    for op in &plan.service.operations {
        out.push_str(&format!("- `{op}`\n"));
    }
    out
}

/// One CSV per entity under `db/data/`, named the way the CDS loader
/// expects (`<namespace>-<Entity>.csv`).
pub fn sample_data(plan: &GenerationPlan) -> Vec<GeneratedFile> {
    plan.entities
        .iter()
        .map(|entity| {
            let mut csv = String::from("ID;name;sourceKey\n");
            for row in 1..=SAMPLE_ROWS {
                csv.push_str(&format!(
                    "{row};{} {row};{}-{row:04}\n",
                    entity.name, entity.source_table
                ));
            }
            GeneratedFile::new(
                format!("db/data/{}-{}.csv", plan.namespace, entity.name),
                csv,
            )
        })
        .collect()
}

/// CI workflow pushed next to the generated project.
pub fn ci_workflow() -> String {
    "name: CI\n\
     on:\n  push:\n    branches: [main]\n  pull_request:\n\
     jobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n      - uses: actions/setup-node@v4\n        with:\n          node-version: 20\n      - run: npm ci\n      - run: npx cds build --production\n"
        .to_string()
}

/// Reject absolute paths and `..` so provider output cannot escape the
/// work area.
pub fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Write every file under `root`, creating parent directories.
pub async fn write_files(root: &Path, files: &[GeneratedFile]) -> std::io::Result<()> {
    for file in files {
        if !is_safe_relative(&file.path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Refusing to write outside the work area: {}", file.path),
            ));
        }
        let target = root.join(&file.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.content).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relift_core::analysis::ClassificationSource;
    use relift_core::config::UiFramework;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            business_logic: vec!["Pricing procedure".to_string()],
            tables: vec!["VBAK".to_string(), "ZLOG".to_string()],
            dependencies: vec![],
            patterns: vec![],
            module: "SD".to_string(),
            complexity: 3,
            lines_of_code: 40,
            documentation: "## Source Analysis".to_string(),
            classification: ClassificationSource::Analyzer,
        }
    }

    #[test]
    fn supporting_files_cover_manifests_and_docs() {
        let analysis = analysis();
        let plan = GenerationPlan::derive(&analysis, UiFramework::FioriElements);
        let files = supporting_files("Sales Pricing", &plan, &analysis);
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            ["package.json", "mta.yaml", "xs-security.json", "README.md", "docs/DOCUMENTATION.md"]
        );

        let package: serde_json::Value = serde_json::from_str(&files[0].content).unwrap();
        assert_eq!(package["name"], "sales-pricing");
        assert!(files[1].content.contains("ID: sales-pricing"));
        assert!(files[3].content.contains("| SalesOrder | VBAK |"));
        assert!(files[3].content.contains("- Pricing procedure"));
    }

    #[test]
    fn sample_data_per_entity() {
        let analysis = analysis();
        let plan = GenerationPlan::derive(&analysis, UiFramework::None);
        let files = sample_data(&plan);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "db/data/relift.sd-SalesOrder.csv");
        assert_eq!(files[0].content.lines().count(), SAMPLE_ROWS + 1);
    }

    #[test]
    fn unsafe_paths_rejected() {
        assert!(is_safe_relative("srv/service.cds"));
        assert!(!is_safe_relative("../escape.txt"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative(""));
    }

    #[tokio::test]
    async fn writes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[GeneratedFile::new("app/ui/webapp/manifest.json", "{}")],
        )
        .await
        .unwrap();
        assert!(dir.path().join("app/ui/webapp/manifest.json").is_file());
    }

    #[tokio::test]
    async fn write_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_files(dir.path(), &[GeneratedFile::new("../x", "")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
