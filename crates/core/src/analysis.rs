//! ANALYZE stage output and the module classification table.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Module tag used when nothing in the source points at a known module.
pub const UNKNOWN_MODULE: &str = "CUSTOM";

/// Table-name prefixes mapped to functional modules, most specific first.
const MODULE_PREFIXES: &[(&str, &str)] = &[
    ("VBAK", "SD"),
    ("VBAP", "SD"),
    ("VBRK", "SD"),
    ("VBRP", "SD"),
    ("LIKP", "SD"),
    ("LIPS", "SD"),
    ("KONV", "SD"),
    ("KNA1", "SD"),
    ("KNVV", "SD"),
    ("MARA", "MM"),
    ("MARC", "MM"),
    ("MAKT", "MM"),
    ("EKKO", "MM"),
    ("EKPO", "MM"),
    ("LFA1", "MM"),
    ("MSEG", "MM"),
    ("BKPF", "FI"),
    ("BSEG", "FI"),
    ("SKA1", "FI"),
    ("T001", "FI"),
    ("CSKS", "CO"),
    ("COEP", "CO"),
    ("AUFK", "PP"),
    ("AFKO", "PP"),
    ("PA00", "HR"),
];

/// Where the module tag of an [`AnalysisResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Analyzer,
    LanguageModel,
    Heuristic,
}

/// Structured result of the ANALYZE stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub business_logic: Vec<String>,
    pub tables: Vec<String>,
    pub dependencies: Vec<String>,
    pub patterns: Vec<String>,
    pub module: String,
    /// 1 (trivial) to 10 (very complex).
    pub complexity: i32,
    pub lines_of_code: i64,
    pub documentation: String,
    pub classification: ClassificationSource,
}

impl AnalysisResult {
    /// Compact summary stored on the stage log.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "module": self.module,
            "tables": self.tables,
            "business_logic_count": self.business_logic.len(),
            "patterns": self.patterns,
            "complexity": self.complexity,
            "classification": self.classification,
        })
    }
}

// ---------------------------------------------------------------------------
// Analyzer wire payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerPayload {
    #[serde(default)]
    business_logic: Vec<String>,
    #[serde(default)]
    tables: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    metadata: AnalyzerMetadata,
    #[serde(default)]
    documentation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerMetadata {
    module: Option<String>,
    complexity: Option<i32>,
    lines_of_code: Option<i64>,
}

impl AnalysisResult {
    /// Decode the code-analyzer response.
    ///
    /// Accepts the payload directly or wrapped in a `{ "data": ... }`
    /// envelope. Table names are upper-cased and de-duplicated; a missing
    /// module tag is filled in from the table classification.
    pub fn from_analyzer_payload(
        value: &serde_json::Value,
        source_lines: i64,
    ) -> Result<Self, CoreError> {
        let body = value.get("data").unwrap_or(value);
        let payload: AnalyzerPayload = serde_json::from_value(body.clone()).map_err(|e| {
            CoreError::Validation(format!("Malformed code-analyzer response: {e}"))
        })?;

        let tables = normalize_tables(&payload.tables);
        let module = payload
            .metadata
            .module
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.trim().to_uppercase())
            .unwrap_or_else(|| classify_module(&tables).to_string());

        Ok(Self {
            business_logic: payload.business_logic,
            tables,
            dependencies: payload.dependencies,
            patterns: payload.patterns,
            module,
            complexity: payload.metadata.complexity.unwrap_or(1).clamp(1, 10),
            lines_of_code: payload.metadata.lines_of_code.unwrap_or(source_lines),
            documentation: payload.documentation,
            classification: ClassificationSource::Analyzer,
        })
    }
}

/// Upper-case, trim, and de-duplicate table names, keeping first-seen order.
pub fn normalize_tables(tables: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(tables.len());
    for table in tables {
        let name = table.trim().to_uppercase();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Classify a set of tables into a functional module by majority vote.
///
/// Ties resolve to the module whose first hit came earliest in `tables`.
/// Returns [`UNKNOWN_MODULE`] when no table is recognised.
pub fn classify_module(tables: &[String]) -> &'static str {
    let mut votes: Vec<(&'static str, usize)> = Vec::new();
    for table in tables {
        let upper = table.to_uppercase();
        let hit = MODULE_PREFIXES
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix))
            .map(|(_, module)| *module);
        if let Some(module) = hit {
            match votes.iter_mut().find(|(m, _)| *m == module) {
                Some((_, count)) => *count += 1,
                None => votes.push((module, 1)),
            }
        }
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (module, count) in votes {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((module, count)),
        }
    }
    best.map(|(m, _)| m).unwrap_or(UNKNOWN_MODULE)
}

/// Human-readable name for a module tag, used in service naming.
pub fn module_display_name(module: &str) -> &'static str {
    match module {
        "SD" => "SalesDistribution",
        "MM" => "MaterialsManagement",
        "FI" => "Finance",
        "CO" => "Controlling",
        "PP" => "ProductionPlanning",
        "HR" => "HumanResources",
        _ => "Custom",
    }
}
