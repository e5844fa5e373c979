//! Local best-effort analysis of legacy source text.
//!
//! Used when the code analyzer is optional and unreachable, and to fill in
//! documentation and classification when the language model is.

use std::sync::LazyLock;

use regex::Regex;

use relift_core::analysis::{
    classify_module, module_display_name, normalize_tables, AnalysisResult,
    ClassificationSource, UNKNOWN_MODULE,
};

static READ_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSELECT\b[^.]*?\bFROM\s+([A-Z][A-Z0-9_/]*)").expect("valid regex")
});

static WRITE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:UPDATE|INSERT\s+INTO|INSERT|MODIFY|DELETE\s+FROM|DELETE)\s+([A-Z][A-Z0-9_/]*)")
        .expect("valid regex")
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCALL\s+FUNCTION\s+'([A-Z0-9_/]+)'").expect("valid regex")
});

static BAPI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBAPI_[A-Z0-9_]+").expect("valid regex"));

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:IF|ELSEIF|CASE|WHEN|LOOP|DO|WHILE|CATCH)\b").expect("valid regex")
});

/// Prefixes of local variables and internal tables, never database tables.
const LOCAL_PREFIXES: &[&str] = &["LT_", "GT_", "IT_", "LS_", "GS_", "WA_", "LV_", "GV_"];

/// Keywords the write pattern can capture by accident (`MODIFY TABLE`, ...).
const NOT_TABLES: &[&str] = &["TABLE", "LINES", "SCREEN", "CURRENT", "ENTITIES", "REPORT"];

/// Keyword triggers for business-logic statements.
const LOGIC_RULES: &[(&[&str], &str)] = &[
    (&["CALCULATE"], "Calculation logic"),
    (&["PRICING"], "Pricing procedure"),
    (&["KONV"], "Pricing procedure"),
    (&["CREDIT", "LIMIT"], "Credit limit validation"),
    (&["DISCOUNT"], "Discount calculation"),
    (&["MWST"], "Tax calculation"),
    (&["TAX"], "Tax calculation"),
    (&["AUTHORITY-CHECK"], "Authorization checks"),
];

const PATTERN_RULES: &[(&str, &str)] = &[
    ("KONV", "SAP Pricing Procedure"),
    ("KSCHL", "SAP Pricing Procedure"),
    ("AUTHORITY-CHECK", "SAP Authorization Object"),
    ("NUMBER_GET_NEXT", "SAP Number Range"),
    ("SELECT SINGLE", "Single-record read"),
    ("LOOP AT", "Internal table loop"),
    ("MESSAGE ", "User message"),
];

/// Analyse `source` without any external provider.
pub fn analyze(source: &str) -> AnalysisResult {
    let upper = source.to_uppercase();
    let tables = detect_tables(source);
    let module = classify_module(&tables).to_string();
    let lines_of_code = code_lines(source);

    let mut analysis = AnalysisResult {
        business_logic: business_logic(source, &upper),
        dependencies: dependencies(source),
        patterns: patterns(&upper),
        complexity: complexity(source, lines_of_code),
        lines_of_code,
        tables,
        module,
        documentation: String::new(),
        classification: ClassificationSource::Heuristic,
    };
    analysis.documentation = document(&analysis);
    analysis
}

/// Table names read or written by `source`, upper-cased, first-seen order.
pub fn detect_tables(source: &str) -> Vec<String> {
    let mut found = Vec::new();
    for re in [&*READ_TABLE_RE, &*WRITE_TABLE_RE] {
        for caps in re.captures_iter(source) {
            let name = caps[1].to_uppercase();
            if LOCAL_PREFIXES.iter().any(|p| name.starts_with(p))
                || NOT_TABLES.contains(&name.as_str())
            {
                continue;
            }
            found.push(name);
        }
    }
    normalize_tables(&found)
}

/// Count lines that are neither blank nor full-line comments.
pub fn code_lines(source: &str) -> i64 {
    source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('*') && !l.starts_with('"'))
        .count() as i64
}

fn business_logic(source: &str, upper: &str) -> Vec<String> {
    let mut statements: Vec<String> = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        let comment = trimmed
            .strip_prefix('*')
            .or_else(|| trimmed.strip_prefix('"'))
            .map(|c| c.trim_matches(|ch: char| ch == '*' || ch == '-' || ch.is_whitespace()));
        if let Some(text) = comment {
            if text.split_whitespace().count() >= 3 && !statements.iter().any(|s| s == text) {
                statements.push(text.to_string());
            }
        }
    }
    for (keywords, statement) in LOGIC_RULES {
        if keywords.iter().all(|k| upper.contains(k))
            && !statements.iter().any(|s| s == statement)
        {
            statements.push((*statement).to_string());
        }
    }
    statements
}

fn dependencies(source: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    let names = FUNCTION_RE
        .captures_iter(source)
        .map(|c| c[1].to_uppercase())
        .chain(BAPI_RE.find_iter(source).map(|m| m.as_str().to_uppercase()));
    for name in names {
        if !deps.contains(&name) {
            deps.push(name);
        }
    }
    deps
}

fn patterns(upper: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for (needle, pattern) in PATTERN_RULES {
        if upper.contains(needle) && !found.iter().any(|p| p == pattern) {
            found.push((*pattern).to_string());
        }
    }
    found
}

/// 1..=10 from branching density and size.
fn complexity(source: &str, lines_of_code: i64) -> i32 {
    let branches = BRANCH_RE.find_iter(source).count() as i64;
    let score = 1 + branches / 3 + lines_of_code / 50;
    score.clamp(1, 10) as i32
}

/// Markdown documentation for an analysis result.
pub fn document(analysis: &AnalysisResult) -> String {
    let module_name = if analysis.module == UNKNOWN_MODULE {
        "Custom development".to_string()
    } else {
        format!("{} ({})", analysis.module, module_display_name(&analysis.module))
    };

    let mut doc = String::from("## Source Analysis\n\n");
    doc.push_str(&format!("**Module:** {module_name}\n"));
    doc.push_str(&format!("**Complexity:** {}/10\n", analysis.complexity));
    doc.push_str(&format!("**Lines of Code:** {}\n", analysis.lines_of_code));

    for (title, items) in [
        ("Business Logic", &analysis.business_logic),
        ("Database Tables", &analysis.tables),
        ("Dependencies", &analysis.dependencies),
        ("Patterns Detected", &analysis.patterns),
    ] {
        if items.is_empty() {
            continue;
        }
        doc.push_str(&format!("\n### {title}\n"));
        for item in items {
            doc.push_str(&format!("- {item}\n"));
        }
    }
    doc
}
