//! PLAN stage output and the pure analysis-to-plan derivation.
//!
//! The derivation maps legacy table names onto target entity names via a
//! fixed lookup table, falling back to a PascalCase rendering of the table
//! name, then exposes every entity through a single CRUD service.

use serde::{Deserialize, Serialize};

use crate::analysis::{module_display_name, AnalysisResult};
use crate::config::UiFramework;

/// Known legacy tables and the target entity names they become.
const ENTITY_NAMES: &[(&str, &str)] = &[
    ("VBAK", "SalesOrder"),
    ("VBAP", "SalesOrderItem"),
    ("VBRK", "BillingDocument"),
    ("VBRP", "BillingDocumentItem"),
    ("LIKP", "Delivery"),
    ("LIPS", "DeliveryItem"),
    ("KNA1", "Customer"),
    ("KNVV", "CustomerSalesArea"),
    ("KONV", "PricingCondition"),
    ("MARA", "Material"),
    ("MARC", "MaterialPlant"),
    ("MAKT", "MaterialDescription"),
    ("EKKO", "PurchaseOrder"),
    ("EKPO", "PurchaseOrderItem"),
    ("LFA1", "Supplier"),
    ("MSEG", "MaterialDocumentItem"),
    ("BKPF", "AccountingDocument"),
    ("BSEG", "AccountingDocumentItem"),
    ("SKA1", "GLAccount"),
    ("T001", "CompanyCode"),
    ("CSKS", "CostCenter"),
    ("AUFK", "Order"),
];

/// CRUD operations exposed for every entity.
pub const CRUD_OPERATIONS: [&str; 4] = ["create", "read", "update", "delete"];

/// A target entity derived from one legacy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub source_table: String,
    /// `true` when the name came from the lookup table.
    pub mapped: bool,
}

/// The single service generated per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub entities: Vec<String>,
    pub operations: Vec<String>,
}

/// Abstract UI template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiTemplate {
    ListReportObjectPage,
    Worklist,
    OverviewPage,
    None,
}

/// Structured result of the PLAN stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlan {
    /// Namespace for the generated data model, e.g. `relift.sd`.
    pub namespace: String,
    pub module: String,
    pub entities: Vec<EntityDefinition>,
    pub service: ServiceDefinition,
    pub ui_framework: UiFramework,
    pub ui_template: UiTemplate,
    /// Best-practice snippets to embed as comments; may be empty.
    pub best_practices: Vec<String>,
}

impl GenerationPlan {
    /// Derive a plan from an analysis result. Pure; no external calls.
    pub fn derive(analysis: &AnalysisResult, ui_framework: UiFramework) -> Self {
        let entities: Vec<EntityDefinition> = analysis
            .tables
            .iter()
            .map(|table| entity_for_table(table))
            .collect();

        let entity_names: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        let operations = entity_names
            .iter()
            .flat_map(|entity| {
                CRUD_OPERATIONS
                    .iter()
                    .map(move |op| format!("{op}{entity}"))
            })
            .collect();

        let service = ServiceDefinition {
            name: format!("{}Service", module_display_name(&analysis.module)),
            entities: entity_names,
            operations,
        };

        Self {
            namespace: format!("relift.{}", analysis.module.to_lowercase()),
            module: analysis.module.clone(),
            ui_template: select_ui_template(ui_framework, &entities),
            entities,
            service,
            ui_framework,
            best_practices: Vec::new(),
        }
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "namespace": self.namespace,
            "entities": self.service.entities,
            "service": self.service.name,
            "ui_template": self.ui_template,
            "best_practices": self.best_practices.len(),
        })
    }
}

/// Map one legacy table to an entity definition.
pub fn entity_for_table(table: &str) -> EntityDefinition {
    let upper = table.trim().to_uppercase();
    match ENTITY_NAMES.iter().find(|(t, _)| *t == upper) {
        Some((_, name)) => EntityDefinition {
            name: (*name).to_string(),
            source_table: upper,
            mapped: true,
        },
        None => EntityDefinition {
            name: pascal_case(&upper),
            source_table: upper,
            mapped: false,
        },
    }
}

/// `ZSALES_HEADER` -> `ZsalesHeader`.
fn pascal_case(raw: &str) -> String {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn select_ui_template(framework: UiFramework, entities: &[EntityDefinition]) -> UiTemplate {
    if framework == UiFramework::None {
        return UiTemplate::None;
    }
    match entities.len() {
        0 => UiTemplate::OverviewPage,
        1 => UiTemplate::Worklist,
        _ => UiTemplate::ListReportObjectPage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ClassificationSource;

    fn analysis(module: &str, tables: &[&str]) -> AnalysisResult {
        AnalysisResult {
            business_logic: vec!["Check credit limit".to_string()],
            tables: tables.iter().map(|s| s.to_string()).collect(),
            dependencies: Vec::new(),
            patterns: Vec::new(),
            module: module.to_string(),
            complexity: 3,
            lines_of_code: 30,
            documentation: String::new(),
            classification: ClassificationSource::Analyzer,
        }
    }

    #[test]
    fn known_tables_map_to_entities() {
        let plan = GenerationPlan::derive(
            &analysis("SD", &["VBAK", "VBAP", "KNA1"]),
            UiFramework::FioriElements,
        );
        let names: Vec<&str> = plan.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["SalesOrder", "SalesOrderItem", "Customer"]);
        assert!(plan.entities.iter().all(|e| e.mapped));
        assert_eq!(plan.service.name, "SalesDistributionService");
        assert_eq!(plan.service.entities.len(), 3);
        assert_eq!(plan.service.operations.len(), 12);
        assert!(plan.service.operations.contains(&"readSalesOrder".to_string()));
        assert_eq!(plan.namespace, "relift.sd");
        assert_eq!(plan.ui_template, UiTemplate::ListReportObjectPage);
    }

    #[test]
    fn unknown_table_passes_through() {
        let entity = entity_for_table("zsales_header");
        assert_eq!(entity.name, "ZsalesHeader");
        assert_eq!(entity.source_table, "ZSALES_HEADER");
        assert!(!entity.mapped);
    }

    #[test]
    fn ui_template_selection() {
        let one = GenerationPlan::derive(&analysis("MM", &["MARA"]), UiFramework::React);
        assert_eq!(one.ui_template, UiTemplate::Worklist);

        let none = GenerationPlan::derive(&analysis("MM", &[]), UiFramework::Ui5Freestyle);
        assert_eq!(none.ui_template, UiTemplate::OverviewPage);

        let headless = GenerationPlan::derive(&analysis("MM", &["MARA"]), UiFramework::None);
        assert_eq!(headless.ui_template, UiTemplate::None);
    }

    #[test]
    fn custom_module_service_name() {
        let plan = GenerationPlan::derive(&analysis("CUSTOM", &["ZTAB"]), UiFramework::None);
        assert_eq!(plan.service.name, "CustomService");
        assert_eq!(plan.namespace, "relift.custom");
    }
}
