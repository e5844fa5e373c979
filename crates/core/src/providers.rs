//! Canonical names of the external tool providers the stages call.

pub const CODE_ANALYZER: &str = "code-analyzer";
pub const SCHEMA_GENERATOR: &str = "schema-generator";
pub const SERVICE_GENERATOR: &str = "service-generator";
pub const UI_GENERATOR: &str = "ui-generator";
pub const SOURCE_CONTROL: &str = "source-control";
pub const MESSAGING: &str = "messaging";
pub const DOCS_SEARCH: &str = "docs-search";
pub const LANGUAGE_MODEL: &str = "llm";

/// Not a connected provider: the local build-tool process, named so its
/// invocations sit in the same call log as provider calls.
pub const BUILD_TOOL: &str = "build-tool";

// Operation names.
pub const OP_ANALYZE_CODE: &str = "analyzeCode";
pub const OP_SUMMARIZE: &str = "summarize";
pub const OP_COMPLETE: &str = "complete";
pub const OP_SEARCH_DOCS: &str = "searchDocs";
pub const OP_GENERATE_SCHEMA: &str = "generateSchema";
pub const OP_GENERATE_SERVICE: &str = "generateService";
pub const OP_GENERATE_UI: &str = "generateUi";
pub const OP_CREATE_REPOSITORY: &str = "createRepository";
pub const OP_PUSH_FILES: &str = "pushFiles";
pub const OP_CREATE_WORKFLOW: &str = "createWorkflow";
pub const OP_POST_MESSAGE: &str = "postMessage";
pub const OP_INIT_PROJECT: &str = "init";
pub const OP_BUILD: &str = "build";
