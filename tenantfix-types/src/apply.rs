use crate::ops::{PassKind, RewriteEngine, SkipReason};
use crate::tool::ToolInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantfixApply {
    pub schema: String,
    pub tool: ToolInfo,
    pub engine: RewriteEngine,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_ref: Option<PlanRef>,

    pub files: ApplyFiles,
    pub preconditions: ApplyPreconditions,

    /// False for dry runs.
    pub written: bool,

    #[serde(default)]
    pub results: Vec<ApplyResult>,
    pub summary: ApplySummary,
    pub run: ApplyRunInfo,
}

impl TenantfixApply {
    pub fn new(tool: ToolInfo, engine: RewriteEngine, files: ApplyFiles) -> Self {
        Self {
            schema: crate::schema::TENANTFIX_APPLY_V1.to_string(),
            tool,
            engine,
            plan_ref: None,
            files,
            preconditions: ApplyPreconditions::default(),
            written: false,
            results: vec![],
            summary: ApplySummary::default(),
            run: ApplyRunInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRef {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyFiles {
    pub input: String,
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyPreconditions {
    pub verified: bool,

    #[serde(default)]
    pub mismatches: Vec<PreconditionMismatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreconditionMismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub op_id: String,
    pub model: String,
    pub pass: PassKind,
    pub status: ApplyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<SkipReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Blocked,
    Skipped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    pub attempted: u64,
    pub applied: u64,
    pub skipped: u64,
    pub blocked: u64,
    pub files_modified: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyRunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}
