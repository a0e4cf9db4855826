use crate::ops::{PassKind, RewriteEngine, SkipReason, TenantSpec};
use crate::tool::ToolInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantfixPlan {
    pub schema: String,
    pub tool: ToolInfo,
    pub input: PlanInput,
    pub engine: RewriteEngine,

    #[serde(default = "default_true")]
    pub guard_existing: bool,

    pub tenant: TenantSpec,

    /// Target model names in execution order.
    #[serde(default)]
    pub models: Vec<String>,

    #[serde(default)]
    pub ops: Vec<PlanOp>,

    pub summary: PlanSummary,
}

impl TenantfixPlan {
    pub fn new(
        tool: ToolInfo,
        input: PlanInput,
        engine: RewriteEngine,
        tenant: TenantSpec,
    ) -> Self {
        Self {
            schema: crate::schema::TENANTFIX_PLAN_V1.to_string(),
            tool,
            input,
            engine,
            guard_existing: true,
            tenant,
            models: vec![],
            ops: vec![],
            summary: PlanSummary::default(),
        }
    }

    /// Ops that will change the document.
    pub fn ready_ops(&self) -> impl Iterator<Item = &PlanOp> {
        self.ops.iter().filter(|op| !op.blocked)
    }
}

fn default_true() -> bool {
    true
}

/// The schema file the plan was computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub path: String,

    /// Where the rewritten document is written; `None` means in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// sha256 of the input at plan time; `apply` refuses to run if it changed.
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSummary {
    pub models_total: u64,
    pub models_missing: u64,
    pub ops_total: u64,
    pub ops_blocked: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOp {
    pub id: String,
    pub model: String,
    pub pass: PassKind,
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<SkipReason>,
}
