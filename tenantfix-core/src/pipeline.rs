//! Migrate, plan and apply pipelines, extracted from the CLI.

use crate::planner::{build_plan, PlanOutcome};
use crate::settings::MigrationSettings;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use tenantfix_edit::{
    apply_plan, apply_rewrite, sha256_hex, ApplyOptions, EditError, PolicyBlockError,
};
use tenantfix_render::{render_apply_md, render_plan_md};
use tenantfix_schema::Document;
use tenantfix_types::apply::{PlanRef, TenantfixApply};
use tenantfix_types::plan::TenantfixPlan;
use tenantfix_types::tool::ToolInfo;
use tracing::{debug, info, warn};

/// Error type for pipeline results. Exit code 2 = policy block, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("policy block: {0}")]
    PolicyBlock(String),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::PolicyBlock(_) => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

impl From<EditError> for ToolError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::PolicyBlock(block) => ToolError::PolicyBlock(block.to_string()),
            EditError::Parse(parse) => {
                ToolError::Internal(anyhow::Error::new(parse).context("parse schema"))
            }
            EditError::Runtime(e) => ToolError::Internal(e),
        }
    }
}

/// Outcome of `run_apply`.
pub struct ApplyOutcome {
    pub apply: TenantfixApply,
    pub patch: String,
    pub policy_block: bool,
}

/// Write the rewrite computed by [`run_plan`] without reading the schema
/// again. The output is written even when no pass applied.
pub fn commit_migration(outcome: &PlanOutcome, tool: ToolInfo) -> Result<TenantfixApply, ToolError> {
    let opts = ApplyOptions {
        dry_run: false,
        always_write: true,
    };
    let (apply, _) = apply_rewrite(&outcome.plan, &outcome.rewrite, tool, &opts)?;
    Ok(apply)
}

/// Compute a plan and patch preview without touching the schema.
pub fn run_plan(settings: &MigrationSettings, tool: ToolInfo) -> Result<PlanOutcome, ToolError> {
    let outcome = plan_from_disk(settings, tool)?;
    if settings.strict {
        enforce_strict(&outcome.plan)?;
    }
    Ok(outcome)
}

/// Apply `plan.json` from `plan_path`. Dry-run unless `write` is set.
pub fn run_apply(plan_path: &Utf8Path, tool: ToolInfo, write: bool) -> Result<ApplyOutcome, ToolError> {
    let plan_str =
        fs::read_to_string(plan_path).with_context(|| format!("read {}", plan_path))?;
    let plan: TenantfixPlan = serde_json::from_str(&plan_str).context("parse plan.json")?;

    let opts = ApplyOptions {
        dry_run: !write,
        always_write: false,
    };
    let (mut apply, patch) = apply_plan(&plan, tool, &opts)?;
    apply.plan_ref = Some(PlanRef {
        path: plan_path.to_string(),
        sha256: Some(sha256_hex(plan_str.as_bytes())),
    });
    let policy_block = !apply.preconditions.verified;
    if policy_block {
        warn!(path = %plan.input.path, "precondition mismatch; re-run `tenantfix plan`");
    }

    Ok(ApplyOutcome {
        apply,
        patch,
        policy_block,
    })
}

/// Presence of one configured target in the schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModelPresence {
    pub name: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Whether the tenant field is already declared.
    pub migrated: bool,
}

pub fn inspect_models(settings: &MigrationSettings) -> Result<Vec<ModelPresence>, ToolError> {
    let text = read_input(&settings.input)?;
    let doc = Document::parse(&text).map_err(EditError::from)?;

    Ok(settings
        .models
        .iter()
        .map(|name| {
            let block = doc.model(name);
            ModelPresence {
                name: name.clone(),
                present: block.is_some(),
                line: block.map(|b| b.start_line()),
                migrated: block.is_some_and(|b| b.find_field(&settings.tenant.field).is_some()),
            }
        })
        .collect())
}

pub fn write_plan_artifacts(out_dir: &Utf8Path, outcome: &PlanOutcome) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir))?;
    write_json(&out_dir.join("plan.json"), &outcome.plan)?;
    fs::write(out_dir.join("plan.md"), render_plan_md(&outcome.plan))?;
    fs::write(out_dir.join("patch.diff"), &outcome.patch)?;
    info!("wrote plan to {}", out_dir);
    Ok(())
}

pub fn write_apply_artifacts(out_dir: &Utf8Path, outcome: &ApplyOutcome) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir))?;
    write_json(&out_dir.join("apply.json"), &outcome.apply)?;
    fs::write(out_dir.join("apply.md"), render_apply_md(&outcome.apply))?;
    fs::write(out_dir.join("patch.diff"), &outcome.patch)?;
    info!("wrote apply artifacts to {}", out_dir);
    Ok(())
}

fn plan_from_disk(settings: &MigrationSettings, tool: ToolInfo) -> Result<PlanOutcome, ToolError> {
    let text = read_input(&settings.input)?;
    debug!(path = %settings.input, bytes = text.len(), engine = %settings.engine, "schema loaded");
    Ok(build_plan(settings, &text, tool)?)
}

fn read_input(path: &Utf8Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path))
}

fn enforce_strict(plan: &TenantfixPlan) -> Result<(), ToolError> {
    let blocked: Vec<String> = plan
        .ops
        .iter()
        .filter(|op| op.blocked)
        .map(|op| {
            let reason = op
                .blocked_reason
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            format!("{}/{} ({})", op.model, op.pass, reason)
        })
        .collect();

    if blocked.is_empty() {
        return Ok(());
    }
    Err(EditError::from(PolicyBlockError::SkippedOperations {
        message: blocked.join(", "),
    })
    .into())
}

/// Policy block for an input whose sha256 no longer matches its plan.
pub fn precondition_block(path: &str, detail: &str) -> ToolError {
    EditError::from(PolicyBlockError::PreconditionMismatch {
        message: format!("{} {}", path, detail),
    })
    .into()
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}
