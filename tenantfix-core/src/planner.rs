//! Plan construction: run the rewrite in memory and record what each pass
//! would do.

use crate::settings::MigrationSettings;
use std::collections::BTreeSet;
use tenantfix_edit::{render_patch, rewrite_document, sha256_hex, EditResult, PassStatus, Rewrite};
use tenantfix_types::ops::{op_id, SkipReason};
use tenantfix_types::plan::{PlanInput, PlanOp, PlanSummary, TenantfixPlan};
use tenantfix_types::tool::ToolInfo;
use tracing::debug;

pub struct PlanOutcome {
    pub plan: TenantfixPlan,
    pub patch: String,
    /// The in-memory rewrite the plan describes.
    pub rewrite: Rewrite,
}

/// Build a plan for `text`, the current contents of `settings.input`.
pub fn build_plan(
    settings: &MigrationSettings,
    text: &str,
    tool: ToolInfo,
) -> EditResult<PlanOutcome> {
    let rewrite = rewrite_document(
        text,
        &settings.models,
        &settings.tenant,
        &settings.rewrite_options(),
    )?;

    let input = PlanInput {
        path: settings.input.to_string(),
        output: settings.output.as_ref().map(|p| p.to_string()),
        sha256: sha256_hex(text.as_bytes()),
    };
    let mut plan = TenantfixPlan::new(tool, input, settings.engine, settings.tenant.clone());
    plan.guard_existing = settings.guard_existing;
    plan.models = settings.models.clone();

    for outcome in &rewrite.outcomes {
        plan.ops.push(PlanOp {
            id: op_id(&outcome.model, outcome.pass),
            model: outcome.model.clone(),
            pass: outcome.pass,
            blocked: !outcome.status.is_applied(),
            blocked_reason: outcome.status.skip_reason().cloned(),
        });
    }

    let patch = render_patch(settings.output_path().as_str(), &rewrite.before, &rewrite.after);

    let missing: BTreeSet<&str> = rewrite
        .outcomes
        .iter()
        .filter(|o| o.status == PassStatus::Skipped(SkipReason::ModelMissing))
        .map(|o| o.model.as_str())
        .collect();

    plan.summary = PlanSummary {
        models_total: settings.models.len() as u64,
        models_missing: missing.len() as u64,
        ops_total: plan.ops.len() as u64,
        ops_blocked: plan.ops.iter().filter(|op| op.blocked).count() as u64,
        patch_bytes: Some(patch.len() as u64),
    };
    debug!(
        ops = plan.summary.ops_total,
        blocked = plan.summary.ops_blocked,
        missing = plan.summary.models_missing,
        "plan built"
    );

    Ok(PlanOutcome {
        plan,
        patch,
        rewrite,
    })
}
