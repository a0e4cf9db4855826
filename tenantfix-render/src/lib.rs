//! Rendering helpers (markdown and console) for human-readable artifacts.

use tenantfix_types::apply::{ApplyStatus, TenantfixApply};
use tenantfix_types::ops::PassKind;
use tenantfix_types::plan::{PlanOp, TenantfixPlan};

pub fn render_plan_md(plan: &TenantfixPlan) -> String {
    let mut out = String::new();
    out.push_str("# tenantfix plan\n\n");
    out.push_str(&format!("- Schema: `{}`\n", plan.input.path));
    if let Some(output) = &plan.input.output {
        out.push_str(&format!("- Output: `{}`\n", output));
    }
    out.push_str(&format!("- Engine: `{}`\n", plan.engine));
    out.push_str(&format!(
        "- Models: {} (missing {})\n",
        plan.summary.models_total, plan.summary.models_missing
    ));
    out.push_str(&format!(
        "- Ops: {} (ready {}, blocked {})\n",
        plan.summary.ops_total,
        plan.ready_ops().count(),
        plan.summary.ops_blocked
    ));
    if let Some(bytes) = plan.summary.patch_bytes {
        out.push_str(&format!("- Patch bytes: {}\n", bytes));
    }
    out.push('\n');

    out.push_str("## Ops\n\n");
    if plan.ops.is_empty() {
        out.push_str("_No ops planned._\n");
        return out;
    }

    out.push_str("| Model | Pass | Status |\n|---|---|---|\n");
    for op in &plan.ops {
        let status = match &op.blocked_reason {
            Some(reason) => format!("blocked: {}", reason),
            None if op.blocked => "blocked".to_string(),
            None => "ready".to_string(),
        };
        out.push_str(&format!("| `{}` | {} | {} |\n", op.model, op.pass, status));
    }

    out
}

pub fn render_apply_md(apply: &TenantfixApply) -> String {
    let mut out = String::new();
    out.push_str("# tenantfix apply\n\n");
    out.push_str(&format!(
        "- Attempted: {}\n- Applied: {}\n- Skipped: {}\n- Blocked: {}\n- Files modified: {}\n",
        apply.summary.attempted,
        apply.summary.applied,
        apply.summary.skipped,
        apply.summary.blocked,
        apply.summary.files_modified
    ));
    out.push_str(&format!("- Written: `{}`\n\n", apply.written));

    if !apply.preconditions.verified {
        out.push_str("## Precondition mismatches\n\n");
        for m in &apply.preconditions.mismatches {
            out.push_str(&format!(
                "- `{}` expected {} found {}\n",
                m.path, m.expected, m.actual
            ));
        }
        out.push('\n');
    }

    out.push_str("## Results\n\n");
    if apply.results.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }

    for r in &apply.results {
        out.push_str(&format!(
            "- `{}` {}: `{}`",
            r.model,
            r.pass,
            status_label(&r.status)
        ));
        if let Some(reason) = &r.skipped_reason {
            out.push_str(&format!(" ({})", reason));
        }
        out.push('\n');
    }

    out
}

/// One console line per targeted model, in execution order.
///
/// Ops come in runs of one per pass, so a model listed twice gets two lines.
pub fn progress_lines(plan: &TenantfixPlan) -> Vec<String> {
    plan.ops
        .chunks(PassKind::ALL.len())
        .map(|ops| {
            format!(
                "Adding {} to {}{}",
                plan.tenant.field,
                ops[0].model,
                outcome_suffix(ops)
            )
        })
        .collect()
}

fn outcome_suffix(ops: &[PlanOp]) -> String {
    let ready: Vec<String> = ops
        .iter()
        .filter(|op| !op.blocked)
        .map(|op| op.pass.to_string())
        .collect();

    if ready.len() == ops.len() {
        return String::new();
    }
    if let Some(reason) = ops.iter().find_map(|op| op.blocked_reason.as_ref())
        && ready.is_empty()
        && ops.iter().all(|op| op.blocked_reason.as_ref() == Some(reason))
    {
        return format!(" (skipped: {})", reason);
    }

    let mut parts = Vec::new();
    if !ready.is_empty() {
        parts.push(ready.join(", "));
    }
    for op in ops.iter().filter(|op| op.blocked) {
        match &op.blocked_reason {
            Some(reason) => parts.push(format!("{} skipped: {}", op.pass, reason)),
            None => parts.push(format!("{} skipped", op.pass)),
        }
    }
    format!(" ({})", parts.join("; "))
}

fn status_label(s: &ApplyStatus) -> &'static str {
    match s {
        ApplyStatus::Applied => "applied",
        ApplyStatus::Blocked => "blocked",
        ApplyStatus::Skipped => "skipped",
    }
}
