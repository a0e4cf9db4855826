//! Edit engine for tenantfix.
//!
//! Responsibilities:
//! - Run the field/relation/index passes for each target model, with either
//!   the structural or the legacy pattern engine.
//! - Check the sha256 precondition recorded in a plan and apply it.
//! - Generate a unified diff preview.

pub mod error;
pub mod pattern;
pub mod structural;

pub use error::{EditError, EditResult, PolicyBlockError};

use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use diffy::PatchFormatter;
use fs_err as fs;
use sha2::{Digest, Sha256};
use tenantfix_schema::Document;
use tenantfix_types::apply::{
    ApplyFiles, ApplyPreconditions, ApplyResult, ApplyStatus, PreconditionMismatch,
    TenantfixApply,
};
use tenantfix_types::ops::{op_id, PassKind, RewriteEngine, SkipReason, TenantSpec};
use tenantfix_types::plan::TenantfixPlan;
use tenantfix_types::tool::ToolInfo;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStatus {
    Applied,
    Skipped(SkipReason),
}

impl PassStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, PassStatus::Applied)
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            PassStatus::Applied => None,
            PassStatus::Skipped(reason) => Some(reason),
        }
    }
}

/// Result of one pass against one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub model: String,
    pub pass: PassKind,
    pub status: PassStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions {
    pub engine: RewriteEngine,
    pub guard_existing: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            engine: RewriteEngine::Structural,
            guard_existing: true,
        }
    }
}

/// The document before and after all passes, plus per-pass outcomes in
/// execution order (model by model, field/relation/index).
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub before: String,
    pub after: String,
    pub outcomes: Vec<PassOutcome>,
}

impl Rewrite {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn applied(&self) -> impl Iterator<Item = &PassOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_applied())
    }
}

/// Rewrite `text` for each model in order, accumulating into one document.
///
/// The structural engine fails up front on unbalanced braces; the pattern
/// engine never fails on content.
pub fn rewrite_document(
    text: &str,
    models: &[String],
    spec: &TenantSpec,
    opts: &RewriteOptions,
) -> EditResult<Rewrite> {
    let mut outcomes = Vec::with_capacity(models.len() * PassKind::ALL.len());

    let after = match opts.engine {
        RewriteEngine::Structural => {
            let mut doc = Document::parse(text)?;
            for model in models {
                outcomes.extend(structural::rewrite_model(
                    &mut doc,
                    model,
                    spec,
                    opts.guard_existing,
                ));
            }
            doc.to_string()
        }
        RewriteEngine::Pattern => {
            if opts.guard_existing {
                debug!("pattern engine has no duplicate guard; guard_existing ignored");
            }
            let mut current = text.to_string();
            for model in models {
                let (next, model_outcomes) = pattern::rewrite_model(&current, model, spec)?;
                current = next;
                outcomes.extend(model_outcomes);
            }
            current
        }
    };

    Ok(Rewrite {
        before: text.to_string(),
        after,
        outcomes,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Unified diff for one file; empty when nothing changed.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    out.push_str(&PatchFormatter::new().fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Compare the plan's recorded input hash against the current contents.
pub fn check_preconditions(plan: &TenantfixPlan, current: &str) -> ApplyPreconditions {
    let actual = sha256_hex(current.as_bytes());
    if actual == plan.input.sha256 {
        ApplyPreconditions {
            verified: true,
            mismatches: vec![],
        }
    } else {
        ApplyPreconditions {
            verified: false,
            mismatches: vec![PreconditionMismatch {
                path: plan.input.path.clone(),
                expected: plan.input.sha256.clone(),
                actual,
            }],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    /// Write the output even when the rewrite changed nothing.
    pub always_write: bool,
}

/// Apply a plan. When `opts.dry_run` is true nothing is written, but results
/// and a patch are still produced.
///
/// A precondition mismatch is not an error: the returned apply has
/// `preconditions.verified == false`, every op `blocked`, and nothing written.
pub fn apply_plan(
    plan: &TenantfixPlan,
    tool: ToolInfo,
    opts: &ApplyOptions,
) -> EditResult<(TenantfixApply, String)> {
    let started_at = Utc::now();
    let (input, _) = plan_paths(plan);
    let text = fs::read_to_string(input).with_context(|| format!("read {}", input))?;

    let preconditions = check_preconditions(plan, &text);
    if !preconditions.verified {
        warn!(path = %input, "input changed since plan; nothing applied");
        let mut apply = TenantfixApply::new(tool, plan.engine, apply_files(plan, &text));
        apply.run.started_at = Some(started_at);
        apply.preconditions = preconditions;
        for op in &plan.ops {
            apply.results.push(ApplyResult {
                op_id: op.id.clone(),
                model: op.model.clone(),
                pass: op.pass,
                status: ApplyStatus::Blocked,
                skipped_reason: None,
            });
            apply.summary.blocked += 1;
        }
        apply.run.ended_at = Some(Utc::now());
        return Ok((apply, String::new()));
    }

    let rewrite = rewrite_document(
        &text,
        &plan.models,
        &plan.tenant,
        &RewriteOptions {
            engine: plan.engine,
            guard_existing: plan.guard_existing,
        },
    )?;
    apply_rewrite(plan, &rewrite, tool, opts)
}

/// Write `rewrite`, already computed from the plan's input, without reading
/// the input again.
///
/// `rewrite.before` must hash to the plan's recorded sha256; anything else is
/// a `PreconditionMismatch` policy block.
pub fn apply_rewrite(
    plan: &TenantfixPlan,
    rewrite: &Rewrite,
    tool: ToolInfo,
    opts: &ApplyOptions,
) -> EditResult<(TenantfixApply, String)> {
    let (input, output) = plan_paths(plan);
    let mut apply = TenantfixApply::new(tool, plan.engine, apply_files(plan, &rewrite.before));
    apply.run.started_at = Some(Utc::now());
    apply.preconditions = check_preconditions(plan, &rewrite.before);
    if !apply.preconditions.verified {
        return Err(PolicyBlockError::PreconditionMismatch {
            message: format!("rewrite of {} does not match the plan", input),
        }
        .into());
    }

    for outcome in &rewrite.outcomes {
        apply.summary.attempted += 1;
        let (status, skipped_reason) = match &outcome.status {
            PassStatus::Applied => {
                apply.summary.applied += 1;
                (ApplyStatus::Applied, None)
            }
            PassStatus::Skipped(reason) => {
                apply.summary.skipped += 1;
                (ApplyStatus::Skipped, Some(reason.clone()))
            }
        };
        apply.results.push(ApplyResult {
            op_id: op_id(&outcome.model, outcome.pass),
            model: outcome.model.clone(),
            pass: outcome.pass,
            status,
            skipped_reason,
        });
    }

    let patch = render_patch(output.as_str(), &rewrite.before, &rewrite.after);
    apply.files.sha256_after = Some(sha256_hex(rewrite.after.as_bytes()));

    if !opts.dry_run && (rewrite.changed() || opts.always_write || output != input) {
        fs::write(output, &rewrite.after).with_context(|| format!("write {}", output))?;
        apply.written = true;
        if rewrite.changed() {
            apply.summary.files_modified = 1;
        }
        info!(path = %output, applied = rewrite.applied().count(), "schema written");
    } else {
        debug!(dry_run = opts.dry_run, changed = rewrite.changed(), "schema not written");
    }

    apply.run.ended_at = Some(Utc::now());
    Ok((apply, patch))
}

/// Input and output paths; output defaults to the input.
fn plan_paths(plan: &TenantfixPlan) -> (&Utf8Path, &Utf8Path) {
    let input = Utf8Path::new(&plan.input.path);
    let output = plan
        .input
        .output
        .as_deref()
        .map(Utf8Path::new)
        .unwrap_or(input);
    (input, output)
}

fn apply_files(plan: &TenantfixPlan, before: &str) -> ApplyFiles {
    let (input, output) = plan_paths(plan);
    ApplyFiles {
        input: input.to_string(),
        output: output.to_string(),
        sha256_before: Some(sha256_hex(before.as_bytes())),
        sha256_after: None,
    }
}
