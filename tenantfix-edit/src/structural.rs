//! Structural engine: edits classified lines of parsed model blocks.

use crate::{PassOutcome, PassStatus};
use tenantfix_schema::{Block, Document, FieldDecl, Line, LineKind};
use tenantfix_types::ops::{PassKind, SkipReason, TenantSpec};
use tracing::debug;

/// Run the three passes against every `model <model>` block in `doc`.
///
/// With `guard_existing`, a pass whose declaration is already in the block is
/// skipped instead of duplicated.
pub fn rewrite_model(
    doc: &mut Document,
    model: &str,
    spec: &TenantSpec,
    guard_existing: bool,
) -> Vec<PassOutcome> {
    let newline = doc.newline();
    let mut statuses: Vec<Option<PassStatus>> = vec![None; PassKind::ALL.len()];

    for block in doc.models_named_mut(model) {
        for (slot, pass) in statuses.iter_mut().zip(PassKind::ALL) {
            let status = match pass {
                PassKind::Field => insert_field(block, spec, guard_existing, newline),
                PassKind::Relation => insert_relation(block, spec, guard_existing, newline),
                PassKind::Index => insert_index(block, spec, guard_existing, newline),
            };
            debug!(model, %pass, line = block.start_line(), ?status, "structural pass");
            // Applied in any duplicate block wins over a skip elsewhere.
            if slot.as_ref().is_none_or(|s| !s.is_applied()) {
                *slot = Some(status);
            }
        }
    }

    PassKind::ALL
        .into_iter()
        .zip(statuses)
        .map(|(pass, status)| PassOutcome {
            model: model.to_string(),
            pass,
            status: status.unwrap_or(PassStatus::Skipped(SkipReason::ModelMissing)),
        })
        .collect()
}

fn insert_field(block: &mut Block, spec: &TenantSpec, guard: bool, newline: &str) -> PassStatus {
    if guard && block.find_field(&spec.field).is_some() {
        return PassStatus::Skipped(SkipReason::AlreadyPresent);
    }

    let Some((anchor, _)) = block
        .fields()
        .find(|(_, f)| f.name == spec.anchor_field && f.base_type() == spec.anchor_field_type)
    else {
        return anchor_missing(&spec.anchor_field);
    };
    let Some(marker) = block.position_from(anchor + 1, |l| is_marker(l, spec)) else {
        return anchor_missing(&spec.relations_marker);
    };

    // Directly after the last non-blank line above the marker.
    let insert_at = (anchor..marker)
        .rev()
        .find(|&i| !block.lines()[i].is_blank())
        .map_or(marker, |i| i + 1);

    let text = format!("{}{}", block.indent_of(anchor), spec.field_decl());
    block.insert_line(insert_at, text, newline);
    PassStatus::Applied
}

fn insert_relation(block: &mut Block, spec: &TenantSpec, guard: bool, newline: &str) -> PassStatus {
    if guard && block.find_field(&spec.relation).is_some() {
        return PassStatus::Skipped(SkipReason::AlreadyPresent);
    }

    let Some(marker) = block.position_from(0, |l| is_marker(l, spec)) else {
        return anchor_missing(&spec.relations_marker);
    };
    let Some(anchor) = block.position_from(marker + 1, |l| {
        l.field().is_some_and(|f| f.name == spec.anchor_relation)
    }) else {
        return anchor_missing(&spec.anchor_relation);
    };
    let Some(list) = block.position_from(anchor + 1, |l| l.field().is_some_and(FieldDecl::is_list))
    else {
        return anchor_missing(&format!("list field after {}", spec.anchor_relation));
    };

    let text = format!("{}{}", block.indent_of(list), spec.relation_decl());
    block.insert_line(list, text, newline);
    PassStatus::Applied
}

fn insert_index(block: &mut Block, spec: &TenantSpec, guard: bool, newline: &str) -> PassStatus {
    let decl = spec.index_decl();
    if guard && block.lines().iter().any(|l| is_index(l, &decl)) {
        return PassStatus::Skipped(SkipReason::AlreadyPresent);
    }
    // An index on a column the block does not declare would not validate.
    if block.find_field(&spec.field).is_none() {
        return anchor_missing(&spec.field);
    }

    let indent = block
        .fields()
        .next()
        .map(|(i, _)| block.indent_of(i).to_string())
        .unwrap_or_else(|| "  ".to_string());
    if block.lines().last().is_some_and(|l| !l.is_blank()) {
        block.push_line("", newline);
    }
    block.push_line(format!("{indent}{decl}"), newline);
    PassStatus::Applied
}

/// The marker comment, alone or followed by whitespace and more text.
fn is_marker(line: &Line, spec: &TenantSpec) -> bool {
    matches!(line.kind(), LineKind::Comment)
        && line
            .trimmed()
            .strip_prefix(spec.relations_marker.trim())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn is_index(line: &Line, decl: &str) -> bool {
    matches!(line.kind(), LineKind::Attribute)
        && line.trimmed().split_whitespace().collect::<String>() == decl
}

fn anchor_missing(anchor: &str) -> PassStatus {
    PassStatus::Skipped(SkipReason::AnchorMissing {
        anchor: anchor.to_string(),
    })
}
