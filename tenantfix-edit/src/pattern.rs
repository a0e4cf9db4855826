//! Pattern engine: the legacy regular-expression rewrite.
//!
//! Block boundaries are approximated by `[^}]*?` spans, so output is only
//! correct for blocks without `}` in their body. Known artifacts of this
//! engine, all kept for byte compatibility with previously migrated schemas:
//! - the relation is inserted right after the anchor relation's name token,
//!   splitting that line;
//! - the index is glued to the closing brace and added even when the other
//!   passes matched nothing;
//! - an unclosed block lets every pass run on into the following block;
//! - nothing prevents a second run from inserting everything again.

use crate::{PassOutcome, PassStatus};
use anyhow::Context;
use regex::{Captures, Regex};
use tenantfix_types::ops::{PassKind, SkipReason, TenantSpec};
use tracing::debug;

/// Apply the three substitutions for `model` and return the new text.
pub fn rewrite_model(
    text: &str,
    model: &str,
    spec: &TenantSpec,
) -> anyhow::Result<(String, Vec<PassOutcome>)> {
    let present = text.contains(&format!("model {model} {{"));
    let mut current = text.to_string();
    let mut outcomes = Vec::with_capacity(PassKind::ALL.len());

    for pass in PassKind::ALL {
        let (re, insert) = pass_pattern(pass, model, spec)?;
        let matched = re.is_match(&current);
        if matched {
            current = re
                .replace_all(&current, |caps: &Captures| {
                    format!("{}{}{}", &caps[1], insert, &caps[2])
                })
                .into_owned();
        }
        debug!(model, %pass, matched, "pattern pass");

        let status = match (matched, present) {
            (true, _) => PassStatus::Applied,
            (false, false) => PassStatus::Skipped(SkipReason::ModelMissing),
            (false, true) => PassStatus::Skipped(SkipReason::PatternNoMatch),
        };
        outcomes.push(PassOutcome {
            model: model.to_string(),
            pass,
            status,
        });
    }

    Ok((current, outcomes))
}

/// The regex for one pass and the text spliced between its two groups.
fn pass_pattern(pass: PassKind, model: &str, spec: &TenantSpec) -> anyhow::Result<(Regex, String)> {
    let head = format!(r"model {} \{{", regex::escape(model));
    let marker = regex::escape(&spec.relations_marker);

    let (pattern, insert) = match pass {
        PassKind::Field => (
            format!(
                r"({head}[^}}]*?{}\s+{}[^}}]*?)(\s+{marker})",
                regex::escape(&spec.anchor_field),
                regex::escape(&spec.anchor_field_type),
            ),
            format!("\n  {}", spec.field_decl()),
        ),
        PassKind::Relation => (
            format!(
                r"({head}[^}}]*?{marker}[^}}]*?{}[^}}]*?)(\s+[a-zA-Z_][a-zA-Z0-9_]*\s+[^}}]*?\[\])",
                regex::escape(&spec.anchor_relation),
            ),
            format!("\n  {}", spec.relation_decl()),
        ),
        PassKind::Index => (
            format!(r"({head}[^}}]*?)(\}})"),
            format!("\n\n  {}", spec.index_decl()),
        ),
    };

    let re = Regex::new(&pattern).with_context(|| format!("compile {pass} pattern for {model}"))?;
    Ok((re, insert))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn patterns_escape_model_and_marker() {
        let spec = TenantSpec {
            relations_marker: "// Relations (1:n)".to_string(),
            ..TenantSpec::default()
        };
        let (re, _) = pass_pattern(PassKind::Field, "A.B", &spec).expect("compile");
        assert!(re.as_str().contains(r"model A\.B \{"));
        assert!(re.as_str().contains(r"// Relations \(1:n\)"));
    }

    #[test]
    fn index_pass_glues_annotation_to_closing_brace() {
        let text = "model Task {\n  id String\n}\n";
        let (out, outcomes) = rewrite_model(text, "Task", &TenantSpec::default()).expect("rewrite");
        assert_eq!(
            out,
            "model Task {\n  id String\n\n\n  @@index([organizationId])}\n"
        );
        let statuses: Vec<_> = outcomes.into_iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                PassStatus::Skipped(SkipReason::PatternNoMatch),
                PassStatus::Skipped(SkipReason::PatternNoMatch),
                PassStatus::Applied,
            ]
        );
    }

    #[test]
    fn unknown_model_is_a_no_op() {
        let text = "model Task {\n  id String\n}\n";
        let (out, outcomes) = rewrite_model(text, "Journey", &TenantSpec::default()).expect("rewrite");
        assert_eq!(out, text);
        assert!(outcomes
            .iter()
            .all(|o| o.status == PassStatus::Skipped(SkipReason::ModelMissing)));
    }

    #[test]
    fn model_name_prefix_does_not_match() {
        let text = "model TaskList {\n  id String\n}\n";
        let (out, _) = rewrite_model(text, "Task", &TenantSpec::default()).expect("rewrite");
        assert_eq!(out, text);
    }
}
