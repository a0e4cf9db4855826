use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which rewrite implementation runs the three passes.
///
/// - structural: parses the document into blocks and edits lines (default)
/// - pattern: the legacy regular-expression rewrite, kept byte-compatible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteEngine {
    #[default]
    Structural,
    Pattern,
}

impl RewriteEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteEngine::Structural => "structural",
            RewriteEngine::Pattern => "pattern",
        }
    }
}

impl fmt::Display for RewriteEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three insertions performed per model, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Field,
    Relation,
    Index,
}

impl PassKind {
    pub const ALL: [PassKind; 3] = [PassKind::Field, PassKind::Relation, PassKind::Index];

    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::Field => "field",
            PassKind::Relation => "relation",
            PassKind::Index => "index",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pass left the document untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No `model <Name> {` block exists.
    ModelMissing,
    /// The block exists but lacks the line the insertion is anchored on.
    AnchorMissing { anchor: String },
    /// The declaration being inserted is already there.
    AlreadyPresent,
    /// The legacy pattern matched nothing.
    PatternNoMatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModelMissing => f.write_str("model not found"),
            SkipReason::AnchorMissing { anchor } => write!(f, "anchor `{anchor}` not found"),
            SkipReason::AlreadyPresent => f.write_str("already present"),
            SkipReason::PatternNoMatch => f.write_str("pattern did not match"),
        }
    }
}

/// Declarations injected into every target model, plus the anchors used to
/// place them.
///
/// Defaults reproduce the organization tenant migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantSpec {
    pub field: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_comment: Option<String>,
    pub relation: String,
    pub relation_model: String,
    pub references: String,
    pub anchor_field: String,
    pub anchor_field_type: String,
    pub anchor_relation: String,
    pub relations_marker: String,
}

impl Default for TenantSpec {
    fn default() -> Self {
        Self {
            field: "organizationId".to_string(),
            field_type: "String".to_string(),
            field_comment: Some("Made optional for safe migration".to_string()),
            relation: "organization".to_string(),
            relation_model: "Organization".to_string(),
            references: "id".to_string(),
            anchor_field: "createdById".to_string(),
            anchor_field_type: "String".to_string(),
            anchor_relation: "createdBy".to_string(),
            relations_marker: "// Relations".to_string(),
        }
    }
}

impl TenantSpec {
    /// Field declaration without indentation, e.g.
    /// `organizationId  String?   // Made optional for safe migration`.
    pub fn field_decl(&self) -> String {
        let mut decl = format!("{:<15} {}?", self.field, self.field_type);
        if let Some(comment) = self.field_comment.as_deref().filter(|c| !c.is_empty()) {
            decl.push_str("   // ");
            decl.push_str(comment);
        }
        decl
    }

    /// Relation declaration without indentation.
    pub fn relation_decl(&self) -> String {
        format!(
            "{:<15} {}? @relation(fields: [{}], references: [{}])",
            self.relation, self.relation_model, self.field, self.references
        )
    }

    /// Block attribute declaring the tenant index.
    pub fn index_decl(&self) -> String {
        format!("@@index([{}])", self.field)
    }
}

/// Deterministic op id for a (model, pass) pair.
pub fn op_id(model: &str, pass: PassKind) -> String {
    let name = format!("tenantfix/{model}/{pass}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}
