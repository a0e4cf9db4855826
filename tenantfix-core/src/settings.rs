//! Clap-free settings for the migration pipelines.

use camino::{Utf8Path, Utf8PathBuf};
use tenantfix_edit::RewriteOptions;
use tenantfix_types::ops::{RewriteEngine, TenantSpec};

pub const DEFAULT_SCHEMA_PATH: &str = "prisma/schema.prisma";

/// Tenant-isolated models that still lack the tenant field.
pub const DEFAULT_MODELS: &[&str] = &[
    "Segment",
    "EmailTemplate",
    "SMSCampaign",
    "WhatsAppCampaign",
    "Workflow",
    "Task",
    "Journey",
    "AI_ContentAnalysis",
    "AI_CustomerSegment",
    "AI_ChatHistory",
    "LeadPulseVisitor",
    "LeadPulseTouchpoint",
    "ConversionEvent",
    "ConversionTracking",
    "ConversionFunnel",
    "PredictionModel",
    "ChurnPrediction",
    "LifetimeValuePrediction",
    "ContactJourney",
];

pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

pub fn default_next_steps() -> Vec<String> {
    vec![
        "Run: npx prisma db push".to_string(),
        "Test super admin login".to_string(),
        "Verify tenant isolation".to_string(),
    ]
}

#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub input: Utf8PathBuf,
    /// `None` rewrites `input` in place.
    pub output: Option<Utf8PathBuf>,
    pub models: Vec<String>,
    pub tenant: TenantSpec,
    pub engine: RewriteEngine,
    pub guard_existing: bool,
    /// Refuse to write when any pass would be skipped.
    pub strict: bool,
    pub next_steps: Vec<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            input: Utf8PathBuf::from(DEFAULT_SCHEMA_PATH),
            output: None,
            models: default_models(),
            tenant: TenantSpec::default(),
            engine: RewriteEngine::Structural,
            guard_existing: true,
            strict: false,
            next_steps: default_next_steps(),
        }
    }
}

impl MigrationSettings {
    pub fn output_path(&self) -> &Utf8Path {
        self.output.as_deref().unwrap_or(&self.input)
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            engine: self.engine,
            guard_existing: self.guard_existing,
        }
    }
}
