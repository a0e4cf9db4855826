//! End-to-end pipeline runs against a scratch schema.

use camino::Utf8PathBuf;
use fs_err as fs;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tenantfix_core::pipeline::{
    commit_migration, inspect_models, run_apply, run_plan, write_apply_artifacts,
    write_plan_artifacts,
};
use tenantfix_core::settings::MigrationSettings;
use tenantfix_types::tool::ToolInfo;

const SCHEMA: &str = "\
model User {
  id String @id
}

model Segment {
  id          String @id
  name        String
  createdById String

  // Relations
  createdBy   User   @relation(fields: [createdById], references: [id])
  members     SegmentMember[]
}
";

fn tool() -> ToolInfo {
    ToolInfo::new("tenantfix", Some("0.1.0".to_string()))
}

fn setup(temp: &TempDir) -> (Utf8PathBuf, MigrationSettings) {
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    let input = root.join("schema.prisma");
    fs::write(&input, SCHEMA).expect("write schema");
    let settings = MigrationSettings {
        input,
        models: vec!["Segment".to_string(), "Journey".to_string()],
        ..MigrationSettings::default()
    };
    (root, settings)
}

#[test]
fn migrate_writes_once_and_reports_outcomes() {
    let temp = TempDir::new().expect("temp dir");
    let (_, settings) = setup(&temp);

    let planned = run_plan(&settings, tool()).expect("plan");
    assert_eq!(planned.plan.summary.models_missing, 1);
    let apply = commit_migration(&planned, tool()).expect("commit");

    assert!(apply.written);
    assert_eq!(apply.summary.applied, 3);
    assert_eq!(apply.summary.skipped, 3);

    let written = fs::read_to_string(&settings.input).expect("read back");
    assert_eq!(
        written,
        "\
model User {
  id String @id
}

model Segment {
  id          String @id
  name        String
  createdById String
  organizationId  String?   // Made optional for safe migration

  // Relations
  createdBy   User   @relation(fields: [createdById], references: [id])
  organization    Organization? @relation(fields: [organizationId], references: [id])
  members     SegmentMember[]

  @@index([organizationId])
}
"
    );
}

#[test]
fn planning_alone_leaves_schema_alone() {
    let temp = TempDir::new().expect("temp dir");
    let (_, settings) = setup(&temp);

    let planned = run_plan(&settings, tool()).expect("plan");

    assert!(planned.patch.contains("+  @@index([organizationId])"));
    assert_eq!(fs::read_to_string(&settings.input).expect("read"), SCHEMA);
}

#[test]
fn commit_writes_the_planned_rewrite_without_reading_again() {
    let temp = TempDir::new().expect("temp dir");
    let (_, settings) = setup(&temp);

    let planned = run_plan(&settings, tool()).expect("plan");
    // A second read would now fail with a missing file.
    fs::remove_file(&settings.input).expect("remove schema");

    let apply = commit_migration(&planned, tool()).expect("commit");
    assert!(apply.written);
    assert!(apply.preconditions.verified);
    assert_eq!(
        fs::read_to_string(&settings.input).expect("read back"),
        planned.rewrite.after
    );
}

#[test]
fn migrate_rewrites_unchanged_schema() {
    let temp = TempDir::new().expect("temp dir");
    let (_, mut settings) = setup(&temp);
    settings.models = vec!["Journey".to_string()];

    let planned = run_plan(&settings, tool()).expect("plan");
    let apply = commit_migration(&planned, tool()).expect("commit");
    assert!(apply.written);
    assert_eq!(apply.summary.files_modified, 0);
}

#[test]
fn strict_mode_blocks_before_writing() {
    let temp = TempDir::new().expect("temp dir");
    let (_, mut settings) = setup(&temp);
    settings.strict = true;

    let err = run_plan(&settings, tool()).err().expect("policy block");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("Journey/field"));
    assert_eq!(fs::read_to_string(&settings.input).expect("read"), SCHEMA);
}

#[test]
fn plan_then_apply_round_trip() {
    let temp = TempDir::new().expect("temp dir");
    let (root, settings) = setup(&temp);
    let out_dir = root.join("artifacts");

    let plan = run_plan(&settings, tool()).expect("plan");
    write_plan_artifacts(&out_dir, &plan).expect("write plan");
    assert!(out_dir.join("plan.md").exists());
    assert!(out_dir.join("patch.diff").exists());

    let dry = run_apply(&out_dir.join("plan.json"), tool(), false).expect("dry apply");
    assert!(!dry.policy_block);
    assert!(!dry.apply.written);
    assert_eq!(fs::read_to_string(&settings.input).expect("read"), SCHEMA);

    let applied = run_apply(&out_dir.join("plan.json"), tool(), true).expect("apply");
    write_apply_artifacts(&out_dir, &applied).expect("write apply");
    assert!(applied.apply.written);
    assert!(applied.apply.plan_ref.is_some());
    assert!(out_dir.join("apply.json").exists());
    assert_eq!(applied.patch, plan.patch);

    // The schema changed, so the old plan no longer applies.
    let stale = run_apply(&out_dir.join("plan.json"), tool(), true).expect("stale apply");
    assert!(stale.policy_block);
    assert!(!stale.apply.written);
}

#[test]
fn missing_schema_is_an_internal_error() {
    let temp = TempDir::new().expect("temp dir");
    let (root, mut settings) = setup(&temp);
    settings.input = root.join("missing.prisma");

    let err = run_plan(&settings, tool()).err().expect("error");
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("missing.prisma"));
}

#[test]
fn unbalanced_schema_is_an_internal_error() {
    let temp = TempDir::new().expect("temp dir");
    let (_, settings) = setup(&temp);
    fs::write(&settings.input, "model Segment {\n  id String @id\n").expect("write");

    let err = run_plan(&settings, tool()).err().expect("error");
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("parse schema"));
}

#[test]
fn inspect_reports_presence_and_migration_state() {
    let temp = TempDir::new().expect("temp dir");
    let (_, settings) = setup(&temp);

    let before = inspect_models(&settings).expect("inspect");
    assert_eq!(before.len(), 2);
    assert!(before[0].present);
    assert_eq!(before[0].line, Some(5));
    assert!(!before[0].migrated);
    assert!(!before[1].present);
    assert_eq!(before[1].line, None);

    let planned = run_plan(&settings, tool()).expect("plan");
    commit_migration(&planned, tool()).expect("commit");
    let after = inspect_models(&settings).expect("inspect");
    assert!(after[0].migrated);
}
