//! Binary-level tests: exit codes, console output and written files.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = "\
model Segment {
  id          String @id
  createdById String

  // Relations
  createdBy   User   @relation(fields: [createdById], references: [id])
  members     SegmentMember[]
}
";

fn tenantfix() -> Command {
    Command::cargo_bin("tenantfix").expect("tenantfix binary")
}

fn create_temp_project() -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(td.path().join("prisma")).unwrap();
    fs::write(td.path().join("prisma").join("schema.prisma"), SCHEMA).unwrap();
    td
}

fn read_schema(root: &Path) -> String {
    fs::read_to_string(root.join("prisma").join("schema.prisma")).unwrap()
}

#[test]
fn test_no_args_runs_migration() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing 19 models..."))
        .stdout(predicate::str::contains("  Adding organizationId to Segment\n"))
        .stdout(predicate::str::contains(
            "  Adding organizationId to Journey (skipped: model not found)",
        ))
        .stdout(predicate::str::contains(
            "  Adding organizationId to ContactJourney (skipped: model not found)\n\
             Writing updated schema...\n\
             Schema update complete!\n\
             \n\
             Next steps:\n\
             1. Run: npx prisma db push\n",
        ))
        .stdout(predicate::str::starts_with(
            "Reading schema from prisma/schema.prisma\nProcessing 19 models...\n",
        ))
        .stdout(predicate::str::contains("Wrote").not());

    let written = read_schema(temp.path());
    assert!(written.contains("  organizationId  String?   // Made optional for safe migration\n"));
    assert!(written.contains("  @@index([organizationId])\n}"));
}

#[test]
fn test_dry_run_prints_patch() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["run", "--dry-run", "--model", "Segment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("diff --git a/prisma/schema.prisma"))
        .stdout(predicate::str::contains("+  @@index([organizationId])"))
        .stdout(predicate::str::contains("Schema update complete!").not());

    assert_eq!(read_schema(temp.path()), SCHEMA);
}

#[test]
fn test_second_run_is_a_no_op() {
    let temp = create_temp_project();
    tenantfix().current_dir(temp.path()).assert().success();
    let once = read_schema(temp.path());

    tenantfix()
        .current_dir(temp.path())
        .args(["--model", "Segment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(skipped: already present)"));
    assert_eq!(read_schema(temp.path()), once);
}

#[test]
fn test_missing_schema_exits_1() {
    let temp = tempfile::tempdir().expect("tempdir");

    tenantfix()
        .current_dir(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("schema.prisma"));
}

#[test]
fn test_unbalanced_schema_exits_1_and_writes_nothing() {
    let temp = create_temp_project();
    let broken = "model Segment {\n  id String @id\n";
    fs::write(temp.path().join("prisma").join("schema.prisma"), broken).unwrap();

    tenantfix().current_dir(temp.path()).assert().code(1);
    assert_eq!(read_schema(temp.path()), broken);
}

#[test]
fn test_strict_exits_2() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["--strict"])
        .assert()
        .code(2);
    assert_eq!(read_schema(temp.path()), SCHEMA);
}

#[test]
fn test_plan_then_apply() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["plan", "--model", "Segment"])
        .assert()
        .success();
    let out = temp.path().join("artifacts").join("tenantfix");
    assert!(out.join("plan.json").exists());
    assert!(out.join("plan.md").exists());
    assert!(out.join("patch.diff").exists());

    tenantfix()
        .current_dir(temp.path())
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"));
    assert_eq!(read_schema(temp.path()), SCHEMA);

    tenantfix()
        .current_dir(temp.path())
        .args(["apply", "--apply"])
        .assert()
        .success();
    assert!(read_schema(temp.path()).contains("organizationId"));
    assert!(out.join("apply.json").exists());
}

#[test]
fn test_apply_after_edit_exits_2() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["plan", "--model", "Segment"])
        .assert()
        .success();

    let edited = format!("{}\nmodel Extra {{\n  id String @id\n}}\n", SCHEMA);
    fs::write(temp.path().join("prisma").join("schema.prisma"), &edited).unwrap();

    tenantfix()
        .current_dir(temp.path())
        .args(["apply", "--apply"])
        .assert()
        .code(2);
    assert_eq!(read_schema(temp.path()), edited);
}

#[test]
fn test_list_models_json() {
    let temp = create_temp_project();

    let output = tenantfix()
        .current_dir(temp.path())
        .args(["list-models", "--format", "json", "--model", "Segment", "--model", "Journey"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let items = value.as_array().expect("array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Segment");
    assert_eq!(items[0]["present"], true);
    assert_eq!(items[0]["line"], 1);
    assert_eq!(items[1]["present"], false);
}

#[test]
fn test_config_file_sets_schema_and_models() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("custom.prisma"), SCHEMA).unwrap();
    fs::write(
        temp.path().join("tenantfix.toml"),
        r#"
[schema]
path = "custom.prisma"
output = "migrated.prisma"

[migration]
models = ["Segment"]
next_steps = []
"#,
    )
    .unwrap();

    tenantfix()
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing 1 models..."))
        .stdout(predicate::str::contains("Next steps:").not());

    assert_eq!(fs::read_to_string(temp.path().join("custom.prisma")).unwrap(), SCHEMA);
    let migrated = fs::read_to_string(temp.path().join("migrated.prisma")).unwrap();
    assert!(migrated.contains("organization    Organization?"));
}

#[test]
fn test_invalid_engine_rejected() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["--engine", "regex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_model_listed_twice_reports_twice() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["--model", "Segment", "--model", "Segment"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  Adding organizationId to Segment\n  Adding organizationId to Segment (skipped: already present)\n",
        ));
}

#[test]
fn test_apply_rejects_migration_flags() {
    let temp = create_temp_project();

    for flag in [
        &["apply", "--model", "Segment"][..],
        &["apply", "--schema", "other.prisma"][..],
        &["apply", "--dry-run"][..],
        &["apply", "--strict"][..],
    ] {
        tenantfix()
            .current_dir(temp.path())
            .args(flag)
            .assert()
            .failure()
            .stderr(predicate::str::contains("unexpected argument"));
    }
    assert_eq!(read_schema(temp.path()), SCHEMA);
}

#[test]
fn test_run_flags_before_subcommand_are_rejected() {
    let temp = create_temp_project();

    tenantfix()
        .current_dir(temp.path())
        .args(["--strict", "plan"])
        .assert()
        .failure();
    assert!(!temp.path().join("artifacts").exists());
    assert_eq!(read_schema(temp.path()), SCHEMA);
}
