mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use std::process::ExitCode;
use tenantfix_core::pipeline::{
    commit_migration, inspect_models, precondition_block, run_apply, run_plan,
    write_apply_artifacts, write_plan_artifacts, ToolError,
};
use tenantfix_core::settings::MigrationSettings;
use tenantfix_render::progress_lines;
use tenantfix_types::ops::RewriteEngine;
use tenantfix_types::tool::ToolInfo;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUT_DIR: &str = "artifacts/tenantfix";

#[derive(Debug, Parser)]
#[command(
    name = "tenantfix",
    version,
    about = "Adds a tenant foreign key, relation and index to Prisma schema models.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Arguments of the default `run` command.
    #[command(flatten)]
    run: RunArgs,

    /// Defaults to `run`.
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate every target model and write the schema once.
    Run(RunArgs),
    /// Compute the migration and write plan artifacts without touching the schema.
    Plan(PlanArgs),
    /// Apply an existing plan (default: dry-run).
    Apply(ApplyArgs),
    /// List target models and whether the schema declares them.
    ListModels(ListModelsArgs),
}

/// Where the schema and the target list come from.
#[derive(Debug, Args)]
struct SourceArgs {
    /// Config file (default: ./tenantfix.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Schema to migrate (default: prisma/schema.prisma).
    #[arg(long)]
    schema: Option<Utf8PathBuf>,

    /// Target model; repeat to build the list. Replaces the configured list.
    #[arg(long = "model")]
    models: Vec<String>,
}

impl SourceArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            schema: self.schema.clone(),
            models: self.models.clone(),
            ..CliOverrides::default()
        }
    }
}

#[derive(Debug, Args)]
struct MigrationArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write the migrated schema here instead of in place.
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Rewrite engine.
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Insert declarations even if they already exist.
    #[arg(long, default_value_t = false)]
    no_guard: bool,

    /// Fail with exit code 2 if any pass would be skipped.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

impl MigrationArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            output: self.output.clone(),
            engine: self.engine.map(RewriteEngine::from),
            no_guard: self.no_guard,
            strict: self.strict,
            ..self.source.overrides()
        }
    }
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    migration: MigrationArgs,

    /// Print the patch instead of writing the schema.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    migration: MigrationArgs,

    /// Output directory for plan artifacts (default: artifacts/tenantfix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    /// Directory containing plan.json (default: artifacts/tenantfix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Apply changes to disk. If omitted, runs a dry-run and only emits artifacts.
    #[arg(long, default_value_t = false)]
    apply: bool,
}

#[derive(Debug, Args)]
struct ListModelsArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EngineArg {
    Structural,
    Pattern,
}

impl From<EngineArg> for RewriteEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Structural => RewriteEngine::Structural,
            EngineArg::Pattern => RewriteEngine::Pattern,
        }
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn real_main() -> Result<(), ToolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => {
            let settings = load_settings(
                args.migration.source.config.as_deref(),
                args.migration.overrides(),
            )?;
            cmd_run(&settings, args.dry_run)
        }
        Command::Plan(args) => {
            let settings = load_settings(
                args.migration.source.config.as_deref(),
                args.migration.overrides(),
            )?;
            cmd_plan(&settings, args.out_dir)
        }
        Command::Apply(args) => cmd_apply(args),
        Command::ListModels(args) => {
            let settings = load_settings(args.source.config.as_deref(), args.source.overrides())?;
            cmd_list_models(&settings, args.format)
        }
    }
}

fn load_settings(
    config_path: Option<&Utf8Path>,
    overrides: CliOverrides,
) -> anyhow::Result<MigrationSettings> {
    let file_config = config::load_or_default(config_path, Utf8Path::new("."))
        .context("load tenantfix.toml config")?;
    let settings = ConfigMerger::new(file_config).merge(&overrides);
    debug!(
        "merged config: input={}, models={}, engine={}, guard_existing={}, strict={}",
        settings.input,
        settings.models.len(),
        settings.engine,
        settings.guard_existing,
        settings.strict
    );
    Ok(settings)
}

fn cmd_run(settings: &MigrationSettings, dry_run: bool) -> Result<(), ToolError> {
    println!("Reading schema from {}", settings.input);
    let outcome = run_plan(settings, tool_info())?;

    println!("Processing {} models...", settings.models.len());
    for line in progress_lines(&outcome.plan) {
        println!("  {}", line);
    }

    if dry_run {
        print!("{}", outcome.patch);
        println!("Dry run: {} not written", settings.output_path());
        return Ok(());
    }

    println!("Writing updated schema...");
    commit_migration(&outcome, tool_info())?;

    println!("Schema update complete!");
    if !settings.next_steps.is_empty() {
        println!("\nNext steps:");
        for (i, step) in settings.next_steps.iter().enumerate() {
            println!("{}. {}", i + 1, step);
        }
    }
    Ok(())
}

fn cmd_plan(settings: &MigrationSettings, out_dir: Option<Utf8PathBuf>) -> Result<(), ToolError> {
    let out_dir = out_dir.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR));

    let outcome = run_plan(settings, tool_info())?;
    write_plan_artifacts(&out_dir, &outcome)?;

    println!(
        "Planned {} ops ({} blocked) for {} models; wrote {}",
        outcome.plan.summary.ops_total,
        outcome.plan.summary.ops_blocked,
        outcome.plan.summary.models_total,
        out_dir
    );
    Ok(())
}

fn cmd_apply(args: ApplyArgs) -> Result<(), ToolError> {
    let out_dir = args
        .out_dir
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR));

    let outcome = run_apply(&out_dir.join("plan.json"), tool_info(), args.apply)?;
    write_apply_artifacts(&out_dir, &outcome)?;

    if outcome.policy_block {
        return Err(precondition_block(
            &outcome.apply.files.input,
            "changed since the plan was written; run `tenantfix plan` again",
        ));
    }

    let mode = if args.apply { "applied" } else { "dry-run" };
    println!(
        "{}: {} of {} ops applied; wrote {}",
        mode, outcome.apply.summary.applied, outcome.apply.summary.attempted, out_dir
    );
    Ok(())
}

fn cmd_list_models(settings: &MigrationSettings, format: OutputFormat) -> Result<(), ToolError> {
    let models = inspect_models(settings)?;

    match format {
        OutputFormat::Text => {
            println!("Target models in {}:\n", settings.input);
            println!("  {:<28} {:<8} {:<6} MIGRATED", "MODEL", "PRESENT", "LINE");
            println!("  {:<28} {:<8} {:<6} --------", "-----", "-------", "----");
            for m in &models {
                let line = m.line.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<28} {:<8} {:<6} {}",
                    m.name,
                    if m.present { "yes" } else { "no" },
                    line,
                    if m.migrated { "yes" } else { "no" }
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&models).context("serialize json")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo::new("tenantfix", Some(env!("CARGO_PKG_VERSION").to_string()))
}
