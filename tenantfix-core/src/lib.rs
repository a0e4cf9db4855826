//! Embeddable core library for tenantfix.
//!
//! Provides clap-free entry points; the CLI only parses arguments, merges
//! configuration into [`MigrationSettings`](settings::MigrationSettings) and
//! prints.
//!
//! # Entry points
//!
//! - [`run_plan`](pipeline::run_plan) - read once, compute a plan and patch preview
//! - [`commit_migration`](pipeline::commit_migration) - write that plan's rewrite
//! - [`run_apply`](pipeline::run_apply) - apply a previously written plan
//! - [`inspect_models`](pipeline::inspect_models) - which targets exist

pub mod pipeline;
pub mod planner;
pub mod settings;

pub use pipeline::ToolError;
