//! Shared DTOs (schemas-as-code) for the tenantfix workspace.
//!
//! # Design constraints
//! - Plan and apply types are serialized to disk and read back by `apply`.
//! - Prefer adding optional fields over changing semantics.

pub mod apply;
pub mod ops;
pub mod plan;
pub mod tool;

/// Schema identifiers.
pub mod schema {
    pub const TENANTFIX_PLAN_V1: &str = "tenantfix.plan.v1";
    pub const TENANTFIX_APPLY_V1: &str = "tenantfix.apply.v1";
}
