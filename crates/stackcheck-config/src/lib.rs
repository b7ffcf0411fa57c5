// crates/stackcheck-config/src/lib.rs
// ============================================================================
// Module: Stackcheck Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for stackcheck.toml semantics.
// Dependencies: stackcheck-core, serde, toml
// ============================================================================

//! ## Overview
//! `stackcheck-config` defines the configuration model for the condition
//! engine: enumeration and traversal limits plus the audit sink. Loading is
//! strict and fail-closed, and the result converts directly into
//! [`stackcheck_core::EngineLimits`] and a ready audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
