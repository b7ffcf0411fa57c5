// crates/stackcheck-config/src/config.rs
// ============================================================================
// Module: Stackcheck Configuration
// Description: Configuration loading and validation for the condition engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: stackcheck-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; an empty file yields the engine defaults.
//! Values outside the engine's hard ceilings are rejected rather than clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use stackcheck_core::ConditionAuditSink;
use stackcheck_core::EngineLimits;
use stackcheck_core::FileAuditSink;
use stackcheck_core::NoopAuditSink;
use stackcheck_core::StderrAuditSink;
use stackcheck_core::limits::DEFAULT_MAX_EXPRESSION_DEPTH;
use stackcheck_core::limits::DEFAULT_MAX_SCENARIOS;
use stackcheck_core::limits::DEFAULT_MAX_TREE_DEPTH;
use stackcheck_core::limits::DEFAULT_MAX_VARIABLES;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "stackcheck.toml";
/// Environment variable consulted when no explicit path is given.
pub(crate) const CONFIG_ENV_VAR: &str = "STACKCHECK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a whole path.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Top-level `stackcheck.toml` model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StackcheckConfig {
    /// Enumeration and traversal limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Audit event sink.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl StackcheckConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then `STACKCHECK_CONFIG`, then
    /// `stackcheck.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the engine limits described by this configuration.
    #[must_use]
    pub const fn engine_limits(&self) -> EngineLimits {
        self.limits.to_engine_limits()
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a file sink has no path, or
    /// [`ConfigError::Io`] when the audit log cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn ConditionAuditSink>, ConfigError> {
        self.audit.build_sink()
    }
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Enumeration and traversal limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Variables enumerated exhaustively before the rest are left unconstrained.
    #[serde(default = "default_max_variables")]
    pub max_variables: usize,
    /// Maximum scenarios returned by one enumeration.
    #[serde(default = "default_max_scenarios")]
    pub max_scenarios: usize,
    /// Maximum nesting depth of a condition definition.
    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,
    /// Maximum depth walked inside a document subtree.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_variables: default_max_variables(),
            max_scenarios: default_max_scenarios(),
            max_expression_depth: default_max_expression_depth(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

impl LimitsConfig {
    /// Validates every limit against the engine ceilings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.to_engine_limits()
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("limits.{err}")))
    }

    /// Converts to the engine representation.
    const fn to_engine_limits(self) -> EngineLimits {
        EngineLimits {
            max_variables: self.max_variables,
            max_scenarios: self.max_scenarios,
            max_expression_depth: self.max_expression_depth,
            max_tree_depth: self.max_tree_depth,
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Where audit events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
}

/// Audit event sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving engine events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines); required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink = \"file\" requires audit.path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::None | AuditSinkKind::Stderr, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid with audit.sink = \"file\"".to_string(),
            )),
            (AuditSinkKind::None | AuditSinkKind::Stderr, None) => Ok(()),
        }
    }

    /// Opens the configured sink.
    fn build_sink(&self) -> Result<Arc<dyn ConditionAuditSink>, ConfigError> {
        match self.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::File => {
                let path = self.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("audit.sink = \"file\" requires audit.path".to_string())
                })?;
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from explicit input, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default exhaustively enumerated variable count.
const fn default_max_variables() -> usize {
    DEFAULT_MAX_VARIABLES
}

/// Default scenario ceiling.
const fn default_max_scenarios() -> usize {
    DEFAULT_MAX_SCENARIOS
}

/// Default condition nesting depth.
const fn default_max_expression_depth() -> usize {
    DEFAULT_MAX_EXPRESSION_DEPTH
}

/// Default document walk depth.
const fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_TREE_DEPTH
}
