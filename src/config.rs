//! Registry configuration.
//!
//! Options can be built in code, read from environment variables, or (with the
//! `config` feature) deserialized from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Default environment variable prefix used by [`RegistryOptions::from_env`].
pub const ENV_PREFIX: &str = "SHARED_SERVICES";

const DEFAULT_MAX_INSTANTIATION_DEPTH: usize = 1024;

/// Behavior knobs for a [`ServiceRegistry`](crate::ServiceRegistry).
///
/// # Examples
///
/// ```
/// use shared_services::{RegistryOptions, ServiceRegistry};
///
/// let options = RegistryOptions::default()
///     .finalize_on_drop(true)
///     .max_instantiation_depth(64);
///
/// let registry = ServiceRegistry::with_options(options);
/// assert!(registry.options().finalize_on_drop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RegistryOptions {
    /// Run `finalize_all` when the last registry handle is dropped. A factory
    /// that captures a registry clone keeps the registry alive, so such
    /// registries need an explicit `finalize_all`.
    pub finalize_on_drop: bool,
    /// Limit on nested service creation through factories
    pub max_instantiation_depth: usize,
    /// Log a warning when a registry is dropped with unfinalized services
    pub warn_on_unfinalized: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            finalize_on_drop: false,
            max_instantiation_depth: DEFAULT_MAX_INSTANTIATION_DEPTH,
            warn_on_unfinalized: true,
        }
    }
}

impl RegistryOptions {
    pub fn finalize_on_drop(mut self, enabled: bool) -> Self {
        self.finalize_on_drop = enabled;
        self
    }

    pub fn max_instantiation_depth(mut self, depth: usize) -> Self {
        self.max_instantiation_depth = depth;
        self
    }

    pub fn warn_on_unfinalized(mut self, enabled: bool) -> Self {
        self.warn_on_unfinalized = enabled;
        self
    }

    /// Reads options from `SHARED_SERVICES_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Reads options from `{PREFIX}_FINALIZE_ON_DROP`,
    /// `{PREFIX}_MAX_INSTANTIATION_DEPTH` and `{PREFIX}_WARN_ON_UNFINALIZED`.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        let prefix = prefix.to_uppercase();
        let mut options = Self::default();

        if let Some(value) = read_var(&prefix, "FINALIZE_ON_DROP") {
            options.finalize_on_drop = parse_bool(&value)?;
        }
        if let Some(value) = read_var(&prefix, "MAX_INSTANTIATION_DEPTH") {
            options.max_instantiation_depth = parse_number(&value)?;
        }
        if let Some(value) = read_var(&prefix, "WARN_ON_UNFINALIZED") {
            options.warn_on_unfinalized = parse_bool(&value)?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Parses options from a JSON document. Missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| DiError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.max_instantiation_depth == 0 {
            return Err(DiError::Config(
                "max_instantiation_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_var(prefix: &str, key: &str) -> Option<String> {
    env::var(format!("{}_{}", prefix, key)).ok()
}

fn parse_bool(value: &str) -> DiResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DiError::Config(format!("invalid boolean: {}", other))),
    }
}

fn parse_number<T: FromStr>(value: &str) -> DiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DiError::Config(format!("invalid number: {}", value)))
}
