//! Runtime configuration for roster hosts.
//!
//! # Responsibility
//! - Collect database, logging and actor settings in one place.
//! - Overlay environment variables on top of defaults.
//!
//! # Invariants
//! - `system_actor` is never blank after `from_env`.
//! - Blank environment values are ignored, never applied.

use crate::context::{Actor, DEFAULT_SYSTEM_ACTOR};
use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "ROSTER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "ROSTER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ROSTER_LOG_DIR";
pub const ENV_SYSTEM_ACTOR: &str = "ROSTER_SYSTEM_ACTOR";

const DEFAULT_DB_FILE_NAME: &str = "roster.sqlite3";

/// Host configuration for opening the store and wiring the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Actor recorded when a caller supplies no identity.
    pub system_actor: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            system_actor: DEFAULT_SYSTEM_ACTOR.to_string(),
        }
    }
}

impl RosterConfig {
    /// Builds config from defaults overlaid with `ROSTER_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = non_blank(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = non_blank(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(actor) = non_blank(ENV_SYSTEM_ACTOR) {
            config.system_actor = actor;
        }
        config
    }

    /// Resolves the configured system actor, falling back to the default.
    pub fn system_actor(&self) -> Actor {
        Actor::new(self.system_actor.as_str()).unwrap_or_else(Actor::system)
    }
}
