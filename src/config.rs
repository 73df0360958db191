//! Interner configuration: retention policy and its environment override.

use crate::error::ConfigError;
use std::env::{self, VarError};

/// Environment variable selecting [`Retention::Pinned`] when true.
pub const SAFE_BUT_LEAKY_ENV: &str = "RC_INTERN_SAFE_BUT_LEAKY";

/// What happens to an entry once no handle refers to it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Retention {
    /// Remove and free the entry when its last handle drops.
    #[default]
    Reclaim,
    /// Keep every entry until the interner itself is dropped.
    Pinned,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InternerConfig {
    pub retention: Retention,
}

impl InternerConfig {
    pub fn new(retention: Retention) -> Self {
        Self { retention }
    }

    /// Read the configuration from `RC_INTERN_SAFE_BUT_LEAKY`.
    ///
    /// Unset or empty means the default; otherwise the value must be a
    /// boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = match env::var(SAFE_BUT_LEAKY_ENV) {
            Ok(v) => Some(v),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                return Err(ConfigError::NotUnicode {
                    var: SAFE_BUT_LEAKY_ENV,
                })
            }
        };
        let cfg = Self::from_leaky_value(raw.as_deref())?;
        tracing::debug!(retention = ?cfg.retention, "interner retention read from environment");
        Ok(cfg)
    }

    pub(crate) fn from_leaky_value(raw: Option<&str>) -> Result<Self, ConfigError> {
        let leaky = match raw {
            None | Some("") => false,
            Some(v) => parse_bool(v).ok_or_else(|| ConfigError::InvalidBool {
                var: SAFE_BUT_LEAKY_ENV,
                value: v.to_string(),
            })?,
        };
        let retention = if leaky {
            Retention::Pinned
        } else {
            Retention::Reclaim
        };
        Ok(Self { retention })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
