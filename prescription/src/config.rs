//! Configuration management for the prescription contract.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Invalid values fall back to the default rather than failing.

use crate::codec::NumericArgs;
use serde::{Deserialize, Serialize};
use std::env;

/// Default prescription validity, in calendar months.
pub const DEFAULT_VALIDITY_MONTHS: u32 = 6;

/// Contract configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Calendar months between issue and expiry (`RXLEDGER_VALIDITY_MONTHS`, default 6)
    pub validity_months: u32,
    /// Reject unparseable numeric arguments instead of treating them as zero
    /// (`RXLEDGER_STRICT_NUMERIC_ARGS`, default `false`)
    pub strict_numeric_args: bool,
    /// Log filter (trace, debug, info, warn, error) (`RUST_LOG`, default `info`)
    pub log_level: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            validity_months: DEFAULT_VALIDITY_MONTHS,
            strict_numeric_args: false,
            log_level: "info".to_string(),
        }
    }
}

impl ContractConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            validity_months: lookup("RXLEDGER_VALIDITY_MONTHS")
                .and_then(|s| s.parse().ok())
                .filter(|months| *months > 0)
                .unwrap_or(defaults.validity_months),
            strict_numeric_args: lookup("RXLEDGER_STRICT_NUMERIC_ARGS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strict_numeric_args),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Numeric argument handling selected by this configuration
    #[must_use]
    pub const fn numeric_args(&self) -> NumericArgs {
        if self.strict_numeric_args {
            NumericArgs::Strict
        } else {
            NumericArgs::Lenient
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ContractConfig::from_lookup(|_| None);
        assert_eq!(config, ContractConfig::default());
        assert_eq!(config.validity_months, 6);
        assert_eq!(config.numeric_args(), NumericArgs::Lenient);
    }

    #[test]
    fn reads_overrides() {
        let config = ContractConfig::from_lookup(lookup_from(&[
            ("RXLEDGER_VALIDITY_MONTHS", "12"),
            ("RXLEDGER_STRICT_NUMERIC_ARGS", "true"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.validity_months, 12);
        assert_eq!(config.numeric_args(), NumericArgs::Strict);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ContractConfig::from_lookup(lookup_from(&[
            ("RXLEDGER_VALIDITY_MONTHS", "0"),
            ("RXLEDGER_STRICT_NUMERIC_ARGS", "sometimes"),
        ]));
        assert_eq!(config.validity_months, DEFAULT_VALIDITY_MONTHS);
        assert!(!config.strict_numeric_args);
    }
}
