//! Interpreter configuration

use crate::error::{Error, Result};

/// Environment variable holding the stack slot limit
pub const ENV_MAX_STACK: &str = "LITSTACK_MAX_STACK";
/// Environment variable toggling constant folding (`0`/`false` disables it)
pub const ENV_FOLD: &str = "LITSTACK_FOLD";
/// Environment variable enabling per-instruction trace logging
pub const ENV_TRACE: &str = "LITSTACK_TRACE";

/// Analysis configuration, built with `Config::default().with_*(..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum operand stack depth in slots. `None` means unbounded.
    pub max_stack: Option<usize>,
    /// Fold arithmetic, comparisons and conversions over known literals.
    pub fold_constants: bool,
    /// Log every executed instruction with the resulting stack at trace level.
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_stack: None,
            fold_constants: true,
            trace: false,
        }
    }
}

impl Config {
    pub fn with_max_stack(mut self, limit: usize) -> Self {
        self.max_stack = Some(limit);
        self
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.fold_constants = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Build a configuration from `LITSTACK_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_STACK) {
            let limit = raw.trim().parse::<usize>().map_err(|_| {
                Error::malformed(format!("{} must be a slot count, got '{}'", ENV_MAX_STACK, raw))
            })?;
            config = config.with_max_stack(limit);
        }
        if let Some(raw) = lookup(ENV_FOLD) {
            config = config.with_constant_folding(parse_flag(&raw));
        }
        if let Some(raw) = lookup(ENV_TRACE) {
            config = config.with_trace(parse_flag(&raw));
        }
        Ok(config)
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_folds_without_limit() {
        let config = Config::default();
        assert_eq!(config.max_stack, None);
        assert!(config.fold_constants);
        assert!(!config.trace);
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::default()
            .with_max_stack(4)
            .with_constant_folding(false)
            .with_trace(true);
        assert_eq!(config.max_stack, Some(4));
        assert!(!config.fold_constants);
        assert!(config.trace);
    }

    #[test]
    fn test_env_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_MAX_STACK, "16"),
            (ENV_FOLD, "off"),
            (ENV_TRACE, "1"),
        ]))
        .unwrap();
        assert_eq!(config.max_stack, Some(16));
        assert!(!config.fold_constants);
        assert!(config.trace);
    }

    #[test]
    fn test_env_rejects_bad_limit() {
        let err = Config::from_lookup(lookup_from(&[(ENV_MAX_STACK, "lots")])).unwrap_err();
        assert!(matches!(err, Error::MalformedInstruction { .. }));
    }
}
