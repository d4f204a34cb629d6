//! Configuration management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use crate::application::errors::ConfigError;

/// Destination the media processors listen to
pub const DEFAULT_DESTINATION: &str = "adaptive_media/processor";

/// Service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub bus: BusConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatcherConfig {
    /// Destination every deferred message is sent to
    pub destination: String,
    /// What to do when a call arrives outside any transaction
    pub no_transaction: NoTransactionPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            no_transaction: NoTransactionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BusConfig {
    /// Destinations declared on startup, besides the dispatcher's own
    pub destinations: Vec<String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            destinations: vec![DEFAULT_DESTINATION.to_string()],
        }
    }
}

/// Behaviour of a dispatch call made without an active transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoTransactionPolicy {
    /// Fail the call with `NoActiveTransaction`
    #[default]
    Reject,
    /// Send the message right away
    Immediate,
}

impl fmt::Display for NoTransactionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoTransactionPolicy::Reject => f.write_str("reject"),
            NoTransactionPolicy::Immediate => f.write_str("immediate"),
        }
    }
}

impl FromStr for NoTransactionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(NoTransactionPolicy::Reject),
            "immediate" => Ok(NoTransactionPolicy::Immediate),
            other => Err(ConfigError::InvalidValue(format!("no-transaction policy: {}", other))),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        Config::default().apply_env()
    }

    /// Override fields from MEDIA_DISPATCH_* environment variables
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(destination) = lookup("MEDIA_DISPATCH_DESTINATION") {
            if destination.trim().is_empty() {
                tracing::warn!("Ignoring empty MEDIA_DISPATCH_DESTINATION");
            } else {
                self.dispatcher.destination = destination;
            }
        }

        if let Some(policy) = lookup("MEDIA_DISPATCH_NO_TRANSACTION") {
            match policy.parse() {
                Ok(policy) => self.dispatcher.no_transaction = policy,
                Err(e) => tracing::warn!("Ignoring MEDIA_DISPATCH_NO_TRANSACTION: {}", e),
            }
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.destination.trim().is_empty() {
            return Err(ConfigError::MissingField("dispatcher.destination".to_string()));
        }
        if let Some(blank) = self.bus.destinations.iter().position(|d| d.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!("bus.destinations[{}] is empty", blank)));
        }
        Ok(())
    }

    /// Destinations to declare on the bus, the dispatcher's included
    pub fn all_destinations(&self) -> Vec<String> {
        let mut all = self.bus.destinations.clone();
        if !all.contains(&self.dispatcher.destination) {
            all.push(self.dispatcher.destination.clone());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("dispatcher:\n  no-transaction: immediate\n").unwrap();

        assert_eq!(config.dispatcher.no_transaction, NoTransactionPolicy::Immediate);
        assert_eq!(config.dispatcher.destination, DEFAULT_DESTINATION);
        assert_eq!(config.bus, BusConfig::default());
    }

    #[test]
    fn test_empty_destination_is_rejected() {
        let result = Config::from_yaml("dispatcher:\n  destination: \"\"\n");
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let result = Config::from_yaml("dispatcher:\n  no-transaction: sometimes\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        assert!("later".parse::<NoTransactionPolicy>().is_err());
    }

    #[test]
    fn test_dispatcher_destination_is_always_declared() {
        let mut config = Config::default();
        config.dispatcher.destination = "custom/queue".to_string();

        let all = config.all_destinations();
        assert!(all.contains(&DEFAULT_DESTINATION.to_string()));
        assert!(all.contains(&"custom/queue".to_string()));
        assert_eq!(Config::default().all_destinations().len(), 1);
    }

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("no-transaction: reject"));
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.dispatcher, DispatcherConfig::default());
    }

    #[test]
    fn test_env_overrides_apply_on_top_of_file() {
        let config = Config::from_yaml("dispatcher:\n  destination: from/file\n")
            .unwrap()
            .apply_overrides(env(&[("MEDIA_DISPATCH_NO_TRANSACTION", "immediate")]));

        assert_eq!(config.dispatcher.destination, "from/file");
        assert_eq!(config.dispatcher.no_transaction, NoTransactionPolicy::Immediate);

        let config = config.apply_overrides(env(&[("MEDIA_DISPATCH_DESTINATION", "from/env")]));
        assert_eq!(config.dispatcher.destination, "from/env");
    }

    #[test]
    fn test_invalid_env_overrides_are_ignored() {
        let config = Config::default().apply_overrides(env(&[
            ("MEDIA_DISPATCH_DESTINATION", "  "),
            ("MEDIA_DISPATCH_NO_TRANSACTION", "sometimes"),
        ]));

        assert_eq!(config.dispatcher, DispatcherConfig::default());
    }
}
