//! Configuration Module
//!
//! Construction parameters for an expiring dictionary, loadable from
//! environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DictError, Result};

/// Default maximum number of live entries
pub const DEFAULT_MAX_LEN: usize = 1000;

/// Default maximum entry age
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Default interval between periodic sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// == Expiration Policy ==
/// When expired entries are physically removed.
///
/// Every policy applies the same freshness check on reads; the policies only
/// differ in whether stale, never-accessed entries are also swept eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// Remove stale entries only when an access discovers them
    #[default]
    Lazy,
    /// Sweep the whole store before every mutation
    OnMutation,
    /// Sweep from a background task on a fixed interval
    Periodic(Duration),
}

// == Dict Config ==
/// Expiring dictionary configuration.
///
/// Values are immutable once a dictionary has been built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictConfig {
    /// Hard cap on live entries, must be at least 1
    pub max_len: usize,
    /// Entries at least this old are treated as absent
    pub max_age: Duration,
    /// Whether successful reads also count as a use for LRU eviction
    pub refresh_on_read: bool,
    /// Eager sweep mode
    pub expiration: ExpirationPolicy,
}

impl DictConfig {
    /// Creates a config with the given bounds and default policies.
    pub fn new(max_len: usize, max_age: Duration) -> Self {
        Self {
            max_len,
            max_age,
            refresh_on_read: false,
            expiration: ExpirationPolicy::Lazy,
        }
    }

    /// Creates a config with `max_age` given in (possibly fractional) seconds.
    ///
    /// Fails if `max_age_secs` is negative or not finite.
    pub fn from_secs_f64(max_len: usize, max_age_secs: f64) -> Result<Self> {
        let max_age = Duration::try_from_secs_f64(max_age_secs).map_err(|_| {
            DictError::Configuration(format!(
                "max_age must be a non-negative number of seconds, got {}",
                max_age_secs
            ))
        })?;
        let config = Self::new(max_len, max_age);
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables LRU refresh on successful reads.
    pub fn with_refresh_on_read(mut self, enabled: bool) -> Self {
        self.refresh_on_read = enabled;
        self
    }

    /// Sets the eager sweep mode.
    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }

    // == Validate ==
    /// Checks the construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.max_len < 1 {
            return Err(DictError::Configuration(format!(
                "max_len must be >= 1, got {}",
                self.max_len
            )));
        }
        if let ExpirationPolicy::Periodic(interval) = self.expiration {
            if interval.is_zero() {
                return Err(DictError::Configuration(
                    "periodic sweep interval must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Loads a config from environment variables.
    ///
    /// # Environment Variables
    /// - `EXPIRING_DICT_MAX_LEN` - Maximum live entries (default: 1000)
    /// - `EXPIRING_DICT_MAX_AGE` - Maximum age in seconds, fractional allowed (default: 300)
    /// - `EXPIRING_DICT_REFRESH_ON_READ` - `true`/`false` (default: false)
    /// - `EXPIRING_DICT_EXPIRATION` - `lazy`, `on_mutation` or `periodic` (default: lazy)
    /// - `EXPIRING_DICT_SWEEP_INTERVAL` - Periodic sweep interval in seconds (default: 1)
    ///
    /// Unparseable values fall back to their defaults. Values that parse but
    /// violate the construction invariants are reported as errors.
    pub fn from_env() -> Result<Self> {
        let max_len = env::var("EXPIRING_DICT_MAX_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_LEN);
        let max_age_secs = env::var("EXPIRING_DICT_MAX_AGE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_MAX_AGE.as_secs_f64());
        let refresh_on_read = env::var("EXPIRING_DICT_REFRESH_ON_READ")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);
        let sweep_interval = env::var("EXPIRING_DICT_SWEEP_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);
        let expiration = match env::var("EXPIRING_DICT_EXPIRATION").ok().as_deref() {
            Some("on_mutation") => ExpirationPolicy::OnMutation,
            Some("periodic") => ExpirationPolicy::Periodic(sweep_interval),
            _ => ExpirationPolicy::Lazy,
        };

        let config = Self::from_secs_f64(max_len, max_age_secs)?
            .with_refresh_on_read(refresh_on_read)
            .with_expiration(expiration);
        config.validate()?;
        Ok(config)
    }
}

impl Default for DictConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN, DEFAULT_MAX_AGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DictConfig::default();
        assert_eq!(config.max_len, 1000);
        assert_eq!(config.max_age, Duration::from_secs(300));
        assert!(!config.refresh_on_read);
        assert_eq!(config.expiration, ExpirationPolicy::Lazy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_max_len() {
        let config = DictConfig::new(0, Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(DictError::Configuration(_))));
    }

    #[test]
    fn test_config_rejects_negative_max_age() {
        let result = DictConfig::from_secs_f64(1, -1.0);
        assert!(matches!(result, Err(DictError::Configuration(_))));

        let result = DictConfig::from_secs_f64(1, f64::NAN);
        assert!(matches!(result, Err(DictError::Configuration(_))));
    }

    #[test]
    fn test_config_zero_max_age_is_valid() {
        let config = DictConfig::from_secs_f64(3, 0.0).unwrap();
        assert_eq!(config.max_age, Duration::ZERO);
    }

    #[test]
    fn test_config_rejects_zero_sweep_interval() {
        let config = DictConfig::default().with_expiration(ExpirationPolicy::Periodic(Duration::ZERO));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = DictConfig::new(10, Duration::from_millis(500))
            .with_refresh_on_read(true)
            .with_expiration(ExpirationPolicy::OnMutation);
        assert_eq!(config.max_len, 10);
        assert!(config.refresh_on_read);
        assert_eq!(config.expiration, ExpirationPolicy::OnMutation);
    }

    // Single test for every env var so parallel tests never race on them
    #[test]
    fn test_config_from_env() {
        env::remove_var("EXPIRING_DICT_MAX_LEN");
        env::remove_var("EXPIRING_DICT_MAX_AGE");
        env::remove_var("EXPIRING_DICT_REFRESH_ON_READ");
        env::remove_var("EXPIRING_DICT_EXPIRATION");
        env::remove_var("EXPIRING_DICT_SWEEP_INTERVAL");

        let config = DictConfig::from_env().unwrap();
        assert_eq!(config, DictConfig::default());

        env::set_var("EXPIRING_DICT_MAX_LEN", "42");
        env::set_var("EXPIRING_DICT_MAX_AGE", "1.5");
        env::set_var("EXPIRING_DICT_REFRESH_ON_READ", "true");
        env::set_var("EXPIRING_DICT_EXPIRATION", "periodic");
        env::set_var("EXPIRING_DICT_SWEEP_INTERVAL", "0.25");

        let config = DictConfig::from_env().unwrap();
        assert_eq!(config.max_len, 42);
        assert_eq!(config.max_age, Duration::from_millis(1500));
        assert!(config.refresh_on_read);
        assert_eq!(
            config.expiration,
            ExpirationPolicy::Periodic(Duration::from_millis(250))
        );

        env::set_var("EXPIRING_DICT_MAX_AGE", "-3");
        assert!(matches!(
            DictConfig::from_env(),
            Err(DictError::Configuration(_))
        ));

        env::set_var("EXPIRING_DICT_MAX_AGE", "1");
        env::set_var("EXPIRING_DICT_MAX_LEN", "0");
        assert!(matches!(
            DictConfig::from_env(),
            Err(DictError::Configuration(_))
        ));

        env::remove_var("EXPIRING_DICT_MAX_LEN");
        env::remove_var("EXPIRING_DICT_MAX_AGE");
        env::remove_var("EXPIRING_DICT_REFRESH_ON_READ");
        env::remove_var("EXPIRING_DICT_EXPIRATION");
        env::remove_var("EXPIRING_DICT_SWEEP_INTERVAL");
    }
}
