//! Tunables for account admission, report validation and the leaderboard

use shared::PING_INTERVAL_SECS;
use thiserror::Error;

/// All thresholds the tracker applies, in seconds unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// New accounts admitted per `creation_window` (count, not seconds)
    pub max_new_accounts: usize,
    /// Length of the rolling creation-rate window
    pub creation_window: f64,
    /// Largest delta a single report may contribute
    pub max_increment: f64,
    /// Allowed gap between the asserted delta and server-observed time
    pub drift_tolerance: f64,
    /// An account counts as online if it reported within this window
    pub online_window: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_new_accounts: 1,
            creation_window: 1.0,
            max_increment: PING_INTERVAL_SECS,
            drift_tolerance: 10.0,
            online_window: PING_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} must be positive and finite, got {value}")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: f64,
}

impl TrackerConfig {
    /// Checks that every limit is usable before the server starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_new_accounts == 0 {
            return Err(ConfigError {
                field: "max_new_accounts",
                value: 0.0,
            });
        }

        let windows = [
            ("creation_window", self.creation_window),
            ("max_increment", self.max_increment),
            ("drift_tolerance", self.drift_tolerance),
            ("online_window", self.online_window),
        ];

        for (field, value) in windows {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError { field, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_behavior() {
        let config = TrackerConfig::default();

        assert_eq!(config.max_new_accounts, 1);
        assert_eq!(config.creation_window, 1.0);
        assert_eq!(config.max_increment, 120.0);
        assert_eq!(config.drift_tolerance, 10.0);
        assert_eq!(config.online_window, 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_accounts() {
        let config = TrackerConfig {
            max_new_accounts: 0,
            ..TrackerConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "max_new_accounts");
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        let bad_values = vec![0.0, -1.0, f64::NAN, f64::INFINITY];

        for value in bad_values {
            let config = TrackerConfig {
                drift_tolerance: value,
                ..TrackerConfig::default()
            };

            let err = config.validate().unwrap_err();
            assert_eq!(err.field, "drift_tolerance");
            assert!(err.to_string().contains("drift_tolerance"));
        }
    }
}
