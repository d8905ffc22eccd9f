//! Tracker config validation.

use anyhow::{bail, Result};

use crate::config::types::TrackerConfig;
use crate::memory::snapshot_cost;

/// Validate a parsed config.
///
/// # Errors
///
/// Returns an error describing every problem found.
pub fn validate_config(config: &TrackerConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.commit_tracking_enabled && config.max_pending_state_bytes < snapshot_cost(0) {
        errors.push(format!(
            "max_pending_state_bytes must be at least {} bytes to hold one checkpoint",
            snapshot_cost(0)
        ));
    }

    if !errors.is_empty() {
        bail!("Tracker config validation failed:\n  - {}", errors.join("\n  - "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&TrackerConfig::default()).is_ok());
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let config = TrackerConfig {
            max_pending_state_bytes: 0,
            ..TrackerConfig::default()
        };
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("max_pending_state_bytes"));
    }

    #[test]
    fn zero_ceiling_allowed_when_tracking_disabled() {
        let config = TrackerConfig {
            max_pending_state_bytes: 0,
            commit_tracking_enabled: false,
            log_checkpoints: false,
        };
        assert!(validate_config(&config).is_ok());
    }
}
