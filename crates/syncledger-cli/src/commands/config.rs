use std::path::Path;

use anyhow::{Context, Result};
use syncledger_tracker::config::{parser, validator};

/// Execute the `config` command: parse, validate, and print a tracker config.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = parser::parse_config(config_path)
        .with_context(|| format!("Failed to parse tracker config: {}", config_path.display()))?;
    validator::validate_config(&config)?;

    println!("max_pending_state_bytes: {}", config.max_pending_state_bytes);
    println!("commit_tracking_enabled: {}", config.commit_tracking_enabled);
    println!("log_checkpoints:         {}", config.log_checkpoints);
    println!("\nConfig is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_pending_state_bytes: 4096").unwrap();
        assert!(execute(file.path()).is_ok());
    }

    #[test]
    fn rejects_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_pending_bytes: 4096").unwrap();
        assert!(execute(file.path()).is_err());
    }
}
