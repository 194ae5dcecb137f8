//! Configuration file support for l2ppmgrd
//!
//! Loads and validates daemon configuration from TOML files.
//! Default location: /etc/nsc/l2ppmgrd.conf

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nsc_cfgmgr_common::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nsc/l2ppmgrd.conf";

/// l2ppmgrd configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2ppMgrConfig {
    /// Topology snapshot with hosts, placements, overlays and services
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Services rendered concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Interval between reconciliation passes in milliseconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_ms: u64,

    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where rendered service status is written as JSON, if anywhere
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/etc/nsc/topology.toml")
}

fn default_workers() -> usize {
    4
}

fn default_reconcile_interval() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for L2ppMgrConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            workers: default_workers(),
            reconcile_interval_ms: default_reconcile_interval(),
            log_level: default_log_level(),
            output_path: None,
        }
    }
}

impl L2ppMgrConfig {
    /// Load configuration from `path`, using defaults if the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();

        let config: Self = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                RenderError::config(
                    "config",
                    format!("Failed to parse config file {}: {}", path.display(), e),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(RenderError::Io(e)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load() -> RenderResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.workers == 0 {
            return Err(RenderError::config("workers", "must be at least 1"));
        }
        if self.reconcile_interval_ms == 0 {
            return Err(RenderError::config("reconcile_interval_ms", "must be greater than 0"));
        }
        if self.log_level.trim().is_empty() {
            return Err(RenderError::config("log_level", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = L2ppMgrConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.reconcile_interval(), Duration::from_secs(1));
        assert!(config.output_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_workers() {
        let config = L2ppMgrConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RenderError::Config { ref field, .. }) if field == "workers"
        ));
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let config: L2ppMgrConfig = toml::from_str(
            r#"
snapshot_path = "/tmp/topo.json"
workers = 2
"#,
        )
        .unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/topo.json"));
        assert_eq!(config.workers, 2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reconcile_interval_ms = 250").unwrap();
        writeln!(file, "output_path = \"/tmp/l2pp-status.json\"").unwrap();

        let config = L2ppMgrConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.reconcile_interval_ms, 250);
        assert_eq!(config.output_path, Some(PathBuf::from("/tmp/l2pp-status.json")));
    }

    #[test]
    fn test_load_invalid_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = 0").unwrap();
        assert!(L2ppMgrConfig::load_or_default(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = [").unwrap();
        let err = L2ppMgrConfig::load_or_default(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = L2ppMgrConfig::load_or_default("/nonexistent/l2ppmgrd.conf").unwrap();
        assert_eq!(config, L2ppMgrConfig::default());
    }
}
