//! Engine configuration

use crate::error::{CpgFlowError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted timeout (one day)
pub const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Settings shared by every fixpoint run of an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Wall-clock budget of a single fixpoint computation. `Some(0)` aborts
    /// immediately; `None` runs until convergence.
    pub timeout_ms: Option<u64>,
    /// Analyse callees before their callers
    pub order_dependencies: bool,
    /// Record iteration counters into a `Measurements` context
    pub record_measurements: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            order_dependencies: true,
            record_measurements: false,
        }
    }
}

impl FlowConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CpgFlowError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Rejects timeouts above [`MAX_TIMEOUT_MS`]
    pub fn validate(&self) -> Result<()> {
        match self.timeout_ms {
            Some(ms) if ms > MAX_TIMEOUT_MS => Err(CpgFlowError::InvalidConfig(format!(
                "timeout_ms must not exceed {MAX_TIMEOUT_MS}, got {ms}"
            ))),
            _ => Ok(()),
        }
    }

    /// The timeout as a `Duration`
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.timeout(), None);
        assert!(config.order_dependencies);
        assert!(!config.record_measurements);
        assert_eq!(FlowConfig::from_json_str("{}").unwrap(), config);
    }

    #[test]
    fn test_zero_timeout_is_valid() {
        let config = FlowConfig::from_json_str(r#"{"timeout_ms": 0}"#).unwrap();
        assert_eq!(config.timeout(), Some(Duration::ZERO));
    }

    #[test]
    fn test_rejects_bad_input() {
        let too_long = format!(r#"{{"timeout_ms": {}}}"#, MAX_TIMEOUT_MS + 1);
        assert!(matches!(
            FlowConfig::from_json_str(&too_long),
            Err(CpgFlowError::InvalidConfig(_))
        ));
        assert!(matches!(
            FlowConfig::from_json_str(r#"{"timeout": 5}"#),
            Err(CpgFlowError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_ms": 250, "record_measurements": true}}"#).unwrap();

        let config = FlowConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert!(config.record_measurements);
        assert!(config.order_dependencies);

        let missing = FlowConfig::from_file(Path::new("/nonexistent/cpgflow.json"));
        assert!(matches!(missing, Err(CpgFlowError::ConfigIo { .. })));
    }
}
