//! Run configuration
//!
//! Settings that shape a run without changing the program: random bug
//! injection, the politeness check, the system library and the random
//! seed. A configuration can be built in code or read from TOML.
//!
//! # Example
//!
//! ```rust,ignore
//! use cringe::RunConfig;
//!
//! let config = RunConfig::new()
//!     .with_random_bugs(false)
//!     .with_seed(Some(7));
//! ```
//!
//! ```toml
//! random_bugs = false
//! min_politeness_percent = 25
//! seed = 7
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Inject E774 with probability 1/256 per statement
    pub random_bugs: bool,
    /// Reject programs that are too rude or too polite
    pub politeness: bool,
    pub min_politeness_percent: u32,
    pub max_politeness_percent: u32,
    /// Link the system library
    pub syslib: bool,
    /// Seed for percent gates, bug injection and the system library's
    /// random routines
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            random_bugs: true,
            politeness: true,
            min_politeness_percent: 20,
            max_politeness_percent: 34,
            syslib: true,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse run config: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    pub fn with_random_bugs(mut self, enabled: bool) -> Self {
        self.random_bugs = enabled;
        self
    }

    pub fn with_politeness(mut self, enabled: bool) -> Self {
        self.politeness = enabled;
        self
    }

    pub fn with_politeness_range(mut self, min: u32, max: u32) -> Self {
        self.min_politeness_percent = min;
        self.max_politeness_percent = max;
        self
    }

    pub fn with_syslib(mut self, enabled: bool) -> Self {
        self.syslib = enabled;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert!(config.random_bugs);
        assert!(config.politeness);
        assert_eq!(config.min_politeness_percent, 20);
        assert_eq!(config.max_politeness_percent, 34);
        assert!(config.syslib);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml("random_bugs = false\nseed = 7\n").unwrap();
        assert!(!config.random_bugs);
        assert_eq!(config.seed, Some(7));
        assert!(config.politeness);
        assert_eq!(config.max_politeness_percent, 34);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RunConfig::from_toml("politness = false").unwrap_err();
        assert!(err.contains("Failed to parse run config"));
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new()
            .with_random_bugs(false)
            .with_politeness(false)
            .with_politeness_range(10, 50)
            .with_syslib(false)
            .with_seed(Some(3));
        assert!(!config.random_bugs);
        assert!(!config.politeness);
        assert_eq!(
            (config.min_politeness_percent, config.max_politeness_percent),
            (10, 50)
        );
        assert!(!config.syslib);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cringe.toml");
        fs::write(&path, "syslib = false\n").unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert!(!config.syslib);

        let missing = RunConfig::load(&dir.path().join("absent.toml"));
        assert!(missing.is_err());
    }
}
