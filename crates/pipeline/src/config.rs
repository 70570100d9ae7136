// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! reuse_margin = "1K"
//! abort_on_error = false
//! max_input_blocks = 64
//! ```

use buffer_pool::ReuseMargin;
use std::path::Path;

/// Configuration for a processing chain.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Slack tolerated when reusing pooled blocks (human-readable, e.g. `"1K"`).
    #[serde(default = "default_margin")]
    pub reuse_margin: String,
    /// Stop processing an event at the first failing stage.
    #[serde(default)]
    pub abort_on_error: bool,
    /// Blocks a stage may take from one parent per event, unless the
    /// component sets its own limit.
    #[serde(default = "default_max_input_blocks")]
    pub max_input_blocks: usize,
}

fn default_margin() -> String {
    "1K".to_string()
}

fn default_max_input_blocks() -> usize {
    64
}

impl PipelineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::PipelineError::Config(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::PipelineError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| super::PipelineError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::PipelineError> {
        toml::to_string_pretty(self).map_err(|e| {
            super::PipelineError::Config(format!("TOML serialise error: {e}"))
        })
    }

    /// Parses the reuse margin string into a [`ReuseMargin`].
    pub fn parse_margin(&self) -> Result<ReuseMargin, super::PipelineError> {
        ReuseMargin::parse(&self.reuse_margin)
            .map_err(|e| super::PipelineError::Config(format!("invalid reuse margin: {e}")))
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<(), super::PipelineError> {
        self.parse_margin()?;
        if self.max_input_blocks == 0 {
            return Err(super::PipelineError::Config(
                "max_input_blocks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reuse_margin: default_margin(),
            abort_on_error: false,
            max_input_blocks: default_max_input_blocks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = PipelineConfig::default();
        assert_eq!(c.reuse_margin, "1K");
        assert!(!c.abort_on_error);
        assert_eq!(c.max_input_blocks, 64);
        assert_eq!(c.parse_margin().unwrap(), ReuseMargin::DEFAULT);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
reuse_margin = "64"
abort_on_error = true
max_input_blocks = 8
"#;
        let c = PipelineConfig::from_toml(toml).unwrap();
        assert_eq!(c.parse_margin().unwrap().as_bytes(), 64);
        assert!(c.abort_on_error);
        assert_eq!(c.max_input_blocks, 8);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let c = PipelineConfig::from_toml("abort_on_error = true").unwrap();
        assert_eq!(c.reuse_margin, "1K");
        assert_eq!(c.max_input_blocks, 64);
    }

    #[test]
    fn test_invalid_values() {
        assert!(PipelineConfig::from_toml("reuse_margin = \"lots\"").is_err());
        assert!(PipelineConfig::from_toml("max_input_blocks = 0").is_err());
        assert!(PipelineConfig::from_toml("reuse_margin = 12").is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = PipelineConfig {
            reuse_margin: "2K".into(),
            abort_on_error: true,
            max_input_blocks: 3,
        };
        let toml = c.to_toml().unwrap();
        let back = PipelineConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_missing_file() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/chain.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
