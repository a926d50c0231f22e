//! Applicator configuration
//!
//! Configuration can be built in code or loaded from YAML:
//!
//! ```yaml
//! tag_name: apply
//! max_depth: 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Default tag key read from field descriptors
pub const DEFAULT_TAG_NAME: &str = "apply";

/// Settings for an [`Applicator`](crate::Applicator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicatorConfig {
    /// Tag key whose annotation drives the transforms
    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    /// Maximum nesting depth before traversal fails; unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

fn default_tag_name() -> String {
    DEFAULT_TAG_NAME.to_string()
}

impl Default for ApplicatorConfig {
    fn default() -> Self {
        Self {
            tag_name: default_tag_name(),
            max_depth: None,
        }
    }
}

impl ApplicatorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading applicator config: {}", path.display());
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the tag key
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    /// Set the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tag_name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "tag_name must not be empty".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(Error::ConfigInvalid {
                message: "max_depth must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApplicatorConfig::default();
        assert_eq!(config.tag_name, "apply");
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = ApplicatorConfig::from_yaml("max_depth: 16\n").unwrap();
        assert_eq!(config.tag_name, "apply");
        assert_eq!(config.max_depth, Some(16));
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
tag_name: mold
max_depth: 8
"#;
        let config = ApplicatorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config, ApplicatorConfig::default().with_tag_name("mold").with_max_depth(8));
    }

    #[test]
    fn test_empty_tag_name_is_invalid() {
        let err = ApplicatorConfig::from_yaml("tag_name: ''\n").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_zero_depth_is_invalid() {
        let err = ApplicatorConfig::from_yaml("max_depth: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = ApplicatorConfig::from_yaml("max_depth: [").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
