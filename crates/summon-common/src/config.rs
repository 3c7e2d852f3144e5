//! Resolver configuration.
//!
//! Loaded from a TOML table. Every key is optional:
//!
//! ```toml
//! max_expansion_depth = 16
//! type_scopes = true
//! framework_injectables = true
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse resolver config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Longest derivation chain (lifted producers, nested declaration
    /// scopes, spread applications) an injectable may have before it is no
    /// longer collected.
    pub max_expansion_depth: usize,
    /// Query the implicit scope of the requested type's own declarations
    /// when the user-declared candidates yield nothing usable.
    pub type_scopes: bool,
    /// Synthesize providers, collections, witnesses and components.
    pub framework_injectables: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_expansion_depth: 16,
            type_scopes: true,
            framework_injectables: true,
        }
    }
}

impl ResolverConfig {
    pub fn from_file(path: &Path) -> Result<ResolverConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<ResolverConfig, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ResolverConfig::from_str("").unwrap();
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config = ResolverConfig::from_str("max_expansion_depth = 4\ntype_scopes = false\n").unwrap();
        assert_eq!(config.max_expansion_depth, 4);
        assert!(!config.type_scopes);
        assert!(config.framework_injectables);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ResolverConfig::from_str("max_depth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ResolverConfig::from_file(Path::new("/nonexistent/summon.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
