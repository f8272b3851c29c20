use std::{
    num::NonZeroU64,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Everything that controls one exploration run.
///
/// Deserializable from TOML; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExploreConfig {
    /// Edge length of the cube
    pub size: usize,
    /// Also twist inner slices, not just the outer layers
    pub deep_slices: bool,
    /// Generate children on the rayon thread pool
    pub parallel: bool,
    /// Number of frontier configurations expanded per parallel batch
    pub chunk_size: usize,
    /// Log progress after this many expanded configurations
    pub progress_interval: u64,
    pub budget: Budget,
    pub checkpoint: CheckpointConfig,
}

/// When to stop exploring. Exploration also stops once no new configurations are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Budget {
    /// Stop as soon as this many configurations have been recorded
    pub max_states: Option<u64>,
    /// Never record configurations further than this many twists from the start
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub data_dir: PathBuf,
    /// Write the table each time the completed count passes a multiple of this
    pub increment: NonZeroU64,
    /// Also write the table when the run ends
    pub final_checkpoint: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        ExploreConfig {
            size: 3,
            deep_slices: false,
            parallel: false,
            chunk_size: 4096,
            progress_interval: 100,
            budget: Budget::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget {
            max_states: None,
            max_depth: Some(9),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            enabled: true,
            data_dir: PathBuf::from("data"),
            increment: NonZeroU64::new(100_000).unwrap_or(NonZeroU64::MIN),
            final_checkpoint: true,
        }
    }
}

impl ExploreConfig {
    /// # Errors
    ///
    /// Fails if the TOML is malformed or names unknown fields
    pub fn from_toml_str(text: &str) -> Result<ExploreConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse
    pub fn from_file(path: &Path) -> Result<ExploreConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        ExploreConfig::from_toml_str(&text)
    }

    /// A config with checkpointing switched off, mostly useful for tests and dry runs
    #[must_use]
    pub fn in_memory(size: usize, budget: Budget) -> ExploreConfig {
        ExploreConfig {
            size,
            budget,
            checkpoint: CheckpointConfig {
                enabled: false,
                ..CheckpointConfig::default()
            },
            ..ExploreConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            ExploreConfig::from_toml_str("").unwrap(),
            ExploreConfig::default()
        );
    }

    #[test]
    fn partial_toml() {
        let config = ExploreConfig::from_toml_str(
            r#"
            size = 4
            deep_slices = true

            [budget]
            max_states = 5000

            [checkpoint]
            data_dir = "/tmp/tables"
            increment = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.size, 4);
        assert!(config.deep_slices);
        assert_eq!(config.budget.max_states, Some(5000));
        assert_eq!(config.budget.max_depth, Some(9));
        assert_eq!(config.checkpoint.data_dir, PathBuf::from("/tmp/tables"));
        assert_eq!(config.checkpoint.increment.get(), 1000);
        assert!(config.checkpoint.enabled);
        assert_eq!(config.chunk_size, 4096);
    }

    #[test]
    fn budget_defaults_agree() {
        let sections = [
            "",
            "[budget]",
            "[budget]\nmax_states = 10",
            "size = 5\n[checkpoint]\nenabled = false",
        ];

        for text in sections {
            let config = ExploreConfig::from_toml_str(text).unwrap();
            assert_eq!(config.budget.max_depth, Some(9), "{text:?}");
        }
        assert_eq!(ExploreConfig::default().budget, Budget::default());

        let config = ExploreConfig::from_toml_str("[budget]\nmax_depth = 3").unwrap();
        assert_eq!(
            config.budget,
            Budget {
                max_states: None,
                max_depth: Some(3)
            }
        );
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(ExploreConfig::from_toml_str("sise = 3").is_err());
        assert!(ExploreConfig::from_toml_str("[checkpoint]\nincrement = 0").is_err());
        assert!(ExploreConfig::from_file(Path::new("/nonexistent/cube.toml")).is_err());
    }
}
