//! Chunking configuration management.
//!
//! Loads from `.filing/chunking.yaml` if it exists, otherwise falls back
//! to defaults. Invalid combinations are rejected before any parsing or
//! chunking work begins, naming the offending field.

use filing_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How section boundaries constrain chunk composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Hard: a chunk's constituent nodes never span two sections.
    #[default]
    RespectSection,

    /// Soft: a section change closes the buffer only once it holds at
    /// least `min_chunk_size` characters; smaller buffers are carried
    /// across the boundary rather than emitted as fragments.
    PreferSection,

    /// Every table and image node is emitted as its own chunk; text may
    /// cross sections freely.
    RespectTable,

    /// Size and atomicity constraints only.
    AllowCrossSection,
}

/// Unit for the overlap window seeded into each following chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapUnit {
    /// Trailing `overlap_size` characters of the closed chunk's content.
    #[default]
    Chars,

    /// Trailing whole nodes whose combined length fits `overlap_size`.
    Nodes,
}

/// What to do with a text node that exceeds `max_chunk_size` on its own.
/// Tables and images are atomic regardless and are never split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizedPolicy {
    /// Split at the semantic sub-boundary nearest the limit and continue
    /// with the remainder.
    #[default]
    Split,

    /// Emit the node as a standalone chunk flagged `oversized`.
    StandaloneFlagged,
}

/// Immutable chunking configuration, shared read-only across concurrent
/// filing tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Overlap window size in characters; must stay below
    /// `max_chunk_size`
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,

    /// Soft floor used by `PreferSection` to decide whether a buffer is
    /// large enough to close at a section boundary
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    #[serde(default)]
    pub boundary_policy: BoundaryPolicy,

    #[serde(default)]
    pub overlap_unit: OverlapUnit,

    #[serde(default)]
    pub oversized_policy: OversizedPolicy,
}

fn default_max_chunk_size() -> usize {
    2000
}

fn default_overlap_size() -> usize {
    200
}

fn default_min_chunk_size() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
            min_chunk_size: default_min_chunk_size(),
            boundary_policy: BoundaryPolicy::default(),
            overlap_unit: OverlapUnit::default(),
            oversized_policy: OversizedPolicy::default(),
        }
    }
}

impl ChunkingConfig {
    /// Reject invalid combinations before any work is done.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_chunk_size == 0 {
            return Err(AppError::Config(
                "max_chunk_size must be a positive number of characters".to_string(),
            ));
        }

        if self.overlap_size >= self.max_chunk_size {
            return Err(AppError::Config(format!(
                "overlap_size ({}) must be smaller than max_chunk_size ({})",
                self.overlap_size, self.max_chunk_size
            )));
        }

        if self.min_chunk_size > self.max_chunk_size {
            return Err(AppError::Config(format!(
                "min_chunk_size ({}) must not exceed max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }

        Ok(())
    }
}

/// Load chunking configuration for a workspace.
///
/// Reads `.filing/chunking.yaml` when present, otherwise uses defaults.
/// The result is validated either way.
pub fn load_config(workspace: &Path) -> AppResult<ChunkingConfig> {
    let config_path = get_config_path(workspace);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: ChunkingConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded chunking config from {:?}", config_path);
        config
    } else {
        tracing::debug!("Using default chunking config (no config file found)");
        ChunkingConfig::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save chunking configuration for a workspace.
pub fn save_config(workspace: &Path, config: &ChunkingConfig) -> AppResult<()> {
    config.validate()?;

    let config_path = get_config_path(workspace);
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved chunking config to {:?}", config_path);
    Ok(())
}

/// Path to the workspace chunking config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".filing").join("chunking.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.boundary_policy, BoundaryPolicy::RespectSection);
        assert_eq!(config.oversized_policy, OversizedPolicy::Split);
    }

    #[test]
    fn test_overlap_must_be_below_max() {
        let config = ChunkingConfig {
            max_chunk_size: 100,
            overlap_size: 100,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overlap_size"));
    }

    #[test]
    fn test_zero_max_rejected() {
        let config = ChunkingConfig {
            max_chunk_size: 0,
            overlap_size: 0,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_chunk_size"));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let config = ChunkingConfig {
            max_chunk_size: 100,
            overlap_size: 10,
            min_chunk_size: 500,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_chunk_size"));
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, ChunkingConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = ChunkingConfig {
            max_chunk_size: 800,
            overlap_size: 100,
            boundary_policy: BoundaryPolicy::AllowCrossSection,
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "max_chunk_size: 100\noverlap_size: 250\n").unwrap();

        assert!(load_config(temp.path()).is_err());
    }
}
