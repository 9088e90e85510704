//! Configuration loading and persistence.
//!
//! Mirrors the original tool's `config.py`: a small TOML file under a
//! configurable directory, merged over compiled-in defaults, written back
//! atomically (temp file + rename) so a crash mid-write never corrupts the
//! file an already-running process might be reading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::errors::{ResemblError, Result};

const CONFIG_DIR_ENV: &str = "ASMATCH_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = ".config/asmatch";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Output rendering format recognized by external collaborators. The core
/// never renders output itself; this is carried only so configuration
/// round-trips the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Machine-readable JSON.
    Json,
    /// Comma-separated values.
    Csv,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

/// Typed configuration recognized by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResemblConfig {
    /// LSH similarity threshold, `[0.0, 0.99)`.
    pub lsh_threshold: f64,
    /// MinHash signature width.
    pub num_permutations: usize,
    /// Default number of results returned by `find_matches`.
    pub top_n: usize,
    /// Default shingle size for the fingerprint builder.
    pub ngram_size: usize,
    /// Jaccard weight in the hybrid score, `[0, 1]`.
    pub jaccard_weight: f64,
    /// Preferred output rendering format (an external-collaborator hint).
    pub format: OutputFormat,
}

impl Default for ResemblConfig {
    fn default() -> Self {
        Self {
            lsh_threshold: 0.5,
            num_permutations: 128,
            top_n: 5,
            ngram_size: 3,
            jaccard_weight: 0.4,
            format: OutputFormat::default(),
        }
    }
}

/// Return the configuration directory, respecting `ASMATCH_CONFIG_DIR`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// Return the path to the config file itself.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Load the configuration file if it exists, merged over the defaults.
/// A malformed file is logged and treated as absent rather than a hard
/// failure — configuration is read-mostly, best-effort input.
pub fn load_config() -> ResemblConfig {
    load_config_from(&config_path())
}

fn load_config_from(path: &Path) -> ResemblConfig {
    let Ok(raw) = fs::read_to_string(path) else {
        return ResemblConfig::default();
    };
    match toml::from_str(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("error decoding config file at {}: {err}", path.display());
            ResemblConfig::default()
        }
    }
}

/// Write `config` to the config file atomically.
pub fn save_config(config: &ResemblConfig) -> Result<()> {
    save_config_to(config, &config_dir(), &config_path())
}

fn save_config_to(config: &ResemblConfig, dir: &Path, path: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let body = toml::to_string_pretty(config)?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, body)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        ResemblError::io(
            format!("failed to install config file at {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("missing.toml"));
        assert_eq!(cfg, ResemblConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = ResemblConfig::default();
        cfg.top_n = 10;
        cfg.format = OutputFormat::Json;
        save_config_to(&cfg, dir.path(), &path).unwrap();
        let loaded = load_config_from(&path);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid = [[[ toml").unwrap();
        let cfg = load_config_from(&path);
        assert_eq!(cfg, ResemblConfig::default());
    }

    #[test]
    fn save_is_atomic_no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_config_to(&ResemblConfig::default(), dir.path(), &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
