//! Configuration loading and merging for Signet.
//!
//! Signet resolves configuration from multiple sources with CLI > project >
//! home > defaults precedence. Configuration is loaded from `.signet.yaml`
//! files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::CoreError;

/// Default catalog location relative to the working directory, used when no
/// config layer provides one.
pub const DEFAULT_CATALOG_PATH: &str = "catalog/default.yaml";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Top-level Signet configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignetConfig {
    /// Storage locations (database, evidence vault).
    pub storage: StorageConfig,
    /// Evidence catalog location.
    pub catalog: CatalogConfig,
}

impl SignetConfig {
    /// Absolute or working-directory-relative path of the SQLite database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.storage.data_dir).join(&self.storage.database_file)
    }

    /// Root directory of the evidence file vault.
    #[must_use]
    pub fn evidence_root(&self) -> PathBuf {
        Path::new(&self.storage.data_dir).join(&self.storage.evidence_dir)
    }

    /// Path of the evidence catalog YAML.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        match &self.catalog.path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory holding the database and the evidence vault.
    pub data_dir: String,
    /// Database file name inside `data_dir`.
    pub database_file: String,
    /// Evidence vault directory name inside `data_dir`.
    pub evidence_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: ".signet".to_string(),
            database_file: "signet.db".to_string(),
            evidence_dir: "evidence".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogConfig
// ---------------------------------------------------------------------------

/// Evidence catalog settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the catalog YAML. `None` means the built-in default location.
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and merge configuration from multiple sources.
///
/// Resolution order (highest priority first):
/// 1. CLI overrides (applied by the caller after loading)
/// 2. An explicit config file passed on the command line
/// 3. `.signet.yaml` in the project directory
/// 4. `.signet.yaml` in the user home directory
/// 5. Built-in defaults
///
/// # Errors
///
/// Returns [`CoreError::Config`] if a config file exists but is malformed,
/// or if an explicitly named config file does not exist.
pub fn load_config(
    project_dir: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<SignetConfig, CoreError> {
    let mut config = SignetConfig::default();

    // Layer 1: home directory config.
    if let Some(home) = home_dir() {
        let home_config = home.join(".signet.yaml");
        if home_config.is_file() {
            debug!(path = %home_config.display(), "loading home config");
            let layer = load_config_file(&home_config)?;
            config = merge_config(config, layer);
        }
    }

    // Layer 2: project directory config.
    if let Some(dir) = project_dir {
        let project_config = dir.join(".signet.yaml");
        if project_config.is_file() {
            debug!(path = %project_config.display(), "loading project config");
            let layer = load_config_file(&project_config)?;
            config = merge_config(config, layer);
        }
    }

    // Layer 3: explicit config file. Unlike the implicit layers, a missing
    // file here is an error the operator needs to hear about.
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(CoreError::Config(format!(
                "config file not found: '{}'",
                path.display()
            )));
        }
        debug!(path = %path.display(), "loading explicit config");
        let layer = load_config_file(path)?;
        config = merge_config(config, layer);
    }

    info!("configuration loaded");
    Ok(config)
}

/// Load a single config file and deserialize it.
fn load_config_file(path: &Path) -> Result<SignetConfig, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    serde_yml::from_str(&content).map_err(|e| {
        CoreError::Config(format!(
            "failed to parse config file '{}': {e}",
            path.display()
        ))
    })
}

/// Merge `overlay` on top of `base`. Non-default values in `overlay` win.
fn merge_config(base: SignetConfig, overlay: SignetConfig) -> SignetConfig {
    SignetConfig {
        storage: merge_storage(base.storage, overlay.storage),
        catalog: CatalogConfig {
            path: overlay.catalog.path.or(base.catalog.path),
        },
    }
}

fn merge_storage(base: StorageConfig, overlay: StorageConfig) -> StorageConfig {
    let defaults = StorageConfig::default();
    StorageConfig {
        data_dir: if overlay.data_dir == defaults.data_dir {
            base.data_dir
        } else {
            overlay.data_dir
        },
        database_file: if overlay.database_file == defaults.database_file {
            base.database_file
        } else {
            overlay.database_file
        },
        evidence_dir: if overlay.evidence_dir == defaults.evidence_dir {
            base.evidence_dir
        } else {
            overlay.evidence_dir
        },
    }
}

/// Get the user home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
