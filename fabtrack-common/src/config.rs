//! Configuration loading and root folder resolution
//!
//! Every FabTrack service stores its data (fabtrack.db and friends) under a
//! single root folder, resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (FABTRACK_ROOT_FOLDER, then FABTRACK_ROOT)
//! 3. Per-module TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Missing config files never abort startup; resolution degrades to the
//! compiled default with a log line.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the SQLite database file inside the root folder
pub const DATABASE_FILE_NAME: &str = "fabtrack.db";

/// Compiled platform defaults used when no other configuration source applies
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("fabtrack"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/fabtrack"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("fabtrack"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fabtrack"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("fabtrack"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fabtrack"))
        } else {
            PathBuf::from("./fabtrack_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Logging configuration from the bootstrap TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime; all runtime-tunable values
/// live in the database `settings` table instead.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the service's data (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port override (optional)
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML config file, tolerating absence
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str::<TomlConfig>(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(config))
    }
}

/// Resolves the root folder for one service module
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve the root folder using the 4-tier priority order (no CLI tier)
    pub fn resolve(&self) -> PathBuf {
        self.resolve_with_cli(None)
    }

    /// Resolve the root folder, with an optional command-line override on top
    pub fn resolve_with_cli(&self, cli_arg: Option<&Path>) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        // Priority 2: Environment variables (FABTRACK_ROOT_FOLDER wins)
        if let Ok(path) = std::env::var("FABTRACK_ROOT_FOLDER") {
            return PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("FABTRACK_ROOT") {
            return PathBuf::from(path);
        }

        // Priority 3: Per-module TOML config file
        match self.load_toml_config() {
            Ok(Some(config)) => {
                if let Some(root_folder) = config.root_folder {
                    return root_folder;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Ignoring unreadable config file: {}", e);
            }
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load this module's bootstrap TOML config, if present
    pub fn load_toml_config(&self) -> Result<Option<TomlConfig>> {
        match self.config_file_path() {
            Some(path) => TomlConfig::load(&path),
            None => Ok(None),
        }
    }

    /// Candidate config file path: <config dir>/fabtrack/<module>.toml
    fn config_file_path(&self) -> Option<PathBuf> {
        let user_config = dirs::config_dir()
            .map(|d| d.join("fabtrack").join(format!("{}.toml", self.module_name)));
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }

        // System-wide fallback on Linux
        if cfg!(target_os = "linux") {
            let system_config =
                PathBuf::from("/etc/fabtrack").join(format!("{}.toml", self.module_name));
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Prepares a resolved root folder for use (directory creation, db path)
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if needed (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// Whether the database file already exists
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
