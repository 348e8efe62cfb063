//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FIBERTRACK_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup: it is logged and
//! the compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FIBERTRACK_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "fiberariza.db";

/// Default HTTP port for fibertrack-web
pub const DEFAULT_PORT: u16 = 5780;

/// Compiled-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fibertrack (or /var/lib/fibertrack for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("fibertrack"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fibertrack"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("fibertrack"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fibertrack"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("fibertrack"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fibertrack"))
    } else {
        PathBuf::from("./fibertrack_data")
    }
}

/// Default TOML config location (`<config dir>/fibertrack/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fibertrack").join("config.toml"))
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// How the ingest pipeline learns which bulletin numbers already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyLookup {
    /// Read every stored key once, then check rows against the in-memory set.
    /// O(existing + batch) memory and time.
    #[default]
    Preload,
    /// Send only the batch's candidate keys to the store and let it return
    /// the ones it does not hold.
    SetDifference,
}

/// Spreadsheet ingest settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Headers every upload must carry. `None` uses the built-in list.
    pub required_columns: Option<Vec<String>>,
    pub key_lookup: KeyLookup,
    /// Per-field header overrides, keyed by record field name
    /// (e.g. `bulletin_number = "Bulten No"`).
    pub columns: BTreeMap<String, String>,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
}

impl TomlConfig {
    /// Parse a config file, failing on I/O or syntax errors
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the config file if there is one, otherwise fall back to defaults.
    ///
    /// Never fails. The returned [`ConfigOrigin`] says what happened so the
    /// caller can report it once logging is up (the log level itself comes
    /// from this file).
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, ConfigOrigin) {
        let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return (Self::default(), ConfigOrigin::NoConfigDir),
        };

        if !path.exists() {
            return (Self::default(), ConfigOrigin::NotFound(path));
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => (Self::default(), ConfigOrigin::Invalid(e.to_string())),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// No file at this path; defaults in use
    NotFound(PathBuf),
    /// File present but unreadable or malformed; defaults in use
    Invalid(String),
    /// Platform has no config directory and no path was given
    NoConfigDir,
}

impl ConfigOrigin {
    /// Report at info, or warn when a present file had to be ignored
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config: {}", path.display()),
            ConfigOrigin::NotFound(path) => {
                info!("No config file at {} (using defaults)", path.display())
            }
            ConfigOrigin::Invalid(reason) => warn!("{} (using defaults)", reason),
            ConfigOrigin::NoConfigDir => info!("No config directory (using defaults)"),
        }
    }
}

/// Resolves the root folder that holds the database
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command-line value (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// TOML value (priority 3)
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    /// Apply the priority order and return the winning path
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder for use
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Full path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
