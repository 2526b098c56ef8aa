//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`LMS_ROOT_FOLDER`, then `LMS_ROOT`)
//! 3. TOML config file (`~/.config/lms/<module>.toml`, `/etc/lms/<module>.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file never aborts startup. `load_config`
//! reports a malformed file as an error so the caller can log it once tracing
//! is up; `resolve` logs a warning and falls through to the next tier.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ENV_ROOT_FOLDER: &str = "LMS_ROOT_FOLDER";
/// Alternative root folder environment variable
pub const ENV_ROOT: &str = "LMS_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lms.db";

/// Default HTTP port for the text-stream service
pub const DEFAULT_PORT: u16 = 5730;

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file path
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_presentation_hosts() -> Vec<String> {
    vec!["gamma.app".to_string()]
}

/// Per-module TOML configuration
///
/// Every field is optional so that older config files keep parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Directory holding previously uploaded module content
    #[serde(default)]
    pub uploads_dir: Option<PathBuf>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Host patterns treated as external presentation providers
    #[serde(default = "default_presentation_hosts")]
    pub presentation_hosts: Vec<String>,

    /// Kept last: TOML tables follow plain values
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            uploads_dir: None,
            bind_address: None,
            port: None,
            presentation_hosts: default_presentation_hosts(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Uploads directory, defaulting to `<root>/uploads`
    pub fn uploads_dir_for(&self, root_folder: &Path) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| root_folder.join("uploads"))
    }

    /// Listen address, defaulting to `127.0.0.1:<DEFAULT_PORT>`
    pub fn listen_address(&self) -> String {
        format!(
            "{}:{}",
            self.bind_address.as_deref().unwrap_or("127.0.0.1"),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/lms (or /var/lib/lms for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("lms"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/lms"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("lms"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lms"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("lms"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lms"))
        } else {
            PathBuf::from("./lms_data")
        };

        Self { root_folder }
    }
}

/// Resolves the root folder and TOML config for one module
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Resolve the root folder following the documented priority order
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variables
        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        // Priority 3: TOML config file
        match self.load_config() {
            Ok(config) => {
                if let Some(root_folder) = config.root_folder {
                    return root_folder;
                }
            }
            Err(e) => warn!("{}", e),
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load this module's TOML config
    ///
    /// Defaults when no config file exists. An unreadable or malformed file
    /// is an error naming the file; callers fall back to defaults.
    pub fn load_config(&self) -> Result<TomlConfig> {
        let Some(path) = self.config_file_path() else {
            debug!("No config file for {}, using defaults", self.module_name);
            return Ok(TomlConfig::default());
        };

        load_toml_config(&path)
            .map_err(|e| Error::Config(format!("Ignoring config file {}: {}", path.display(), e)))
    }

    /// First existing config file for this module
    fn config_file_path(&self) -> Option<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);

        let user_config = dirs::config_dir().map(|d| d.join("lms").join(&file_name));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/lms").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Creates the root folder and locates files inside it
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

    /// Create the root folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder).map_err(|e| {
            Error::Config(format!(
                "Failed to create root folder {}: {}",
                self.root_folder.display(),
                e
            ))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
