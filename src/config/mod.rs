//! Configuration management.
//!
//! Configuration is read from TOML and then overridden by `MEMPORT_*`
//! environment variables:
//!
//! ```toml
//! data_dir = "~/.local/share/memport"
//! fetch_limit = 1000
//!
//! [store]
//! backend = "http"            # memory | file | http
//! base_url = "http://localhost:3000"
//! api_key = "..."
//! timeout_secs = 30
//!
//! [scope]
//! user_id = "alice"
//! family = "smith"
//!
//! [export]
//! source = "memport"
//! format = "json-pretty"      # json | json-pretty | csv
//!
//! [import]
//! skip_duplicates = true
//! validate_before_import = true
//! mode = "merge"              # merge | append | replace
//! duplicate_policy = "exact"  # exact | trimmed | normalized
//!
//! [logging]
//! format = "pretty"           # pretty | json
//! level = "info"
//! file = "/tmp/memport.log"
//! ```

use crate::io::{DuplicatePolicy, ExportFormat, ImportMode, ImportOptions};
use crate::models::MemoryScope;
use crate::observability::{LogFormat, LoggingConfig};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "MEMPORT_CONFIG_PATH";
/// Environment override for `store.base_url`.
pub const BASE_URL_ENV: &str = "MEMPORT_BASE_URL";
/// Environment override for `store.api_key`.
pub const API_KEY_ENV: &str = "MEMPORT_API_KEY";
/// Environment override for `scope.user_id`.
pub const USER_ID_ENV: &str = "MEMPORT_USER_ID";
/// Environment override for `scope.family`.
pub const FAMILY_ENV: &str = "MEMPORT_FAMILY";

/// Default number of records fetched from the store before import/export.
pub const DEFAULT_FETCH_LIMIT: usize = 1000;

/// Main configuration for memport.
#[derive(Debug, Clone)]
pub struct MemportConfig {
    /// Directory for the file store.
    pub data_dir: PathBuf,
    /// How many existing records to fetch before importing or exporting.
    pub fetch_limit: usize,
    /// Memory store backend.
    pub store: StoreConfig,
    /// Scope records are read from and written to.
    pub scope: MemoryScope,
    /// Export defaults.
    pub export: ExportSettings,
    /// Import defaults.
    pub import: ImportOptions,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Available memory store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local, discarded on exit.
    Memory,
    /// JSON file under the data directory.
    #[default]
    File,
    /// Remote `/api/mem0` endpoint.
    Http,
}

impl StoreBackend {
    /// Returns the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Http => "http",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "http" | "remote" | "mem0" => Ok(Self::Http),
            _ => Err(Error::InvalidInput(format!("Unknown store backend: {s}"))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Memory store configuration (`[store]` section).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Which backend to use.
    pub backend: StoreBackend,
    /// Base URL of the remote service (http backend).
    pub base_url: Option<String>,
    /// Bearer token for the remote service.
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            base_url: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Export defaults (`[export]` section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Tag written to the envelope's `source` field.
    pub source: String,
    /// Default output format.
    pub format: ExportFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            source: "memport".to_string(),
            format: ExportFormat::default(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Fetch limit.
    pub fetch_limit: Option<usize>,
    /// Store section.
    pub store: Option<ConfigFileStore>,
    /// Scope section.
    pub scope: Option<ConfigFileScope>,
    /// Export section.
    pub export: Option<ConfigFileExport>,
    /// Import section.
    pub import: Option<ConfigFileImport>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Store section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStore {
    /// Backend name.
    pub backend: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Scope section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileScope {
    /// User id.
    pub user_id: Option<String>,
    /// Family.
    pub family: Option<String>,
}

/// Export section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExport {
    /// Envelope source tag.
    pub source: Option<String>,
    /// Format name.
    pub format: Option<String>,
}

/// Import section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileImport {
    /// Skip duplicates.
    pub skip_duplicates: Option<bool>,
    /// Validate before import.
    pub validate_before_import: Option<bool>,
    /// Import mode name.
    pub mode: Option<String>,
    /// Duplicate policy name.
    pub duplicate_policy: Option<String>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Format name.
    pub format: Option<String>,
    /// Level or filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for MemportConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            store: StoreConfig::default(),
            scope: MemoryScope::default(),
            export: ExportSettings::default(),
            import: ImportOptions::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MemportConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the effective configuration.
    ///
    /// Uses `path` if given, else `MEMPORT_CONFIG_PATH`, else the default
    /// locations, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// names an unknown backend, format, mode or policy.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::operation("read_config_file", format!("{}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or holds unknown
    /// enumerated values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/memport/` on macOS)
    /// 2. XDG config dir (`~/.config/memport/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found or usable.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("memport").join("config.toml");
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("memport")
            .join("config.toml");

        for candidate in [platform_config, xdg_config] {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(
                    path = %candidate.display(),
                    error = %e,
                    "Ignoring unusable config file"
                ),
            }
        }

        Self::default()
    }

    /// Applies `MEMPORT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(BASE_URL_ENV) {
            self.store.base_url = Some(url);
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.store.api_key = Some(SecretString::from(key));
        }
        if let Some(user_id) = lookup(USER_ID_ENV) {
            self.scope.user_id = user_id;
        }
        if let Some(family) = lookup(FAMILY_ENV) {
            self.scope.family = family;
        }
    }

    /// Converts a `ConfigFile` to `MemportConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = expand_home(&data_dir);
        }
        if let Some(fetch_limit) = file.fetch_limit {
            config.fetch_limit = fetch_limit;
        }
        if let Some(store) = file.store {
            if let Some(backend) = store.backend {
                config.store.backend = backend.parse()?;
            }
            config.store.base_url = store.base_url;
            config.store.api_key = store.api_key.map(SecretString::from);
            if let Some(timeout) = store.timeout_secs {
                config.store.timeout_secs = timeout;
            }
        }
        if let Some(scope) = file.scope {
            if let Some(user_id) = scope.user_id {
                config.scope.user_id = user_id;
            }
            if let Some(family) = scope.family {
                config.scope.family = family;
            }
        }
        if let Some(export) = file.export {
            if let Some(source) = export.source {
                config.export.source = source;
            }
            if let Some(format) = export.format {
                config.export.format = format.parse()?;
            }
        }
        if let Some(import) = file.import {
            if let Some(v) = import.skip_duplicates {
                config.import.skip_duplicates = v;
            }
            if let Some(v) = import.validate_before_import {
                config.import.validate_before_import = v;
            }
            if let Some(mode) = import.mode {
                config.import.mode = mode.parse::<ImportMode>()?;
            }
            if let Some(policy) = import.duplicate_policy {
                config.import.duplicate_policy = policy.parse::<DuplicatePolicy>()?;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = format.parse::<LogFormat>()?;
            }
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            config.logging.file = logging.file.as_deref().map(expand_home);
        }

        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the store backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.store.backend = backend;
        self
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "memport")
        .map_or_else(|| PathBuf::from(".memport"), |dirs| dirs.data_dir().to_path_buf())
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
