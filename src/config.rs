//! Configuration file discovery and loading.
//!
//! The file source is a mapping document, YAML by default or TOML when the
//! file name ends in `.toml`. Both formats are normalised into one
//! [`serde_yaml::Mapping`] so the resolver only ever sees a single shape.
//!
//! Loading never fails: a missing, unreadable or malformed file is logged and
//! replaced by an empty mapping, which makes every setting fall through to its
//! default.
//!
//! ## Config file search order
//!
//! 1. `-c/--config-file` (explicit override)
//! 2. `SURIKIOSK_CONFIG` environment variable
//! 3. User config directory (`$XDG_CONFIG_HOME/surikiosk/config.{yaml,yml,toml}`)
//! 4. `~/.surikiosk.yaml`
//! 5. `/etc/surikiosk.yaml`
//! 6. No file found → empty mapping

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::resolver::Environment;
use crate::settings;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SURIKIOSK_CONFIG";

const USER_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "config.toml"];
const SYSTEM_CONFIG: &str = "/etc/surikiosk.yaml";

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    /// Picks the format from the file extension. Anything but `.toml` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Parsed configuration file (the lowest-precedence source).
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    path: Option<PathBuf>,
    values: Mapping,
}

impl FileConfig {
    /// A file source with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps an already-parsed mapping.
    pub fn from_mapping(values: Mapping) -> Self {
        Self { path: None, values }
    }

    /// Discovers and loads the configuration file.
    pub fn discover(explicit: Option<&Path>, env: &Environment) -> Self {
        match find_config_path(explicit, env) {
            Some(path) => Self::load_path(&path),
            None => {
                info!("No config file found, using defaults");
                Self::empty()
            }
        }
    }

    /// Loads one file. Never panics: any failure yields an empty mapping.
    pub fn load_path(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                return Self::empty();
            }
        };

        match parse(&content, FileFormat::from_path(path)) {
            Ok(values) => {
                info!(path = %path.display(), keys = values.len(), "Configuration loaded");
                let config = Self {
                    path: Some(path.to_path_buf()),
                    values,
                };
                for key in config.unknown_keys() {
                    debug!(key, "Ignoring unrecognised config key");
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::empty()
            }
        }
    }

    /// Raw value for `key`, if the file has one.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Path the configuration was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys present in the file that no setting declares.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.values
            .keys()
            .filter_map(Value::as_str)
            .filter(|key| settings::find(key).is_none())
    }
}

/// Parses a configuration document into a mapping.
///
/// An empty document is an empty mapping; any other non-mapping document is
/// an error.
pub fn parse(content: &str, format: FileFormat) -> Result<Mapping, String> {
    let value: Value = match format {
        FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
        FileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
    };

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(format!(
            "top-level document must be a mapping, found {}",
            value_kind(&other)
        )),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Searches for a config file in the standard locations.
///
/// An explicit path is returned as-is, even if it does not exist, so that the
/// loader can report it.
pub fn find_config_path(explicit: Option<&Path>, env: &Environment) -> Option<PathBuf> {
    // 1. Explicit CLI override
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // 2. Env var override
    if let Some(path) = env.get(CONFIG_ENV) {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
        warn!(path = %p.display(), "{CONFIG_ENV} does not name a file, continuing search");
    }

    // 3. User config directory
    if let Some(dir) = user_config_dir(env) {
        for name in USER_FILE_NAMES {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }

    // 4. Dotfile in the home directory
    if let Some(home) = env.get("HOME") {
        let p = Path::new(home).join(".surikiosk.yaml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 5. System-wide
    let p = PathBuf::from(SYSTEM_CONFIG);
    if p.is_file() {
        return Some(p);
    }

    None
}

/// User config directory, from the captured environment.
fn user_config_dir(env: &Environment) -> Option<PathBuf> {
    #[cfg(windows)]
    {
        env.get("APPDATA")
            .map(|appdata| PathBuf::from(appdata).join("SuriKiosk"))
    }
    #[cfg(not(windows))]
    {
        env.get("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env.get("HOME").map(|h| Path::new(h).join(".config")))
            .map(|dir| dir.join("surikiosk"))
    }
}
