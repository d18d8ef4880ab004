//! Configuration resolver: merges command line, environment and file into one
//! [`EffectiveConfig`].
//!
//! For every declared [`Setting`] the candidates are consulted in precedence
//! order (CLI, then the setting's environment binding, then the file). The
//! first present, non-null candidate wins; enumerated settings skip
//! candidates outside their allowed set. The winner is then coerced to the
//! declared type. Only coercion can fail, and that failure is fatal.
//!
//! Resolution is a pure function of its three inputs (plus reads of
//! file-indirected templates), so a reset can rebuild the configuration by
//! calling it again with the same [`ConfigSources`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;

use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info_span, warn};

use crate::config::FileConfig;
use crate::effective::EffectiveConfig;
use crate::error::ConfigError;
use crate::settings::{SETTINGS, Setting, SettingKind};

// ─────────────────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Where an effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cli,
    Environment,
    File,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "command line",
            Self::Environment => "environment",
            Self::File => "config file",
            Self::Default => "default",
        })
    }
}

/// Snapshot of the process environment.
///
/// Empty variables are treated as unset.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Captures the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Values given on the command line. Keys the user did not pass are absent.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: BTreeMap<String, Value>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a CLI value for `key`. `None` leaves the key absent.
    pub fn set<T: Into<Value>>(&mut self, key: &str, value: Option<T>) {
        debug_assert!(
            crate::settings::find(key).is_some(),
            "CLI override for undeclared setting `{key}`"
        );
        if let Some(value) = value {
            self.values.insert(key.to_string(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The three inputs of a resolution, kept so that a reset can re-derive the
/// exact same configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub cli: Overrides,
    pub env: Environment,
    pub file: FileConfig,
}

impl ConfigSources {
    pub fn new(cli: Overrides, env: Environment, file: FileConfig) -> Self {
        Self { cli, env, file }
    }

    pub fn resolve(&self) -> Result<EffectiveConfig, ConfigError> {
        resolve(&self.cli, &self.env, &self.file)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the effective configuration. Every declared key is present in the
/// result.
pub fn resolve(
    cli: &Overrides,
    env: &Environment,
    file: &FileConfig,
) -> Result<EffectiveConfig, ConfigError> {
    let _span = info_span!("resolve_config").entered();
    let mut config = EffectiveConfig::empty();

    for setting in SETTINGS {
        let candidate = first_candidate(setting, cli, env, file);

        let (value, origin) = if setting.file_indirect {
            resolve_indirect(setting, candidate)
        } else {
            match candidate {
                Some((origin, raw)) => (coerce(setting, raw, origin)?, origin),
                None => (setting.default.to_value(), Source::Default),
            }
        };

        if origin != Source::Default {
            debug!(key = setting.key, source = %origin, "Setting resolved");
        }
        config.insert(setting.key, value, origin);
    }

    Ok(config)
}

/// First present, non-null, allowed candidate in precedence order.
fn first_candidate(
    setting: &Setting,
    cli: &Overrides,
    env: &Environment,
    file: &FileConfig,
) -> Option<(Source, Value)> {
    let from_env = setting
        .env
        .and_then(|var| env.get(var))
        .map(|v| Value::String(v.to_string()));

    [
        (Source::Cli, cli.get(setting.key).cloned()),
        (Source::Environment, from_env),
        (Source::File, file.get(setting.key).cloned()),
    ]
    .into_iter()
    .filter_map(|(source, value)| value.map(|v| (source, v)))
    .filter(|(_, value)| !value.is_null())
    .find(|(source, value)| {
        let ok = setting.accepts(value);
        if !ok {
            warn!(
                key = setting.key,
                source = %source,
                value = %describe(value),
                allowed = ?setting.allowed.unwrap_or_default(),
                "Value not allowed, ignoring"
            );
        }
        ok
    })
}

/// Resolves a file-indirected setting: the candidate is a path whose contents
/// become the value. Any failure falls back to the built-in default.
fn resolve_indirect(setting: &Setting, candidate: Option<(Source, Value)>) -> (Value, Source) {
    let default = || (setting.default.to_value(), Source::Default);

    let Some((origin, raw)) = candidate else {
        return default();
    };

    let Some(path) = raw.as_str() else {
        warn!(
            key = setting.key,
            source = %origin,
            value = %describe(&raw),
            "Expected a file path, using built-in content"
        );
        return default();
    };

    match fs::read_to_string(path) {
        Ok(content) => (Value::String(content), origin),
        Err(e) => {
            warn!(key = setting.key, path, error = %e, "Couldn't read file, using built-in content");
            default()
        }
    }
}

/// Coerces a raw candidate to the setting's declared type.
pub fn coerce(setting: &Setting, raw: Value, origin: Source) -> Result<Value, ConfigError> {
    let fail = |raw: &Value| ConfigError::Coercion {
        key: setting.key,
        expected: setting.kind,
        found: describe(raw),
        origin,
    };

    match setting.kind {
        SettingKind::Boolean => match &raw {
            Value::Bool(_) => Ok(raw),
            Value::String(s) => parse_bool(s).map(Value::Bool).ok_or_else(|| fail(&raw)),
            Value::Number(n) => n
                .as_i64()
                .map(|i| Value::Bool(i != 0))
                .ok_or_else(|| fail(&raw)),
            _ => Err(fail(&raw)),
        },
        SettingKind::Integer => match &raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                        .map(|f| f as i64)
                })
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| fail(&raw)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| fail(&raw)),
            _ => Err(fail(&raw)),
        },
        SettingKind::Float => match &raw {
            Value::Number(n) => n
                .as_f64()
                .map(|f| Value::Number(f.into()))
                .ok_or_else(|| fail(&raw)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| Value::Number(f.into()))
                .ok_or_else(|| fail(&raw)),
            _ => Err(fail(&raw)),
        },
        SettingKind::String | SettingKind::List | SettingKind::Mapping => Ok(raw),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Short human-readable rendering of a value for diagnostics.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}
