//! Registry of every recognised configuration key.
//!
//! Each [`Setting`] declares exactly one type and one default. A setting may
//! additionally restrict its values to an enumerated set, accept a value from
//! an environment variable, or be *file-indirected*: the candidate names a file
//! whose contents become the effective value.
//!
//! Keys that are not in [`SETTINGS`] are ignored when they appear in the
//! configuration file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::templates;

// ─────────────────────────────────────────────────────────────────────────────
// Setting declarations
// ─────────────────────────────────────────────────────────────────────────────

/// Declared type of a setting. Drives coercion in [`crate::resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Boolean,
    String,
    Integer,
    Float,
    List,
    Mapping,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::List => "list",
            Self::Mapping => "mapping",
        })
    }
}

/// Compile-time default of a setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Str(&'static str),
    Int(i64),
    Float(f64),
    List(&'static [&'static str]),
    EmptyMapping,
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Str(s) => Value::String(s.to_string()),
            Self::Int(i) => Value::Number(i.into()),
            Self::Float(f) => Value::Number(f.into()),
            Self::List(items) => Value::Sequence(
                items.iter().map(|s| Value::String((*s).to_string())).collect(),
            ),
            Self::EmptyMapping => Value::Mapping(Mapping::new()),
        }
    }
}

/// A named configuration entry.
#[derive(Debug, Clone, Copy)]
pub struct Setting {
    pub key: &'static str,
    pub kind: SettingKind,
    pub default: DefaultValue,
    /// Enumerated values. A candidate outside this set is treated as absent.
    pub allowed: Option<&'static [&'static str]>,
    /// Environment variable consulted between the CLI and the file.
    pub env: Option<&'static str>,
    /// The candidate is a path; the file's contents become the value.
    pub file_indirect: bool,
}

impl Setting {
    const fn new(key: &'static str, kind: SettingKind, default: DefaultValue) -> Self {
        Self {
            key,
            kind,
            default,
            allowed: None,
            env: None,
            file_indirect: false,
        }
    }

    const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    const fn env(mut self, var: &'static str) -> Self {
        self.env = Some(var);
        self
    }

    const fn from_file(mut self) -> Self {
        self.file_indirect = true;
        self
    }

    /// Returns `true` if `candidate` is acceptable for an enumerated setting.
    /// Non-enumerated settings accept everything.
    pub fn accepts(&self, candidate: &Value) -> bool {
        match self.allowed {
            None => true,
            Some(allowed) => candidate
                .as_str()
                .is_some_and(|s| allowed.contains(&s)),
        }
    }
}

const DEFAULT_NAVIGATION_LAYOUT: &[&str] = &[
    "back",
    "forward",
    "refresh",
    "stop",
    "zoom_in",
    "zoom_out",
    "separator",
    "bookmarks",
    "separator",
    "spacer",
    "quit",
];

use DefaultValue as D;
use SettingKind as K;

/// Every setting the resolver knows about.
pub const SETTINGS: &[Setting] = &[
    Setting::new("start_url", K::String, D::Str("about:blank")),
    Setting::new("whitelist", K::List, D::Bool(false)),
    Setting::new("whitelist_redirects", K::Boolean, D::Bool(true)),
    Setting::new("bookmarks", K::Mapping, D::EmptyMapping),
    Setting::new("navigation", K::Boolean, D::Bool(true)),
    Setting::new("navigation_layout", K::List, D::List(DEFAULT_NAVIGATION_LAYOUT)),
    Setting::new("fullscreen", K::Boolean, D::Bool(false)),
    Setting::new("window_size", K::String, D::Null),
    Setting::new("icon_theme", K::String, D::Null),
    Setting::new("timeout", K::Integer, D::Int(0)),
    Setting::new("timeout_mode", K::String, D::Str("reset")).one_of(TimeoutMode::ALLOWED),
    Setting::new("screensaver_url", K::String, D::Str("about:blank")),
    Setting::new("ssl_mode", K::String, D::Str("strict")).one_of(SslMode::ALLOWED),
    Setting::new("quit_button_mode", K::String, D::Str("reset")).one_of(QuitButtonMode::ALLOWED),
    Setting::new("quit_button_text", K::String, D::Str("I'm &Finished")),
    Setting::new("proxy_server", K::String, D::Null).env("http_proxy"),
    Setting::new("page_unavailable_html", K::String, D::Str(templates::NOT_FOUND_HTML)).from_file(),
    Setting::new("network_down_html", K::String, D::Str(templates::NETWORK_DOWN_HTML)).from_file(),
    Setting::new("certificate_error_html", K::String, D::Str(templates::CERTIFICATE_ERROR_HTML))
        .from_file(),
    Setting::new("unsupported_content_html", K::String, D::Str(templates::UNSUPPORTED_CONTENT_HTML))
        .from_file(),
    Setting::new("zoom_factor", K::Float, D::Float(1.0)),
    Setting::new("allow_popups", K::Boolean, D::Bool(false)),
    Setting::new("allow_plugins", K::Boolean, D::Bool(false)),
    Setting::new("allow_printing", K::Boolean, D::Bool(false)),
    Setting::new("allow_external_content", K::Boolean, D::Bool(false)),
    Setting::new("content_handlers", K::Mapping, D::EmptyMapping),
    Setting::new("privacy_mode", K::Boolean, D::Bool(true)),
    Setting::new("user_agent", K::String, D::Null),
    Setting::new("force_js_confirm", K::String, D::Str("ask")).one_of(JsConfirmPolicy::ALLOWED),
    Setting::new("suppress_alerts", K::Boolean, D::Bool(false)),
    Setting::new("default_user", K::String, D::Null),
    Setting::new("default_password", K::String, D::Null),
];

/// Looks up a setting by key.
pub fn find(key: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.key == key)
}

// ─────────────────────────────────────────────────────────────────────────────
// Closed mode enums
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned when a mode string is not part of its enumerated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode `{}`", self.0)
    }
}

impl std::error::Error for UnknownMode {}

/// How certificate errors are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Strict,
    Ignore,
}

impl SslMode {
    pub const ALLOWED: &'static [&'static str] = &["strict", "ignore"];
}

impl FromStr for SslMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "ignore" => Ok(Self::Ignore),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// What happens when the inactivity timer fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutMode {
    #[default]
    Reset,
    Close,
    Screensaver,
}

impl TimeoutMode {
    pub const ALLOWED: &'static [&'static str] = &["reset", "close", "screensaver"];
}

impl FromStr for TimeoutMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" => Ok(Self::Reset),
            "close" => Ok(Self::Close),
            "screensaver" => Ok(Self::Screensaver),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// What the "I'm finished" button does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuitButtonMode {
    #[default]
    Reset,
    Close,
}

impl QuitButtonMode {
    pub const ALLOWED: &'static [&'static str] = &["reset", "close"];
}

impl FromStr for QuitButtonMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" => Ok(Self::Reset),
            "close" => Ok(Self::Close),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Answer given to JavaScript `confirm()` dialogs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsConfirmPolicy {
    /// Show the dialog to the user.
    #[default]
    Ask,
    Accept,
    Deny,
}

impl JsConfirmPolicy {
    pub const ALLOWED: &'static [&'static str] = &["ask", "accept", "deny"];
}

impl FromStr for JsConfirmPolicy {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ask" => Ok(Self::Ask),
            "accept" => Ok(Self::Accept),
            "deny" => Ok(Self::Deny),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// A token of `navigation_layout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Back,
    Forward,
    Refresh,
    Stop,
    ZoomIn,
    ZoomOut,
    Print,
    Separator,
    Spacer,
    Bookmarks,
    Quit,
}

impl FromStr for NavItem {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "back" => Self::Back,
            "forward" => Self::Forward,
            "refresh" => Self::Refresh,
            "stop" => Self::Stop,
            "zoom_in" => Self::ZoomIn,
            "zoom_out" => Self::ZoomOut,
            "print" => Self::Print,
            "separator" => Self::Separator,
            "spacer" => Self::Spacer,
            "bookmarks" => Self::Bookmarks,
            "quit" => Self::Quit,
            other => return Err(UnknownMode(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        for (i, a) in SETTINGS.iter().enumerate() {
            for b in &SETTINGS[i + 1..] {
                assert_ne!(a.key, b.key, "duplicate setting key");
            }
        }
    }

    #[test]
    fn test_enumerated_defaults_are_allowed() {
        for setting in SETTINGS {
            if setting.allowed.is_some() {
                assert!(
                    setting.accepts(&setting.default.to_value()),
                    "default of `{}` is outside its allowed set",
                    setting.key
                );
            }
        }
    }

    #[test]
    fn test_accepts_rejects_unknown_mode() {
        let ssl = find("ssl_mode").unwrap();
        assert!(ssl.accepts(&Value::String("ignore".into())));
        assert!(!ssl.accepts(&Value::String("bogus".into())));
        assert!(!ssl.accepts(&Value::Bool(true)));
    }

    #[test]
    fn test_proxy_bound_to_http_proxy() {
        assert_eq!(find("proxy_server").unwrap().env, Some("http_proxy"));
    }

    #[test]
    fn test_templates_are_file_indirected() {
        for key in [
            "page_unavailable_html",
            "network_down_html",
            "certificate_error_html",
            "unsupported_content_html",
        ] {
            assert!(find(key).unwrap().file_indirect, "{key}");
        }
        assert!(!find("start_url").unwrap().file_indirect);
    }

    #[test]
    fn test_default_layout_parses() {
        let layout = DefaultValue::List(DEFAULT_NAVIGATION_LAYOUT).to_value();
        for token in layout.as_sequence().unwrap() {
            assert!(token.as_str().unwrap().parse::<NavItem>().is_ok());
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("ignore".parse::<SslMode>(), Ok(SslMode::Ignore));
        assert_eq!("screensaver".parse::<TimeoutMode>(), Ok(TimeoutMode::Screensaver));
        assert_eq!("close".parse::<QuitButtonMode>(), Ok(QuitButtonMode::Close));
        assert_eq!("deny".parse::<JsConfirmPolicy>(), Ok(JsConfirmPolicy::Deny));
        assert!("Strict".parse::<SslMode>().is_err());
    }
}
