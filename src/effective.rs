//! The merged, type-coerced configuration and its typed views.
//!
//! An [`EffectiveConfig`] is built once per session by
//! [`crate::resolver::resolve`] and never mutated afterwards; a reset builds a
//! new one. Accessors return typed values for the keys the rest of the crate
//! consumes. Malformed composite values (bookmarks, window size, proxy) are
//! logged and skipped rather than failing the whole configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;
use url::Url;

use crate::error::ParseValueError;
use crate::resolver::Source;
use crate::settings::{JsConfirmPolicy, NavItem, QuitButtonMode, SslMode, TimeoutMode};

/// Total mapping from setting key to resolved value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    values: BTreeMap<&'static str, Value>,
    #[serde(skip)]
    origins: BTreeMap<&'static str, Source>,
}

impl EffectiveConfig {
    pub(crate) fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
            origins: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: &'static str, value: Value, origin: Source) {
        self.values.insert(key, value);
        self.origins.insert(key, origin);
    }

    /// Raw value of `key`. `None` only for undeclared keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Source that provided the value of `key`.
    pub fn origin(&self, key: &str) -> Option<Source> {
        self.origins.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn integer(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn float(&self, key: &str) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// String value of `key`; scalars are rendered, null and empty strings
    /// are `None`.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Renders the configuration as YAML (for `--print-config`).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.values)
    }

    // ── Typed views ──────────────────────────────────────────────────────

    pub fn start_url(&self) -> String {
        self.string("start_url")
            .unwrap_or_else(|| "about:blank".to_string())
    }

    pub fn screensaver_url(&self) -> String {
        self.string("screensaver_url")
            .unwrap_or_else(|| "about:blank".to_string())
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.mode("ssl_mode")
    }

    pub fn timeout_mode(&self) -> TimeoutMode {
        self.mode("timeout_mode")
    }

    pub fn quit_button_mode(&self) -> QuitButtonMode {
        self.mode("quit_button_mode")
    }

    pub fn js_confirm_policy(&self) -> JsConfirmPolicy {
        self.mode("force_js_confirm")
    }

    fn mode<T: FromStr + Default>(&self, key: &str) -> T {
        self.string(key)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Inactivity timeout. `None` when disabled (zero or negative).
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.integer("timeout"))
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Page zoom factor; non-positive values fall back to 1.0.
    pub fn zoom_factor(&self) -> f64 {
        let zoom = self.float("zoom_factor");
        if zoom > 0.0 { zoom } else { 1.0 }
    }

    /// Configured bookmarks in file order. Malformed entries are skipped.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        let Some(Value::Mapping(entries)) = self.get("bookmarks") else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|(name, entry)| {
                let name = match name {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => {
                        warn!(name = ?other, "Ignoring bookmark with non-string name");
                        return None;
                    }
                };
                match serde_yaml::from_value::<BookmarkEntry>(entry.clone()) {
                    Ok(entry) => Some(Bookmark {
                        name,
                        url: entry.url,
                        description: entry.description,
                    }),
                    Err(e) => {
                        warn!(bookmark = %name, error = %e, "Ignoring malformed bookmark");
                        None
                    }
                }
            })
            .collect()
    }

    /// Toolbar layout. Unknown tokens are skipped.
    pub fn navigation_layout(&self) -> Vec<NavItem> {
        let Some(Value::Sequence(tokens)) = self.get("navigation_layout") else {
            return Vec::new();
        };

        tokens
            .iter()
            .filter_map(|token| {
                let parsed = token.as_str().map(str::parse::<NavItem>);
                match parsed {
                    Some(Ok(item)) => Some(item),
                    _ => {
                        warn!(token = ?token, "Ignoring unknown navigation layout item");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn window_size(&self) -> Option<WindowSize> {
        let raw = self.string("window_size")?;
        raw.parse()
            .map_err(|e: ParseValueError| warn!(error = %e, "Ignoring invalid window size"))
            .ok()
    }

    pub fn proxy(&self) -> Option<ProxyServer> {
        let raw = self.string("proxy_server")?;
        raw.parse()
            .map_err(|e: ParseValueError| warn!(error = %e, "Ignoring invalid proxy server"))
            .ok()
    }

    /// External program registered for `content_type`.
    pub fn content_handler(&self, content_type: &str) -> Option<String> {
        let Some(Value::Mapping(handlers)) = self.get("content_handlers") else {
            return None;
        };
        handlers
            .get(content_type)
            .and_then(Value::as_str)
            .filter(|program| !program.is_empty())
            .map(str::to_string)
    }

    /// Default credentials for pages requiring authentication.
    pub fn credentials(&self) -> Option<Credentials> {
        let user = self.string("default_user")?;
        Some(Credentials {
            user,
            password: self.string("default_password").unwrap_or_default(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed values
// ─────────────────────────────────────────────────────────────────────────────

/// A named shortcut shown in the toolbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct BookmarkEntry {
    url: String,
    #[serde(default)]
    description: Option<String>,
}

/// Initial window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    Maximized,
    Fixed { width: u32, height: u32 },
}

impl FromStr for WindowSize {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(Self::Maximized);
        }
        let invalid = || ParseValueError::WindowSize(s.to_string());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::Fixed { width, height })
    }
}

/// HTTP proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyServer {
    pub host: String,
    pub port: u16,
}

impl FromStr for ProxyServer {
    type Err = ParseValueError;

    /// Accepts `host:port` as well as the `scheme://host:port/` form usually
    /// found in `http_proxy`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseValueError::Proxy(s.to_string());
        let url = if s.contains("://") {
            Url::parse(s)
        } else {
            Url::parse(&format!("http://{s}"))
        }
        .map_err(|_| invalid())?;

        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Credentials supplied automatically on authentication challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, FileFormat, parse};
    use crate::resolver::{Environment, Overrides, resolve};

    fn config(yaml: &str) -> EffectiveConfig {
        let file = FileConfig::from_mapping(parse(yaml, FileFormat::Yaml).unwrap());
        resolve(&Overrides::new(), &Environment::default(), &file).unwrap()
    }

    #[test]
    fn test_defaults_match_registry() {
        let c = config("");
        assert_eq!(c.start_url(), "about:blank");
        assert_eq!(c.ssl_mode(), SslMode::Strict);
        assert_eq!(c.timeout_mode(), TimeoutMode::Reset);
        assert_eq!(c.quit_button_mode(), QuitButtonMode::Reset);
        assert_eq!(c.js_confirm_policy(), JsConfirmPolicy::Ask);
        assert_eq!(c.timeout(), None);
        assert_eq!(c.zoom_factor(), 1.0);
        assert_eq!(c.string("quit_button_text").as_deref(), Some("I'm &Finished"));
        assert!(c.bool("navigation"));
        assert!(c.bool("privacy_mode"));
        assert!(!c.bool("allow_popups"));
        assert!(c.bookmarks().is_empty());
        assert_eq!(c.navigation_layout().len(), 11);
        assert_eq!(c.navigation_layout()[0], NavItem::Back);
        assert!(c.window_size().is_none());
        assert!(c.proxy().is_none());
        assert!(c.credentials().is_none());
    }

    #[test]
    fn test_bookmarks_keep_file_order() {
        let c = config(
            r#"
bookmarks:
  Zeta:
    url: "http://zeta.local"
  Alpha:
    url: "http://alpha.local"
    description: "First letter"
  Broken:
    description: "no url"
"#,
        );
        let bookmarks = c.bookmarks();
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].name, "Zeta");
        assert_eq!(bookmarks[1].url, "http://alpha.local");
        assert_eq!(bookmarks[1].description.as_deref(), Some("First letter"));
    }

    #[test]
    fn test_layout_skips_unknown_tokens() {
        let c = config("navigation_layout: [back, teleport, print, quit]\n");
        assert_eq!(
            c.navigation_layout(),
            vec![NavItem::Back, NavItem::Print, NavItem::Quit]
        );
    }

    #[test]
    fn test_timeout_duration() {
        assert_eq!(config("timeout: 90\n").timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config("timeout: -5\n").timeout(), None);
    }

    #[test]
    fn test_zoom_non_positive_falls_back() {
        assert_eq!(config("zoom_factor: 0\n").zoom_factor(), 1.0);
        assert_eq!(config("zoom_factor: 1.5\n").zoom_factor(), 1.5);
    }

    #[test]
    fn test_window_size_parsing() {
        assert_eq!("max".parse::<WindowSize>(), Ok(WindowSize::Maximized));
        assert_eq!("MAX".parse::<WindowSize>(), Ok(WindowSize::Maximized));
        assert_eq!(
            "1024x768".parse::<WindowSize>(),
            Ok(WindowSize::Fixed { width: 1024, height: 768 })
        );
        assert!("1024".parse::<WindowSize>().is_err());
        assert!("0x768".parse::<WindowSize>().is_err());
        assert!("widexhigh".parse::<WindowSize>().is_err());
        assert!(config("window_size: huge\n").window_size().is_none());
    }

    #[test]
    fn test_proxy_parsing() {
        let proxy: ProxyServer = "proxy.local:3128".parse().unwrap();
        assert_eq!(proxy.host, "proxy.local");
        assert_eq!(proxy.port, 3128);
        assert_eq!(proxy.to_string(), "proxy.local:3128");

        let proxy: ProxyServer = "http://10.0.0.1:8080/".parse().unwrap();
        assert_eq!(proxy.host, "10.0.0.1");
        assert_eq!(proxy.port, 8080);

        let proxy: ProxyServer = "proxy.local".parse().unwrap();
        assert_eq!(proxy.port, 80);

        assert!(":3128".parse::<ProxyServer>().is_err());
    }

    #[test]
    fn test_content_handler_lookup() {
        let c = config("content_handlers:\n  application/pdf: /usr/bin/evince\n");
        assert_eq!(c.content_handler("application/pdf").as_deref(), Some("/usr/bin/evince"));
        assert!(c.content_handler("text/csv").is_none());
    }

    #[test]
    fn test_credentials_need_user() {
        let c = config("default_password: secret\n");
        assert!(c.credentials().is_none());
        let c = config("default_user: kiosk\n");
        assert_eq!(
            c.credentials(),
            Some(Credentials { user: "kiosk".into(), password: String::new() })
        );
    }

    #[test]
    fn test_to_yaml_contains_every_key() {
        let yaml = config("").to_yaml().unwrap();
        for setting in crate::settings::SETTINGS {
            assert!(yaml.contains(setting.key), "{}", setting.key);
        }
    }
}
