//! Hostname whitelist.
//!
//! A [`Whitelist`] is derived once per [`EffectiveConfig`]. When the
//! `whitelist` setting is truthy it is seeded with the host of the start URL
//! and of every bookmark, plus any explicitly listed hosts. Entries are
//! normalised (IDNA, ASCII-lowercase, no trailing dot) and deduplicated.
//!
//! Matching is exact-or-subdomain: pattern `p` matches host `h` iff `h == p`
//! or `h` ends with `"." + p`. This is the anchored expression
//! `(^|.*\.)(p1|p2|...)$` with every literal dot escaped, evaluated without a
//! regex engine so a dot can never act as a wildcard.

use serde_yaml::Value;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::effective::EffectiveConfig;
use crate::settings::TimeoutMode;

/// Set of permitted host suffixes, or no restriction at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Whitelist {
    /// Whitelisting is off: every destination is allowed.
    #[default]
    Disabled,
    /// Only these hosts (and their subdomains) are allowed.
    Hosts(Vec<String>),
}

impl Whitelist {
    /// Derives the whitelist from a resolved configuration.
    pub fn derive(config: &EffectiveConfig) -> Self {
        let explicit: Vec<String> = match config.get("whitelist") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Self::Disabled,
            Some(Value::Bool(true)) => Vec::new(),
            Some(Value::Sequence(items)) if items.is_empty() => return Self::Disabled,
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(s) => Some(s.to_string()),
                    None => {
                        warn!(entry = ?item, "Ignoring non-string whitelist entry");
                        None
                    }
                })
                .collect(),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "no" | "off" | "0" => return Self::Disabled,
                "true" | "yes" | "on" | "1" => Vec::new(),
                _ => vec![s.clone()],
            },
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return Self::Disabled,
            Some(Value::Mapping(entries)) if entries.is_empty() => return Self::Disabled,
            // Any other truthy value seeds only.
            Some(other) => {
                warn!(value = ?other, "Whitelist is not a list, seeding from start URL and bookmarks only");
                Vec::new()
            }
        };

        let mut seeds = vec![config.start_url()];
        seeds.extend(config.bookmarks().into_iter().map(|b| b.url));
        if config.timeout_mode() == TimeoutMode::Screensaver {
            seeds.push(config.screensaver_url());
        }

        let seed_hosts = seeds
            .iter()
            .filter_map(|url| Url::parse(url).ok())
            .filter_map(|url| url.host_str().map(str::to_string));

        let whitelist = Self::from_hosts(explicit.into_iter().chain(seed_hosts));
        debug!(
            pattern = whitelist.pattern().as_deref().unwrap_or(""),
            "Generated whitelist"
        );
        whitelist
    }

    /// Builds an enabled whitelist from raw host patterns. Entries that do not
    /// normalise to a host are dropped.
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in hosts {
            let raw = raw.as_ref();
            match normalize_pattern(raw) {
                Some(host) if !normalized.contains(&host) => normalized.push(host),
                Some(_) => {}
                None => warn!(entry = raw, "Ignoring invalid whitelist entry"),
            }
        }
        Self::Hosts(normalized)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Hosts(_))
    }

    /// Normalised patterns; empty when disabled.
    pub fn hosts(&self) -> &[String] {
        match self {
            Self::Disabled => &[],
            Self::Hosts(hosts) => hosts,
        }
    }

    /// Returns `true` if `host` is permitted. A disabled whitelist permits
    /// everything.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Disabled => true,
            Self::Hosts(patterns) => {
                let host = normalize_host(host);
                patterns.iter().any(|p| host_matches(&host, p))
            }
        }
    }

    /// Equivalent anchored regular expression, for diagnostics.
    pub fn pattern(&self) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Hosts(hosts) => {
                let alternatives: Vec<String> =
                    hosts.iter().map(|h| h.replace('.', "\\.")).collect();
                Some(format!("(^|.*\\.)({})$", alternatives.join("|")))
            }
        }
    }
}

/// Suffix match on already-normalised strings.
pub fn host_matches(host: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    match host.strip_suffix(pattern) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// Normalises a host taken from a parsed URL: ASCII-lowercase, trailing dot
/// removed.
pub fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Normalises a configured whitelist entry. Accepts bare hosts, `*.host`,
/// `.host` and full URLs.
fn normalize_pattern(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        Url::parse(raw).ok()?.host_str()?.to_string()
    } else {
        raw.trim_start_matches("*.").trim_start_matches('.').to_string()
    };
    let candidate = candidate.trim_end_matches('.');
    if candidate.is_empty() {
        return None;
    }
    let host = match Host::parse(candidate).ok()? {
        Host::Domain(domain) => domain,
        ip => ip.to_string(),
    };
    Some(normalize_host(&host))
}
