//! Navigation policy engine.
//!
//! Decides, per event fired by the render host, whether a destination may be
//! shown and which fallback page replaces it otherwise. Every evaluation is a
//! total, side-effect-free function of the request and the
//! [`EffectiveConfig`]: nothing here returns an error or panics on bad input.
//! Unparseable URLs are denied (unless whitelisting is disabled) and logged.

use std::fmt;

use tracing::{debug, info, warn};
use url::Url;

use crate::content::{self, ContentDecision};
use crate::effective::{Credentials, EffectiveConfig};
use crate::settings::SslMode;
use crate::templates;
use crate::whitelist::{self, Whitelist};

const BLANK_PAGE: &str = "about:blank";

/// Fallback content shown instead of a denied or failed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstituteKind {
    NotFoundPage,
    NetworkDownPage,
    CertificateErrorPage,
    UnsupportedContentPage,
}

impl SubstituteKind {
    /// Setting holding the template for this kind.
    pub fn setting_key(self) -> &'static str {
        match self {
            Self::NotFoundPage => "page_unavailable_html",
            Self::NetworkDownPage => "network_down_html",
            Self::CertificateErrorPage => "certificate_error_html",
            Self::UnsupportedContentPage => "unsupported_content_html",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            Self::NotFoundPage => templates::NOT_FOUND_HTML,
            Self::NetworkDownPage => templates::NETWORK_DOWN_HTML,
            Self::CertificateErrorPage => templates::CERTIFICATE_ERROR_HTML,
            Self::UnsupportedContentPage => templates::UNSUPPORTED_CONTENT_HTML,
        }
    }
}

impl fmt::Display for SubstituteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFoundPage => "not-found",
            Self::NetworkDownPage => "network-down",
            Self::CertificateErrorPage => "certificate-error",
            Self::UnsupportedContentPage => "unsupported-content",
        })
    }
}

/// Outcome of a navigation or load evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Deny(SubstituteKind),
}

impl NavigationDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Policy derived from one [`EffectiveConfig`]. Rebuilt, never mutated, on
/// reset.
#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    config: EffectiveConfig,
    whitelist: Whitelist,
    start_url: String,
    start: Option<Url>,
}

impl NavigationPolicy {
    pub fn new(config: EffectiveConfig) -> Self {
        let whitelist = Whitelist::derive(&config);
        let start_url = config.start_url();
        let start = Url::parse(&start_url)
            .map_err(|e| warn!(url = %start_url, error = %e, "Start URL does not parse"))
            .ok();
        Self {
            config,
            whitelist,
            start_url,
            start,
        }
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    // ── Navigation ────────────────────────────────────────────────────────

    /// Decides whether a navigation to `url` may proceed.
    pub fn evaluate_navigation(&self, url: &str) -> NavigationDecision {
        if !self.whitelist.is_enabled() || url.trim() == BLANK_PAGE {
            return NavigationDecision::Allow;
        }

        let parsed = match Url::parse(url.trim()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "Invalid URL, denying navigation");
                return NavigationDecision::Deny(SubstituteKind::NotFoundPage);
            }
        };

        let Some(host) = parsed.host_str() else {
            info!(url, "Navigation without host denied by whitelist");
            return NavigationDecision::Deny(SubstituteKind::NotFoundPage);
        };

        let start_host = self.start.as_ref().and_then(Url::host_str);
        if start_host.is_some_and(|start| {
            whitelist::normalize_host(start) == whitelist::normalize_host(host)
        }) || self.whitelist.matches(host)
        {
            debug!(url, "Navigation allowed");
            return NavigationDecision::Allow;
        }

        info!(url, host, "Navigation denied by whitelist");
        NavigationDecision::Deny(SubstituteKind::NotFoundPage)
    }

    /// Navigation performed inside the render host (redirect, script). Only
    /// constrained when `whitelist_redirects` is on.
    pub fn evaluate_redirect(&self, url: &str) -> NavigationDecision {
        if self.config.bool("whitelist_redirects") {
            self.evaluate_navigation(url)
        } else {
            NavigationDecision::Allow
        }
    }

    // ── Load results ──────────────────────────────────────────────────────

    /// Picks the fallback for a failed load. Successful loads need no override.
    ///
    /// A failure on the start page itself (same host, same path ignoring
    /// trailing slashes) means the network is down; anything else is a 404.
    pub fn evaluate_load_result(&self, url: &str, success: bool) -> Option<NavigationDecision> {
        if success {
            return None;
        }

        let kind = match (Url::parse(url.trim()), &self.start) {
            (Ok(failed), Some(start)) if same_page(&failed, start) => {
                warn!(url, "Start URL doesn't seem to be available");
                SubstituteKind::NetworkDownPage
            }
            (Ok(_), _) => {
                info!(url, "Page failed to load");
                SubstituteKind::NotFoundPage
            }
            (Err(e), _) => {
                warn!(url, error = %e, "Invalid URL in load result");
                SubstituteKind::NotFoundPage
            }
        };
        Some(NavigationDecision::Deny(kind))
    }

    /// Certificate errors are only ever ignored when `ssl_mode` is `ignore`.
    pub fn evaluate_tls_error(&self, url: &str) -> NavigationDecision {
        match self.config.ssl_mode() {
            SslMode::Ignore => {
                debug!(url, "SSL error ignored");
                NavigationDecision::Allow
            }
            SslMode::Strict => {
                info!(url, "SSL error, refusing page");
                NavigationDecision::Deny(SubstituteKind::CertificateErrorPage)
            }
        }
    }

    // ── Other host requests ───────────────────────────────────────────────

    /// Content the engine cannot render: hand it to an external program when
    /// allowed and configured, otherwise show the unsupported-content page.
    pub fn evaluate_unsupported_content(&self, content_type: &str, url: &str) -> ContentDecision {
        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if self.config.bool("allow_external_content")
            && let Some(program) = self.config.content_handler(&content_type)
        {
            info!(url, content_type = %content_type, program = %program, "Handing content to external program");
            return ContentDecision::Handoff { program };
        }

        info!(url, content_type = %content_type, "Unrenderable content");
        ContentDecision::Deny(SubstituteKind::UnsupportedContentPage)
    }

    /// Credentials to answer an authentication challenge with.
    pub fn evaluate_auth_request(&self, url: &str) -> Option<Credentials> {
        let credentials = self.config.credentials();
        debug!(url, supplied = credentials.is_some(), "Authentication required");
        credentials
    }

    pub fn popups_allowed(&self) -> bool {
        self.config.bool("allow_popups")
    }

    // ── Fallback content ──────────────────────────────────────────────────

    /// Renders the fallback page for `kind`. `{start_url}` is always
    /// available; `vars` supplies the rest (and may override it).
    pub fn substitute_html(&self, kind: SubstituteKind, vars: &[(&str, &str)]) -> String {
        let template = self.config.string(kind.setting_key());
        let template = template.as_deref().unwrap_or(kind.builtin());

        let mut all: Vec<(&str, &str)> = vars.to_vec();
        all.push(("start_url", self.start_url.as_str()));
        templates::fill(template, &all)
    }

    /// Convenience for the unsupported-content page.
    pub fn unsupported_content_html(
        &self,
        content_type: &str,
        url: &str,
        disposition: Option<&str>,
    ) -> String {
        let filename = disposition
            .and_then(content::filename_from_disposition)
            .unwrap_or_default();
        self.substitute_html(
            SubstituteKind::UnsupportedContentPage,
            &[("url", url), ("content_type", content_type), ("filename", filename.as_str())],
        )
    }
}

/// Same host and same path, ignoring trailing slashes.
fn same_page(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}
