//! Command-line surface.
//!
//! Switches that are not given stay *absent* in [`Overrides`] rather than
//! `false`, so they never mask a value from the environment or the config
//! file.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::resolver::Overrides;

#[derive(Parser, Debug, Default)]
#[command(name = "surikiosk", version, about = "Kiosk browser configuration and navigation policy", long_about = None)]
pub struct CliOptions {
    /// Start URL.
    #[arg(short = 'l', long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// Start fullscreen.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub fullscreen: bool,

    /// Hide the navigation bar.
    #[arg(short = 'n', long = "no-navigation", action = ArgAction::SetTrue)]
    pub no_navigation: bool,

    /// Configuration file (YAML, or TOML by extension).
    #[arg(short = 'c', long = "config-file", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Verbose logging on stderr.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Also append the log to FILE.
    #[arg(long = "debug-log", value_name = "FILE")]
    pub debug_log: Option<PathBuf>,

    /// Inactivity timeout in seconds (0 disables).
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Icon theme for the navigation bar.
    #[arg(short, long = "icon-theme", value_name = "THEME")]
    pub icon_theme: Option<String>,

    /// Page zoom factor.
    #[arg(short, long = "zoom", value_name = "FACTOR")]
    pub zoom: Option<f64>,

    /// Allow popup windows.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub popups: bool,

    /// Default user for authentication prompts.
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Default password for authentication prompts.
    #[arg(short = 'w', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Open unsupported content with external programs.
    #[arg(short = 'e', long = "allow-external", action = ArgAction::SetTrue)]
    pub allow_external: bool,

    /// Enable browser plugins.
    #[arg(short = 'g', long = "allow-plugins", action = ArgAction::SetTrue)]
    pub allow_plugins: bool,

    #[arg(long = "allow-printing", action = ArgAction::SetTrue)]
    pub allow_printing: bool,

    /// Window size, WIDTHxHEIGHT or `max`.
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Proxy server, HOST:PORT.
    #[arg(long, value_name = "HOST:PORT")]
    pub proxy: Option<String>,

    /// `strict` or `ignore`.
    #[arg(long = "ssl-mode", value_name = "MODE")]
    pub ssl_mode: Option<String>,

    /// `reset`, `close` or `screensaver`.
    #[arg(long = "timeout-mode", value_name = "MODE")]
    pub timeout_mode: Option<String>,

    /// HTML file shown for blocked or missing pages.
    #[arg(long = "page-unavailable-html", value_name = "PATH")]
    pub page_unavailable_html: Option<PathBuf>,

    /// HTML file shown when the start page cannot be reached.
    #[arg(long = "network-down-html", value_name = "PATH")]
    pub network_down_html: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit.
    #[arg(long = "print-config", action = ArgAction::SetTrue)]
    pub print_config: bool,
}

impl CliOptions {
    /// Settings given on the command line, keyed by setting name.
    pub fn overrides(&self) -> Overrides {
        let mut o = Overrides::new();
        o.set("start_url", self.url.clone());
        o.set("fullscreen", self.fullscreen.then_some(true));
        o.set("navigation", self.no_navigation.then_some(false));
        o.set("timeout", self.timeout);
        o.set("icon_theme", self.icon_theme.clone());
        o.set("zoom_factor", self.zoom);
        o.set("allow_popups", self.popups.then_some(true));
        o.set("default_user", self.user.clone());
        o.set("default_password", self.password.clone());
        o.set("allow_external_content", self.allow_external.then_some(true));
        o.set("allow_plugins", self.allow_plugins.then_some(true));
        o.set("allow_printing", self.allow_printing.then_some(true));
        o.set("window_size", self.size.clone());
        o.set("proxy_server", self.proxy.clone());
        o.set("ssl_mode", self.ssl_mode.clone());
        o.set("timeout_mode", self.timeout_mode.clone());
        o.set("page_unavailable_html", self.page_unavailable_html.as_deref().map(path_string));
        o.set("network_down_html", self.network_down_html.as_deref().map(path_string));
        o
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
