//! Hôte de rendu sans interface.
//!
//! Remplace la fenêtre graphique : les événements du moteur arrivent ligne par
//! ligne sur l'entrée (`navigate URL`, `load fail URL`, `idle`, ...) et les
//! commandes envoyées à l'hôte sont écrites, une par ligne, sur la sortie.
//!
//! ```text
//! > navigate http://evil.com/
//! < html <!DOCTYPE html>\n<html>...
//! > quit
//! < clear-history
//! < load http://library.local/
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::effective::Credentials;
use crate::host::RenderHost;
use crate::session::KioskController;

// ─────────────────────────────────────────────────────────────────────────────
// Événements entrants
// ─────────────────────────────────────────────────────────────────────────────

/// Un événement du moteur de rendu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Navigate(String),
    Redirect(String),
    LoadFinished { success: bool, url: String },
    TlsError(String),
    UnsupportedContent {
        content_type: String,
        url: String,
        disposition: Option<String>,
    },
    AuthRequired(String),
    Popup(String),
    Idle,
    Activity,
    Quit,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid event line: {0}")]
pub struct ParseEventError(String);

impl FromStr for HostEvent {
    type Err = ParseEventError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let err = || ParseEventError(line.to_string());
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let url = || {
            if rest.is_empty() {
                Err(err())
            } else {
                Ok(rest.to_string())
            }
        };

        match verb {
            "navigate" => Ok(Self::Navigate(url()?)),
            "redirect" => Ok(Self::Redirect(url()?)),
            "load" => {
                let (status, url) = rest.split_once(char::is_whitespace).ok_or_else(err)?;
                let success = match status {
                    "ok" => true,
                    "fail" => false,
                    _ => return Err(err()),
                };
                Ok(Self::LoadFinished { success, url: url.trim().to_string() })
            }
            "tls" => Ok(Self::TlsError(url()?)),
            "content" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let content_type = parts.next().filter(|s| !s.is_empty()).ok_or_else(err)?;
                let url = parts.next().ok_or_else(err)?;
                let disposition = parts.next().map(str::trim).filter(|s| !s.is_empty());
                Ok(Self::UnsupportedContent {
                    content_type: content_type.to_string(),
                    url: url.to_string(),
                    disposition: disposition.map(str::to_string),
                })
            }
            "auth" => Ok(Self::AuthRequired(url()?)),
            "popup" => Ok(Self::Popup(url()?)),
            "idle" => Ok(Self::Idle),
            "activity" => Ok(Self::Activity),
            "quit" => Ok(Self::Quit),
            "reset" => Ok(Self::Reset),
            _ => Err(err()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hôte
// ─────────────────────────────────────────────────────────────────────────────

/// Écrit les commandes de l'hôte sur `W`.
pub struct StdoutHost<W: Write> {
    out: RefCell<W>,
    closed: Cell<bool>,
}

impl<W: Write> StdoutHost<W> {
    pub fn new(out: W) -> Self {
        Self { out: RefCell::new(out), closed: Cell::new(false) }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, line: fmt::Arguments<'_>) {
        let mut out = self.out.borrow_mut();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write host command");
        }
    }
}

impl<W: Write> RenderHost for StdoutHost<W> {
    fn load(&self, url: &str) {
        self.emit(format_args!("load {url}"));
    }

    fn set_html(&self, html: &str) {
        // Une commande par ligne.
        let escaped = html.replace('\\', "\\\\").replace('\n', "\\n");
        self.emit(format_args!("html {escaped}"));
    }

    fn ignore_tls_errors(&self) {
        self.emit(format_args!("ignore-tls"));
    }

    fn clear_history(&self) {
        self.emit(format_args!("clear-history"));
    }

    fn launch(&self, program: &str, url: &str) {
        self.emit(format_args!("launch {program} {url}"));
    }

    fn provide_credentials(&self, credentials: &Credentials) {
        // Le mot de passe n'est jamais écrit.
        self.emit(format_args!("credentials {}", credentials.user));
    }

    fn close(&self) {
        self.closed.set(true);
        self.emit(format_args!("close"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Boucle
// ─────────────────────────────────────────────────────────────────────────────

/// Transmet un événement au contrôleur.
pub fn dispatch<H: RenderHost>(controller: &KioskController<H>, event: &HostEvent) {
    match event {
        HostEvent::Navigate(url) => {
            controller.on_navigation_requested(url);
        }
        HostEvent::Redirect(url) => {
            controller.on_redirect(url);
        }
        HostEvent::LoadFinished { success, url } => {
            controller.on_load_finished(*success, url);
        }
        HostEvent::TlsError(url) => {
            controller.on_tls_error(url);
        }
        HostEvent::UnsupportedContent { content_type, url, disposition } => {
            controller.on_unsupported_content(content_type, url, disposition.as_deref());
        }
        HostEvent::AuthRequired(url) => {
            controller.on_auth_required(url);
        }
        HostEvent::Popup(url) => {
            if controller.on_popup_requested(url) {
                controller.on_navigation_requested(url);
            }
        }
        HostEvent::Idle => controller.on_inactivity_timeout(),
        HostEvent::Activity => controller.on_activity(),
        HostEvent::Quit => controller.on_quit_button(),
        HostEvent::Reset => {
            controller.reset();
        }
    }
}

/// Lit les événements jusqu'à la fin de l'entrée ou la fermeture de la fenêtre.
/// Les lignes vides et les commentaires `#` sont ignorés.
pub fn run<W: Write, R: BufRead>(
    controller: &KioskController<StdoutHost<W>>,
    input: R,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.parse::<HostEvent>() {
            Ok(event) => {
                debug!(?event, "Host event");
                dispatch(controller, &event);
            }
            Err(e) => warn!(error = %e, "Ignoring event"),
        }
        if controller.host().is_closed() {
            break;
        }
    }
    Ok(())
}
