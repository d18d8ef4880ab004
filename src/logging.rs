//! Installation du subscriber `tracing`.
//!
//! Un seul subscriber par processus, construit depuis les options CLI :
//! - `RUST_LOG` gagne s'il est défini ;
//! - sinon `-d/--debug` → niveau `debug`, sinon `warn` ;
//! - `--debug-log FICHIER` ajoute une seconde sortie (sans couleurs) en ajout.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Niveau par défaut quand `RUST_LOG` est absent.
pub fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "warn" }
}

/// Installe le subscriber global. À appeler une seule fois, depuis `main`.
pub fn init(debug: bool, debug_log: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    let file_layer = debug_log.and_then(open_log_file).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

fn open_log_file(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            // Le subscriber n'est pas encore installé : stderr direct.
            eprintln!("cannot open debug log {}: {e}", path.display());
            None
        }
    }
}
