//! Erreurs fatales de configuration.
//!
//! Seule la coercition de type peut interrompre le démarrage : un fichier
//! absent, illisible ou mal formé est récupéré localement (voir
//! [`crate::config`]) et ne remonte jamais ici.

use thiserror::Error;

use crate::settings::SettingKind;

/// Erreur de résolution de configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Une valeur candidate n'a pas pu être convertie vers le type déclaré.
    #[error("invalid value for `{key}` (from {origin}): expected {expected}, found {found}")]
    Coercion {
        key: &'static str,
        expected: SettingKind,
        found: String,
        origin: crate::resolver::Source,
    },
}

impl ConfigError {
    /// Clé de configuration fautive.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Coercion { key, .. } => key,
        }
    }
}

/// Valeur composite mal formée. Jamais fatale : l'appelant journalise et ignore.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseValueError {
    #[error("invalid window size `{0}`, expected WIDTHxHEIGHT or max")]
    WindowSize(String),
    #[error("invalid proxy server `{0}`, expected host:port")]
    Proxy(String),
}
