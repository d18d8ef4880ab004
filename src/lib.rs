//! # SuriKiosk : navigateur kiosque
//!
//! Résolution de configuration et moteur de politique de navigation pour un
//! navigateur en mode kiosque (bornes publiques, bibliothèques, salons).
//!
//! ## Architecture des modules
//!
//! - [`settings`] : Registre déclaratif de tous les réglages (type, défaut,
//!   valeurs permises, variable d'environnement, indirection fichier).
//!
//! - [`config`] : Découverte et lecture du fichier de configuration
//!   (YAML ou TOML), normalisé en un mapping unique.
//!
//! - [`resolver`] : Fusion CLI > environnement > fichier > défaut, coercition
//!   des types. Produit un [`effective::EffectiveConfig`] immuable.
//!
//! - [`effective`] : La configuration effective et ses vues typées
//!   (favoris, taille de fenêtre, proxy, identifiants).
//!
//! - [`whitelist`] : Liste blanche d'hôtes, correspondance exacte ou
//!   sous-domaine.
//!
//! - [`policy`] : Décisions de navigation (autoriser, ou substituer une page
//!   de repli) et rendu des pages de repli.
//!
//! - [`templates`] / [`content`] : Pages de repli intégrées et gestion du
//!   contenu non affichable.
//!
//! - [`host`] / [`session`] : Contrat avec l'hôte de rendu et contrôleur de
//!   session (verrouillage, timeout, reset atomique).
//!
//! - [`headless`] : Hôte de rendu sur stdin/stdout, utilisé par le binaire.
//!
//! - [`cli`] / [`logging`] / [`error`] : Surface ligne de commande,
//!   subscriber `tracing`, erreurs fatales.

pub mod cli;
pub mod config;
pub mod content;
pub mod effective;
pub mod error;
pub mod headless;
pub mod host;
pub mod logging;
pub mod policy;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod templates;
pub mod whitelist;
