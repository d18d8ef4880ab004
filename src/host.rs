//! Contrat entre le moteur de politique et l'hôte de rendu.
//!
//! L'hôte de rendu (fenêtre + moteur web) est un collaborateur externe : il
//! charge et affiche les pages, et déclenche les événements consommés par
//! [`crate::session::KioskController`] (`on_navigation_requested`,
//! `on_load_finished`, `on_tls_error`, ...). En retour, le contrôleur lui
//! envoie des commandes via ce trait.
//!
//! Toutes les méthodes prennent `&self` : comme pour les delegates du moteur,
//! l'état mutable de l'hôte vit derrière `Cell`/`RefCell` sur le thread UI.

use crate::effective::Credentials;

/// Commandes que le contrôleur envoie à l'hôte de rendu.
pub trait RenderHost {
    /// Navigue vers `url`.
    fn load(&self, url: &str);

    /// Remplace le contenu affiché par `html` (page de repli).
    fn set_html(&self, html: &str);

    /// Ignore l'erreur de certificat en cours (mode `ssl_mode: ignore`).
    fn ignore_tls_errors(&self);

    /// Vide l'historique de navigation (reset).
    fn clear_history(&self);

    /// Télécharge `url` et l'ouvre avec `program`.
    fn launch(&self, program: &str, url: &str);

    /// Répond à une demande d'authentification.
    fn provide_credentials(&self, credentials: &Credentials);

    /// Ferme la fenêtre.
    fn close(&self);
}

impl<H: RenderHost + ?Sized> RenderHost for &H {
    fn load(&self, url: &str) {
        (**self).load(url)
    }

    fn set_html(&self, html: &str) {
        (**self).set_html(html)
    }

    fn ignore_tls_errors(&self) {
        (**self).ignore_tls_errors()
    }

    fn clear_history(&self) {
        (**self).clear_history()
    }

    fn launch(&self, program: &str, url: &str) {
        (**self).launch(program, url)
    }

    fn provide_credentials(&self, credentials: &Credentials) {
        (**self).provide_credentials(credentials)
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<H: RenderHost + ?Sized> RenderHost for std::rc::Rc<H> {
    fn load(&self, url: &str) {
        (**self).load(url)
    }

    fn set_html(&self, html: &str) {
        (**self).set_html(html)
    }

    fn ignore_tls_errors(&self) {
        (**self).ignore_tls_errors()
    }

    fn clear_history(&self) {
        (**self).clear_history()
    }

    fn launch(&self, program: &str, url: &str) {
        (**self).launch(program, url)
    }

    fn provide_credentials(&self, credentials: &Credentials) {
        (**self).provide_credentials(credentials)
    }

    fn close(&self) {
        (**self).close()
    }
}
