//! Contrôleur de session kiosque.
//!
//! ## Machine à états
//!
//! ```text
//!            navigation refusée / chargement échoué
//!   Active ─────────────────────────────────────────▶ Locked(kind)
//!     ▲                                                   │
//!     └──────── navigation autorisée ou reset ◀───────────┘
//!
//!   n'importe quel état ── reset ──▶ Active (historique vidé)
//!   n'importe quel état ── timeout (mode screensaver) ──▶ Screensaver
//!   Screensaver ── activité ──▶ reset
//! ```
//!
//! ## Reset
//!
//! Le reset reconstruit la configuration depuis les mêmes sources (CLI,
//! environnement, fichier déjà lu), remplace la politique, vide l'historique,
//! repasse en `Active` et recharge la page d'accueil. Il est atomique du point
//! de vue du thread UI : un second reset déclenché pendant le premier (timer
//! ré-entrant, callback de l'hôte) est ignoré.
//!
//! Tout vit sur le thread UI : `Cell`/`RefCell`, pas d'`Arc`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::content::ContentDecision;
use crate::error::ConfigError;
use crate::host::RenderHost;
use crate::policy::{NavigationDecision, NavigationPolicy, SubstituteKind};
use crate::resolver::ConfigSources;
use crate::settings::{QuitButtonMode, TimeoutMode};

/// État d'une fenêtre kiosque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Navigation normale.
    Active,
    /// Une page de repli est affichée.
    Locked(SubstituteKind),
    /// L'économiseur d'écran est affiché ; la prochaine activité déclenche un reset.
    Screensaver,
}

/// Comportement associé au timeout d'inactivité et au bouton « terminé ».
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Reset,
    Close,
    Screensaver,
}

impl From<TimeoutMode> for SessionAction {
    fn from(mode: TimeoutMode) -> Self {
        match mode {
            TimeoutMode::Reset => Self::Reset,
            TimeoutMode::Close => Self::Close,
            TimeoutMode::Screensaver => Self::Screensaver,
        }
    }
}

impl From<QuitButtonMode> for SessionAction {
    fn from(mode: QuitButtonMode) -> Self {
        match mode {
            QuitButtonMode::Reset => Self::Reset,
            QuitButtonMode::Close => Self::Close,
        }
    }
}

/// Drapeau « reset en cours », relâché au drop.
struct ResetGuard<'a>(&'a Cell<bool>);

impl<'a> ResetGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// KioskController
// ─────────────────────────────────────────────────────────────────────────────

/// Relie les événements de l'hôte de rendu au moteur de politique.
pub struct KioskController<H: RenderHost> {
    host: H,
    sources: ConfigSources,
    /// Politique courante. `Rc` pour ne jamais garder d'emprunt pendant
    /// qu'on rappelle l'hôte (qui peut ré-entrer).
    policy: RefCell<Rc<NavigationPolicy>>,
    state: Cell<SessionState>,
    history: RefCell<Vec<String>>,
    resetting: Cell<bool>,
}

impl<H: RenderHost> KioskController<H> {
    /// Résout la configuration et crée le contrôleur. Échoue uniquement sur
    /// une erreur de coercition.
    pub fn new(host: H, sources: ConfigSources) -> Result<Self, ConfigError> {
        let policy = NavigationPolicy::new(sources.resolve()?);
        Ok(Self::with_policy(host, sources, policy))
    }

    pub fn with_policy(host: H, sources: ConfigSources, policy: NavigationPolicy) -> Self {
        Self {
            host,
            sources,
            policy: RefCell::new(Rc::new(policy)),
            state: Cell::new(SessionState::Active),
            history: RefCell::new(Vec::new()),
            resetting: Cell::new(false),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Politique en vigueur pour la session courante.
    pub fn policy(&self) -> Rc<NavigationPolicy> {
        self.policy.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// URLs autorisées depuis le dernier reset.
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    /// Délai d'inactivité que l'hôte doit armer (`None` = désactivé).
    pub fn inactivity_timeout(&self) -> Option<Duration> {
        self.policy().config().timeout()
    }

    /// Charge la page d'accueil.
    pub fn start(&self) {
        let start = self.policy().start_url().to_string();
        info!(url = %start, "Loading start page");
        self.host.load(&start);
    }

    // ── Événements de navigation ─────────────────────────────────────────

    pub fn on_navigation_requested(&self, url: &str) -> NavigationDecision {
        let policy = self.policy();
        let decision = policy.evaluate_navigation(url);
        self.apply(&policy, url, decision);
        decision
    }

    /// Navigation interne au moteur (redirection, script).
    pub fn on_redirect(&self, url: &str) -> NavigationDecision {
        let policy = self.policy();
        let decision = policy.evaluate_redirect(url);
        self.apply(&policy, url, decision);
        decision
    }

    pub fn on_load_finished(&self, success: bool, url: &str) -> Option<NavigationDecision> {
        let policy = self.policy();
        let decision = policy.evaluate_load_result(url, success);
        if let Some(NavigationDecision::Deny(kind)) = decision {
            self.lock(&policy, kind, url);
        }
        decision
    }

    pub fn on_tls_error(&self, url: &str) -> NavigationDecision {
        let policy = self.policy();
        let decision = policy.evaluate_tls_error(url);
        match decision {
            NavigationDecision::Allow => self.host.ignore_tls_errors(),
            NavigationDecision::Deny(kind) => self.lock(&policy, kind, url),
        }
        decision
    }

    pub fn on_unsupported_content(
        &self,
        content_type: &str,
        url: &str,
        disposition: Option<&str>,
    ) -> ContentDecision {
        let policy = self.policy();
        let decision = policy.evaluate_unsupported_content(content_type, url);
        match &decision {
            ContentDecision::Handoff { program } => self.host.launch(program, url),
            ContentDecision::Deny(kind) => {
                let html = policy.unsupported_content_html(content_type, url, disposition);
                self.state.set(SessionState::Locked(*kind));
                self.host.set_html(&html);
            }
        }
        decision
    }

    /// Retourne `true` si des identifiants ont été fournis.
    pub fn on_auth_required(&self, url: &str) -> bool {
        match self.policy().evaluate_auth_request(url) {
            Some(credentials) => {
                self.host.provide_credentials(&credentials);
                true
            }
            None => false,
        }
    }

    /// Retourne `true` si l'hôte peut ouvrir la fenêtre popup.
    pub fn on_popup_requested(&self, url: &str) -> bool {
        let allowed = self.policy().popups_allowed();
        if !allowed {
            debug!(url, "Popup not loaded");
        }
        allowed
    }

    // ── Inactivité et bouton « terminé » ─────────────────────────────────

    /// Activité utilisateur (souris, clavier). Sort de l'économiseur d'écran.
    pub fn on_activity(&self) {
        if self.state.get() == SessionState::Screensaver {
            self.reset();
        }
    }

    pub fn on_inactivity_timeout(&self) {
        let action = SessionAction::from(self.policy().config().timeout_mode());
        debug!(?action, "Inactivity timeout");
        self.perform(action);
    }

    pub fn on_quit_button(&self) {
        let action = SessionAction::from(self.policy().config().quit_button_mode());
        debug!(?action, "Quit button pressed");
        self.perform(action);
    }

    pub fn perform(&self, action: SessionAction) {
        match action {
            SessionAction::Reset => {
                self.reset();
            }
            SessionAction::Close => {
                info!("Closing browser");
                self.host.close();
            }
            SessionAction::Screensaver => {
                let url = self.policy().config().screensaver_url();
                info!(url = %url, "Showing screensaver");
                self.state.set(SessionState::Screensaver);
                self.host.load(&url);
            }
        }
    }

    /// Reconstruit la configuration et revient à la page d'accueil.
    ///
    /// Retourne `false` si un reset était déjà en cours (appel ignoré). Si la
    /// reconstruction échoue, la configuration précédente est conservée.
    pub fn reset(&self) -> bool {
        let Some(_guard) = ResetGuard::acquire(&self.resetting) else {
            info!("Reset already in progress, ignoring");
            return false;
        };

        info!("Resetting browser");
        match self.sources.resolve() {
            Ok(config) => {
                *self.policy.borrow_mut() = Rc::new(NavigationPolicy::new(config));
            }
            Err(e) => error!(error = %e, "Configuration rebuild failed, keeping previous configuration"),
        }

        self.history.borrow_mut().clear();
        self.state.set(SessionState::Active);
        self.host.clear_history();
        self.start();
        true
    }

    // ── Interne ──────────────────────────────────────────────────────────

    fn apply(&self, policy: &NavigationPolicy, url: &str, decision: NavigationDecision) {
        match decision {
            NavigationDecision::Allow => {
                self.state.set(SessionState::Active);
                let mut history = self.history.borrow_mut();
                if history.last().map(String::as_str) != Some(url) {
                    history.push(url.to_string());
                }
            }
            NavigationDecision::Deny(kind) => self.lock(policy, kind, url),
        }
    }

    fn lock(&self, policy: &NavigationPolicy, kind: SubstituteKind, url: &str) {
        let html = policy.substitute_html(kind, &[("url", url)]);
        self.state.set(SessionState::Locked(kind));
        self.host.set_html(&html);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::OnceCell;
    use std::rc::Weak;

    use super::*;
    use crate::config::{FileConfig, FileFormat, parse};
    use crate::effective::Credentials;
    use crate::resolver::{Environment, Overrides};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum HostCall {
        Load(String),
        SetHtml(String),
        IgnoreTls,
        ClearHistory,
        Launch(String, String),
        Credentials(String),
        Close,
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: RefCell<Vec<HostCall>>,
    }

    impl RecordingHost {
        fn take(&self) -> Vec<HostCall> {
            std::mem::take(&mut *self.calls.borrow_mut())
        }
    }

    impl RenderHost for RecordingHost {
        fn load(&self, url: &str) {
            self.calls.borrow_mut().push(HostCall::Load(url.into()));
        }
        fn set_html(&self, html: &str) {
            self.calls.borrow_mut().push(HostCall::SetHtml(html.into()));
        }
        fn ignore_tls_errors(&self) {
            self.calls.borrow_mut().push(HostCall::IgnoreTls);
        }
        fn clear_history(&self) {
            self.calls.borrow_mut().push(HostCall::ClearHistory);
        }
        fn launch(&self, program: &str, url: &str) {
            self.calls
                .borrow_mut()
                .push(HostCall::Launch(program.into(), url.into()));
        }
        fn provide_credentials(&self, credentials: &Credentials) {
            self.calls
                .borrow_mut()
                .push(HostCall::Credentials(credentials.user.clone()));
        }
        fn close(&self) {
            self.calls.borrow_mut().push(HostCall::Close);
        }
    }

    fn sources(yaml: &str) -> ConfigSources {
        let file = FileConfig::from_mapping(parse(yaml, FileFormat::Yaml).unwrap());
        ConfigSources::new(Overrides::new(), Environment::default(), file)
    }

    const KIOSK: &str = r#"
start_url: "http://library.local/"
whitelist: [example.com]
timeout: 60
"#;

    #[test]
    fn test_start_loads_start_url() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();
        controller.start();
        assert_eq!(host.take(), vec![HostCall::Load("http://library.local/".into())]);
        assert_eq!(controller.inactivity_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_denied_navigation_locks_and_allowed_unlocks() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();

        let decision = controller.on_navigation_requested("http://evil.com/");
        assert_eq!(decision, NavigationDecision::Deny(SubstituteKind::NotFoundPage));
        assert_eq!(
            controller.state(),
            SessionState::Locked(SubstituteKind::NotFoundPage)
        );
        match host.take().as_slice() {
            [HostCall::SetHtml(html)] => assert!(html.contains("http://library.local/")),
            other => panic!("unexpected host calls: {other:?}"),
        }

        assert!(controller.on_navigation_requested("http://www.example.com/").is_allowed());
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.history(), vec!["http://www.example.com/".to_string()]);
        assert!(host.take().is_empty());
    }

    #[test]
    fn test_failed_start_page_shows_network_down() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();
        controller.on_load_finished(false, "http://library.local");
        assert_eq!(
            controller.state(),
            SessionState::Locked(SubstituteKind::NetworkDownPage)
        );
        assert_eq!(controller.on_load_finished(true, "http://library.local/"), None);
    }

    #[test]
    fn test_tls_error_strict_and_ignore() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();
        controller.on_tls_error("https://example.com/");
        assert_eq!(
            controller.state(),
            SessionState::Locked(SubstituteKind::CertificateErrorPage)
        );

        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources("ssl_mode: ignore\n")).unwrap();
        controller.on_tls_error("https://example.com/");
        assert_eq!(host.take(), vec![HostCall::IgnoreTls]);
        assert_eq!(controller.state(), SessionState::Active);
    }

    #[test]
    fn test_unsupported_content_handoff_and_fallback() {
        let yaml = "allow_external_content: true\ncontent_handlers:\n  application/pdf: evince\n";
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(yaml)).unwrap();

        controller.on_unsupported_content("application/pdf", "http://x/a.pdf", None);
        assert_eq!(
            host.take(),
            vec![HostCall::Launch("evince".into(), "http://x/a.pdf".into())]
        );

        controller.on_unsupported_content("application/zip", "http://x/a.zip", None);
        assert_eq!(
            controller.state(),
            SessionState::Locked(SubstituteKind::UnsupportedContentPage)
        );
    }

    #[test]
    fn test_auth_and_popup() {
        let host = RecordingHost::default();
        let controller =
            KioskController::new(&host, sources("default_user: kiosk\n")).unwrap();
        assert!(controller.on_auth_required("http://intranet/"));
        assert_eq!(host.take(), vec![HostCall::Credentials("kiosk".into())]);
        assert!(!controller.on_popup_requested("http://intranet/popup"));
    }

    #[test]
    fn test_reset_clears_history_and_reloads_start() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();
        controller.on_navigation_requested("http://example.com/a");
        controller.on_navigation_requested("http://evil.com/");
        host.take();

        assert!(controller.reset());
        assert_eq!(controller.state(), SessionState::Active);
        assert!(controller.history().is_empty());
        assert_eq!(
            host.take(),
            vec![
                HostCall::ClearHistory,
                HostCall::Load("http://library.local/".into())
            ]
        );
    }

    #[test]
    fn test_reset_rebuilds_identical_config() {
        let host = RecordingHost::default();
        let controller = KioskController::new(&host, sources(KIOSK)).unwrap();
        let before = controller.policy().config().clone();
        controller.reset();
        assert_eq!(controller.policy().config(), &before);
    }

    #[test]
    fn test_timeout_and_quit_modes() {
        let host = RecordingHost::default();
        let controller = KioskController::new(
            &host,
            sources("timeout_mode: close\nquit_button_mode: reset\n"),
        )
        .unwrap();
        controller.on_inactivity_timeout();
        assert_eq!(host.take(), vec![HostCall::Close]);
        controller.on_quit_button();
        assert_eq!(
            host.take(),
            vec![HostCall::ClearHistory, HostCall::Load("about:blank".into())]
        );
    }

    #[test]
    fn test_screensaver_then_activity_resets() {
        let host = RecordingHost::default();
        let yaml = "start_url: http://library.local/\ntimeout_mode: screensaver\nscreensaver_url: http://slides.local/\n";
        let controller = KioskController::new(&host, sources(yaml)).unwrap();

        controller.on_activity();
        assert!(host.take().is_empty());

        controller.on_inactivity_timeout();
        assert_eq!(controller.state(), SessionState::Screensaver);
        assert_eq!(host.take(), vec![HostCall::Load("http://slides.local/".into())]);

        controller.on_activity();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(
            host.take(),
            vec![
                HostCall::ClearHistory,
                HostCall::Load("http://library.local/".into())
            ]
        );
    }

    #[test]
    fn test_action_mapping() {
        assert_eq!(SessionAction::from(TimeoutMode::Screensaver), SessionAction::Screensaver);
        assert_eq!(SessionAction::from(QuitButtonMode::Close), SessionAction::Close);
    }

    /// Hôte qui tente un second reset depuis un callback déclenché par le reset.
    #[derive(Default)]
    struct ReentrantHost {
        controller: OnceCell<Weak<KioskController<Rc<ReentrantHost>>>>,
        nested_reset: Cell<Option<bool>>,
        loads: RefCell<Vec<String>>,
    }

    impl RenderHost for ReentrantHost {
        fn load(&self, url: &str) {
            self.loads.borrow_mut().push(url.into());
        }
        fn set_html(&self, _html: &str) {}
        fn ignore_tls_errors(&self) {}
        fn clear_history(&self) {
            if let Some(controller) = self.controller.get().and_then(Weak::upgrade) {
                self.nested_reset.set(Some(controller.reset()));
            }
        }
        fn launch(&self, _program: &str, _url: &str) {}
        fn provide_credentials(&self, _credentials: &Credentials) {}
        fn close(&self) {}
    }

    #[test]
    fn test_reentrant_reset_is_ignored() {
        let host = Rc::new(ReentrantHost::default());
        let controller = Rc::new(KioskController::new(host.clone(), sources(KIOSK)).unwrap());
        host.controller.set(Rc::downgrade(&controller)).ok();

        assert!(controller.reset());
        assert_eq!(host.nested_reset.get(), Some(false));
        assert_eq!(host.loads.borrow().as_slice(), ["http://library.local/"]);

        // Le drapeau est relâché : un reset ultérieur passe.
        assert!(controller.reset());
    }
}
