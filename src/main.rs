//! Point d'entrée de SuriKiosk.
//!
//! Usage :
//!   surikiosk [OPTIONS]
//!
//! Exemples :
//!   surikiosk -l http://library.local/        → page d'accueil imposée
//!   surikiosk -c kiosk.toml --print-config    → affiche la configuration effective
//!   surikiosk -d < events.txt                 → rejoue une session sur stdin

use std::error::Error;
use std::io;

use clap::Parser;

use surikiosk::cli::CliOptions;
use surikiosk::config::FileConfig;
use surikiosk::headless::{self, StdoutHost};
use surikiosk::resolver::{ConfigSources, Environment};
use surikiosk::session::KioskController;

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Ligne de commande ───────────────────────────────────────────
    let cli = CliOptions::parse();

    // ── 2. Logging / Tracing ───────────────────────────────────────────
    surikiosk::logging::init(cli.debug, cli.debug_log.as_deref());

    // ── 3. Sources de configuration ────────────────────────────────────
    let env = Environment::from_process();
    let file = FileConfig::discover(cli.config_file.as_deref(), &env);
    let sources = ConfigSources::new(cli.overrides(), env, file);

    // ── 4. Résolution (une erreur de coercition est fatale) ────────────
    let config = sources.resolve()?;

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    // ── 5. Session kiosque sur stdin/stdout ────────────────────────────
    let policy = surikiosk::policy::NavigationPolicy::new(config);
    let controller = KioskController::with_policy(StdoutHost::new(io::stdout()), sources, policy);
    controller.start();
    if let Some(timeout) = controller.inactivity_timeout() {
        tracing::info!(seconds = timeout.as_secs(), "Inactivity timeout configured");
    }

    headless::run(&controller, io::stdin().lock())?;
    Ok(())
}
