//! Campnet - keep a device logged in to a Cyberoam-style captive portal
//!
//! Runs as a background agent by default. `once`, `login` and `logout` run a
//! single action and exit; `setup` writes a config interactively.

use anyhow::{Context, Result};
use campnet::config::{self, Config};
use campnet::daemon::{self, PollingLoop};
use campnet::eligibility::EligibilityCheck;
use campnet::network::{IdentityCache, PlatformSsid};
use campnet::orchestrator::{LoginOrchestrator, SettleDelays};
use campnet::portal::{CaptivePortal, CyberoamPortal};
use campnet::probe::ConnectivityProbe;
use campnet::session::{self, SessionState};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "campnet")]
#[command(about = "Captive Portal Keep-Alive Login Agent", long_about = None)]
struct Args {
    /// Config file path (default: search config.toml, user config dir, /etc/campnet)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Keep the device logged in until stopped (default)
    Run,
    /// Run a single polling tick and exit
    Once,
    /// Log in now, re-enabling auto-login
    Login,
    /// Log out now
    Logout,
    /// Prompt for credentials and write a config file
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let action = args.command.unwrap_or(Action::Run);

    if action == Action::Setup {
        let path = setup_target(args.config.as_deref())?;
        run_setup(&path)?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    // Load configuration
    let (cfg, cfg_path) = load_or_setup(args.config.as_deref())?;

    // Initialize logging
    campnet::logging::init(&cfg.logging)?;

    tracing::info!("Campnet v{} - Captive Portal Keep-Alive", env!("CARGO_PKG_VERSION"));
    tracing::info!("Config: {}", cfg_path.display());

    let session = SessionState::new();
    let mut orchestrator = build_orchestrator(&cfg, session.clone())?;

    match action {
        Action::Once => {
            let result = orchestrator.tick().await;
            tracing::info!("{}", result.status_text());
            Ok(())
        }
        Action::Login => {
            let result = orchestrator.force_login().await;
            tracing::info!("{}", result.status_text());
            Ok(())
        }
        Action::Logout => {
            orchestrator.force_logout().await;
            tracing::info!("{}", session.snapshot().text);
            Ok(())
        }
        Action::Run | Action::Setup => run_daemon(&cfg, cfg_path, orchestrator, session).await,
    }
}

/// Wire the portal, probe and eligibility rule from configuration
fn build_orchestrator(cfg: &Config, session: SessionState) -> Result<LoginOrchestrator> {
    let portal: Arc<dyn CaptivePortal> = Arc::new(
        CyberoamPortal::new(&cfg.portal.base_url, &cfg.http)
            .context("Failed to create portal client")?,
    );
    let probe = Arc::new(
        ConnectivityProbe::new(&cfg.probe.url, &cfg.http)
            .context("Failed to create connectivity probe")?,
    );
    let cache = IdentityCache::new(Box::new(PlatformSsid), cfg.identity_refresh());

    tracing::debug!("Using portal: {}", portal.name());
    Ok(LoginOrchestrator::new(
        portal,
        probe,
        EligibilityCheck::new(cfg.eligibility_rule(), cache),
        cfg.credentials(),
        SettleDelays {
            after_login: cfg.settle_after_login(),
            after_logout: cfg.settle_after_logout(),
        },
        session,
    ))
}

/// Run in daemon mode - continuous monitoring
async fn run_daemon(
    cfg: &Config,
    cfg_path: PathBuf,
    orchestrator: LoginOrchestrator,
    session: SessionState,
) -> Result<()> {
    tracing::info!("Starting daemon mode...");
    tracing::info!("Check interval: {}s", cfg.global.check_interval);
    tracing::info!("---");

    tokio::spawn(session::log_status_changes(session.subscribe()));

    let (polling, controller) = PollingLoop::new(orchestrator, cfg.check_interval());
    tokio::spawn(async move {
        if let Err(e) = daemon::handle_signals(controller, cfg_path).await {
            tracing::error!("Failed to install signal handlers: {}", e);
        }
    });

    polling.run().await;
    Ok(())
}

fn setup_target(explicit: Option<&Path>) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(Config::user_config_path)
        .context("Cannot determine a config location; pass --config")
}

fn run_setup(path: &Path) -> Result<Config> {
    // Re-running setup over an existing file only replaces the credentials.
    let base = if path.exists() {
        Config::read_file(path).unwrap_or_default()
    } else {
        Config::default()
    };
    let stdin = std::io::stdin();
    let cfg = config::interactive_setup(&mut stdin.lock(), &mut std::io::stdout(), base, path)?;
    Ok(cfg)
}

/// Load the config, falling back to interactive setup on a terminal
fn load_or_setup(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let terminal = stdin.is_terminal().then_some((&mut input, &mut output));
    config::load_or_setup(explicit, terminal).context("Invalid configuration")
}
