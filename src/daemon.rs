//! Polling loop and manual control surface
//!
//! One task owns the [`LoginOrchestrator`] and drives it on a fixed interval.
//! Manual actions arrive as [`Command`]s and run between ticks, so no two
//! login sequences ever overlap. Shutdown interrupts the wait between ticks
//! but lets an in-flight tick finish.

use crate::config::Config;
use crate::models::PollCycleResult;
use crate::orchestrator::{LoginOrchestrator, SettleDelays};
use crate::session::{SessionState, StatusSnapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior};

pub enum Command {
    ForceLogin(oneshot::Sender<PollCycleResult>),
    ForceLogout(oneshot::Sender<()>),
    Reload(Box<Config>),
}

/// Cancellation flag observed by the loop before and during each wait
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self, reason: &str) {
        if !self.tx.send_replace(true) {
            tracing::info!("Shutting down ({})", reason);
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once triggered.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for the UI side: the only way to mutate a running agent
#[derive(Clone)]
pub struct Controller {
    commands: mpsc::Sender<Command>,
    session: SessionState,
    shutdown: ShutdownSignal,
}

impl Controller {
    /// Returns `None` if the loop has already stopped
    pub async fn force_login(&self) -> Option<PollCycleResult> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::ForceLogin(tx)).await.ok()?;
        rx.await.ok()
    }

    pub async fn force_logout(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::ForceLogout(tx)).await.is_err() {
            return false;
        }
        rx.await.is_ok()
    }

    pub async fn reload(&self, cfg: Config) -> bool {
        self.commands.send(Command::Reload(Box::new(cfg))).await.is_ok()
    }

    pub fn request_status(&self) -> StatusSnapshot {
        let snap = self.session.snapshot();
        tracing::info!(
            "Status requested: {}, auto_login={}",
            snap.text,
            snap.auto_login
        );
        snap
    }

    pub fn shutdown(&self, reason: &str) {
        self.shutdown.trigger(reason);
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }
}

pub struct PollingLoop {
    orchestrator: LoginOrchestrator,
    interval: Duration,
    commands: mpsc::Receiver<Command>,
    shutdown: ShutdownSignal,
}

impl PollingLoop {
    pub fn new(orchestrator: LoginOrchestrator, interval: Duration) -> (Self, Controller) {
        let (tx, rx) = mpsc::channel(8);
        let shutdown = ShutdownSignal::new();
        let controller = Controller {
            commands: tx,
            session: orchestrator.session().clone(),
            shutdown: shutdown.clone(),
        };

        let polling = Self {
            orchestrator,
            interval,
            commands: rx,
            shutdown,
        };
        (polling, controller)
    }

    /// Run until the shutdown signal is raised
    pub async fn run(mut self) {
        tracing::info!("Worker loop started (every {:?})", self.interval);
        let mut ticker = Self::ticker(self.interval);

        while !self.shutdown.is_triggered() {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                Some(cmd) = self.commands.recv() => self.handle(cmd, &mut ticker).await,
                _ = ticker.tick() => {
                    let result = self.orchestrator.tick().await;
                    tracing::debug!("Tick finished: {:?}", result);
                }
            }
        }

        tracing::info!("Worker loop stopped");
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn handle(&mut self, cmd: Command, ticker: &mut Interval) {
        match cmd {
            Command::ForceLogin(reply) => {
                let result = self.orchestrator.force_login().await;
                let _ = reply.send(result);
            }
            Command::ForceLogout(reply) => {
                self.orchestrator.force_logout().await;
                let _ = reply.send(());
            }
            Command::Reload(cfg) => {
                self.orchestrator.reconfigure(
                    cfg.credentials(),
                    cfg.eligibility_rule(),
                    SettleDelays {
                        after_login: cfg.settle_after_login(),
                        after_logout: cfg.settle_after_logout(),
                    },
                );
                let interval = cfg.check_interval();
                if interval != self.interval {
                    tracing::info!("Check interval changed to {:?}", interval);
                    self.interval = interval;
                    *ticker = Self::ticker(interval);
                }
                tracing::info!("Configuration reloaded");
            }
        }
    }
}

/// Map process signals onto the controller.
///
/// SIGUSR1 forces a login, SIGUSR2 forces a logout, SIGHUP reloads the config
/// from `config_path`, SIGINT/SIGTERM shut down.
#[cfg(unix)]
pub async fn handle_signals(controller: Controller, config_path: PathBuf) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = usr1.recv() => {
                if let Some(result) = controller.force_login().await {
                    tracing::info!("Manual login finished: {}", result.status_text());
                }
            }
            _ = usr2.recv() => {
                controller.force_logout().await;
            }
            _ = hup.recv() => {
                reload_from(&controller, &config_path).await;
                controller.request_status();
            }
            _ = term.recv() => {
                controller.shutdown("SIGTERM");
                return Ok(());
            }
            _ = int.recv() => {
                controller.shutdown("Ctrl+C / signal");
                return Ok(());
            }
        }
    }
}

#[cfg(not(unix))]
pub async fn handle_signals(controller: Controller, _config_path: PathBuf) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    controller.shutdown("Ctrl+C");
    Ok(())
}

/// Reload a config file into the running loop; a bad file keeps the old config
#[cfg_attr(not(unix), allow(dead_code))]
async fn reload_from(controller: &Controller, path: &std::path::Path) {
    match Config::load(Some(path)) {
        Ok((cfg, _)) => {
            controller.reload(cfg).await;
        }
        Err(e) => tracing::error!("Config reload failed, keeping current settings: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityCheck;
    use crate::models::{EligibilityRule, ProbeStatus};
    use crate::network::IdentityCache;
    use crate::network::SsidSource;
    use crate::testing::{credentials, FakePortal, FixedSsid, ScriptedProbe, SlowSsid};

    fn make_loop(
        portal: Arc<FakePortal>,
        probe: Arc<ScriptedProbe>,
        interval: Duration,
    ) -> (PollingLoop, Controller) {
        make_loop_with(
            portal,
            probe,
            interval,
            EligibilityRule::PortalReachability,
            Box::new(FixedSsid(None)),
        )
    }

    fn make_loop_with(
        portal: Arc<FakePortal>,
        probe: Arc<ScriptedProbe>,
        interval: Duration,
        rule: EligibilityRule,
        ssids: Box<dyn SsidSource>,
    ) -> (PollingLoop, Controller) {
        let cache = IdentityCache::new(ssids, Duration::from_secs(60));
        let orch = LoginOrchestrator::new(
            portal,
            probe,
            EligibilityCheck::new(rule, cache),
            credentials(),
            SettleDelays::NONE,
            SessionState::new(),
        );
        PollingLoop::new(orch, interval)
    }

    async fn wait_for_status(controller: &Controller, text: &str) {
        wait_for_status_within(controller, text, Duration::from_secs(2)).await;
    }

    async fn wait_for_status_within(controller: &Controller, text: &str, limit: Duration) {
        let mut rx = controller.session().subscribe();
        tokio::time::timeout(limit, rx.wait_for(|s| s.text == text))
            .await
            .expect("status not reached in time")
            .expect("session dropped");
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let portal = Arc::new(FakePortal::default());
        let probe = Arc::new(ScriptedProbe::with(&[ProbeStatus::Authenticated]));
        let (polling, controller) = make_loop(portal, probe.clone(), Duration::from_secs(3600));

        let handle = tokio::spawn(polling.run());
        wait_for_status(&controller, "Connected (campus network)").await;

        controller.shutdown("test");
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_login_through_controller() {
        let portal = Arc::new(FakePortal::default());
        let probe = Arc::new(ScriptedProbe::with(&[
            ProbeStatus::Authenticated,
            ProbeStatus::Authenticated,
        ]));
        let (polling, controller) =
            make_loop(portal.clone(), probe, Duration::from_secs(3600));
        let handle = tokio::spawn(polling.run());

        let result = controller.force_login().await;
        assert_eq!(result, Some(PollCycleResult::LoginSucceeded));
        assert_eq!(portal.logins(), 1);
        assert_eq!(portal.logouts(), 0);

        controller.shutdown("test");
        handle.await.unwrap();
        assert_eq!(controller.force_login().await, None);
    }

    #[tokio::test]
    async fn test_force_logout_pauses_following_ticks() {
        let portal = Arc::new(FakePortal::unreachable());
        let probe = Arc::new(ScriptedProbe::default());
        let (polling, controller) =
            make_loop(portal.clone(), probe.clone(), Duration::from_millis(20));
        let handle = tokio::spawn(polling.run());

        assert!(controller.force_logout().await);
        wait_for_status(&controller, "Auto-login paused").await;
        assert!(!controller.request_status().auto_login);
        assert_eq!(portal.logouts(), 1);
        assert_eq!(portal.logins(), 0);
        assert_eq!(probe.calls(), 0);

        controller.shutdown("test");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_swaps_eligibility_rule() {
        let portal = Arc::new(FakePortal::default());
        let probe = Arc::new(ScriptedProbe::default());
        let (polling, controller) =
            make_loop(portal.clone(), probe, Duration::from_millis(20));
        let handle = tokio::spawn(polling.run());

        let mut cfg = Config::default();
        cfg.portal.username = "bob".into();
        cfg.portal.password = "pw".into();
        cfg.eligibility.rule = crate::config::RuleKind::AllowedSsids;
        cfg.eligibility.ssids = vec!["Lab".into()];
        assert!(controller.reload(cfg).await);

        // FixedSsid(None) under the allowed-set rule reports no Wi-Fi.
        wait_for_status(&controller, "No Wi-Fi connection").await;

        controller.shutdown("test");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_ssid_lookup_does_not_stall_runtime() {
        let portal = Arc::new(FakePortal::default());
        let probe = Arc::new(ScriptedProbe::with(&[ProbeStatus::Authenticated]));
        let rule = EligibilityRule::AllowedIdentifiers(["Lab".to_string()].into_iter().collect());
        let (polling, controller) = make_loop_with(
            portal,
            probe,
            Duration::from_secs(3600),
            rule,
            Box::new(SlowSsid(Duration::from_secs(2), "Lab")),
        );
        let handle = tokio::spawn(polling.run());

        // Let the loop enter its first tick.
        tokio::task::yield_now().await;
        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_millis(500));

        wait_for_status_within(&controller, "Connected (Lab)", Duration::from_secs(5)).await;
        controller.shutdown("test");
        handle.await.unwrap();
    }
}
