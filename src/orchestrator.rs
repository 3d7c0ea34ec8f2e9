//! Login/verification state machine
//!
//! Each tick re-derives where the device stands (paused, ineligible network,
//! already online, or behind the portal) and takes at most one bounded login
//! attempt sequence: login, re-probe, then a single logout+login reset.

use crate::eligibility::{Eligibility, EligibilityCheck};
use crate::error::TransportError;
use crate::models::{Credentials, EligibilityRule, IneligibleReason, PollCycleResult};
use crate::portal::CaptivePortal;
use crate::probe::Probe;
use crate::session::SessionState;
use std::sync::Arc;
use std::time::Duration;

/// Pauses that let the portal session propagate before re-probing
#[derive(Debug, Clone, Copy)]
pub struct SettleDelays {
    pub after_login: Duration,
    pub after_logout: Duration,
}

impl SettleDelays {
    pub const NONE: SettleDelays = SettleDelays {
        after_login: Duration::ZERO,
        after_logout: Duration::ZERO,
    };
}

pub struct LoginOrchestrator {
    portal: Arc<dyn CaptivePortal>,
    probe: Arc<dyn Probe>,
    eligibility: EligibilityCheck,
    credentials: Arc<Credentials>,
    settle: SettleDelays,
    session: SessionState,
}

impl LoginOrchestrator {
    pub fn new(
        portal: Arc<dyn CaptivePortal>,
        probe: Arc<dyn Probe>,
        eligibility: EligibilityCheck,
        credentials: Credentials,
        settle: SettleDelays,
        session: SessionState,
    ) -> Self {
        Self {
            portal,
            probe,
            eligibility,
            credentials: Arc::new(credentials),
            settle,
            session,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Swap credentials and eligibility rule between ticks
    pub fn reconfigure(
        &mut self,
        credentials: Credentials,
        rule: EligibilityRule,
        settle: SettleDelays,
    ) {
        self.credentials = Arc::new(credentials);
        self.eligibility.set_rule(rule);
        self.settle = settle;
    }

    /// One polling tick. Never fails; every outcome becomes a status line.
    pub async fn tick(&mut self) -> PollCycleResult {
        let (result, identifier) = self.evaluate().await;
        self.publish(&result, identifier);
        result
    }

    async fn evaluate(&mut self) -> (PollCycleResult, Option<String>) {
        if !self.session.auto_login_enabled() {
            return (PollCycleResult::Paused, None);
        }

        let identifier = match self.eligibility.evaluate(self.portal.as_ref()).await {
            Eligibility::Ineligible(reason) => {
                tracing::debug!("Skipping tick: {}", reason);
                let seen = match &reason {
                    IneligibleReason::NotAllowed(ssid) => Some(ssid.clone()),
                    _ => None,
                };
                return (PollCycleResult::NotEligible(reason), seen);
            }
            Eligibility::Eligible { identifier } => identifier,
        };

        if self.probe.check().await.is_authenticated() {
            let result = PollCycleResult::AlreadyAuthenticated {
                identifier: identifier.clone(),
            };
            return (result, identifier);
        }

        tracing::info!("Campus network detected -> attempting login");
        self.session
            .set_status("Campus network detected - logging in", identifier.clone());
        (self.attempt_login().await, identifier)
    }

    /// The bounded login attempt sequence.
    ///
    /// At most two login POSTs and one logout POST. A transport failure ends
    /// the sequence early as a transient error.
    pub async fn attempt_login(&self) -> PollCycleResult {
        match self.login_sequence().await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Login attempt aborted: {}", e);
                PollCycleResult::TransientError(e.short())
            }
        }
    }

    async fn login_sequence(&self) -> Result<PollCycleResult, TransportError> {
        let creds = Arc::clone(&self.credentials);

        self.portal.login(&creds).await?;
        tokio::time::sleep(self.settle.after_login).await;

        if self.probe.check().await.is_authenticated() {
            tracing::info!("Login successful");
            return Ok(PollCycleResult::LoginSucceeded);
        }

        tracing::warn!("Login did not stick, retrying with logout");
        self.portal.logout(&creds.username).await?;
        tokio::time::sleep(self.settle.after_logout).await;
        self.portal.login(&creds).await?;
        tokio::time::sleep(self.settle.after_login).await;

        if self.probe.check().await.is_authenticated() {
            tracing::info!("Login successful after reset");
            Ok(PollCycleResult::LoginSucceededAfterReset)
        } else {
            tracing::error!("Login failed after retry");
            Ok(PollCycleResult::LoginFailed)
        }
    }

    /// Re-enable auto-login and run the attempt sequence right away
    pub async fn force_login(&mut self) -> PollCycleResult {
        self.session.set_auto_login(true);
        self.session.set_status("Manual login requested", None);
        tracing::info!("Manual login triggered (auto-login enabled)");

        let result = self.attempt_login().await;
        self.publish(&result, None);
        result
    }

    /// Pause auto-login and send one best-effort logout
    pub async fn force_logout(&mut self) {
        self.session.set_auto_login(false);
        self.session.set_status("Logged out (auto-login paused)", None);
        tracing::info!("Manual logout triggered (auto-login paused)");

        match self.portal.logout(&self.credentials.username).await {
            Ok(_) => tracing::info!("Logout successful"),
            Err(e) => {
                tracing::error!("Logout failed: {}", e);
                self.session.set_status("Logout error", None);
            }
        }
    }

    fn publish(&self, result: &PollCycleResult, identifier: Option<String>) {
        self.session.set_status(result.status_text(), identifier);
    }
}
