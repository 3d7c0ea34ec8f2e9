//! In-memory stand-ins for the portal, probe and SSID lookup

use crate::error::{PlatformQueryError, TransportError};
use crate::models::{Credentials, ProbeStatus};
use crate::network::SsidSource;
use crate::portal::{CaptivePortal, PortalReply};
use crate::probe::Probe;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Reachable,
    Probe,
    Login,
    Logout,
}

/// Calls made against the fakes, in order, with the (tokio) time they happened
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<(Call, Instant)>>,
}

impl CallLog {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn timed(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakePortal {
    pub unreachable: AtomicBool,
    pub fail_requests: AtomicBool,
    logins: AtomicUsize,
    logouts: AtomicUsize,
    reachability_checks: AtomicUsize,
    log: Option<Arc<CallLog>>,
}

impl FakePortal {
    pub fn unreachable() -> Self {
        let portal = Self::default();
        portal.unreachable.store(true, Ordering::SeqCst);
        portal
    }

    pub fn recording(log: Arc<CallLog>) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn reachability_checks(&self) -> usize {
        self.reachability_checks.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        if let Some(log) = &self.log {
            log.record(call);
        }
    }

    fn reply(&self, op: &'static str) -> Result<PortalReply, TransportError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(TransportError::request(op, "http://portal", builder_error()));
        }
        Ok(PortalReply {
            status: 200,
            message: None,
        })
    }
}

fn builder_error() -> reqwest::Error {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid URL must fail to build")
}

#[async_trait]
impl CaptivePortal for FakePortal {
    fn name(&self) -> &str {
        "fake"
    }

    async fn login(&self, _creds: &Credentials) -> Result<PortalReply, TransportError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Login);
        self.reply("login")
    }

    async fn logout(&self, _username: &str) -> Result<PortalReply, TransportError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Logout);
        self.reply("logout")
    }

    async fn is_reachable(&self) -> bool {
        self.reachability_checks.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Reachable);
        !self.unreachable.load(Ordering::SeqCst)
    }
}

/// Answers from a script, then NotAuthenticated once the script runs out
#[derive(Default)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeStatus>>,
    calls: AtomicUsize,
    log: Option<Arc<CallLog>>,
}

impl ScriptedProbe {
    pub fn with(script: &[ProbeStatus]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn recording(script: &[ProbeStatus], log: Arc<CallLog>) -> Self {
        Self {
            log: Some(log),
            ..Self::with(script)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self) -> ProbeStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(Call::Probe);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProbeStatus::NotAuthenticated)
    }
}

pub struct FixedSsid(pub Option<&'static str>);

#[async_trait]
impl SsidSource for FixedSsid {
    fn command(&self) -> &'static str {
        "fixed"
    }

    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError> {
        Ok(self.0.map(str::to_string))
    }
}

/// Answers only after `delay`, like `nmcli` during a rescan
pub struct SlowSsid(pub Duration, pub &'static str);

#[async_trait]
impl SsidSource for SlowSsid {
    fn command(&self) -> &'static str {
        "slow"
    }

    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError> {
        tokio::time::sleep(self.0).await;
        Ok(Some(self.1.to_string()))
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "f20210001".into(),
        password: "hunter2".into(),
    }
}
