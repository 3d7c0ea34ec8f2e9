//! Shared session state
//!
//! The polling worker writes status snapshots into a `watch` channel and the
//! status surface reads them from there. Subscribers are only woken when the
//! visible status actually changes. The auto-login flag is the one field
//! writable from both sides and lives in an atomic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub text: String,
    pub last_seen_identifier: Option<String>,
    pub auto_login: bool,
    pub updated_at: SystemTime,
}

#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

struct Inner {
    auto_login: AtomicBool,
    status: watch::Sender<StatusSnapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        let (status, _) = watch::channel(StatusSnapshot {
            text: "Starting...".to_string(),
            last_seen_identifier: None,
            auto_login: true,
            updated_at: SystemTime::now(),
        });

        Self {
            inner: Arc::new(Inner {
                auto_login: AtomicBool::new(true),
                status,
            }),
        }
    }

    pub fn auto_login_enabled(&self) -> bool {
        self.inner.auto_login.load(Ordering::SeqCst)
    }

    pub fn set_auto_login(&self, enabled: bool) {
        self.inner.auto_login.store(enabled, Ordering::SeqCst);
    }

    /// Publish a status line. `identifier` replaces the last seen network
    /// only when present.
    pub fn set_status(&self, text: impl Into<String>, identifier: Option<String>) {
        let text = text.into();
        let auto_login = self.auto_login_enabled();

        self.inner.status.send_if_modified(|snap| {
            let identifier = identifier.or_else(|| snap.last_seen_identifier.clone());
            if snap.text == text
                && snap.last_seen_identifier == identifier
                && snap.auto_login == auto_login
            {
                return false;
            }
            snap.text = text;
            snap.last_seen_identifier = identifier;
            snap.auto_login = auto_login;
            snap.updated_at = SystemTime::now();
            true
        });
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Status surface: logs every visible status change until the session is dropped
pub async fn log_status_changes(mut rx: watch::Receiver<StatusSnapshot>) {
    while rx.changed().await.is_ok() {
        let snap = rx.borrow_and_update().clone();
        match &snap.last_seen_identifier {
            Some(ssid) => tracing::info!("Status: {} [{}]", snap.text, ssid),
            None => tracing::info!("Status: {}", snap.text),
        }
    }
}
