//! Data models shared by the portal, probe and orchestrator

use std::collections::BTreeSet;
use std::fmt;

/// Portal login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Policy deciding whether the current network is one to authenticate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityRule {
    /// Eligible iff the portal's landing page answers 200
    PortalReachability,
    /// Eligible iff the current SSID is in the set
    AllowedIdentifiers(BTreeSet<String>),
}

/// Outcome of the generate_204 connectivity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Authenticated,
    NotAuthenticated,
}

impl ProbeStatus {
    pub fn is_authenticated(self) -> bool {
        self == ProbeStatus::Authenticated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibleReason {
    PortalUnreachable,
    NoWifi,
    NotAllowed(String),
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortalUnreachable => write!(f, "Not on campus network"),
            Self::NoWifi => write!(f, "No Wi-Fi connection"),
            Self::NotAllowed(ssid) => write!(f, "Network '{}' not allowed", ssid),
        }
    }
}

/// What one polling tick (or forced action) ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCycleResult {
    Paused,
    NotEligible(IneligibleReason),
    AlreadyAuthenticated { identifier: Option<String> },
    LoginSucceeded,
    LoginSucceededAfterReset,
    LoginFailed,
    TransientError(String),
}

impl PollCycleResult {
    /// Human-readable status line for the status surface
    pub fn status_text(&self) -> String {
        match self {
            Self::Paused => "Auto-login paused".to_string(),
            Self::NotEligible(reason) => reason.to_string(),
            Self::AlreadyAuthenticated {
                identifier: Some(ssid),
            } => format!("Connected ({})", ssid),
            Self::AlreadyAuthenticated { identifier: None } => {
                "Connected (campus network)".to_string()
            }
            Self::LoginSucceeded => "Logged in successfully".to_string(),
            Self::LoginSucceededAfterReset => "Logged in after reset".to_string(),
            Self::LoginFailed => "Login failed".to_string(),
            Self::TransientError(detail) => format!("Error: {}", detail),
        }
    }
}
