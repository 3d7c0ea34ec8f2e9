//! Captive portal abstraction layer
//!
//! The orchestrator talks to the portal only through [`CaptivePortal`], so the
//! login/verification state machine can be driven by a fake in tests.

pub mod cyberoam;

pub use cyberoam::CyberoamPortal;

use crate::error::TransportError;
use crate::models::Credentials;
use async_trait::async_trait;

/// What the portal answered to a login or logout POST.
///
/// The portal API is fire-and-forget: a reply only means the request was
/// delivered. Whether it worked is decided by the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalReply {
    pub status: u16,
    pub message: Option<String>,
}

#[async_trait]
pub trait CaptivePortal: Send + Sync {
    /// Returns the human-readable name of this portal
    fn name(&self) -> &str;

    /// Submit credentials. No retries; the caller owns the retry policy.
    async fn login(&self, creds: &Credentials) -> Result<PortalReply, TransportError>;

    /// End the session for `username`
    async fn logout(&self, username: &str) -> Result<PortalReply, TransportError>;

    /// True if the portal's landing page answers 200 on this network
    async fn is_reachable(&self) -> bool;
}
