//! Network identity lookup
//!
//! Asks the platform which Wi-Fi network the device is associated with, and
//! caches the answer so the platform is queried at most once per refresh window
//! no matter how often the polling loop ticks. Every query is bounded by a
//! timeout; a hung `nmcli` reads as "no identifier".

use crate::error::PlatformQueryError;
use crate::parser;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Upper bound for one platform query
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait SsidSource: Send + Sync {
    /// Name of the tool being queried, for log lines
    fn command(&self) -> &'static str;

    /// `Ok(None)` means no Wi-Fi association
    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError>;
}

/// Queries the OS network tooling (`nmcli` on Linux, `netsh` on Windows)
pub struct PlatformSsid;

#[cfg(any(target_os = "linux", target_os = "windows"))]
async fn run_tool(command: &'static str, args: &[&str]) -> Result<String, PlatformQueryError> {
    let output = tokio::process::Command::new(command)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| PlatformQueryError::Spawn { command, source })?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl SsidSource for PlatformSsid {
    #[cfg(target_os = "linux")]
    fn command(&self) -> &'static str {
        "nmcli"
    }

    #[cfg(target_os = "windows")]
    fn command(&self) -> &'static str {
        "netsh"
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    fn command(&self) -> &'static str {
        "none"
    }

    #[cfg(target_os = "linux")]
    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError> {
        let stdout = run_tool("nmcli", &["-t", "-f", "active,ssid", "dev", "wifi"]).await?;
        Ok(parser::parse_nmcli_ssid(&stdout))
    }

    #[cfg(target_os = "windows")]
    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError> {
        let stdout = run_tool("netsh", &["wlan", "show", "interfaces"]).await?;
        Ok(parser::parse_netsh_ssid(&stdout))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    async fn current_ssid(&self) -> Result<Option<String>, PlatformQueryError> {
        Err(PlatformQueryError::Unsupported)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkIdentitySample {
    pub identifier: Option<String>,
    pub sampled_at: Instant,
}

pub struct IdentityCache {
    source: Box<dyn SsidSource>,
    refresh: Duration,
    query_timeout: Duration,
    sample: Option<NetworkIdentitySample>,
}

impl IdentityCache {
    pub fn new(source: Box<dyn SsidSource>, refresh: Duration) -> Self {
        Self {
            source,
            refresh,
            query_timeout: QUERY_TIMEOUT,
            sample: None,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn current(&mut self) -> Option<String> {
        self.current_at(Instant::now()).await
    }

    /// Cached identifier, re-sampled once `refresh` has elapsed since the last query
    pub async fn current_at(&mut self, now: Instant) -> Option<String> {
        if let Some(sample) = &self.sample {
            if now.saturating_duration_since(sample.sampled_at) < self.refresh {
                return sample.identifier.clone();
            }
        }

        let identifier = match self.query().await {
            Ok(ssid) => ssid,
            Err(e) => {
                tracing::warn!("SSID lookup failed: {}", e);
                None
            }
        };

        if self.sample.as_ref().map(|s| &s.identifier) != Some(&identifier) {
            tracing::info!(
                "Network identity changed: {}",
                identifier.as_deref().unwrap_or("<none>")
            );
        }

        self.sample = Some(NetworkIdentitySample {
            identifier: identifier.clone(),
            sampled_at: now,
        });
        identifier
    }

    async fn query(&self) -> Result<Option<String>, PlatformQueryError> {
        tokio::time::timeout(self.query_timeout, self.source.current_ssid())
            .await
            .map_err(|_| PlatformQueryError::Timeout {
                command: self.source.command(),
                timeout: self.query_timeout,
            })?
    }

    pub fn last_sample(&self) -> Option<&NetworkIdentitySample> {
        self.sample.as_ref()
    }
}
