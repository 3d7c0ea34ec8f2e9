//! Connectivity probe
//!
//! A `generate_204` endpoint answers 204 only when traffic passes the gateway
//! untouched. A captive portal shows up as a redirect or a 200 login page.

use crate::config::HttpConfig;
use crate::error::TransportError;
use crate::http::HttpClient;
use crate::models::ProbeStatus;
use async_trait::async_trait;

#[async_trait]
pub trait Probe: Send + Sync {
    /// Never fails: transport errors count as not authenticated
    async fn check(&self) -> ProbeStatus;
}

pub struct ConnectivityProbe {
    url: String,
    client: HttpClient,
}

impl ConnectivityProbe {
    pub fn new(url: &str, http: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            url: url.to_string(),
            client: HttpClient::for_probe(http)?,
        })
    }

    pub async fn try_check(&self) -> Result<ProbeStatus, TransportError> {
        let resp = self.client.get("connectivity check", &self.url).await?;
        let status = resp.status().as_u16();
        tracing::debug!("Connectivity check returned {}", status);

        Ok(if status == 204 {
            ProbeStatus::Authenticated
        } else {
            ProbeStatus::NotAuthenticated
        })
    }
}

#[async_trait]
impl Probe for ConnectivityProbe {
    async fn check(&self) -> ProbeStatus {
        match self.try_check().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Connectivity check failed: {}", e);
                ProbeStatus::NotAuthenticated
            }
        }
    }
}
