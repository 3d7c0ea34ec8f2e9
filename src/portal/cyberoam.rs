//! Cyberoam / Sophos captive portal implementation
//!
//! Speaks the `login.xml` / `logout.xml` form protocol served on the portal
//! origin (usually port 8090).

use crate::config::HttpConfig;
use crate::error::TransportError;
use crate::http::HttpClient;
use crate::models::Credentials;
use crate::parser;
use crate::portal::{CaptivePortal, PortalReply};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

const MODE_LOGIN: &str = "191";
const MODE_LOGOUT: &str = "193";
const PRODUCT_TYPE: &str = "0";

pub struct CyberoamPortal {
    base_url: String,
    client: HttpClient,
}

impl CyberoamPortal {
    pub fn new(base_url: &str, http: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: HttpClient::for_portal(base_url, http)?,
        })
    }

    fn url(&self, page: &str) -> String {
        format!("{}/{}", self.base_url, page)
    }

    async fn submit(
        &self,
        op: &'static str,
        page: &str,
        form: &[(&str, &str)],
    ) -> Result<PortalReply, TransportError> {
        let url = self.url(page);
        let resp = self.client.post_form(op, &url, form).await?;

        let status = resp.status().as_u16();
        // The body only carries a hint for the log; a lost body is not an error.
        let body = resp.text().await.unwrap_or_default();
        let message = parser::parse_portal_message(&body);

        tracing::debug!(
            "{} replied {} ({})",
            op,
            status,
            message.as_deref().unwrap_or("no message")
        );
        Ok(PortalReply { status, message })
    }
}

/// Millisecond timestamp the portal expects as the `a` nonce
pub fn now_ms() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl CaptivePortal for CyberoamPortal {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn login(&self, creds: &Credentials) -> Result<PortalReply, TransportError> {
        tracing::info!("Sending login request for {}", creds.username);
        let nonce = now_ms();
        let form = [
            ("mode", MODE_LOGIN),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
            ("a", nonce.as_str()),
            ("producttype", PRODUCT_TYPE),
        ];
        self.submit("login", "login.xml", &form).await
    }

    async fn logout(&self, username: &str) -> Result<PortalReply, TransportError> {
        tracing::info!("Sending logout request for {}", username);
        let nonce = now_ms();
        let form = [
            ("mode", MODE_LOGOUT),
            ("username", username),
            ("a", nonce.as_str()),
            ("producttype", PRODUCT_TYPE),
        ];
        self.submit("logout", "logout.xml", &form).await
    }

    async fn is_reachable(&self) -> bool {
        let url = self.url("httpclient.html");
        match self.client.get("reachability", &url).await {
            Ok(resp) => resp.status().as_u16() == 200,
            Err(e) => {
                tracing::debug!("Portal not reachable: {}", e);
                false
            }
        }
    }
}
