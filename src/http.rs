//! HTTP clients for the portal and the connectivity probe
//!
//! The portal client pins Origin/Referer to the portal, sends a browser
//! User-Agent and carries the portal's language cookie. The probe client never
//! follows redirects, so a captive redirect shows up as a non-204 status.

use crate::config::HttpConfig;
use crate::error::TransportError;
use reqwest::cookie::Jar;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use std::sync::Arc;
use std::time::Duration;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";
const LANG_COOKIE: &str = "SF-UI-LANG=en-US";

pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Client for `login.xml`, `logout.xml` and `httpclient.html`
    pub fn for_portal(base_url: &str, cfg: &HttpConfig) -> Result<Self, TransportError> {
        let base = base_url.trim_end_matches('/');

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(base).map_err(|_| TransportError::InvalidHeader("Origin"))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/httpclient.html", base))
                .map_err(|_| TransportError::InvalidHeader("Referer"))?,
        );

        let jar = Jar::default();
        if let Ok(url) = Url::parse(base) {
            jar.add_cookie_str(LANG_COOKIE, &url);
        }

        let client = Self::builder(cfg)
            .cookie_provider(Arc::new(jar))
            .default_headers(headers)
            .build()
            .map_err(TransportError::Build)?;

        Ok(Self { inner: client })
    }

    /// Client for the generate_204 probe; redirects are reported, not followed
    pub fn for_probe(cfg: &HttpConfig) -> Result<Self, TransportError> {
        let client = Self::builder(cfg)
            .redirect(Policy::none())
            .build()
            .map_err(TransportError::Build)?;

        Ok(Self { inner: client })
    }

    fn builder(cfg: &HttpConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(cfg.timeout))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout))
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
    }

    pub async fn get(&self, op: &'static str, url: &str) -> Result<Response, TransportError> {
        tracing::debug!("GET {} ({})", url, op);
        self.inner
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::request(op, url, e))
    }

    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        op: &'static str,
        url: &str,
        form: &T,
    ) -> Result<Response, TransportError> {
        tracing::debug!("POST {} ({})", url, op);
        self.inner
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError::request(op, url, e))
    }
}
