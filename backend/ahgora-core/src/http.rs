// src/http.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::error::{AhgoraError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("ahgora-core/", env!("CARGO_PKG_VERSION"));

/// Status and body of a finished exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Request/response capability the service talks to the portal through.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Posts `form` url-encoded.
    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

/// `reqwest` transport. Keeps a cookie store so the portal session survives between calls.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    http_client: Client,
}

impl ReqwestHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AhgoraError::InvalidHeader(format!("{}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| AhgoraError::InvalidHeader(format!("{}: {}", name, e)))?;
            default_headers.insert(header_name, header_value);
        }

        let http_client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { http_client })
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.http_client.get(url).send().await?;
        Self::into_response(response).await
    }

    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(form)
            .send()
            .await?;
        Self::into_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_decodes_or_reports_decode_error() {
        let ok = HttpResponse::new(200, r#"{"r":"success"}"#);
        assert_eq!(ok.json().unwrap()["r"], "success");

        let bad = HttpResponse::new(200, "<html>not json</html>");
        assert!(matches!(bad.json(), Err(AhgoraError::JsonDecode(_))));
    }

    #[test]
    fn client_rejects_invalid_default_header() {
        let config = HttpClientConfig {
            headers: vec![("bad header".to_string(), "x".to_string())],
            ..HttpClientConfig::default()
        };
        assert!(matches!(
            ReqwestHttpClient::new(config),
            Err(AhgoraError::InvalidHeader(_))
        ));
    }

    #[test]
    fn client_builds_with_defaults() {
        assert!(ReqwestHttpClient::new(HttpClientConfig::default()).is_ok());
    }
}
