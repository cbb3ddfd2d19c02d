use crate::domain::model::{UpstreamEnvelope, UpstreamQuery};
use crate::domain::ports::UpstreamTransport;
use crate::utils::error::{ComexError, Result, TransportError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api-comexstat.mdic.gov.br";
pub const DEFAULT_LANGUAGE: &str = "pt";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 以 reqwest 實作的 ComexStat `POST /general`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, language: &str, accept_invalid_certs: bool) -> Result<Self> {
        let endpoint = general_endpoint(base_url, language)?;

        if accept_invalid_certs {
            tracing::warn!("⚠️ TLS certificate verification is disabled for {}", base_url);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ComexError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn general_endpoint(base_url: &str, language: &str) -> Result<Url> {
    let raw = format!("{}/general", base_url.trim_end_matches('/'));
    let mut url = Url::parse(&raw).map_err(|e| ComexError::InvalidConfigValueError {
        field: "upstream.base_url".to_string(),
        value: base_url.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("language", language);
    Ok(url)
}

impl UpstreamTransport for HttpTransport {
    async fn send(&self, query: &UpstreamQuery) -> std::result::Result<UpstreamEnvelope, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(query)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable {
                message: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::debug!("ComexStat responded with status {}", status);
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })
    }
}
