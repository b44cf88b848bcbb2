//! Monitoring API integration - node inventory and live metric samples

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::metrics::MetricFamily;

/// Inventory entry as reported by the monitoring API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ipaddress: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One named observation. The API sends some values as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    #[serde(deserialize_with = "numeric")]
    pub value: f64,
}

fn numeric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Number(f64),
        Text(String),
    }

    match Numeric::deserialize(deserializer)? {
        Numeric::Number(value) => Ok(value),
        Numeric::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("expected a numeric sample value, got {:?}", text))
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Capabilities the dashboard consumes from the monitoring backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn fetch_nodes(&self) -> Result<Vec<Node>, ApiError>;

    async fn fetch_live_metrics(
        &self,
        node_id: &str,
        family: MetricFamily,
    ) -> Result<Vec<MetricSample>, ApiError>;
}

#[derive(Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Deserialize)]
struct LiveData {
    #[serde(default)]
    metrics: Vec<MetricSample>,
}

/// JSON-over-HTTP client for the monitoring API
pub struct HttpFleetClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpFleetClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(&config.url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("nodetop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl FleetApi for HttpFleetClient {
    async fn fetch_nodes(&self) -> Result<Vec<Node>, ApiError> {
        let url = self.endpoint(&["nodes"])?;
        let list: NodeList = self.get_json(url).await?;
        tracing::debug!(count = list.items.len(), "fetched node inventory");
        Ok(list.items)
    }

    async fn fetch_live_metrics(
        &self,
        node_id: &str,
        family: MetricFamily,
    ) -> Result<Vec<MetricSample>, ApiError> {
        let url = self.endpoint(&["nodes", node_id, "live", family.as_str()])?;
        let data: LiveData = self.get_json(url).await?;
        tracing::trace!(node_id, %family, samples = data.metrics.len(), "fetched live metrics");
        Ok(data.metrics)
    }
}
