//! HTTP side of the local event collector.

use async_trait::async_trait;
use iglu_core::SchemaIdentifier;
use reqwest::Url;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::EmitError;
use crate::tracker::{DeliveryResponse, EventSink, Payload};

/// Default collector endpoint.
pub const DEFAULT_COLLECTOR: &str = "http://localhost:9090";

/// Tracker-protocol POST path.
pub const POST_PATH: &str = "com.snowplowanalytics.snowplow/tp2";

pub const PAYLOAD_DATA_SCHEMA: &str =
    "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4";

/// Whole-request timeout for collector calls. Never shorter than the
/// harness response window, so a slow reply still reaches its case.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client(timeout: Duration) -> Result<reqwest::Client, EmitError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("iglu-harness/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

/// Parse and check a collector URL.
pub fn parse_collector_url(raw: &str) -> Result<Url, EmitError> {
    let url = Url::parse(raw).map_err(|e| EmitError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EmitError::InvalidUrl(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

/// Posts each payload on its own, with no batching.
#[derive(Debug, Clone)]
pub struct CollectorSink {
    base: Url,
    http_client: reqwest::Client,
}

impl CollectorSink {
    pub fn new(base: Url) -> Result<Self, EmitError> {
        Self::with_timeout(base, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, EmitError> {
        let http_client = http_client(timeout)?;
        Ok(CollectorSink { base, http_client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl EventSink for CollectorSink {
    async fn send(&self, mut payload: Payload) -> Result<DeliveryResponse, EmitError> {
        payload.insert(
            "stm".to_string(),
            chrono::Utc::now().timestamp_millis().to_string(),
        );
        let body = json!({ "schema": PAYLOAD_DATA_SCHEMA, "data": [payload] });

        let response = self
            .http_client
            .post(endpoint(&self.base, POST_PATH))
            .json(&body)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        debug!(status_code, "collector accepted request");
        Ok(DeliveryResponse { status_code })
    }
}

/// Read-only queries against the collector's embedded iglu resolver.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    base: Url,
    http_client: reqwest::Client,
}

impl CollectorClient {
    pub fn new(base: Url) -> Result<Self, EmitError> {
        Self::with_timeout(base, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, EmitError> {
        let http_client = http_client(timeout)?;
        Ok(CollectorClient { base, http_client })
    }

    /// Whether the collector resolves the schema (`GET /micro/iglu/...` is 200).
    pub async fn schema_known(&self, id: &SchemaIdentifier) -> Result<bool, EmitError> {
        let url = endpoint(&self.base, &format!("micro/iglu/{}", id.to_iglu_path()));
        let response = self.http_client.get(&url).send().await?;
        let status = response.status().as_u16();
        debug!(schema = %id, status, "iglu lookup");
        Ok(status == 200)
    }
}
