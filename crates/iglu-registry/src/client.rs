//! Schema registry console client
//!
//! Stateless HTTP calls for token exchange, deployment lookup, validation and
//! promotion. Every organization-scoped call authenticates with a bearer
//! token obtained from [`RegistryClient::fetch_access_token`].

use iglu_core::SchemaIdentifier;
use serde::Deserialize;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::hash::SchemaHash;
use crate::reply::RegistryReply;
use crate::request::{DeployTarget, PublishRequest, ValidationRequest};
use crate::Result;

/// Bearer token for the console API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    env: String,
}

#[derive(Debug, Default, Deserialize)]
struct DataStructure {
    #[serde(default)]
    deployments: Vec<Deployment>,
}

/// Registry client
#[derive(Debug, Clone)]
pub struct RegistryClient {
    config: RegistryConfig,
    http_client: reqwest::Client,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(RegistryClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(RegistryConfig::from_env())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Exchange an API key for an access token.
    ///
    /// Any status other than 200 is an [`RegistryError::Auth`].
    pub async fn fetch_access_token(&self, api_key: &str, org_id: &str) -> Result<AccessToken> {
        let url = format!(
            "{}/credentials/v2/token",
            self.config.organization_url(org_id)
        );
        let response = self
            .http_client
            .get(&url)
            .header("X-API-Key", api_key)
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(status, "token request finished");
        if status != 200 {
            return Err(RegistryError::Auth { status });
        }

        let body: TokenResponse = serde_json::from_str(&response.text().await?)?;
        Ok(AccessToken(body.access_token))
    }

    /// Whether the schema identity is already deployed to `target`.
    ///
    /// 200 answers from the deployment list and 404 means "not deployed".
    /// Any other status is surfaced as [`RegistryError::Lookup`] rather than
    /// being read as absence.
    pub async fn schema_exists(
        &self,
        token: &AccessToken,
        org_id: &str,
        id: &SchemaIdentifier,
        target: DeployTarget,
    ) -> Result<bool> {
        let hash = SchemaHash::compute(org_id, id);
        debug!(schema = %id, %hash, "computed schema hash");

        let url = format!(
            "{}/data-structures/v1/{}",
            self.config.organization_url(org_id),
            hash
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(status, "schema exists request finished");
        match status {
            200 => {
                let body: DataStructure = serde_json::from_str(&response.text().await?)?;
                let env = target.environment();
                Ok(body.deployments.iter().any(|d| d.env == env.as_str()))
            }
            404 => Ok(false),
            _ => Err(RegistryError::Lookup {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Send a promotion request. `patch` updates an existing deployment in place.
    pub async fn publish(
        &self,
        token: &AccessToken,
        org_id: &str,
        patch: bool,
        request: &PublishRequest,
    ) -> Result<RegistryReply> {
        let url = format!(
            "{}/data-structures/v1/deployment-requests",
            self.config.organization_url(org_id)
        );
        debug!(?request, patch, "publishing");
        let response = self
            .http_client
            .post(&url)
            .query(&[("patch", patch)])
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await?;

        Self::into_reply(response).await
    }

    /// Submit a schema document for validation.
    pub async fn validate(
        &self,
        token: &AccessToken,
        org_id: &str,
        request: &ValidationRequest,
    ) -> Result<RegistryReply> {
        let url = format!(
            "{}/data-structures/v1/validation-requests",
            self.config.organization_url(org_id)
        );
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await?;

        Self::into_reply(response).await
    }

    async fn into_reply(response: reqwest::Response) -> Result<RegistryReply> {
        let status = response.status().as_u16();
        debug!(status, "registry reply");
        let body = response.text().await?;
        Ok(RegistryReply::new(status, body))
    }
}
