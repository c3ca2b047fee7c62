//! Client facade.
//!
//! [`AmigoClient`] owns the transport and hands out resource clients. The
//! connection pool and the current bearer token are shared by every
//! resource client and every clone; the pool is released when the last
//! handle drops, so a client scoped to a block is released on every exit
//! path. [`AmigoClient::close`] marks the release point explicitly.

use crate::config::{AmigoConfig, AmigoConfigBuilder};
use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::resources::{Conversations, Organization, Roles, Services, Users};
use crate::retry::RetryConfig;

/// Client for the Amigo API.
///
/// ```no_run
/// # async fn example() -> Result<(), amigo::AmigoError> {
/// let client = amigo::AmigoClient::from_env()?;
/// let services = client.services().get_services().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AmigoClient {
    http: AmigoHttpClient,
}

impl AmigoClient {
    pub fn new(config: AmigoConfig) -> Result<Self, AmigoError> {
        Ok(Self {
            http: AmigoHttpClient::new(config)?,
        })
    }

    /// Build a client entirely from `AMIGO_*` environment variables.
    pub fn from_env() -> Result<Self, AmigoError> {
        Self::new(AmigoConfig::from_env()?)
    }

    pub fn builder() -> AmigoClientBuilder {
        AmigoClientBuilder::default()
    }

    /// The shared transport, for callers issuing raw requests.
    pub fn http(&self) -> &AmigoHttpClient {
        &self.http
    }

    pub fn config(&self) -> &AmigoConfig {
        self.http.config()
    }

    pub fn conversations(&self) -> Conversations {
        Conversations::new(self.http.clone(), self.organization_id())
    }

    pub fn organization(&self) -> Organization {
        Organization::new(self.http.clone(), self.organization_id())
    }

    pub fn roles(&self) -> Roles {
        Roles::new(self.http.clone(), self.organization_id())
    }

    pub fn services(&self) -> Services {
        Services::new(self.http.clone(), self.organization_id())
    }

    pub fn users(&self) -> Users {
        Users::new(self.http.clone(), self.organization_id())
    }

    /// Consume the client, releasing its share of the connection pool.
    ///
    /// Dropping the client has the same effect; this exists to make the
    /// release point explicit at the end of a scope.
    pub fn close(self) {}

    fn organization_id(&self) -> String {
        self.http.config().organization_id.clone()
    }
}

/// Builder combining configuration, retry policy, and an optional
/// caller-supplied HTTP pool.
#[derive(Debug, Default)]
pub struct AmigoClientBuilder {
    config: AmigoConfigBuilder,
    retry: Option<RetryConfig>,
    http: Option<reqwest::Client>,
}

impl AmigoClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config = self.config.api_key(api_key);
        self
    }

    pub fn api_key_id(mut self, api_key_id: impl Into<String>) -> Self {
        self.config = self.config.api_key_id(api_key_id);
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config = self.config.user_id(user_id);
        self
    }

    pub fn organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.config = self.config.organization_id(organization_id);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.base_url(base_url);
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Use a caller-configured `reqwest` pool (timeouts, proxies, ...).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<AmigoClient, AmigoError> {
        let config = self.config.build()?;
        let retry = self.retry.unwrap_or_default();
        let http = match self.http {
            Some(http) => AmigoHttpClient::from_parts(http, config, retry),
            None => {
                let pool = reqwest::Client::builder().build().map_err(|e| {
                    AmigoError::Configuration(format!("failed to build HTTP client: {e}"))
                })?;
                AmigoHttpClient::from_parts(pool, config, retry)
            }
        };
        Ok(AmigoClient { http })
    }
}
