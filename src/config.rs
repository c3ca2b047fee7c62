//! Client configuration.
//!
//! Credentials and endpoint settings for one organization, supplied
//! explicitly through the builder or sourced from the environment:
//! `AMIGO_API_KEY`, `AMIGO_API_KEY_ID`, `AMIGO_USER_ID`,
//! `AMIGO_ORGANIZATION_ID`, `AMIGO_BASE_URL`.

use secrecy::SecretString;

use crate::error::AmigoError;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.amigo.ai";

const ENV_API_KEY: &str = "AMIGO_API_KEY";
const ENV_API_KEY_ID: &str = "AMIGO_API_KEY_ID";
const ENV_USER_ID: &str = "AMIGO_USER_ID";
const ENV_ORGANIZATION_ID: &str = "AMIGO_ORGANIZATION_ID";
const ENV_BASE_URL: &str = "AMIGO_BASE_URL";

/// Immutable client configuration.
#[derive(Debug, Clone)]
pub struct AmigoConfig {
    /// Long-lived API key, exchanged for short-lived bearer tokens.
    pub api_key: SecretString,
    /// Identifier of the API key.
    pub api_key_id: String,
    /// User the client acts as.
    pub user_id: String,
    /// Organization all request paths are scoped under.
    pub organization_id: String,
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
}

impl AmigoConfig {
    pub fn builder() -> AmigoConfigBuilder {
        AmigoConfigBuilder::default()
    }

    /// Build a configuration entirely from `AMIGO_*` environment variables.
    pub fn from_env() -> Result<Self, AmigoError> {
        Self::builder().build()
    }
}

/// Builder for [`AmigoConfig`]; unset fields fall back to the environment.
#[derive(Debug, Default)]
pub struct AmigoConfigBuilder {
    api_key: Option<String>,
    api_key_id: Option<String>,
    user_id: Option<String>,
    organization_id: Option<String>,
    base_url: Option<String>,
}

impl AmigoConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_key_id(mut self, api_key_id: impl Into<String>) -> Self {
        self.api_key_id = Some(api_key_id.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> Result<AmigoConfig, AmigoError> {
        let api_key = resolve(self.api_key, ENV_API_KEY)?;
        let api_key_id = resolve(self.api_key_id, ENV_API_KEY_ID)?;
        let user_id = resolve(self.user_id, ENV_USER_ID)?;
        let organization_id = resolve(self.organization_id, ENV_ORGANIZATION_ID)?;
        let base_url = self
            .base_url
            .or_else(|| std::env::var(ENV_BASE_URL).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(AmigoConfig {
            api_key: SecretString::from(api_key),
            api_key_id,
            user_id,
            organization_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn resolve(explicit: Option<String>, env_var: &str) -> Result<String, AmigoError> {
    explicit
        .or_else(|| std::env::var(env_var).ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AmigoError::Configuration(format!(
                "missing required setting: provide it explicitly or set {env_var}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn full_builder() -> AmigoConfigBuilder {
        AmigoConfig::builder()
            .api_key("key")
            .api_key_id("key-id")
            .user_id("user")
            .organization_id("org")
    }

    #[test]
    fn builds_with_explicit_values_and_default_base_url() {
        let config = full_builder().build().expect("config builds");
        assert_eq!(config.api_key.expose_secret(), "key");
        assert_eq!(config.organization_id, "org");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let config = full_builder()
            .base_url("https://api.example.com/")
            .build()
            .expect("config builds");
        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn missing_required_field_names_the_env_var() {
        let err = AmigoConfig::builder()
            .api_key("key")
            .api_key_id("key-id")
            .user_id("user")
            .build()
            .expect_err("organization id missing");
        match err {
            AmigoError::Configuration(message) => {
                assert!(message.contains("AMIGO_ORGANIZATION_ID"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let config = full_builder().build().expect("config builds");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("\"key\""));
    }
}
