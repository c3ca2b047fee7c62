//! Shared helpers for the wiremock-based integration suites.

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use amigo::{AmigoClient, RetryConfig};

pub const ORG: &str = "test-org";

/// Body of a successful sign-in exchange, valid for one hour.
pub fn token_body() -> serde_json::Value {
    json!({
        "id_token": "test-bearer-token",
        "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
    })
}

/// Mount the sign-in endpoint, asserting it is hit exactly `expected` times.
pub async fn mock_sign_in(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/{ORG}/user/signin_with_api_key")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(expected)
        .mount(server)
        .await;
}

/// Client pointed at the mock server with fast retry delays.
pub fn client_for(server: &MockServer, retry: RetryConfig) -> AmigoClient {
    AmigoClient::builder()
        .api_key("test-api-key")
        .api_key_id("test-api-key-id")
        .user_id("test-user-id")
        .organization_id(ORG)
        .base_url(server.uri())
        .retry_config(retry)
        .build()
        .expect("client builds")
}

/// Retry config with near-zero delays so suites run fast.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .with_max_attempts(max_attempts)
        .with_backoff_base(0.01)
        .with_max_delay(0.05)
}
