//! Blocking (synchronous) client.
//!
//! Mirror of the async transport over `reqwest::blocking`, with identical
//! auth, retry, and error semantics: one call at a time per client, real
//! `thread::sleep` between attempts, and an iterator in place of the async
//! line stream. Enabled with the `blocking` cargo feature.

mod resources;

pub use resources::{Conversations, Organization, Roles, Services, Users};

use std::io::{BufRead, BufReader};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;

use crate::cancel::CancelHandle;
use crate::config::AmigoConfig;
use crate::error::{AmigoError, error_for_status, error_for_status_light};
use crate::retry::{self, RetryConfig};
use crate::types::{ConversationEvent, SignInWithApiKeyResponse};

const NDJSON_ACCEPT: &str = "application/x-ndjson";

/// Blocking API-key → bearer-token exchange. One attempt; every failure
/// maps to `Authentication`.
pub fn sign_in_with_api_key(
    http: &reqwest::blocking::Client,
    config: &AmigoConfig,
) -> Result<SignInWithApiKeyResponse, AmigoError> {
    let url = format!(
        "{}/v1/{}/user/signin_with_api_key",
        config.base_url, config.organization_id
    );
    let response = http
        .post(&url)
        .header("x-api-key", config.api_key.expose_secret())
        .header("x-api-key-id", &config.api_key_id)
        .header("x-user-id", &config.user_id)
        .send()
        .map_err(|e| AmigoError::Authentication {
            status: None,
            message: format!("sign in with API key failed: {e}"),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AmigoError::Authentication {
            status: Some(status.as_u16()),
            message: format!("sign in with API key failed: HTTP {}", status.as_u16()),
        });
    }

    response
        .json::<SignInWithApiKeyResponse>()
        .map_err(|e| AmigoError::Authentication {
            status: None,
            message: format!("invalid sign-in response format: {e}"),
        })
}

struct TokenSlot {
    token: Mutex<Option<SignInWithApiKeyResponse>>,
}

impl TokenSlot {
    fn new() -> Self {
        Self {
            token: Mutex::new(None),
        }
    }

    fn ensure_token(
        &self,
        http: &reqwest::blocking::Client,
        config: &AmigoConfig,
    ) -> Result<String, AmigoError> {
        let mut slot = self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(token) = slot.as_ref()
            && Utc::now() <= token.expires_at - chrono::Duration::minutes(5)
        {
            return Ok(token.id_token.clone());
        }
        tracing::debug!("bearer token missing or near expiry, exchanging API key");
        let fresh = sign_in_with_api_key(http, config)?;
        let id_token = fresh.id_token.clone();
        *slot = Some(fresh);
        Ok(id_token)
    }

    fn invalidate(&self) {
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

/// Blocking transport with the same retry and 401 semantics as the async
/// [`AmigoHttpClient`](crate::http::AmigoHttpClient).
pub struct AmigoHttpClient {
    http: reqwest::blocking::Client,
    config: AmigoConfig,
    retry: RetryConfig,
    token: TokenSlot,
}

impl AmigoHttpClient {
    pub fn new(config: AmigoConfig) -> Result<Self, AmigoError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| AmigoError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::from_parts(http, config, RetryConfig::default()))
    }

    pub fn from_parts(
        http: reqwest::blocking::Client,
        config: AmigoConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            config,
            retry,
            token: TokenSlot::new(),
        }
    }

    pub fn config(&self) -> &AmigoConfig {
        &self.config
    }

    /// Execute a request and return the final response for deserialization.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::blocking::Response, AmigoError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt: u32 = 1;
        loop {
            match self.send_with_auth(&method, &url, query, body, headers.as_ref()) {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if attempt < self.retry.max_attempts
                        && retry::is_retryable_response(
                            method.as_str(),
                            status.as_u16(),
                            response.headers(),
                            &self.retry,
                        )
                    {
                        self.backoff(
                            attempt,
                            retry::retry_after_header(response.headers()),
                            status.as_u16(),
                        );
                        attempt += 1;
                        continue;
                    }
                    let status = status.as_u16();
                    let body_text = response.text().unwrap_or_default();
                    return Err(error_for_status(status, &body_text));
                }
                Err(err) => {
                    if attempt < self.retry.max_attempts && self.retryable_transport(&method, &err) {
                        self.backoff(attempt, None, 0);
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Open an ndjson streaming call and return an iterator over its lines.
    pub fn stream_lines(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
        cancel: Option<CancelHandle>,
    ) -> Result<LineIter, AmigoError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut headers = headers.unwrap_or_default();
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(NDJSON_ACCEPT));
        }

        let mut attempt: u32 = 1;
        loop {
            if cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
                return Ok(LineIter::empty());
            }
            match self.send_with_auth(&method, &url, query, body, Some(&headers)) {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(LineIter::new(response, cancel));
                    }
                    if attempt < self.retry.max_attempts
                        && retry::is_retryable_response(
                            method.as_str(),
                            status.as_u16(),
                            response.headers(),
                            &self.retry,
                        )
                    {
                        self.backoff(
                            attempt,
                            retry::retry_after_header(response.headers()),
                            status.as_u16(),
                        );
                        attempt += 1;
                        continue;
                    }
                    return Err(error_for_status_light(status.as_u16()));
                }
                Err(err) => {
                    if attempt < self.retry.max_attempts && self.retryable_transport(&method, &err) {
                        self.backoff(attempt, None, 0);
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    fn send_with_auth(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<reqwest::blocking::Response, AmigoError> {
        let token = self.token.ensure_token(&self.http, &self.config)?;
        let response = self
            .build_request(method, url, query, body, extra_headers, &token)
            .send()
            .map_err(AmigoError::from)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(url, "received 401, refreshing token and retrying once");
        self.token.invalidate();
        let token = self.token.ensure_token(&self.http, &self.config)?;
        self.build_request(method, url, query, body, extra_headers, &token)
            .send()
            .map_err(AmigoError::from)
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        extra_headers: Option<&HeaderMap>,
        token: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let mut rb = self.http.request(method.clone(), url);
        if let Some(headers) = extra_headers {
            rb = rb.headers(headers.clone());
        }
        rb = rb.header(AUTHORIZATION, format!("Bearer {token}"));
        if !query.is_empty() {
            rb = rb.query(query);
        }
        if let Some(body) = body {
            rb = rb.json(body);
        }
        rb
    }

    fn retryable_transport(&self, method: &Method, err: &AmigoError) -> bool {
        matches!(err, AmigoError::Timeout(_))
            && retry::is_retryable_timeout(method.as_str(), &self.retry)
    }

    fn backoff(&self, attempt: u32, retry_after: Option<&str>, status: u16) {
        let delay = retry::compute_retry_delay_seconds(
            attempt,
            self.retry.backoff_base,
            self.retry.max_delay,
            retry_after,
        );
        tracing::warn!(attempt, status, delay_seconds = delay, "retrying request");
        std::thread::sleep(Duration::from_secs_f64(delay));
    }
}

/// Iterator over trimmed, non-empty response lines.
pub struct LineIter {
    lines: Option<std::io::Lines<BufReader<reqwest::blocking::Response>>>,
    cancel: Option<CancelHandle>,
}

impl LineIter {
    fn new(response: reqwest::blocking::Response, cancel: Option<CancelHandle>) -> Self {
        Self {
            lines: Some(BufReader::new(response).lines()),
            cancel,
        }
    }

    fn empty() -> Self {
        Self {
            lines: None,
            cancel: None,
        }
    }
}

impl Iterator for LineIter {
    type Item = Result<String, AmigoError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
                self.lines = None;
                return None;
            }
            match self.lines.as_mut()?.next() {
                None => {
                    self.lines = None;
                    return None;
                }
                Some(Ok(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(Ok(line));
                }
                Some(Err(e)) => {
                    self.lines = None;
                    return Some(Err(AmigoError::Network(e.to_string())));
                }
            }
        }
    }
}

/// Iterator decoding each line into a [`ConversationEvent`].
pub struct EventIter {
    lines: LineIter,
}

impl EventIter {
    pub(crate) fn new(lines: LineIter) -> Self {
        Self { lines }
    }
}

impl Iterator for EventIter {
    type Item = Result<ConversationEvent, AmigoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines
            .next()
            .map(|item| item.and_then(|line| ConversationEvent::from_json_line(&line)))
    }
}

/// Blocking client facade with the same resource accessors as the async
/// [`AmigoClient`](crate::client::AmigoClient).
pub struct AmigoClient {
    http: std::sync::Arc<AmigoHttpClient>,
}

impl AmigoClient {
    pub fn new(config: AmigoConfig) -> Result<Self, AmigoError> {
        Ok(Self {
            http: std::sync::Arc::new(AmigoHttpClient::new(config)?),
        })
    }

    pub fn from_env() -> Result<Self, AmigoError> {
        Self::new(AmigoConfig::from_env()?)
    }

    /// Wrap an already-configured transport.
    pub fn from_transport(transport: AmigoHttpClient) -> Self {
        Self {
            http: std::sync::Arc::new(transport),
        }
    }

    pub fn http(&self) -> &AmigoHttpClient {
        &self.http
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

    /// Consume the client, releasing the connection pool.
    pub fn close(self) {}

    fn organization_id(&self) -> String {
        self.http.config().organization_id.clone()
    }
}
