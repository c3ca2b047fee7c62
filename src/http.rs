//! Resilient HTTP transport.
//!
//! Owns the connection pool and the bearer-token lifecycle, and executes
//! both request/response and ndjson streaming calls:
//!
//! - `Authorization: Bearer` header from the token authenticator
//! - a single out-of-band refresh-and-retry on 401, before and independent
//!   of the generic retry loop
//! - method- and status-aware retry with backoff-plus-jitter delays that
//!   honor `Retry-After`
//! - typed errors for the final non-2xx response
//!
//! Streaming calls confirm the status line before any body bytes are read;
//! setup failures retry like plain requests, but once the first line has
//! been yielded the stream is forward-only.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};

use crate::auth::TokenAuthenticator;
use crate::cancel::CancelHandle;
use crate::config::AmigoConfig;
use crate::error::{AmigoError, error_for_status, error_for_status_light};
use crate::retry::{self, RetryConfig};
use crate::streaming::{LineStream, stream_ndjson_lines};

const NDJSON_ACCEPT: &str = "application/x-ndjson";

/// Transport shared by every resource client.
///
/// Cloning is cheap and shares the connection pool and the current token.
/// The pool is released when the last clone is dropped.
#[derive(Clone)]
pub struct AmigoHttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: AmigoConfig,
    retry: RetryConfig,
    auth: TokenAuthenticator,
}

impl AmigoHttpClient {
    pub fn new(config: AmigoConfig) -> Result<Self, AmigoError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AmigoError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::from_parts(http, config, RetryConfig::default()))
    }

    /// Construct with a caller-supplied pool and retry policy.
    pub fn from_parts(http: reqwest::Client, config: AmigoConfig, retry: RetryConfig) -> Self {
        let auth = TokenAuthenticator::new(http.clone(), config.clone());
        Self {
            inner: Arc::new(Inner {
                http,
                config,
                retry,
                auth,
            }),
        }
    }

    pub fn config(&self) -> &AmigoConfig {
        &self.inner.config
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry
    }

    /// Force the next call to re-authenticate.
    pub async fn invalidate_token(&self) {
        self.inner.auth.invalidate().await;
    }

    /// Execute a request and return the final response for deserialization.
    ///
    /// Fails with the typed error for the final non-2xx status, or with the
    /// last transport error once attempts are exhausted.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, AmigoError> {
        let url = self.url(path);
        let mut attempt: u32 = 1;
        loop {
            match self
                .send_with_auth(&method, &url, query, body, headers.as_ref())
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if attempt < self.inner.retry.max_attempts
                        && retry::is_retryable_response(
                            method.as_str(),
                            status.as_u16(),
                            response.headers(),
                            &self.inner.retry,
                        )
                    {
                        self.backoff(
                            attempt,
                            retry::retry_after_header(response.headers()),
                            status.as_u16(),
                        )
                        .await;
                        attempt += 1;
                        continue;
                    }
                    let status = status.as_u16();
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(error_for_status(status, &body_text));
                }
                Err(err) => {
                    if attempt < self.inner.retry.max_attempts && self.retryable_transport(&method, &err) {
                        self.backoff(attempt, None, 0).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Open an ndjson streaming call and return its line stream.
    ///
    /// The status is checked before any body bytes are consumed, so a
    /// non-2xx handshake maps to a status-only typed error without reading
    /// stream content. Retryable handshake failures re-attempt the whole
    /// stream; once a line has been yielded no retry happens.
    pub async fn stream_lines(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
        cancel: Option<CancelHandle>,
    ) -> Result<LineStream, AmigoError> {
        let url = self.url(path);
        let mut headers = headers.unwrap_or_default();
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(NDJSON_ACCEPT));
        }

        let mut attempt: u32 = 1;
        loop {
            if cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
                return Ok(Box::pin(futures_util::stream::empty()));
            }
            match self
                .send_with_auth(&method, &url, query, body, Some(&headers))
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(stream_ndjson_lines(response, cancel));
                    }
                    if attempt < self.inner.retry.max_attempts
                        && retry::is_retryable_response(
                            method.as_str(),
                            status.as_u16(),
                            response.headers(),
                            &self.inner.retry,
                        )
                    {
                        self.backoff(
                            attempt,
                            retry::retry_after_header(response.headers()),
                            status.as_u16(),
                        )
                        .await;
                        attempt += 1;
                        continue;
                    }
                    return Err(error_for_status_light(status.as_u16()));
                }
                Err(err) => {
                    if attempt < self.inner.retry.max_attempts && self.retryable_transport(&method, &err) {
                        self.backoff(attempt, None, 0).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One authenticated send, with the out-of-band 401 refresh-retry.
    async fn send_with_auth(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<reqwest::Response, AmigoError> {
        let token = self.inner.auth.ensure_token().await?;
        let response = self
            .build_request(method, url, query, body, extra_headers, &token)
            .send()
            .await
            .map_err(AmigoError::from)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(url, "received 401, refreshing token and retrying once");
        self.inner.auth.invalidate().await;
        let token = self.inner.auth.ensure_token().await?;
        self.build_request(method, url, query, body, extra_headers, &token)
            .send()
            .await
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
    ) -> reqwest::RequestBuilder {
        let mut rb = self.inner.http.request(method.clone(), url);
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
            && retry::is_retryable_timeout(method.as_str(), &self.inner.retry)
    }

    async fn backoff(&self, attempt: u32, retry_after: Option<&str>, status: u16) {
        let delay = retry::compute_retry_delay_seconds(
            attempt,
            self.inner.retry.backoff_base,
            self.inner.retry.max_delay,
            retry_after,
        );
        tracing::warn!(attempt, status, delay_seconds = delay, "retrying request");
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url, path)
    }
}
