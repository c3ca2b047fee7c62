//! amigo
//!
//! Rust client for the Amigo conversational AI API.
//!
//! The client exchanges a long-lived API key for a short-lived bearer token,
//! refreshes it transparently (including after a mid-call 401), retries
//! retryable failures with backoff-plus-jitter delays that honor
//! `Retry-After`, and streams ndjson events lazily with per-call
//! cancellation. Resource clients (`conversations`, `organization`, `roles`,
//! `services`, `users`) are thin typed wrappers over the shared transport.
//!
//! ```no_run
//! use futures_util::StreamExt;
//!
//! # async fn example() -> Result<(), amigo::AmigoError> {
//! let client = amigo::AmigoClient::from_env()?;
//!
//! let body = amigo::types::CreateConversationRequest {
//!     service_id: "svc-123".into(),
//!     service_version_set_name: None,
//! };
//! let mut events = client
//!     .conversations()
//!     .create_conversation(&body, &Default::default(), None)
//!     .await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A blocking mirror of the client is available behind the `blocking`
//! feature as [`blocking::AmigoClient`].
#![deny(unsafe_code)]

pub mod auth;
#[cfg(feature = "blocking")]
pub mod blocking;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resources;
pub mod retry;
pub mod streaming;
pub mod types;

pub use cancel::CancelHandle;
pub use client::{AmigoClient, AmigoClientBuilder};
pub use config::AmigoConfig;
pub use error::AmigoError;
pub use http::AmigoHttpClient;
pub use retry::RetryConfig;
pub use types::ConversationEvent;
