//! Resource clients: thin, mechanical mappings of typed calls onto the
//! transport. Each holds a clone of [`AmigoHttpClient`](crate::http::AmigoHttpClient)
//! and the organization all paths are scoped under.

mod conversation;
mod organization;
mod role;
mod service;
mod user;

pub use conversation::Conversations;
pub use organization::Organization;
pub use role::Roles;
pub use service::Services;
pub use user::Users;

use serde::de::DeserializeOwned;

use crate::error::AmigoError;

/// Deserialize a 2xx response body; failures are local SDK errors, never
/// server-reported ones.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AmigoError> {
    let text = response.text().await.map_err(AmigoError::from)?;
    serde_json::from_str(&text)
        .map_err(|e| AmigoError::Sdk(format!("failed to decode response body: {e}")))
}

/// Serialize a request body; failures are local SDK errors.
pub(crate) fn encode_json<T: serde::Serialize>(body: &T) -> Result<serde_json::Value, AmigoError> {
    serde_json::to_value(body)
        .map_err(|e| AmigoError::Sdk(format!("failed to encode request body: {e}")))
}
