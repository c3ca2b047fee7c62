//! Organization operations.

use reqwest::Method;

use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::types::GetOrganizationResponse;

use super::decode_json;

/// Organization resource client.
#[derive(Clone)]
pub struct Organization {
    http: AmigoHttpClient,
    organization_id: String,
}

impl Organization {
    pub(crate) fn new(http: AmigoHttpClient, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    /// Fetch the organization the client is scoped to.
    pub async fn get(&self) -> Result<GetOrganizationResponse, AmigoError> {
        let path = format!("/v1/{}/organization/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }
}
