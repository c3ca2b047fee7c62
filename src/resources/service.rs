//! Service operations.

use reqwest::Method;

use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::types::GetServicesResponse;

use super::decode_json;

/// Service resource client.
#[derive(Clone)]
pub struct Services {
    http: AmigoHttpClient,
    organization_id: String,
}

impl Services {
    pub(crate) fn new(http: AmigoHttpClient, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    /// List the services available to this organization.
    pub async fn get_services(&self) -> Result<GetServicesResponse, AmigoError> {
        let path = format!("/v1/{}/service/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }
}
