//! Role operations.

use reqwest::Method;

use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::types::{CreateRoleRequest, GetRolesResponse};

use super::{decode_json, encode_json};

/// Role resource client.
#[derive(Clone)]
pub struct Roles {
    http: AmigoHttpClient,
    organization_id: String,
}

impl Roles {
    pub(crate) fn new(http: AmigoHttpClient, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub async fn get_roles(&self) -> Result<GetRolesResponse, AmigoError> {
        let path = format!("/v1/{}/role/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }

    pub async fn create_role(&self, body: &CreateRoleRequest) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/role/", self.organization_id);
        let body = encode_json(body)?;
        self.http
            .request(Method::POST, &path, &[], Some(&body), None)
            .await?;
        Ok(())
    }
}
