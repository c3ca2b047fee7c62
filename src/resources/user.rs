//! User management operations.

use reqwest::Method;

use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::types::{
    CreateInvitedUserRequest, CreateInvitedUserResponse, GetUsersParams, GetUsersResponse,
    UpdateUserInfoRequest,
};

use super::{decode_json, encode_json};

/// User resource client.
#[derive(Clone)]
pub struct Users {
    http: AmigoHttpClient,
    organization_id: String,
}

impl Users {
    pub(crate) fn new(http: AmigoHttpClient, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    /// List users, optionally filtered by id or email (filters repeat the key).
    pub async fn get_users(&self, params: &GetUsersParams) -> Result<GetUsersResponse, AmigoError> {
        let path = format!("/v1/{}/user/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &params.to_query(), None, None)
            .await?;
        decode_json(response).await
    }

    /// Invite a new user into the organization.
    pub async fn create_user(
        &self,
        body: &CreateInvitedUserRequest,
    ) -> Result<CreateInvitedUserResponse, AmigoError> {
        let path = format!("/v1/{}/user/invite", self.organization_id);
        let body = encode_json(body)?;
        let response = self
            .http
            .request(Method::POST, &path, &[], Some(&body), None)
            .await?;
        decode_json(response).await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        body: &UpdateUserInfoRequest,
    ) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/user/{user_id}", self.organization_id);
        let body = encode_json(body)?;
        self.http
            .request(Method::PUT, &path, &[], Some(&body), None)
            .await?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/user/{user_id}", self.organization_id);
        self.http
            .request(Method::DELETE, &path, &[], None, None)
            .await?;
        Ok(())
    }
}
