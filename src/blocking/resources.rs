//! Blocking resource clients, co-located mirrors of the async ones.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::AmigoError;
use crate::types::{
    CreateConversationParams, CreateConversationRequest, CreateInvitedUserRequest,
    CreateInvitedUserResponse, CreateRoleRequest, GenerateConversationStartersRequest,
    GenerateConversationStartersResponse, GetConversationMessagesParams,
    GetConversationMessagesResponse, GetConversationsParams, GetConversationsResponse,
    GetOrganizationResponse, GetRolesResponse, GetServicesResponse, GetUsersParams,
    GetUsersResponse, InteractWithConversationParams, InteractionInsightsResponse,
    MessageSourceResponse, RecommendResponsesResponse, UpdateUserInfoRequest,
};

use super::{AmigoHttpClient, EventIter};
use crate::cancel::CancelHandle;

fn decode_json<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, AmigoError> {
    let text = response.text().map_err(AmigoError::from)?;
    serde_json::from_str(&text)
        .map_err(|e| AmigoError::Sdk(format!("failed to decode response body: {e}")))
}

fn encode_json<T: serde::Serialize>(body: &T) -> Result<serde_json::Value, AmigoError> {
    serde_json::to_value(body)
        .map_err(|e| AmigoError::Sdk(format!("failed to encode request body: {e}")))
}

/// Conversation resource client (blocking).
pub struct Conversations {
    http: Arc<AmigoHttpClient>,
    organization_id: String,
}

impl Conversations {
    pub(crate) fn new(http: Arc<AmigoHttpClient>, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub fn create_conversation(
        &self,
        body: &CreateConversationRequest,
        params: &CreateConversationParams,
        cancel: Option<CancelHandle>,
    ) -> Result<EventIter, AmigoError> {
        let path = format!("/v1/{}/conversation/", self.organization_id);
        let body = encode_json(body)?;
        let lines = self.http.stream_lines(
            Method::POST,
            &path,
            &params.to_query(),
            Some(&body),
            None,
            cancel,
        )?;
        Ok(EventIter::new(lines))
    }

    pub fn interact_with_conversation(
        &self,
        conversation_id: &str,
        body: &serde_json::Value,
        params: &InteractWithConversationParams,
        cancel: Option<CancelHandle>,
    ) -> Result<EventIter, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interact",
            self.organization_id
        );
        let lines = self.http.stream_lines(
            Method::POST,
            &path,
            &params.to_query(),
            Some(body),
            None,
            cancel,
        )?;
        Ok(EventIter::new(lines))
    }

    pub fn finish_conversation(&self, conversation_id: &str) -> Result<(), AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/finish/",
            self.organization_id
        );
        self.http.request(Method::POST, &path, &[], None, None)?;
        Ok(())
    }

    pub fn get_conversations(
        &self,
        params: &GetConversationsParams,
    ) -> Result<GetConversationsResponse, AmigoError> {
        let path = format!("/v1/{}/conversation/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &params.to_query(), None, None)?;
        decode_json(response)
    }

    pub fn get_conversation_messages(
        &self,
        conversation_id: &str,
        params: &GetConversationMessagesParams,
    ) -> Result<GetConversationMessagesResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/messages/",
            self.organization_id
        );
        let response = self
            .http
            .request(Method::GET, &path, &params.to_query(), None, None)?;
        decode_json(response)
    }

    pub fn recommend_responses_for_interaction(
        &self,
        conversation_id: &str,
        interaction_id: &str,
    ) -> Result<RecommendResponsesResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interaction/{interaction_id}/recommend_responses",
            self.organization_id
        );
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }

    pub fn get_interaction_insights(
        &self,
        conversation_id: &str,
        interaction_id: &str,
    ) -> Result<InteractionInsightsResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interaction/{interaction_id}/insights",
            self.organization_id
        );
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }

    pub fn get_message_source(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageSourceResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/messages/{message_id}/source",
            self.organization_id
        );
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }

    pub fn generate_conversation_starters(
        &self,
        body: &GenerateConversationStartersRequest,
    ) -> Result<GenerateConversationStartersResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/conversation_starter",
            self.organization_id
        );
        let body = encode_json(body)?;
        let response = self
            .http
            .request(Method::POST, &path, &[], Some(&body), None)?;
        decode_json(response)
    }
}

/// Organization resource client (blocking).
pub struct Organization {
    http: Arc<AmigoHttpClient>,
    organization_id: String,
}

impl Organization {
    pub(crate) fn new(http: Arc<AmigoHttpClient>, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub fn get(&self) -> Result<GetOrganizationResponse, AmigoError> {
        let path = format!("/v1/{}/organization/", self.organization_id);
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }
}

/// Role resource client (blocking).
pub struct Roles {
    http: Arc<AmigoHttpClient>,
    organization_id: String,
}

impl Roles {
    pub(crate) fn new(http: Arc<AmigoHttpClient>, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub fn get_roles(&self) -> Result<GetRolesResponse, AmigoError> {
        let path = format!("/v1/{}/role/", self.organization_id);
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }

    pub fn create_role(&self, body: &CreateRoleRequest) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/role/", self.organization_id);
        let body = encode_json(body)?;
        self.http
            .request(Method::POST, &path, &[], Some(&body), None)?;
        Ok(())
    }
}

/// Service resource client (blocking).
pub struct Services {
    http: Arc<AmigoHttpClient>,
    organization_id: String,
}

impl Services {
    pub(crate) fn new(http: Arc<AmigoHttpClient>, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub fn get_services(&self) -> Result<GetServicesResponse, AmigoError> {
        let path = format!("/v1/{}/service/", self.organization_id);
        let response = self.http.request(Method::GET, &path, &[], None, None)?;
        decode_json(response)
    }
}

/// User resource client (blocking).
pub struct Users {
    http: Arc<AmigoHttpClient>,
    organization_id: String,
}

impl Users {
    pub(crate) fn new(http: Arc<AmigoHttpClient>, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    pub fn get_users(&self, params: &GetUsersParams) -> Result<GetUsersResponse, AmigoError> {
        let path = format!("/v1/{}/user/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &params.to_query(), None, None)?;
        decode_json(response)
    }

    pub fn create_user(
        &self,
        body: &CreateInvitedUserRequest,
    ) -> Result<CreateInvitedUserResponse, AmigoError> {
        let path = format!("/v1/{}/user/invite", self.organization_id);
        let body = encode_json(body)?;
        let response = self
            .http
            .request(Method::POST, &path, &[], Some(&body), None)?;
        decode_json(response)
    }

    pub fn update_user(&self, user_id: &str, body: &UpdateUserInfoRequest) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/user/{user_id}", self.organization_id);
        let body = encode_json(body)?;
        self.http
            .request(Method::PUT, &path, &[], Some(&body), None)?;
        Ok(())
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), AmigoError> {
        let path = format!("/v1/{}/user/{user_id}", self.organization_id);
        self.http
            .request(Method::DELETE, &path, &[], None, None)?;
        Ok(())
    }
}
