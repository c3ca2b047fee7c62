//! Conversation operations, including the ndjson streaming endpoints.

use reqwest::Method;

use crate::cancel::CancelHandle;
use crate::error::AmigoError;
use crate::http::AmigoHttpClient;
use crate::streaming::{EventStream, decode_events};
use crate::types::{
    CreateConversationParams, CreateConversationRequest, GenerateConversationStartersRequest,
    GenerateConversationStartersResponse, GetConversationMessagesParams,
    GetConversationMessagesResponse, GetConversationsParams, GetConversationsResponse,
    InteractWithConversationParams, InteractionInsightsResponse, MessageSourceResponse,
    RecommendResponsesResponse,
};

use super::{decode_json, encode_json};

/// Conversation resource client.
#[derive(Clone)]
pub struct Conversations {
    http: AmigoHttpClient,
    organization_id: String,
}

impl Conversations {
    pub(crate) fn new(http: AmigoHttpClient, organization_id: String) -> Self {
        Self {
            http,
            organization_id,
        }
    }

    /// Create a new conversation and stream its setup events.
    ///
    /// The returned stream ends once the server closes it; the
    /// `ConversationCreated` event carries the new conversation id.
    pub async fn create_conversation(
        &self,
        body: &CreateConversationRequest,
        params: &CreateConversationParams,
        cancel: Option<CancelHandle>,
    ) -> Result<EventStream, AmigoError> {
        let path = format!("/v1/{}/conversation/", self.organization_id);
        let body = encode_json(body)?;
        let lines = self
            .http
            .stream_lines(
                Method::POST,
                &path,
                &params.to_query(),
                Some(&body),
                None,
                cancel,
            )
            .await?;
        Ok(decode_events(lines))
    }

    /// Send a message to a conversation and stream the agent's reply events.
    pub async fn interact_with_conversation(
        &self,
        conversation_id: &str,
        body: &serde_json::Value,
        params: &InteractWithConversationParams,
        cancel: Option<CancelHandle>,
    ) -> Result<EventStream, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interact",
            self.organization_id
        );
        let lines = self
            .http
            .stream_lines(
                Method::POST,
                &path,
                &params.to_query(),
                Some(body),
                None,
                cancel,
            )
            .await?;
        Ok(decode_events(lines))
    }

    /// Finish a conversation.
    pub async fn finish_conversation(&self, conversation_id: &str) -> Result<(), AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/finish/",
            self.organization_id
        );
        self.http
            .request(Method::POST, &path, &[], None, None)
            .await?;
        Ok(())
    }

    pub async fn get_conversations(
        &self,
        params: &GetConversationsParams,
    ) -> Result<GetConversationsResponse, AmigoError> {
        let path = format!("/v1/{}/conversation/", self.organization_id);
        let response = self
            .http
            .request(Method::GET, &path, &params.to_query(), None, None)
            .await?;
        decode_json(response).await
    }

    pub async fn get_conversation_messages(
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
            .request(Method::GET, &path, &params.to_query(), None, None)
            .await?;
        decode_json(response).await
    }

    pub async fn recommend_responses_for_interaction(
        &self,
        conversation_id: &str,
        interaction_id: &str,
    ) -> Result<RecommendResponsesResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interaction/{interaction_id}/recommend_responses",
            self.organization_id
        );
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }

    pub async fn get_interaction_insights(
        &self,
        conversation_id: &str,
        interaction_id: &str,
    ) -> Result<InteractionInsightsResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/interaction/{interaction_id}/insights",
            self.organization_id
        );
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }

    /// Short-lived source link for a transcribed message.
    pub async fn get_message_source(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageSourceResponse, AmigoError> {
        let path = format!(
            "/v1/{}/conversation/{conversation_id}/messages/{message_id}/source",
            self.organization_id
        );
        let response = self
            .http
            .request(Method::GET, &path, &[], None, None)
            .await?;
        decode_json(response).await
    }

    pub async fn generate_conversation_starters(
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
            .request(Method::POST, &path, &[], Some(&body), None)
            .await?;
        decode_json(response).await
    }
}
