//! Wire types for the Amigo API.
//!
//! Request bodies serialize with `None` fields omitted; query-parameter
//! structs flatten to key→value pairs (list-valued fields repeat the key).
//! Streaming responses decode line-by-line into [`ConversationEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AmigoError;

/// Successful body of the sign-in exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInWithApiKeyResponse {
    /// Bearer string presented in the Authorization header.
    pub id_token: String,
    /// Absolute expiry of the token, UTC.
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Streaming events
// ---------------------------------------------------------------------------

/// One event from a conversation ndjson stream.
///
/// Events are a discriminated union keyed by the `type` field. Unrecognized
/// discriminators decode to [`ConversationEvent::Unknown`] so new server-side
/// event kinds never break consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// The conversation has been created and is ready for interaction.
    ConversationCreated { conversation_id: String },
    /// An incremental chunk of the agent's reply.
    NewMessage { message: String },
    /// The interaction finished; the stream will end after this event.
    InteractionComplete {
        interaction_id: String,
        full_message: Option<String>,
    },
    /// The server reported a failure mid-stream.
    Error { message: String },
    /// An event kind this SDK version does not know about.
    Unknown {
        event_type: String,
        data: serde_json::Value,
    },
}

impl ConversationEvent {
    /// Decode one ndjson line.
    ///
    /// The discriminator is inspected first; a known discriminator with a
    /// malformed payload is a local decoding failure (`Sdk`), while an
    /// unknown discriminator is preserved as [`Self::Unknown`].
    pub fn from_json_line(line: &str) -> Result<Self, AmigoError> {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| AmigoError::Sdk(format!("invalid event line: {e}")))?;
        let event_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        fn payload<T: serde::de::DeserializeOwned>(
            value: serde_json::Value,
        ) -> Result<T, AmigoError> {
            serde_json::from_value(value)
                .map_err(|e| AmigoError::Sdk(format!("invalid event payload: {e}")))
        }

        match event_type.as_str() {
            "conversation-created" => {
                #[derive(Deserialize)]
                struct Payload {
                    conversation_id: String,
                }
                let p: Payload = payload(value)?;
                Ok(Self::ConversationCreated {
                    conversation_id: p.conversation_id,
                })
            }
            "new-message" => {
                #[derive(Deserialize)]
                struct Payload {
                    message: String,
                }
                let p: Payload = payload(value)?;
                Ok(Self::NewMessage { message: p.message })
            }
            "interaction-complete" => {
                #[derive(Deserialize)]
                struct Payload {
                    interaction_id: String,
                    full_message: Option<String>,
                }
                let p: Payload = payload(value)?;
                Ok(Self::InteractionComplete {
                    interaction_id: p.interaction_id,
                    full_message: p.full_message,
                })
            }
            "error" => {
                #[derive(Deserialize)]
                struct Payload {
                    message: String,
                }
                let p: Payload = payload(value)?;
                Ok(Self::Error { message: p.message })
            }
            _ => Ok(Self::Unknown {
                event_type,
                data: value,
            }),
        }
    }

    /// Whether this event signals that the consumer should stop iterating.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InteractionComplete { .. } | Self::Error { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub service_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetConversationsResponse {
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub sender: Option<String>,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetConversationMessagesResponse {
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of `create_conversation`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_version_set_name: Option<String>,
}

/// Query parameters for `create_conversation`.
#[derive(Debug, Clone, Default)]
pub struct CreateConversationParams {
    pub response_format: Option<String>,
}

impl CreateConversationParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "response_format", self.response_format.as_ref());
        query
    }
}

/// Query parameters for `interact_with_conversation`.
#[derive(Debug, Clone, Default)]
pub struct InteractWithConversationParams {
    pub request_format: Option<String>,
    pub response_format: Option<String>,
}

impl InteractWithConversationParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "request_format", self.request_format.as_ref());
        push_opt(&mut query, "response_format", self.response_format.as_ref());
        query
    }
}

/// Query parameters for `get_conversations`.
#[derive(Debug, Clone, Default)]
pub struct GetConversationsParams {
    pub service_id: Option<String>,
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
}

impl GetConversationsParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "service_id", self.service_id.as_ref());
        push_opt_display(&mut query, "limit", self.limit.as_ref());
        push_opt(
            &mut query,
            "continuation_token",
            self.continuation_token.as_ref(),
        );
        query
    }
}

/// Query parameters for `get_conversation_messages`.
#[derive(Debug, Clone, Default)]
pub struct GetConversationMessagesParams {
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
}

impl GetConversationMessagesParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt_display(&mut query, "limit", self.limit.as_ref());
        push_opt(
            &mut query,
            "continuation_token",
            self.continuation_token.as_ref(),
        );
        query
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendResponsesResponse {
    pub responses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionInsightsResponse {
    pub interaction_id: String,
    /// Insight payload; the schema varies by service configuration.
    pub insights: serde_json::Value,
}

/// Response of `get_message_source`: a short-lived link to the audio that
/// produced a transcribed message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSourceResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateConversationStartersRequest {
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateConversationStartersResponse {
    pub starters: Vec<String>,
}

// ---------------------------------------------------------------------------
// Organization, roles, services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GetOrganizationResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRolesResponse {
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetServicesResponse {
    pub services: Vec<Service>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetUsersResponse {
    pub users: Vec<User>,
    #[serde(default)]
    pub has_more: bool,
}

/// Query parameters for `get_users`. List-valued filters repeat the key.
#[derive(Debug, Clone, Default)]
pub struct GetUsersParams {
    pub user_id: Vec<String>,
    pub email: Vec<String>,
    pub limit: Option<u32>,
}

impl GetUsersParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        for id in &self.user_id {
            query.push(("user_id", id.clone()));
        }
        for email in &self.email {
            query.push(("email", email.clone()));
        }
        push_opt_display(&mut query, "limit", self.limit.as_ref());
        query
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInvitedUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitedUserResponse {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserInfoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&String>) {
    if let Some(value) = value {
        query.push((key, value.clone()));
    }
}

fn push_opt_display<T: std::fmt::Display>(
    query: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: Option<&T>,
) {
    if let Some(value) = value {
        query.push((key, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_event_kinds() {
        let event = ConversationEvent::from_json_line(
            r#"{"type":"new-message","message":"Hello"}"#,
        )
        .expect("decodes");
        assert_eq!(
            event,
            ConversationEvent::NewMessage {
                message: "Hello".to_string()
            }
        );
        assert!(!event.is_terminal());

        let done = ConversationEvent::from_json_line(
            r#"{"type":"interaction-complete","interaction_id":"i-1","full_message":"Hello"}"#,
        )
        .expect("decodes");
        assert!(done.is_terminal());
    }

    #[test]
    fn unknown_event_type_is_preserved_not_rejected() {
        let event = ConversationEvent::from_json_line(
            r#"{"type":"server-heartbeat","elapsed":12}"#,
        )
        .expect("decodes");
        match event {
            ConversationEvent::Unknown { event_type, data } => {
                assert_eq!(event_type, "server-heartbeat");
                assert_eq!(data["elapsed"], 12);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_for_known_type_is_an_sdk_error() {
        let err = ConversationEvent::from_json_line(r#"{"type":"new-message"}"#)
            .expect_err("missing message field");
        assert!(matches!(err, AmigoError::Sdk(_)));

        let err =
            ConversationEvent::from_json_line("{not json").expect_err("invalid json");
        assert!(matches!(err, AmigoError::Sdk(_)));
    }

    #[test]
    fn query_serialization_omits_none_and_repeats_lists() {
        let params = GetUsersParams {
            user_id: vec!["u-1".into(), "u-2".into()],
            email: vec![],
            limit: None,
        };
        assert_eq!(
            params.to_query(),
            vec![("user_id", "u-1".to_string()), ("user_id", "u-2".to_string())]
        );

        let params = GetConversationsParams {
            service_id: Some("svc".into()),
            limit: Some(25),
            continuation_token: None,
        };
        assert_eq!(
            params.to_query(),
            vec![
                ("service_id", "svc".to_string()),
                ("limit", "25".to_string())
            ]
        );
    }

    #[test]
    fn request_bodies_omit_unset_fields() {
        let body = serde_json::to_value(CreateConversationRequest {
            service_id: "svc".into(),
            service_version_set_name: None,
        })
        .expect("serializes");
        assert_eq!(body, serde_json::json!({"service_id": "svc"}));
    }
}
