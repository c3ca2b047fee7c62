//! Error types for the Amigo API client.
//!
//! Every non-2xx response is mapped onto a fixed status-driven hierarchy so
//! callers can match on the failure kind programmatically. Local decoding
//! failures on otherwise-successful responses are kept distinct (`Sdk`) and
//! never conflated with a server-reported error.

use std::collections::HashMap;

use thiserror::Error;

/// Errors produced by the Amigo client.
#[derive(Error, Debug)]
pub enum AmigoError {
    /// 400, or any 4xx without a more specific mapping.
    #[error("bad request (HTTP {status}): {message}")]
    BadRequest {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 401, and any failure of the API-key exchange itself.
    #[error("authentication failed: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
    },

    /// 403.
    #[error("permission denied (HTTP {status}): {message}")]
    Permission {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 404.
    #[error("not found (HTTP {status}): {message}")]
    NotFound {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 409.
    #[error("conflict (HTTP {status}): {message}")]
    Conflict {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 422, a bad request carrying field-level validation errors.
    #[error("validation failed (HTTP {status}): {message}")]
    Validation {
        status: u16,
        message: String,
        field_errors: HashMap<String, String>,
        body: Option<serde_json::Value>,
    },

    /// 429.
    #[error("rate limited (HTTP {status}): {message}")]
    RateLimit {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 500-range responses.
    #[error("server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 503, the service is down or in maintenance.
    #[error("service unavailable (HTTP {status}): {message}")]
    ServiceUnavailable {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// Local failure decoding a successful response.
    #[error("SDK internal error: {0}")]
    Sdk(String),

    /// The request timed out before a response was received.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Transport-level failure with no response (DNS, connect, TLS, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The client configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AmigoError {
    /// HTTP status carried by this error, when one was observed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. }
            | Self::Permission { status, .. }
            | Self::NotFound { status, .. }
            | Self::Conflict { status, .. }
            | Self::Validation { status, .. }
            | Self::RateLimit { status, .. }
            | Self::Server { status, .. }
            | Self::ServiceUnavailable { status, .. } => Some(*status),
            Self::Authentication { status, .. } => *status,
            _ => None,
        }
    }

    /// Field-level validation errors, when the server supplied them.
    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Validation { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AmigoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Sdk(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Map a non-2xx status and (already-read) body text onto the typed error.
///
/// The body is parsed best-effort: a JSON object with a `message` field
/// supplies the error message, and a 422 `errors` object supplies
/// field-level validation errors. Anything unparseable falls back to a
/// generic message with the raw body attached.
pub fn error_for_status(status: u16, body_text: &str) -> AmigoError {
    let body: Option<serde_json::Value> = serde_json::from_str(body_text).ok();
    let message = body
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| default_message(status));

    match status {
        400 => AmigoError::BadRequest {
            status,
            message,
            body,
        },
        401 => AmigoError::Authentication {
            status: Some(status),
            message,
        },
        403 => AmigoError::Permission {
            status,
            message,
            body,
        },
        404 => AmigoError::NotFound {
            status,
            message,
            body,
        },
        409 => AmigoError::Conflict {
            status,
            message,
            body,
        },
        422 => {
            let field_errors = body
                .as_ref()
                .and_then(|v| v.get("errors"))
                .and_then(|e| e.as_object())
                .map(|map| {
                    map.iter()
                        .map(|(k, v)| {
                            let msg = v
                                .as_str()
                                .map(str::to_owned)
                                .unwrap_or_else(|| v.to_string());
                            (k.clone(), msg)
                        })
                        .collect()
                })
                .unwrap_or_default();
            AmigoError::Validation {
                status,
                message,
                field_errors,
                body,
            }
        }
        429 => AmigoError::RateLimit {
            status,
            message,
            body,
        },
        503 => AmigoError::ServiceUnavailable {
            status,
            message,
            body,
        },
        500..=599 => AmigoError::Server {
            status,
            message,
            body,
        },
        _ => AmigoError::BadRequest {
            status,
            message,
            body,
        },
    }
}

/// Status-only variant of [`error_for_status`] for responses whose body must
/// not be consumed (streaming handshakes).
pub fn error_for_status_light(status: u16) -> AmigoError {
    error_for_status(status, "")
}

fn default_message(status: u16) -> String {
    format!("HTTP {status} error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses_to_expected_variants() {
        assert!(matches!(
            error_for_status(400, ""),
            AmigoError::BadRequest { status: 400, .. }
        ));
        assert!(matches!(
            error_for_status(401, ""),
            AmigoError::Authentication {
                status: Some(401),
                ..
            }
        ));
        assert!(matches!(
            error_for_status(403, ""),
            AmigoError::Permission { status: 403, .. }
        ));
        assert!(matches!(
            error_for_status(404, ""),
            AmigoError::NotFound { status: 404, .. }
        ));
        assert!(matches!(
            error_for_status(409, ""),
            AmigoError::Conflict { status: 409, .. }
        ));
        assert!(matches!(
            error_for_status(422, ""),
            AmigoError::Validation { status: 422, .. }
        ));
        assert!(matches!(
            error_for_status(429, ""),
            AmigoError::RateLimit { status: 429, .. }
        ));
        assert!(matches!(
            error_for_status(500, ""),
            AmigoError::Server { status: 500, .. }
        ));
        assert!(matches!(
            error_for_status(503, ""),
            AmigoError::ServiceUnavailable { status: 503, .. }
        ));
    }

    #[test]
    fn unknown_4xx_maps_to_bad_request_and_unknown_5xx_to_server() {
        assert!(matches!(
            error_for_status(418, ""),
            AmigoError::BadRequest { status: 418, .. }
        ));
        assert!(matches!(
            error_for_status(599, ""),
            AmigoError::Server { status: 599, .. }
        ));
    }

    #[test]
    fn message_is_taken_from_body_when_present() {
        let err = error_for_status(401, r#"{"message":"Invalid API key"}"#);
        match err {
            AmigoError::Authentication { message, .. } => {
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn validation_error_collects_field_errors() {
        let err = error_for_status(
            422,
            r#"{"message":"Validation failed","errors":{"email":"Invalid format"}}"#,
        );
        let fields = err.field_errors().expect("field errors");
        assert_eq!(fields.get("email").map(String::as_str), Some("Invalid format"));
    }

    #[test]
    fn non_json_body_falls_back_to_generic_message() {
        let err = error_for_status(500, "<html>oops</html>");
        match err {
            AmigoError::Server { message, body, .. } => {
                assert_eq!(message, "HTTP 500 error");
                assert!(body.is_none());
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn status_code_accessor_covers_all_carrying_variants() {
        assert_eq!(error_for_status(429, "").status_code(), Some(429));
        assert_eq!(AmigoError::Sdk("x".into()).status_code(), None);
        assert_eq!(AmigoError::Timeout("t".into()).status_code(), None);
    }
}
