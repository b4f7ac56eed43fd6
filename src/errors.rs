use std::fmt;

use slack_morphism::errors::SlackClientError;
use thiserror::Error;

/// The external lookup that failed while assembling a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    ConversationInfo,
    Messages,
    UserInfo,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            Lookup::ConversationInfo => "conversations.info",
            Lookup::Messages => "conversations.replies",
            Lookup::UserInfo => "users.info",
        };
        f.write_str(method)
    }
}

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Invalid slack message url: {0}")]
    InvalidInput(String),

    #[error(
        "You do not have permission to view conversation {conversation_id} message {message_id}: {lookup} failed: {reason}"
    )]
    UpstreamUnavailable {
        lookup: Lookup,
        conversation_id: String,
        message_id: String,
        reason: String,
    },

    #[error("Slack integration is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to parse Slack event: {0}")]
    ParseError(String),

    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Failed to access DataHub GraphQL API: {0}")]
    GraphQLError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),
}

impl SlackError {
    /// Status code surfaced to the caller of the integration service.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SlackError::InvalidInput(_)
            | SlackError::UpstreamUnavailable { .. }
            | SlackError::NotConfigured(_)
            | SlackError::ParseError(_) => 400,
            SlackError::ApiError(_) | SlackError::GraphQLError(_) | SlackError::HttpError(_) => {
                500
            }
        }
    }
}

impl From<SlackClientError> for SlackError {
    fn from(error: SlackClientError) -> Self {
        SlackError::ApiError(error.to_string())
    }
}

impl From<reqwest::Error> for SlackError {
    fn from(error: reqwest::Error) -> Self {
        SlackError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for SlackError {
    fn from(error: serde_json::Error) -> Self {
        SlackError::ParseError(error.to_string())
    }
}

impl From<anyhow::Error> for SlackError {
    fn from(error: anyhow::Error) -> Self {
        SlackError::ApiError(error.to_string())
    }
}
