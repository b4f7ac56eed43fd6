//! Slack Web API access.
//!
//! `SlackApi` is the narrow surface the preview and unfurl code needs.
//! `SlackWebApi` is the production implementation: slack-morphism for the
//! conversation lookups, plain reqwest where we need fields slack-morphism
//! does not model (normalised profile names, `chat.unfurl` blocks as JSON).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::{
    SlackApiConversationsInfoRequest, SlackApiConversationsRepliesRequest,
};
use slack_morphism::{
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackHistoryMessage, SlackTs, SlackUserId,
};
use tracing::{debug, warn};

use crate::errors::SlackError;

const SLACK_API_BASE: &str = "https://slack.com/api";

// Build the Slack client connector safely without panicking.
// If connector construction fails, store None and surface a SlackError at call sites.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationInfo {
    pub name: String,
}

impl ConversationInfo {
    /// Direct messages have no name in `conversations.info`; they are shown
    /// by their conversation id.
    #[must_use]
    pub fn named_or_id(channel: &SlackChannelId, name: Option<String>) -> Self {
        let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| {
            debug!(channel = %channel.0, "Conversation has no name, using its id");
            channel.0.clone()
        });
        Self { name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub ts: String,
    pub text: String,
    pub user: Option<String>,
    pub reply_count: Option<u64>,
}

impl From<SlackHistoryMessage> for ThreadMessage {
    fn from(msg: SlackHistoryMessage) -> Self {
        Self {
            ts: msg.origin.ts.0,
            text: msg.content.text.unwrap_or_default(),
            user: msg.sender.user.map(|u| u.0),
            reply_count: msg.parent.reply_count.map(|c| c as u64),
        }
    }
}

/// The subset of a Slack user profile used to attribute a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name_normalized: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name_normalized: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub image_72: Option<String>,
}

impl UserProfile {
    /// First non-empty of the normalised display name, display name,
    /// normalised real name and real name.
    #[must_use]
    pub fn author_name(&self) -> Option<&str> {
        [
            &self.display_name_normalized,
            &self.display_name,
            &self.real_name_normalized,
            &self.real_name,
        ]
        .into_iter()
        .filter_map(Option::as_deref)
        .find(|name| !name.is_empty())
    }
}

/// Parameters for `conversations.replies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepliesQuery {
    pub channel: SlackChannelId,
    pub ts: SlackTs,
    pub oldest: Option<SlackTs>,
    pub limit: u16,
    pub inclusive: bool,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Unnamed conversations (DMs) report their id as the name.
    async fn conversation_info(
        &self,
        channel: &SlackChannelId,
    ) -> Result<ConversationInfo, SlackError>;

    /// Messages come back in thread order: the root first, then replies.
    async fn conversation_replies(
        &self,
        query: &RepliesQuery,
    ) -> Result<Vec<ThreadMessage>, SlackError>;

    async fn user_info(&self, user: &SlackUserId) -> Result<UserProfile, SlackError>;

    /// `unfurls` maps each shared URL to its attachment payload.
    async fn chat_unfurl(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        unfurls: &Value,
    ) -> Result<(), SlackError>;
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    error: Option<String>,
    user: Option<UsersInfoUser>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoUser {
    #[serde(default)]
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
struct OkResponse {
    ok: bool,
    error: Option<String>,
}

/// Slack Web API client authenticated with the bot token.
pub struct SlackWebApi {
    token: SlackApiToken,
}

impl SlackWebApi {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token.to_string())),
        }
    }

    fn client(&self) -> Result<&'static SlackHyperClient, SlackError> {
        SLACK_CLIENT
            .as_ref()
            .ok_or_else(|| SlackError::ApiError("Slack HTTP connector not initialized".to_string()))
    }
}

#[async_trait]
impl SlackApi for SlackWebApi {
    async fn conversation_info(
        &self,
        channel: &SlackChannelId,
    ) -> Result<ConversationInfo, SlackError> {
        let session = self.client()?.open_session(&self.token);
        let info = session
            .conversations_info(&SlackApiConversationsInfoRequest::new(channel.clone()))
            .await?;

        Ok(ConversationInfo::named_or_id(channel, info.channel.name))
    }

    async fn conversation_replies(
        &self,
        query: &RepliesQuery,
    ) -> Result<Vec<ThreadMessage>, SlackError> {
        let session = self.client()?.open_session(&self.token);

        let mut request =
            SlackApiConversationsRepliesRequest::new(query.channel.clone(), query.ts.clone())
                .with_limit(query.limit)
                .with_inclusive(query.inclusive);
        if let Some(oldest) = &query.oldest {
            request = request.with_oldest(oldest.clone());
        }

        let result = session.conversations_replies(&request).await?;
        debug!(
            channel = %query.channel.0,
            ts = %query.ts.0,
            count = result.messages.len(),
            "Fetched conversation replies"
        );

        Ok(result.messages.into_iter().map(ThreadMessage::from).collect())
    }

    async fn user_info(&self, user: &SlackUserId) -> Result<UserProfile, SlackError> {
        let resp = HTTP_CLIENT
            .get(format!("{SLACK_API_BASE}/users.info"))
            .bearer_auth(&self.token.token_value.0)
            .query(&[("user", user.0.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SlackError::ApiError(format!(
                "users.info HTTP {}",
                resp.status()
            )));
        }

        let body: UsersInfoResponse = resp.json().await?;
        if !body.ok {
            return Err(SlackError::ApiError(format!(
                "users.info error: {}",
                body.error.as_deref().unwrap_or("unknown")
            )));
        }

        body.user
            .map(|u| u.profile)
            .ok_or_else(|| SlackError::ApiError("users.info: missing user".to_string()))
    }

    async fn chat_unfurl(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        unfurls: &Value,
    ) -> Result<(), SlackError> {
        let payload = json!({
            "channel": channel.0,
            "ts": ts.0,
            "unfurls": unfurls,
        });

        let resp = HTTP_CLIENT
            .post(format!("{SLACK_API_BASE}/chat.unfurl"))
            .bearer_auth(&self.token.token_value.0)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SlackError::ApiError(format!(
                "chat.unfurl HTTP {}",
                resp.status()
            )));
        }

        let body: OkResponse = resp.json().await?;
        if !body.ok {
            return Err(SlackError::ApiError(format!(
                "chat.unfurl error: {}",
                body.error.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(())
    }
}
