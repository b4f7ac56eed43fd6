//! In-memory fakes of the Slack and DataHub collaborators.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use slack_integrations::SlackError;
use slack_integrations::clients::{EntityLookup, EntitySocialDetails};
use slack_integrations::core::slack_config::{ConnectionStore, SlackConnection};
use slack_integrations::slack::{ConversationInfo, RepliesQuery, SlackApi, ThreadMessage, UserProfile};
use slack_morphism::{SlackChannelId, SlackTs, SlackUserId};

pub fn message(ts: &str, text: &str, user: Option<&str>, reply_count: Option<u64>) -> ThreadMessage {
    ThreadMessage {
        ts: ts.to_string(),
        text: text.to_string(),
        user: user.map(str::to_string),
        reply_count,
    }
}

#[derive(Default)]
pub struct FakeSlack {
    pub channel_name: Option<String>,
    pub messages: Vec<ThreadMessage>,
    pub users: HashMap<String, UserProfile>,
    pub replies_delay: Option<Duration>,
    pub replies_queries: Mutex<Vec<RepliesQuery>>,
    pub user_lookups: AtomicUsize,
    pub unfurls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeSlack {
    pub fn new(channel_name: &str, messages: Vec<ThreadMessage>) -> Self {
        Self {
            channel_name: Some(channel_name.to_string()),
            messages,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, id: &str, profile: UserProfile) -> Self {
        self.users.insert(id.to_string(), profile);
        self
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn conversation_info(
        &self,
        channel: &SlackChannelId,
    ) -> Result<ConversationInfo, SlackError> {
        match &self.channel_name {
            Some(name) => Ok(ConversationInfo { name: name.clone() }),
            None => Err(SlackError::ApiError(format!(
                "conversations.info error: channel_not_found ({})",
                channel.0
            ))),
        }
    }

    async fn conversation_replies(
        &self,
        query: &RepliesQuery,
    ) -> Result<Vec<ThreadMessage>, SlackError> {
        self.replies_queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.replies_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.messages.clone())
    }

    async fn user_info(&self, user: &SlackUserId) -> Result<UserProfile, SlackError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(&user.0)
            .cloned()
            .ok_or_else(|| SlackError::ApiError("users.info error: user_not_found".to_string()))
    }

    async fn chat_unfurl(
        &self,
        channel: &SlackChannelId,
        ts: &SlackTs,
        unfurls: &Value,
    ) -> Result<(), SlackError> {
        self.unfurls
            .lock()
            .unwrap()
            .push((channel.0.clone(), ts.0.clone(), unfurls.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEntities {
    pub entities: HashMap<String, EntitySocialDetails>,
    pub lookups: Mutex<Vec<String>>,
}

#[async_trait]
impl EntityLookup for FakeEntities {
    async fn get_entity(&self, urn: &str) -> Result<Option<EntitySocialDetails>, SlackError> {
        self.lookups.lock().unwrap().push(urn.to_string());
        Ok(self.entities.get(urn).cloned())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub connection: Mutex<Option<SlackConnection>>,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with(connection: SlackConnection) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
            ..Self::default()
        }
    }

    pub fn set(&self, connection: SlackConnection) {
        *self.connection.lock().unwrap() = Some(connection);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn load(&self) -> Result<Option<SlackConnection>, SlackError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.connection.lock().unwrap().clone())
    }

    async fn save(&self, connection: &SlackConnection) -> Result<(), SlackError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.connection.lock().unwrap() = Some(connection.clone());
        Ok(())
    }
}
