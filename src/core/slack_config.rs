//! Cached Slack connection settings.
//!
//! The Slack app credentials and bot token live in DataHub as a JSON
//! connection blob. `SlackConfigManager` keeps one copy in memory and only
//! goes back to the store when asked to (`reload`, or `force_refresh`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::SlackError;

pub const SLACK_CONFIG_ID: &str = "__system_slack-0";
pub const SLACK_CONFIG_URN: &str = "urn:li:dataHubConnection:__system_slack-0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAppDetails {
    pub app_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub signing_secret: String,
    pub verification_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackConnection {
    #[serde(default)]
    pub app_details: Option<SlackAppDetails>,
    #[serde(default)]
    pub bot_token: Option<String>,
    // Fields managed by other parts of the platform (e.g. app config tokens).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlackConnection {
    /// # Errors
    ///
    /// Returns `NotConfigured` when the app has not been provisioned or installed.
    pub fn bot_token(&self) -> Result<&str, SlackError> {
        if self.app_details.is_none() {
            return Err(SlackError::NotConfigured(
                "The Slack app manifest has not been provisioned yet.".to_string(),
            ));
        }
        self.bot_token.as_deref().ok_or_else(|| {
            SlackError::NotConfigured(
                "The Slack app has not been installed into a workspace yet.".to_string(),
            )
        })
    }
}

/// Backing store for the Slack connection blob.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Returns `None` when no connection has been saved yet.
    async fn load(&self) -> Result<Option<SlackConnection>, SlackError>;

    async fn save(&self, connection: &SlackConnection) -> Result<(), SlackError>;
}

/// Process-wide handle to the Slack connection settings.
pub struct SlackConfigManager {
    store: Arc<dyn ConnectionStore>,
    cached: RwLock<Option<Arc<SlackConnection>>>,
}

impl SlackConfigManager {
    #[must_use]
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the store has to be consulted and the lookup fails.
    pub async fn get_config(&self, force_refresh: bool) -> Result<Arc<SlackConnection>, SlackError> {
        if !force_refresh
            && let Some(config) = self.cached.read().await.as_ref()
        {
            return Ok(Arc::clone(config));
        }

        info!("Getting slack config");
        self.fetch().await
    }

    /// # Errors
    ///
    /// Returns an error if the store lookup fails; the cached value is kept.
    pub async fn reload(&self) -> Result<Arc<SlackConnection>, SlackError> {
        info!("Reloading slack config");
        self.fetch().await
    }

    /// # Errors
    ///
    /// Returns an error if the store rejects the write; the cache is left untouched.
    pub async fn save_config(&self, config: SlackConnection) -> Result<(), SlackError> {
        info!("Setting slack config");
        self.store.save(&config).await?;
        *self.cached.write().await = Some(Arc::new(config));
        Ok(())
    }

    async fn fetch(&self) -> Result<Arc<SlackConnection>, SlackError> {
        let config = Arc::new(self.store.load().await?.unwrap_or_else(|| {
            info!("No slack config found, using an empty config");
            SlackConnection::default()
        }));
        *self.cached.write().await = Some(Arc::clone(&config));
        Ok(config)
    }
}
