use std::sync::Arc;

use crate::clients::datahub_client::{DataHubGraph, EntityLookup};
use crate::core::config::AppConfig;
use crate::core::slack_config::{ConnectionStore, SlackConfigManager};
use crate::errors::SlackError;
use crate::slack::client::{SlackApi, SlackWebApi};

/// Long-lived state shared by every invocation of a warm Lambda.
pub struct AppState {
    pub config: AppConfig,
    pub slack_config: SlackConfigManager,
    pub entities: Arc<dyn EntityLookup>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ConnectionStore>,
        entities: Arc<dyn EntityLookup>,
    ) -> Self {
        Self {
            config,
            slack_config: SlackConfigManager::new(store),
            entities,
        }
    }

    /// Wires the DataHub graph in as both the connection store and the
    /// entity source.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let graph = Arc::new(DataHubGraph::new(
            &config.datahub_server,
            config.datahub_token.clone(),
        ));
        Self::new(config, graph.clone(), graph)
    }

    /// A Slack client authenticated with the currently configured bot token.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if the app is not installed, or the store error
    /// if the configuration cannot be loaded.
    pub async fn slack_api(&self) -> Result<Arc<dyn SlackApi>, SlackError> {
        let connection = self.slack_config.get_config(false).await?;
        Ok(Arc::new(SlackWebApi::new(connection.bot_token()?)))
    }
}
