use std::sync::Arc;

use anyhow::Context;
use slack_integrations::api::{AppState, function_handler};
use slack_integrations::core::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    slack_integrations::setup_logging();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    let state = Arc::new(AppState::from_config(config));

    lambda_runtime::run(lambda_runtime::service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(&state, event).await }
    }))
    .await
}
