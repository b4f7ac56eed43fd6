//! Lambda handler - thin dispatcher that delegates to specialized handlers.
//!
//! Requests carry an `action` discriminator:
//! - `get_link_preview` - preview a Slack message permalink
//! - `reload_credentials` - drop the cached Slack connection and refetch it
//! - `slack_event` - Slack Events API envelope (delegated to `event_handler`)

use lambda_runtime::{Error, LambdaEvent};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::event_handler::{self, SlackEventEnvelope};
use super::helpers::{err_response, error_response, ok_empty, ok_json};
use super::state::AppState;
use crate::slack::preview::build_preview;

/// The only link type the preview endpoint understands.
pub const SLACK_MESSAGE_LINK_TYPE: &str = "SLACK_MESSAGE";

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IntegrationRequest {
    GetLinkPreview {
        #[serde(rename = "type")]
        link_type: String,
        url: String,
    },
    ReloadCredentials,
    SlackEvent {
        payload: SlackEventEnvelope,
    },
}

/// Lambda handler for the integrations entrypoint.
///
/// # Errors
///
/// Never fails for bad input; malformed requests and failed lookups become
/// error response payloads with the matching status code.
#[tracing::instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn function_handler(state: &AppState, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let request: IntegrationRequest = match serde_json::from_value(event.payload) {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return Ok(err_response(400, &format!("Parse Error: {e}")));
        }
    };

    Ok(dispatch(state, request).await)
}

/// Routes a parsed request to its handler.
pub async fn dispatch(state: &AppState, request: IntegrationRequest) -> Value {
    match request {
        IntegrationRequest::GetLinkPreview { link_type, url } => {
            handle_link_preview(state, &link_type, &url).await
        }
        IntegrationRequest::ReloadCredentials => match state.slack_config.reload().await {
            Ok(_) => ok_empty(),
            Err(e) => {
                error!("Failed to reload Slack credentials: {}", e);
                error_response(&e)
            }
        },
        IntegrationRequest::SlackEvent { payload } => {
            event_handler::handle_slack_event(state, &payload).await
        }
    }
}

async fn handle_link_preview(state: &AppState, link_type: &str, url: &str) -> Value {
    if link_type != SLACK_MESSAGE_LINK_TYPE {
        return err_response(400, &format!("Unknown link type: {link_type}"));
    }

    let api = match state.slack_api().await {
        Ok(api) => api,
        Err(e) => {
            error!("Slack client unavailable: {}", e);
            return error_response(&e);
        }
    };

    match build_preview(api.as_ref(), url, state.config.slack_api_timeout).await {
        Ok(preview) => {
            info!(
                channel = %preview.channel_name,
                thread = preview.is_part_of_thread,
                "Built Slack link preview"
            );
            #[cfg(feature = "debug-logs")]
            tracing::debug!(text = %preview.text, "Preview message text");
            ok_json(&preview)
        }
        Err(e) => {
            error!("Failed to build link preview: {}", e);
            error_response(&e)
        }
    }
}
