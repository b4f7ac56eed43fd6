//! Handler for Slack Events API payloads.
//!
//! - `url_verification` - echo the challenge back
//! - `event_callback` / `link_shared` - unfurl DataHub entity links
//!
//! Every other event type is acknowledged and ignored.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::helpers::{ok_empty, ok_json};
use super::state::AppState;
use crate::slack::unfurl::{LinkSharedEvent, unfurl_shared_links};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEventEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    LinkShared(LinkSharedEvent),
    #[serde(other)]
    Other,
}

/// Handle a Slack Events API envelope.
///
/// Unfurl failures are logged and still acknowledged so Slack does not
/// retry the delivery.
pub async fn handle_slack_event(state: &AppState, envelope: &SlackEventEnvelope) -> Value {
    match envelope {
        SlackEventEnvelope::UrlVerification { challenge } => {
            ok_json(&json!({ "challenge": challenge }))
        }
        SlackEventEnvelope::EventCallback {
            event: SlackEvent::LinkShared(event),
        } => {
            let api = match state.slack_api().await {
                Ok(api) => api,
                Err(e) => {
                    error!("Cannot unfurl links: {}", e);
                    return ok_empty();
                }
            };

            match unfurl_shared_links(
                api.as_ref(),
                state.entities.as_ref(),
                &state.config.datahub_frontend_url,
                event,
            )
            .await
            {
                Ok(unfurled) => info!(unfurled, "Handled link_shared event"),
                Err(e) => error!("Failed to unfurl link: {}", e),
            }
            ok_empty()
        }
        SlackEventEnvelope::EventCallback {
            event: SlackEvent::Other,
        } => ok_empty(),
    }
}
