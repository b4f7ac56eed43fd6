//! Unfurling of DataHub entity links shared in Slack.
//!
//! When someone posts a link to a DataHub entity, Slack sends a
//! `link_shared` event. We look the entity up and answer with a Block Kit
//! preview via `chat.unfurl`.

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use slack_morphism::{SlackChannelId, SlackTs};
use tracing::{debug, info};
use url::Url;

use super::client::SlackApi;
use crate::clients::datahub_client::{EntityLookup, EntitySocialDetails};
use crate::errors::SlackError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SharedLink {
    pub url: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Payload of a Slack `link_shared` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkSharedEvent {
    pub channel: String,
    pub message_ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub links: Vec<SharedLink>,
}

/// Extracts the entity urn from a DataHub entity link.
///
/// Entity pages look like `https://<frontend>/<entity_type>/<urn>[/<tab>...]`
/// with the urn percent-encoded.
///
/// # Examples
///
/// ```
/// use slack_integrations::slack::unfurl::entity_urn_from_url;
///
/// let url = "https://demo.datahub.io/dataset/urn%3Ali%3Adataset%3A(urn%3Ali%3AdataPlatform%3Ahive%2Clogging_events%2CPROD)/Schema";
/// assert_eq!(
///     entity_urn_from_url(url).as_deref(),
///     Some("urn:li:dataset:(urn:li:dataPlatform:hive,logging_events,PROD)")
/// );
/// ```
#[must_use]
pub fn entity_urn_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    let _entity_type = segments.next().filter(|s| !s.is_empty())?;
    let encoded = segments.next()?;

    let urn = percent_decode_str(encoded).decode_utf8().ok()?;
    urn.starts_with("urn:li:").then(|| urn.into_owned())
}

/// Builds the Block Kit attachment for an entity unfurl.
#[must_use]
pub fn make_entity_preview(entity: &EntitySocialDetails, frontend_url: &str) -> Value {
    let name = entity
        .properties
        .as_ref()
        .and_then(|p| p.name.as_deref())
        .unwrap_or(&entity.urn);

    let mut blocks = vec![json!({
        "type": "header",
        "text": { "type": "plain_text", "text": name, "emoji": true }
    })];

    // Platform logo and "<Platform> <Subtype>".
    if let Some(platform) = entity.platform.as_ref().and_then(|p| p.properties.as_ref()) {
        let subtype = entity
            .sub_types
            .as_ref()
            .and_then(|s| s.type_names.first())
            .map_or(entity.entity_type.as_str(), String::as_str);
        let platform_name = platform.display_name.as_deref().unwrap_or_default();

        let mut elements = Vec::new();
        if let Some(logo) = platform.logo_url.as_deref().filter(|l| !l.is_empty()) {
            let image_url = if logo.starts_with('/') {
                format!("{frontend_url}{logo}")
            } else {
                logo.to_string()
            };
            elements.push(json!({ "type": "image", "image_url": image_url, "alt_text": "" }));
        }
        elements.push(json!({
            "type": "mrkdwn",
            "text": format!("{platform_name} {subtype}").trim(),
        }));

        blocks.push(json!({ "type": "context", "elements": elements }));
    }

    blocks.push(json!({ "type": "divider" }));

    if let Some(description) = description(entity) {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": description }
        }));
    }

    let facts = facts(entity);
    if !facts.is_empty() {
        blocks.push(json!({ "type": "section", "fields": facts }));
    }

    json!({ "blocks": blocks })
}

/// Edited descriptions take precedence over ingested ones.
fn description(entity: &EntitySocialDetails) -> Option<&str> {
    let edited = entity
        .editable_properties
        .as_ref()
        .and_then(|p| p.description.as_deref());
    let ingested = entity.properties.as_ref().and_then(|p| p.description.as_deref());

    edited
        .filter(|d| !d.is_empty())
        .or(ingested.filter(|d| !d.is_empty()))
}

fn facts(entity: &EntitySocialDetails) -> Vec<Value> {
    let mut facts = Vec::new();

    if let Some(domain) = entity
        .domain
        .as_ref()
        .and_then(|d| d.domain.properties.as_ref())
        .and_then(|p| p.name.as_deref())
        .filter(|n| !n.is_empty())
    {
        facts.push(mrkdwn(format!("*Domain*: {domain}")));
    }

    let owners: Vec<&str> = entity
        .ownership
        .iter()
        .flat_map(|o| &o.owners)
        .filter_map(|o| o.owner.properties.as_ref()?.display_name.as_deref())
        .collect();
    if !owners.is_empty() {
        facts.push(mrkdwn(format!("*Owners*: {}", owners.join(", "))));
    }

    let terms: Vec<&str> = entity
        .glossary_terms
        .iter()
        .flat_map(|g| &g.terms)
        .filter_map(|t| t.term.properties.as_ref()?.name.as_deref())
        .collect();
    if !terms.is_empty() {
        facts.push(mrkdwn(format!("*Terms*: {}", terms.join(", "))));
    }

    facts
}

fn mrkdwn(text: String) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

/// Unfurls the first link of a `link_shared` event.
///
/// Only the first link is handled; Slack sends one event per message and
/// messages with several DataHub links get a single preview.
///
/// Returns `true` when `chat.unfurl` was called.
///
/// # Errors
///
/// Returns an error if the entity lookup or the `chat.unfurl` call fails.
pub async fn unfurl_shared_links<A, E>(
    api: &A,
    entities: &E,
    frontend_url: &str,
    event: &LinkSharedEvent,
) -> Result<bool, SlackError>
where
    A: SlackApi + ?Sized,
    E: EntityLookup + ?Sized,
{
    info!(
        channel = %event.channel,
        message_ts = %event.message_ts,
        links = event.links.len(),
        "Link unfurl request"
    );

    let Some(link) = event.links.first() else {
        return Ok(false);
    };

    let Some(urn) = entity_urn_from_url(&link.url) else {
        debug!(url = %link.url, "Shared link is not an entity link");
        return Ok(false);
    };
    debug!(urn = %urn, "Resolved entity urn");

    let Some(entity) = entities.get_entity(&urn).await? else {
        info!(urn = %urn, "Entity not found, skipping unfurl");
        return Ok(false);
    };

    let mut unfurls = Map::new();
    unfurls.insert(link.url.clone(), make_entity_preview(&entity, frontend_url));

    api.chat_unfurl(
        &SlackChannelId(event.channel.clone()),
        &SlackTs(event.message_ts.clone()),
        &Value::Object(unfurls),
    )
    .await?;

    Ok(true)
}
