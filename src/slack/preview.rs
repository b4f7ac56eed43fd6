//! Link previews for Slack message permalinks.

use std::future::Future;
use std::time::Duration;

use slack_morphism::{SlackTs, SlackUserId};
use tracing::{info, warn};

use super::client::{RepliesQuery, SlackApi, ThreadMessage};
use super::permalink::{ParsedMessageReference, parse_message_url};
use crate::core::models::LinkPreview;
use crate::errors::{Lookup, SlackError};

/// Builds a preview for the message a Slack permalink points to.
///
/// Each Slack call is attempted once and bounded by `call_timeout`.
///
/// # Errors
///
/// `InvalidInput` if `url` is not a message permalink, `UpstreamUnavailable`
/// if any lookup fails, times out or returns nothing usable.
pub async fn build_preview<A>(
    api: &A,
    url: &str,
    call_timeout: Duration,
) -> Result<LinkPreview, SlackError>
where
    A: SlackApi + ?Sized,
{
    let reference =
        parse_message_url(url).ok_or_else(|| SlackError::InvalidInput(url.to_string()))?;
    let message_ts = reference
        .message_ts()
        .ok_or_else(|| SlackError::InvalidInput(url.to_string()))?;
    let query = replies_query(&reference, &message_ts);

    let channel = reference.channel();
    let (conversation, messages) = futures::try_join!(
        bounded(
            &reference,
            Lookup::ConversationInfo,
            call_timeout,
            api.conversation_info(&channel)
        ),
        bounded(
            &reference,
            Lookup::Messages,
            call_timeout,
            api.conversation_replies(&query)
        ),
    )?;

    let (thread_root, message) = split_thread(&reference, &message_ts, messages)?;

    let profile = match &message.user {
        Some(user) => Some(
            bounded(
                &reference,
                Lookup::UserInfo,
                call_timeout,
                api.user_info(&SlackUserId(user.clone())),
            )
            .await?,
        ),
        None => {
            info!(
                conversation_id = %reference.conversation_id,
                message_id = %reference.message_id,
                "Message has no author user, previewing without author"
            );
            None
        }
    };

    let timestamp_millis = ts_to_millis(&message.ts).ok_or_else(|| {
        upstream(
            &reference,
            Lookup::Messages,
            format!("malformed message timestamp {:?}", message.ts),
        )
    })?;

    let mut preview = LinkPreview {
        url: url.to_string(),
        timestamp_millis,
        text: message.text,
        author_name: profile
            .as_ref()
            .and_then(|p| p.author_name())
            .map(str::to_string),
        author_image_url: profile.and_then(|p| p.image_72),
        channel_name: conversation.name,
        is_part_of_thread: false,
        reply_count: None,
        thread_base_message_text: None,
    };

    if let Some(root) = thread_root {
        preview.is_part_of_thread = true;
        preview.reply_count = root.reply_count;
        preview.thread_base_message_text = Some(root.text);
    }

    Ok(preview)
}

/// For a thread link, query from the thread root with the linked message
/// as the lower bound so Slack returns the root followed by that reply.
fn replies_query(reference: &ParsedMessageReference, message_ts: &str) -> RepliesQuery {
    let message_ts = SlackTs(message_ts.to_string());
    let (ts, oldest) = match reference.thread_ts() {
        Some(thread_ts) => (thread_ts, Some(message_ts)),
        None => (message_ts, None),
    };

    RepliesQuery {
        channel: reference.channel(),
        ts,
        oldest,
        limit: 1,
        inclusive: true,
    }
}

/// Picks the linked message out of a `conversations.replies` page.
///
/// A thread link yields the root followed by the linked reply. The reply is
/// only accepted when its timestamp is the linked one; a deleted reply makes
/// Slack return the next one instead. When the linked message is the page's
/// first message it is previewed on its own.
fn split_thread(
    reference: &ParsedMessageReference,
    message_ts: &str,
    messages: Vec<ThreadMessage>,
) -> Result<(Option<ThreadMessage>, ThreadMessage), SlackError> {
    let mut messages = messages.into_iter();
    match (messages.next(), messages.next()) {
        (None, _) => Err(upstream(reference, Lookup::Messages, "no messages returned")),
        (Some(first), _) if first.ts == message_ts => Ok((None, first)),
        (Some(root), Some(reply))
            if reference.thread_root_ts.is_some() && reply.ts == message_ts =>
        {
            Ok((Some(root), reply))
        }
        (Some(first), second) => Err(upstream(
            reference,
            Lookup::Messages,
            format!(
                "message {message_ts} not found, got {}",
                second.map_or(first.ts.clone(), |s| format!("{}, {}", first.ts, s.ts))
            ),
        )),
    }
}

async fn bounded<T, F>(
    reference: &ParsedMessageReference,
    lookup: Lookup,
    call_timeout: Duration,
    call: F,
) -> Result<T, SlackError>
where
    F: Future<Output = Result<T, SlackError>>,
{
    match tokio::time::timeout(call_timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(%lookup, error = %e, "Slack lookup failed");
            Err(upstream(reference, lookup, e.to_string()))
        }
        Err(_) => {
            warn!(%lookup, timeout_ms = call_timeout.as_millis() as u64, "Slack lookup timed out");
            Err(upstream(
                reference,
                lookup,
                format!("timed out after {}ms", call_timeout.as_millis()),
            ))
        }
    }
}

fn upstream(
    reference: &ParsedMessageReference,
    lookup: Lookup,
    reason: impl Into<String>,
) -> SlackError {
    SlackError::UpstreamUnavailable {
        lookup,
        conversation_id: reference.conversation_id.clone(),
        message_id: reference.message_id.clone(),
        reason: reason.into(),
    }
}

/// Converts a Slack `seconds.micros` timestamp to whole milliseconds,
/// truncating sub-millisecond precision.
#[must_use]
pub fn ts_to_millis(ts: &str) -> Option<i64> {
    let (seconds, fraction) = ts.split_once('.').unwrap_or((ts, ""));
    if seconds.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let seconds: i64 = seconds.parse().ok()?;
    let millis = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0_i64, |acc, b| acc * 10 + i64::from(b - b'0'));

    seconds.checked_mul(1000)?.checked_add(millis)
}
