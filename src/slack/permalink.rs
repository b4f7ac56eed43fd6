//! Slack message permalink parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use slack_morphism::{SlackChannelId, SlackTs};

// https://<workspace>.slack.com/archives/<conversation>/p<digits>[?...thread_ts=<ts>...]
static PERMALINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https://([a-zA-Z0-9_\-]+)\.slack\.com/archives/([CD]\w+)/p(\d+)(?:\?.*thread_ts=([\d.]+).*)?$",
    )
    .unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
});

/// Number of digits after the decimal point in a Slack timestamp.
const MICROS_DIGITS: usize = 6;

/// The pieces of a Slack message permalink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessageReference {
    pub workspace: String,
    pub conversation_id: String,
    /// The message timestamp with the decimal point removed.
    pub message_id: String,
    /// Timestamp of the thread root, when the link points into a thread.
    pub thread_root_ts: Option<String>,
}

impl ParsedMessageReference {
    /// The message's own timestamp in Slack's `seconds.micros` format.
    ///
    /// `None` when `message_id` is too short to hold a seconds part or is
    /// not all digits, which `parse_message_url` never produces.
    #[must_use]
    pub fn message_ts(&self) -> Option<String> {
        if !self.message_id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let split = self.message_id.len().checked_sub(MICROS_DIGITS)?;
        if split == 0 {
            return None;
        }
        let (seconds, micros) = self.message_id.split_at(split);
        Some(format!("{seconds}.{micros}"))
    }

    #[must_use]
    pub fn channel(&self) -> SlackChannelId {
        SlackChannelId(self.conversation_id.clone())
    }

    #[must_use]
    pub fn thread_ts(&self) -> Option<SlackTs> {
        self.thread_root_ts.clone().map(SlackTs)
    }
}

/// Parses a Slack message permalink.
///
/// Returns `None` for anything that is not a message permalink, including
/// links whose message id is too short to hold a timestamp and thread
/// timestamps without a decimal separator.
///
/// # Examples
///
/// ```
/// use slack_integrations::slack::permalink::parse_message_url;
///
/// let parsed = parse_message_url(
///     "https://datahub-test.slack.com/archives/C048RD1240Y/p1683591366051289",
/// )
/// .unwrap();
/// assert_eq!(parsed.conversation_id, "C048RD1240Y");
/// assert_eq!(parsed.message_ts().as_deref(), Some("1683591366.051289"));
///
/// assert!(parse_message_url("https://api.slack.com/authentication/config-tokens#creating").is_none());
/// ```
#[must_use]
pub fn parse_message_url(url: &str) -> Option<ParsedMessageReference> {
    let caps = PERMALINK_RE.captures(url)?;

    let workspace = caps.get(1)?.as_str();
    let conversation_id = caps.get(2)?.as_str();
    let message_id = caps.get(3)?.as_str();
    let thread_root_ts = caps.get(4).map(|m| m.as_str());

    if message_id.len() <= MICROS_DIGITS {
        return None;
    }
    if let Some(ts) = thread_root_ts
        && !is_slack_ts(ts)
    {
        return None;
    }

    Some(ParsedMessageReference {
        workspace: workspace.to_string(),
        conversation_id: conversation_id.to_string(),
        message_id: message_id.to_string(),
        thread_root_ts: thread_root_ts.map(str::to_string),
    })
}

fn is_slack_ts(ts: &str) -> bool {
    match ts.split_once('.') {
        Some((seconds, micros)) => {
            !seconds.is_empty() && !micros.is_empty() && !micros.contains('.')
        }
        None => false,
    }
}
