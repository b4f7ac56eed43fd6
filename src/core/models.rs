use serde::{Deserialize, Serialize};

/// Rich preview of a Slack message, returned to the catalog frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    pub url: String,
    /// Unix timestamp in milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
    pub text: String,
    pub author_name: Option<String>,
    pub author_image_url: Option<String>,
    pub channel_name: String,
    // The thread fields describe the whole thread, not the linked message.
    #[serde(default)]
    pub is_part_of_thread: bool,
    pub reply_count: Option<u64>,
    pub thread_base_message_text: Option<String>,
}
