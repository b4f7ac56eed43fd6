//! All Slack-specific functionality

pub mod client;
pub mod permalink;
pub mod preview;
pub mod unfurl;

// Re-export main types for convenience
pub use client::{ConversationInfo, RepliesQuery, SlackApi, SlackWebApi, ThreadMessage, UserProfile};
pub use permalink::{ParsedMessageReference, parse_message_url};
pub use preview::build_preview;
