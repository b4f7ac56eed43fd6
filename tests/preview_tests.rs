mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeSlack, message};
use slack_integrations::SlackError;
use slack_integrations::errors::Lookup;
use slack_integrations::slack::{UserProfile, build_preview};

const TIMEOUT: Duration = Duration::from_secs(5);

const PLAIN_URL: &str = "https://datahub-test.slack.com/archives/C048RD1240Y/p1683591366051289";
const THREAD_URL: &str = "https://datahub-test.slack.com/archives/C048RD1240Y/p1683591420041569?thread_ts=1683591366.051289&cid=C048RD1240Y";
const ROOT_URL: &str = "https://datahub-test.slack.com/archives/C048RD1240Y/p1683591366051289?thread_ts=1683591366.051289&cid=C048RD1240Y";

fn jane() -> UserProfile {
    UserProfile {
        display_name_normalized: Some("jane".to_string()),
        display_name: Some("Jane D.".to_string()),
        real_name_normalized: Some("Jane Doe".to_string()),
        real_name: Some("Jane Doé".to_string()),
        image_72: Some("https://avatars.slack-edge.com/jane_72.png".to_string()),
    }
}

#[tokio::test]
async fn test_plain_message_preview() {
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "hello world", Some("U1"), None)],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap();

    assert_eq!(preview.url, PLAIN_URL);
    assert_eq!(preview.timestamp_millis, 1_683_591_366_051);
    assert_eq!(preview.text, "hello world");
    assert_eq!(preview.author_name.as_deref(), Some("jane"));
    assert_eq!(
        preview.author_image_url.as_deref(),
        Some("https://avatars.slack-edge.com/jane_72.png")
    );
    assert_eq!(preview.channel_name, "general");
    assert!(!preview.is_part_of_thread);
    assert_eq!(preview.reply_count, None);
    assert_eq!(preview.thread_base_message_text, None);

    let queries = slack.replies_queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].ts.0, "1683591366.051289");
    assert!(queries[0].oldest.is_none());
}

#[tokio::test]
async fn test_thread_reply_preview() {
    let slack = FakeSlack::new(
        "general",
        vec![
            message("1683591366.051289", "root question", Some("U2"), Some(4)),
            message("1683591420.041569", "the answer", Some("U1"), None),
        ],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, THREAD_URL, TIMEOUT).await.unwrap();

    assert!(preview.is_part_of_thread);
    assert_eq!(preview.reply_count, Some(4));
    assert_eq!(preview.thread_base_message_text.as_deref(), Some("root question"));
    assert_eq!(preview.text, "the answer");
    assert_eq!(preview.timestamp_millis, 1_683_591_420_041);
    assert_eq!(preview.author_name.as_deref(), Some("jane"));

    let queries = slack.replies_queries.lock().unwrap();
    assert_eq!(queries[0].ts.0, "1683591366.051289");
    assert_eq!(
        queries[0].oldest.as_ref().map(|ts| ts.0.as_str()),
        Some("1683591420.041569")
    );
}

#[tokio::test]
async fn test_thread_link_to_root_is_not_part_of_thread() {
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "root question", Some("U1"), Some(4))],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, ROOT_URL, TIMEOUT).await.unwrap();

    assert!(!preview.is_part_of_thread);
    assert_eq!(preview.text, "root question");
    assert_eq!(preview.reply_count, None);
    assert_eq!(preview.thread_base_message_text, None);
}

#[tokio::test]
async fn test_root_link_ignores_following_replies() {
    let slack = FakeSlack::new(
        "general",
        vec![
            message("1683591366.051289", "root question", Some("U1"), Some(4)),
            message("1683591420.041569", "a reply", Some("U2"), None),
        ],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, ROOT_URL, TIMEOUT).await.unwrap();

    assert!(!preview.is_part_of_thread);
    assert_eq!(preview.text, "root question");
    assert_eq!(preview.author_name.as_deref(), Some("jane"));
    assert_eq!(preview.thread_base_message_text, None);
}

#[tokio::test]
async fn test_deleted_reply_is_not_replaced_by_a_later_one() {
    let slack = FakeSlack::new(
        "general",
        vec![
            message("1683591366.051289", "root question", Some("U2"), Some(4)),
            message("1683591999.000001", "someone else's later reply", Some("U1"), None),
        ],
    )
    .with_user("U1", jane());

    let err = build_preview(&slack, THREAD_URL, TIMEOUT).await.unwrap_err();

    match err {
        SlackError::UpstreamUnavailable { lookup, reason, .. } => {
            assert_eq!(lookup, Lookup::Messages);
            assert!(reason.contains("1683591420.041569"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(slack.user_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_thread_link_without_the_reply_fails() {
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "root question", Some("U1"), Some(4))],
    )
    .with_user("U1", jane());

    let err = build_preview(&slack, THREAD_URL, TIMEOUT).await.unwrap_err();

    assert!(matches!(
        err,
        SlackError::UpstreamUnavailable {
            lookup: Lookup::Messages,
            ..
        }
    ));
}

#[tokio::test]
async fn test_two_messages_without_thread_context_use_the_first() {
    let slack = FakeSlack::new(
        "general",
        vec![
            message("1683591366.051289", "first", Some("U1"), Some(1)),
            message("1683591420.041569", "second", Some("U1"), None),
        ],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap();

    assert!(!preview.is_part_of_thread);
    assert_eq!(preview.text, "first");
}

#[tokio::test]
async fn test_author_name_falls_back_through_profile_fields() {
    let profile = UserProfile {
        display_name_normalized: Some(String::new()),
        display_name: None,
        real_name_normalized: Some("Jane Doe".to_string()),
        real_name: Some("Jane Doé".to_string()),
        image_72: None,
    };
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "hi", Some("U1"), None)],
    )
    .with_user("U1", profile);

    let preview = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap();

    assert_eq!(preview.author_name.as_deref(), Some("Jane Doe"));
    assert_eq!(preview.author_image_url, None);
}

#[tokio::test]
async fn test_message_without_user_has_no_author() {
    let slack = FakeSlack::new(
        "alerts",
        vec![message("1683591366.051289", "deploy finished", None, None)],
    );

    let preview = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap();

    assert_eq!(preview.author_name, None);
    assert_eq!(preview.author_image_url, None);
    assert_eq!(slack.user_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_url_fails_without_lookups() {
    let slack = FakeSlack::new("general", vec![]);

    let err = build_preview(
        &slack,
        "https://api.slack.com/authentication/config-tokens#creating",
        TIMEOUT,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SlackError::InvalidInput(_)));
    assert!(slack.replies_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_conversation_is_upstream_unavailable() {
    let slack = FakeSlack {
        channel_name: None,
        ..FakeSlack::new("unused", vec![message("1683591366.051289", "hi", None, None)])
    };

    let err = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap_err();

    match err {
        SlackError::UpstreamUnavailable {
            lookup,
            conversation_id,
            message_id,
            reason,
        } => {
            assert_eq!(lookup, Lookup::ConversationInfo);
            assert_eq!(conversation_id, "C048RD1240Y");
            assert_eq!(message_id, "1683591366051289");
            assert!(reason.contains("channel_not_found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_result_is_upstream_unavailable() {
    let slack = FakeSlack::new("general", vec![]);

    let err = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap_err();

    assert!(matches!(
        err,
        SlackError::UpstreamUnavailable {
            lookup: Lookup::Messages,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_author_is_upstream_unavailable() {
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "hi", Some("U404"), None)],
    );

    let err = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap_err();

    assert!(matches!(
        err,
        SlackError::UpstreamUnavailable {
            lookup: Lookup::UserInfo,
            ..
        }
    ));
}

#[tokio::test]
async fn test_slow_lookup_times_out() {
    let slack = FakeSlack {
        replies_delay: Some(Duration::from_secs(5)),
        ..FakeSlack::new("general", vec![message("1683591366.051289", "hi", None, None)])
    };

    let err = build_preview(&slack, PLAIN_URL, Duration::from_millis(50))
        .await
        .unwrap_err();

    match err {
        SlackError::UpstreamUnavailable { lookup, reason, .. } => {
            assert_eq!(lookup, Lookup::Messages);
            assert!(reason.contains("timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_preview_serializes_for_the_frontend() {
    let slack = FakeSlack::new(
        "general",
        vec![message("1683591366.051289", "hello", Some("U1"), None)],
    )
    .with_user("U1", jane());

    let preview = build_preview(&slack, PLAIN_URL, TIMEOUT).await.unwrap();
    let json = serde_json::to_value(&preview).unwrap();

    assert_eq!(json["timestamp"], 1_683_591_366_051_i64);
    assert_eq!(json["authorName"], "jane");
    assert_eq!(json["channelName"], "general");
    assert_eq!(json["isPartOfThread"], false);
    assert!(json["replyCount"].is_null());
}
