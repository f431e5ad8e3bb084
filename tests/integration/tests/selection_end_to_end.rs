use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;
use tau_interactivity::{
    ChannelId, CollectorOutcome, CollectorState, InboundMessage, InteractivityConfig,
    InteractivityService, MessageHub, MessageId, MessageModerator, ModerationError, Selection,
    SelectionAppearance, SelectionError, UserId,
};

const CHANNEL: ChannelId = ChannelId(500);

static MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn reply(author: u64, text: &str) -> InboundMessage {
    let id = MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    InboundMessage::new(MessageId(id), CHANNEL, UserId(author), text)
}

fn apple_banana() -> Arc<Selection<&'static str>> {
    Arc::new(
        Selection::builder()
            .values(["A", "B"])
            .possibilities(["apple", "banana"])
            .allow_cancel(true)
            .presentation(json!({ "title": "Pick a fruit" }))
            .build()
            .expect("valid selection"),
    )
}

/// Moderator that loses every delete request after recording it.
#[derive(Default)]
struct FlakyModerator {
    attempts: Mutex<Vec<MessageId>>,
}

#[async_trait]
impl MessageModerator for FlakyModerator {
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ModerationError> {
        self.attempts
            .lock()
            .expect("attempts lock")
            .push(message_id);
        Err(ModerationError::NotFound {
            channel_id,
            message_id,
        })
    }
}

#[tokio::test]
async fn integration_apple_reply_resolves_matched_a() {
    let (service, hub) = InteractivityService::with_hub(InteractivityConfig::default());
    let handle = service.start_selection(apple_banana(), CHANNEL, Some(Duration::from_secs(5)));
    hub.publish(reply(1, "Apple"));

    let report = handle.join().await;
    assert_eq!(report.outcome.value(), Some(&"A"));
}

#[tokio::test]
async fn integration_cancel_reply_resolves_cancelled() {
    let (service, hub) = InteractivityService::with_hub(InteractivityConfig::default());
    let handle = service.start_selection(apple_banana(), CHANNEL, Some(Duration::from_secs(5)));
    let cancel = reply(1, "cancel");
    hub.publish(cancel.clone());

    let report = handle.join().await;
    assert_eq!(
        report.outcome,
        CollectorOutcome::Cancelled {
            trigger: Some(cancel)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn integration_silence_resolves_timed_out() {
    let (service, hub) = InteractivityService::with_hub(InteractivityConfig::default());
    let handle = service.start_selection(apple_banana(), CHANNEL, Some(Duration::from_millis(100)));
    let report = handle.join().await;
    assert!(report.outcome.is_timed_out());
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn integration_timeout_and_late_match_commit_exactly_one_outcome() {
    let (service, hub) = InteractivityService::with_hub(InteractivityConfig::default());
    let handle = service.start_selection(apple_banana(), CHANNEL, Some(Duration::from_millis(100)));

    let first = handle.wait().await;
    assert!(first.is_timed_out());
    hub.publish(reply(1, "apple"));
    assert!(!handle.cancel());
    assert_eq!(handle.state(), CollectorState::Completed);
    assert_eq!(handle.outcome(), Some(first));
}

#[tokio::test]
async fn integration_invalid_configuration_never_produces_a_collector() {
    let error = Selection::builder()
        .values(["A", "B"])
        .possibilities(["apple"])
        .build()
        .expect_err("length mismatch");
    assert_eq!(
        error,
        SelectionError::LengthMismatch {
            values: 2,
            possibilities: 1
        }
    );
}

#[tokio::test]
async fn integration_failed_deletes_do_not_change_the_outcome() {
    let hub = Arc::new(MessageHub::new(32));
    let moderator = Arc::new(FlakyModerator::default());
    let service = InteractivityService::new(
        hub.clone(),
        moderator.clone(),
        InteractivityConfig::default(),
    );
    let selection = Arc::new(
        Selection::builder()
            .with_option("A", "apple")
            .appearance(SelectionAppearance {
                delete_invalid: true,
                delete_valid: true,
                ..SelectionAppearance::default()
            })
            .build()
            .expect("valid selection"),
    );
    let handle = service.start_selection(selection, CHANNEL, Some(Duration::from_secs(5)));
    hub.publish(reply(1, "pear"));
    hub.publish(reply(1, "apple"));

    let report = handle.join().await;
    assert_eq!(report.outcome.value(), Some(&"A"));
    assert_eq!(report.metrics.action_failures, 2);
    assert_eq!(moderator.attempts.lock().expect("attempts lock").len(), 2);
}

#[tokio::test]
async fn integration_presentation_payload_survives_caller_mutation() {
    let selection = apple_banana();
    let mut payload = selection.presentation();
    payload["title"] = json!("changed");
    assert_eq!(selection.presentation()["title"], "Pick a fruit");
}
