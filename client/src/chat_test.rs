use super::*;
use crate::cache::MemoryCache;
use crate::test_support::{FakeApi, ScriptedConnector, msg};
use std::time::Duration;

fn client_with(cooldown: Duration, api: &Arc<FakeApi>) -> ChatClient {
    let config = ClientConfig { cooldown, ..ClientConfig::default() };
    ChatClient::with_transports(
        &config,
        Arc::new(ScriptedConnector::default()),
        api.clone(),
        Box::new(MemoryCache::new()),
    )
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_network() {
    let api = Arc::new(FakeApi::default());
    let mut client = client_with(Duration::from_secs(10), &api);

    let err = client.submit("   ", "hello").await.expect_err("empty name");

    assert!(matches!(err, ChatError::Validation(ValidationError::EmptyName)));
    assert_eq!(err.status_message(), "Please enter your name");
    assert_eq!(api.send_count(), 0);
    assert_eq!(client.locked_name(), None);
}

#[tokio::test]
async fn second_send_inside_cooldown_is_rejected_locally() {
    let api = Arc::new(FakeApi::default());
    let mut client = client_with(Duration::from_secs(10), &api);

    let first = client.submit("Alice", "one").await.expect("first send");
    assert!(matches!(first, Delivery::Fallback(_)));

    let err = client.submit("Alice", "two").await.expect_err("cooldown");

    let ChatError::RateLimit(RateLimitError::Cooldown { remaining }) = &err else {
        panic!("expected cooldown, got {err:?}");
    };
    assert!(*remaining > Duration::ZERO);
    assert!(err.status_message().starts_with("Wait "));
    assert_eq!(api.send_count(), 1);
}

#[tokio::test]
async fn other_name_is_rejected_after_lock() {
    let api = Arc::new(FakeApi::default());
    let mut client = client_with(Duration::ZERO, &api);

    client.submit(" Alice ", "one").await.expect("first send");
    let err = client.submit("Bob", "two").await.expect_err("name lock");

    assert_eq!(err.error_code(), "E_NAME_LOCKED");
    assert_eq!(err.status_message(), "You must keep the same name in this session");
    assert_eq!(client.locked_name(), Some("Alice"));
    assert_eq!(api.send_count(), 1);
}

#[tokio::test]
async fn failed_send_records_nothing() {
    let api = Arc::new(FakeApi::default());
    api.reject_sends();
    let mut client = client_with(Duration::from_secs(10), &api);

    let err = client.submit("Alice", "one").await.expect_err("rejected");
    assert!(matches!(err, ChatError::Transport(_)));
    assert_eq!(err.status_message(), "Message failed to send");

    // No cooldown and no lock were recorded, so a different name goes straight
    // to the transport again.
    let again = client.submit("Bob", "two").await.expect_err("still rejected");
    assert!(matches!(again, ChatError::Transport(_)));
    assert_eq!(api.send_count(), 2);
    assert_eq!(client.locked_name(), None);
}

#[tokio::test]
async fn fallback_delivery_carries_origin_id() {
    let api = Arc::new(FakeApi::default());
    let mut client = client_with(Duration::from_secs(10), &api);

    let Delivery::Fallback(stored) = client.submit("Alice", "hi").await.expect("send") else {
        panic!("expected fallback");
    };

    assert_eq!(stored.client_id, client.origin_id());
    assert_eq!(client.messages(), vec![stored]);
}

#[tokio::test]
async fn start_renders_cached_messages_first() {
    let cache = MemoryCache::new();
    let mut seed = cache.clone();
    seed.store(&[msg("a", 1, "from last run")]).expect("seed cache");
    let api = Arc::new(FakeApi::default());

    let client = ChatClient::with_transports(
        &ClientConfig::default(),
        Arc::new(ScriptedConnector::default()),
        api,
        Box::new(cache),
    );

    assert_eq!(client.messages(), vec![msg("a", 1, "from last run")]);
    assert_eq!(client.manager().snapshot().high_water_mark, 1);
}

#[test]
fn status_messages_cover_length_limits() {
    let name = ChatError::from(ValidationError::NameTooLong { len: 31, max: 30 });
    let message = ChatError::from(ValidationError::MessageTooLong { len: 201, max: 200 });
    assert_eq!(name.status_message(), "Name must be at most 30 characters");
    assert_eq!(message.status_message(), "Message must be at most 200 characters");
}
