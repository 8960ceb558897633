use super::*;

#[test]
fn env_parse_falls_back_on_missing_key() {
    assert_eq!(env_parse("CHAT_TEST_SURELY_UNSET_KEY", 7_u16), 7);
}

#[test]
fn env_parse_reads_and_trims_value() {
    // SAFETY: key is unique to this test, no other thread reads it.
    unsafe { std::env::set_var("CHAT_TEST_ENV_PARSE_TRIM", " 42 ") };
    assert_eq!(env_parse("CHAT_TEST_ENV_PARSE_TRIM", 0_usize), 42);
    unsafe { std::env::remove_var("CHAT_TEST_ENV_PARSE_TRIM") };
}

#[test]
fn env_parse_ignores_garbage() {
    // SAFETY: key is unique to this test, no other thread reads it.
    unsafe { std::env::set_var("CHAT_TEST_ENV_PARSE_GARBAGE", "lots") };
    assert_eq!(env_parse("CHAT_TEST_ENV_PARSE_GARBAGE", 9_u64), 9);
    unsafe { std::env::remove_var("CHAT_TEST_ENV_PARSE_GARBAGE") };
}

#[test]
fn hub_config_default_matches_wire_limits() {
    let cfg = HubConfig::default();
    assert_eq!(cfg.history_limit, 100);
    assert_eq!(cfg.heartbeat_interval, Duration::from_secs(25));
    assert_eq!(cfg.subscriber_queue, DEFAULT_SUBSCRIBER_QUEUE);
}

#[test]
fn from_env_applies_overrides_and_clamps_zero() {
    // SAFETY: this is the only test touching the CHAT_* / PORT keys.
    unsafe {
        std::env::set_var("PORT", "8123");
        std::env::set_var("CHAT_HISTORY_LIMIT", "0");
        std::env::set_var("CHAT_HEARTBEAT_SECS", "5");
        std::env::set_var("CHAT_SUBSCRIBER_QUEUE", "16");
    }

    let cfg = ServerConfig::from_env();
    assert_eq!(cfg.port, 8123);
    assert_eq!(cfg.hub.history_limit, 1);
    assert_eq!(cfg.hub.heartbeat_interval, Duration::from_secs(5));
    assert_eq!(cfg.hub.subscriber_queue, 16);

    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("CHAT_HISTORY_LIMIT");
        std::env::remove_var("CHAT_HEARTBEAT_SECS");
        std::env::remove_var("CHAT_SUBSCRIBER_QUEUE");
    }
}
