use super::*;
use serde_json::json;

fn sample_message() -> ChatMessage {
    ChatMessage { name: "Alice".to_owned(), message: "hi".to_owned(), timestamp: 1_700_000_000_000, client_id: "c1".to_owned() }
}

// =============================================================
// Wire shapes
// =============================================================

#[test]
fn chat_message_uses_camel_case_client_id_on_the_wire() {
    let value = serde_json::to_value(sample_message()).expect("serialize");
    assert_eq!(value, json!({"name": "Alice", "message": "hi", "timestamp": 1_700_000_000_000_i64, "clientId": "c1"}));
}

#[test]
fn chat_message_without_client_id_decodes_as_empty_origin() {
    let msg: ChatMessage = serde_json::from_value(json!({"name": "a", "message": "b", "timestamp": 5})).expect("decode");
    assert_eq!(msg.client_id, "");
    assert_eq!(msg.dedup_key(), (String::new(), 5));
}

#[test]
fn server_history_frame_is_tagged_by_type() {
    let frame = ServerFrame::History { messages: vec![sample_message()] };
    let value: Value = serde_json::from_str(&encode_frame(&frame)).expect("json");
    assert_eq!(value["type"], "history");
    assert_eq!(value["messages"][0]["clientId"], "c1");
}

#[test]
fn server_message_frame_is_tagged_by_type() {
    let frame = ServerFrame::Message { message: sample_message() };
    let value: Value = serde_json::from_str(&encode_frame(&frame)).expect("json");
    assert_eq!(value["type"], "message");
    assert_eq!(value["message"]["name"], "Alice");
}

#[test]
fn client_frame_matches_submission_shape() {
    let draft = Draft::normalize("Alice", "hi", "c1").expect("valid");
    let value: Value = serde_json::from_str(&encode_frame(&ClientFrame::from(&draft))).expect("json");
    assert_eq!(value, json!({"type": "message", "name": "Alice", "message": "hi", "clientId": "c1"}));
}

#[test]
fn decode_server_frame_rejects_unknown_type() {
    let err = decode_server_frame(r#"{"type":"presence","who":[]}"#).expect_err("unknown type");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_server_frame_rejects_garbage() {
    assert!(decode_server_frame("not json").is_err());
}

#[test]
fn error_response_omits_missing_code() {
    let body = ErrorResponse { error: "Invalid chat payload".to_owned(), code: None };
    assert_eq!(encode_frame(&body), r#"{"error":"Invalid chat payload"}"#);
}

// =============================================================
// Normalization
// =============================================================

#[test]
fn normalize_trims_all_fields() {
    let draft = Draft::normalize("  Alice ", "\thi there\n", " c1 ").expect("valid");
    assert_eq!(draft, Draft { name: "Alice".into(), message: "hi there".into(), client_id: "c1".into() });
}

#[test]
fn normalize_rejects_blank_name_and_message() {
    assert_eq!(Draft::normalize("   ", "hi", "c"), Err(ValidationError::EmptyName));
    assert_eq!(Draft::normalize("Alice", "  ", "c"), Err(ValidationError::EmptyMessage));
}

#[test]
fn normalize_accepts_exact_limits() {
    let name = "n".repeat(NAME_LIMIT);
    let message = "m".repeat(MESSAGE_LIMIT);
    assert!(Draft::normalize(&name, &message, "").is_ok());
}

#[test]
fn normalize_rejects_one_past_limits() {
    let name = "n".repeat(NAME_LIMIT + 1);
    let message = "m".repeat(MESSAGE_LIMIT + 1);
    assert_eq!(Draft::normalize(&name, "ok", ""), Err(ValidationError::NameTooLong { len: 31, max: 30 }));
    assert_eq!(Draft::normalize("ok", &message, ""), Err(ValidationError::MessageTooLong { len: 201, max: 200 }));
}

#[test]
fn normalize_counts_utf16_units_not_bytes() {
    let name = "é".repeat(NAME_LIMIT);
    assert!(name.len() > NAME_LIMIT);
    assert!(Draft::normalize(&name, "ok", "").is_ok());
}

#[test]
fn normalize_counts_astral_characters_as_two_units() {
    let fits = "😀".repeat(NAME_LIMIT / 2);
    assert!(Draft::normalize(&fits, "ok", "").is_ok());

    let over = "😀".repeat(NAME_LIMIT / 2 + 1);
    assert_eq!(over.chars().count(), 16);
    assert_eq!(Draft::normalize(&over, "ok", ""), Err(ValidationError::NameTooLong { len: 32, max: 30 }));

    let message = format!("{}😀", "m".repeat(MESSAGE_LIMIT - 1));
    assert_eq!(
        Draft::normalize("ok", &message, ""),
        Err(ValidationError::MessageTooLong { len: 201, max: 200 })
    );
}

#[test]
fn from_value_accepts_missing_client_id() {
    let draft = Draft::from_value(&json!({"name": "Bob", "message": "yo"})).expect("valid");
    assert_eq!(draft.client_id, "");
}

#[test]
fn from_value_rejects_non_string_fields() {
    assert_eq!(Draft::from_value(&json!({"name": 7, "message": "yo"})), Err(ValidationError::FieldType("name")));
    assert_eq!(Draft::from_value(&json!([1, 2])), Err(ValidationError::NotAnObject));
}

#[test]
fn from_frame_requires_message_type() {
    let ok = json!({"type": "message", "name": "Bob", "message": "yo", "clientId": "c2"});
    assert!(Draft::from_frame(&ok).is_ok());
    let missing = json!({"name": "Bob", "message": "yo"});
    assert_eq!(Draft::from_frame(&missing), Err(ValidationError::UnknownType));
    assert_eq!(Draft::from_frame(&json!("message")), Err(ValidationError::NotAnObject));
}

#[test]
fn validation_errors_map_to_stable_codes() {
    assert_eq!(ValidationError::EmptyName.error_code(), "E_EMPTY_NAME");
    assert_eq!(ValidationError::UnknownType.error_code(), "E_MALFORMED");
    assert!(!ValidationError::EmptyMessage.retryable());
}

#[test]
fn into_message_stamps_timestamp() {
    let msg = Draft::normalize("Alice", "hi", "c1").expect("valid").into_message(42);
    assert_eq!(msg.timestamp, 42);
    assert_eq!(msg.client_id, "c1");
}
