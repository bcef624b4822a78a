use futures::executor::block_on;

use super::*;
use crate::testing::{Harness, member_tokens};

#[test]
fn bearer_header_formats_token() {
    assert_eq!(bearer_header("abc").as_deref(), Some("Bearer abc"));
}

#[test]
fn bearer_header_rejects_blank_token() {
    assert_eq!(bearer_header(""), None);
    assert_eq!(bearer_header("   "), None);
}

#[test]
fn endpoint_joins_without_doubled_slashes() {
    assert_eq!(endpoint("https://api.example.com/", "/items"), "https://api.example.com/items");
    assert_eq!(endpoint("https://api.example.com", "items/7"), "https://api.example.com/items/7");
}

#[test]
fn error_message_prefers_json_fields() {
    assert_eq!(error_message(400, r#"{"error":"bad item"}"#), "bad item");
    assert_eq!(error_message(409, r#"{"message":"exists"}"#), "exists");
    assert_eq!(error_message(500, "upstream down\n"), "upstream down");
    assert_eq!(error_message(502, ""), "status 502");
}

#[test]
fn classify_status_maps_unauthorized_and_failures() {
    assert_eq!(classify_status(204, ""), Ok(()));
    assert_eq!(classify_status(401, ""), Err(ApiError::Unauthorized));
    assert_eq!(
        classify_status(403, r#"{"error":"forbidden"}"#),
        Err(ApiError::Status { status: 403, message: "forbidden".to_owned() })
    );
}

#[test]
fn decode_body_reports_shape_mismatch() {
    let decoded: Result<Vec<u32>, _> = decode_body("{\"not\":\"a list\"}");
    assert!(matches!(decoded, Err(ApiError::Decode(_))));
}

#[test]
fn request_without_session_is_not_sent() {
    let h = Harness::new();
    let client = ApiClient::new(h.machine.clone());

    let result: Result<serde_json::Value, _> = block_on(client.get_json("/items"));
    assert_eq!(result, Err(ApiError::Unauthenticated));
    assert_eq!(h.gateway.fetch_calls.get(), 1);
}

#[test]
fn blank_access_token_is_treated_as_signed_out() {
    let h = Harness::new();
    let mut tokens = member_tokens();
    tokens.access_token = " ".to_owned();
    *h.gateway.tokens.borrow_mut() = Some(tokens);
    let client = ApiClient::new(h.machine.clone());

    let result: Result<serde_json::Value, _> = block_on(client.post_json("/items", &serde_json::json!({})));
    assert_eq!(result, Err(ApiError::Unauthenticated));
}

#[cfg(not(feature = "csr"))]
#[test]
fn signed_in_request_reaches_transport() {
    let h = Harness::new();
    *h.gateway.tokens.borrow_mut() = Some(member_tokens());
    let client = ApiClient::new(h.machine.clone());

    let result: Result<serde_json::Value, _> = block_on(client.get_json("/items"));
    assert!(matches!(result, Err(ApiError::Transport(message)) if message.starts_with("https://api.example.com/items")));
}
