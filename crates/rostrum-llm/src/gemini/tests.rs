use super::provider::{build_request, classify_error, parse_response};
use super::types::GeminiResponse;
use super::*;
use crate::completion::CompletionRequest;
use crate::error::Error;
use reqwest::StatusCode;

#[test]
fn test_config_debug_masks_key() {
    let config = GeminiConfig::new("AIzaSyExampleKey1234");
    let debug = format!("{:?}", config);
    assert!(!debug.contains("ExampleKey"));
    assert!(debug.contains("****1234"));
}

#[test]
fn test_config_defaults() {
    let config = GeminiConfig::new("key").with_model("gemini-2.5-pro");
    assert_eq!(config.default_model, "gemini-2.5-pro");
    assert!(MODELS.contains(&DEFAULT_MODEL));
}

#[test]
fn test_build_request_wire_shape() {
    let request = CompletionRequest::new("Rebut this.")
        .with_system("You are a debate opponent.")
        .with_temperature(0.7);

    let wire = serde_json::to_value(build_request(&request, 512)).unwrap();

    assert_eq!(wire["contents"][0]["role"], "user");
    assert_eq!(wire["contents"][0]["parts"][0]["text"], "Rebut this.");
    assert_eq!(
        wire["systemInstruction"]["parts"][0]["text"],
        "You are a debate opponent."
    );
    assert!(wire["systemInstruction"].get("role").is_none());
    assert_eq!(wire["generationConfig"]["maxOutputTokens"], 512);
}

#[test]
fn test_parse_response_joins_parts_and_usage() {
    let body = r#"{
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "First, "}, {"text": "second."}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
    }"#;
    let response: GeminiResponse = serde_json::from_str(body).unwrap();

    let completion = parse_response(response, "gemini-2.5-flash").unwrap();
    assert_eq!(completion.content, "First, second.");
    assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(completion.usage.unwrap().total_tokens, 17);
}

#[test]
fn test_parse_response_without_candidates_is_invalid() {
    let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
    assert!(matches!(
        parse_response(response, "m"),
        Err(Error::InvalidResponse(_))
    ));
}

#[test]
fn test_parse_response_empty_text_is_invalid() {
    let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
    let response: GeminiResponse = serde_json::from_str(body).unwrap();
    match parse_response(response, "m") {
        Err(Error::InvalidResponse(msg)) => assert!(msg.contains("SAFETY")),
        other => panic!("expected invalid response, got {:?}", other),
    }
}

#[test]
fn test_classify_rate_limit() {
    let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED",
        "details": [{"retryDelay": "17s"}]}}"#;
    assert!(matches!(
        classify_error(StatusCode::TOO_MANY_REQUESTS, body),
        Error::RateLimit
    ));
}

#[test]
fn test_classify_auth_error_is_sanitized() {
    let body = r#"{"error": {"code": 400, "message": "API key not valid. key=AIzaSecret", "status": "INVALID_ARGUMENT"}}"#;
    match classify_error(StatusCode::BAD_REQUEST, body) {
        Error::Api(msg) => {
            assert!(!msg.contains("AIzaSecret"));
            assert!(msg.contains("authentication"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[test]
fn test_classify_server_error_without_body() {
    assert!(matches!(
        classify_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
        Error::ServerError(_)
    ));
}
