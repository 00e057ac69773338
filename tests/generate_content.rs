use gemini_transcode::protocol::canonical::keys;
use gemini_transcode::protocol::gemini::encoder::{
    encode_contents, encode_generate_content_request, GenerateContentOptions,
};
use gemini_transcode::protocol::gemini::response_decoder::decode_gemini_response;
use gemini_transcode::protocol::gemini::{GeminiContent, GeminiResponse};
use base64::Engine as _;
use gemini_transcode::protocol::{
    CanonicalMessage, CanonicalRole, CanonicalStopReason, ContentBlock, ImageSource,
    MessageContent, ToolCall, ToolChoice, ToolDeclaration, ToolEntry,
};
use gemini_transcode::{TranscodeConfig, TranscodeError};
use serde_json::json;

fn response_from_turn(turn: &GeminiContent) -> GeminiResponse {
    serde_json::from_value(json!({
        "candidates": [{"content": turn, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
    }))
    .expect("response parse")
}

#[test]
fn ai_text_survives_encode_then_decode() {
    let config = TranscodeConfig::default();
    let history = vec![
        CanonicalMessage::human("Say hi"),
        CanonicalMessage::ai("Hello there"),
    ];
    let encoded = encode_contents(&history, &config).expect("encode");
    let model_turn = encoded.contents.last().expect("model turn");
    assert_eq!(model_turn.role.as_deref(), Some("model"));

    let decoded = decode_gemini_response(&response_from_turn(model_turn)).expect("decode");
    assert_eq!(decoded.message.content, MessageContent::Text("Hello there".into()));
    assert_eq!(decoded.message.stop_reason(), CanonicalStopReason::EndOfTurn);
    assert_eq!(decoded.usage.total_tokens, Some(5));
}

#[test]
fn reasoning_blocks_are_preserved_in_order() {
    let config = TranscodeConfig::default();
    let answer = CanonicalMessage::ai(vec![
        ContentBlock::reasoning("First I consider"),
        ContentBlock::text("The answer is 4"),
    ]);
    let encoded = encode_contents(&[CanonicalMessage::human("2+2?"), answer.clone()], &config)
        .expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.contents[1]).expect("json"),
        json!({"role": "model", "parts": [
            {"text": "First I consider", "thought": true},
            {"text": "The answer is 4"}
        ]})
    );

    let decoded = decode_gemini_response(&response_from_turn(&encoded.contents[1])).expect("decode");
    assert_eq!(decoded.message.content, answer.content);
    assert_eq!(decoded.message.thoughts(), vec!["First I consider"]);
}

#[test]
fn consecutive_human_messages_merge_and_system_is_lifted() {
    let config = TranscodeConfig::default();
    let encoded = encode_contents(
        &[
            CanonicalMessage::system("Be brief."),
            CanonicalMessage::human("one"),
            CanonicalMessage::human("two"),
            CanonicalMessage::system("Use metric."),
        ],
        &config,
    )
    .expect("encode");
    assert_eq!(encoded.contents.len(), 1);
    assert_eq!(encoded.contents[0].parts.len(), 2);
    assert_eq!(
        serde_json::to_value(encoded.system_instruction).expect("json"),
        json!({"parts": [{"text": "Be brief.\n\nUse metric."}]})
    );
}

#[test]
fn signature_rides_on_content_less_tool_call_turn() {
    let config = TranscodeConfig::default();
    let history = vec![
        CanonicalMessage::human("Weather in SF?"),
        CanonicalMessage::ai("")
            .with_tool_calls(vec![ToolCall {
                id: "call_0".into(),
                name: "get_weather".into(),
                args: json!({"city": "SF"}),
            }])
            .with_metadata(keys::THOUGHT_SIGNATURE, "c2lnLTE="),
        CanonicalMessage::tool("call_0", r#"{"temp": 18}"#),
    ];
    let encoded = encode_contents(&history, &config).expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.contents).expect("json"),
        json!([
            {"role": "user", "parts": [{"text": "Weather in SF?"}]},
            {"role": "model", "parts": [{
                "functionCall": {"id": "call_0", "name": "get_weather", "args": {"city": "SF"}},
                "thoughtSignature": "c2lnLTE="
            }]},
            {"role": "user", "parts": [{
                "functionResponse": {"id": "call_0", "name": "get_weather", "response": {"temp": 18}}
            }]}
        ])
    );
}

#[test]
fn signature_without_any_parts_gets_its_own_part() {
    let config = TranscodeConfig::default();
    let encoded = encode_contents(
        &[
            CanonicalMessage::human("hi"),
            CanonicalMessage::ai("").with_metadata(keys::THOUGHT_SIGNATURE, "c2ln"),
        ],
        &config,
    )
    .expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.contents[1]).expect("json"),
        json!({"role": "model", "parts": [{"text": "", "thoughtSignature": "c2ln"}]})
    );
}

#[test]
fn generic_assistant_role_keeps_its_signature() {
    let config = TranscodeConfig::default();
    let encoded = encode_contents(
        &[
            CanonicalMessage::human("hello"),
            CanonicalMessage::new(CanonicalRole::Generic("assistant".into()), "hi")
                .with_metadata(keys::THOUGHT_SIGNATURE, "sig"),
            CanonicalMessage::human("again").with_metadata(keys::THOUGHT_SIGNATURE, "ignored"),
        ],
        &config,
    )
    .expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.contents).expect("json"),
        json!([
            {"role": "user", "parts": [{"text": "hello"}]},
            {"role": "model", "parts": [{"text": "hi", "thoughtSignature": "sig"}]},
            {"role": "user", "parts": [{"text": "again"}]}
        ])
    );
}

#[test]
fn inline_data_url_keeps_mime_and_bytes() {
    let config = TranscodeConfig::default();
    let encoded = encode_contents(
        &[CanonicalMessage::human(vec![ContentBlock::image_url(
            "data:image/png;base64,QUJD",
        )])],
        &config,
    )
    .expect("encode");
    let part = serde_json::to_value(&encoded.contents[0].parts[0]).expect("json");
    assert_eq!(part, json!({"inlineData": {"mimeType": "image/png", "data": "QUJD"}}));

    let data = part["inlineData"]["data"].as_str().expect("data");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .expect("base64");
    assert_eq!(bytes, b"ABC");
}

#[test]
fn images_resolve_to_inline_or_file_data() {
    let config = TranscodeConfig::default();
    let message = CanonicalMessage::human(vec![
        ContentBlock::image_url("data:image/png;base64,iVBORw0KGgo="),
        ContentBlock::image_url("https://example.com/cat.jpg"),
        ContentBlock::Image {
            source: ImageSource::Url("gs://bucket/scan".into()),
            mime_type: Some("image/webp".into()),
        },
    ]);
    let encoded = encode_contents(&[message], &config).expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.contents[0].parts).expect("json"),
        json!([
            {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}},
            {"fileData": {"mimeType": "image/jpeg", "fileUri": "https://example.com/cat.jpg"}},
            {"fileData": {"mimeType": "image/webp", "fileUri": "gs://bucket/scan"}}
        ])
    );
}

#[test]
fn malformed_data_url_is_rejected() {
    let config = TranscodeConfig::default();
    let err = encode_contents(
        &[CanonicalMessage::human(vec![ContentBlock::image_url("data:nope")])],
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, TranscodeError::MalformedContent(_)));
}

#[test]
fn strict_mime_config_rejects_unknown_extension() {
    let config = TranscodeConfig::from_yaml_str(
        "images:\n  default_mime_type: image/jpeg\n  require_explicit_mime_type: true\n",
    )
    .expect("config");
    let err = encode_contents(
        &[CanonicalMessage::human(vec![ContentBlock::image_url(
            "https://example.com/render",
        )])],
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, TranscodeError::MalformedContent(_)));
}

#[test]
fn empty_candidates_is_empty_response() {
    let response: GeminiResponse =
        serde_json::from_value(json!({"candidates": [], "modelVersion": "gemini-2.5-pro"}))
            .expect("parse");
    assert!(matches!(
        decode_gemini_response(&response),
        Err(TranscodeError::EmptyResponse(_))
    ));
}

#[test]
fn function_calls_decode_with_generated_ids() {
    let response: GeminiResponse = serde_json::from_value(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"functionCall": {"name": "a", "args": {"x": 1}}, "thoughtSignature": "s"},
                {"functionCall": {"name": "b"}}
            ]},
            "finishReason": "STOP"
        }]
    }))
    .expect("parse");
    let decoded = decode_gemini_response(&response).expect("decode");
    let calls = &decoded.message.tool_calls;
    assert_eq!(calls.len(), 2);
    assert_eq!((calls[0].id.as_str(), calls[0].name.as_str()), ("call_0", "a"));
    assert_eq!(calls[1].id, "call_1");
    assert_eq!(calls[1].args, json!({}));
    assert_eq!(decoded.message.thought_signature(), Some("s"));
    assert_eq!(decoded.message.stop_reason(), CanonicalStopReason::ToolCalls);
}

#[test]
fn full_request_with_tools() {
    let config = TranscodeConfig::default();
    let options = GenerateContentOptions {
        temperature: Some(0.2),
        max_output_tokens: Some(256),
        tools: vec![
            ToolDeclaration::new("get_weather")
                .with_description("Current weather")
                .with_parameters(json!({"type": "object", "properties": {"city": {"type": "string"}}}))
                .into(),
            ToolEntry::from_value(json!({"googleSearch": {}})),
            ToolEntry::from_value(json!({"type": "mcp_server", "name": "x", "url": "https://x"})),
        ],
        tool_choice: Some(ToolChoice::from_value(&json!("get_weather"))),
        ..GenerateContentOptions::default()
    };
    let request = encode_generate_content_request(
        "gemini-2.5-flash",
        &[CanonicalMessage::human("Weather?")],
        &options,
        &config,
    )
    .expect("encode");
    let value = serde_json::to_value(&request).expect("json");
    assert_eq!(value["model"], "gemini-2.5-flash");
    assert_eq!(value["config"]["temperature"], json!(0.2));
    assert_eq!(value["config"]["maxOutputTokens"], json!(256));
    assert_eq!(
        value["config"]["tools"],
        json!([
            {"functionDeclarations": [{
                "name": "get_weather",
                "description": "Current weather",
                "parameters": {"type": "object", "properties": {"city": {"type": "string"}}}
            }]},
            {"googleSearch": {}}
        ])
    );
    assert_eq!(
        value["config"]["toolConfig"],
        json!({"functionCallingConfig": {"mode": "ANY", "allowedFunctionNames": ["get_weather"]}})
    );
}
