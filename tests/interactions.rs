use gemini_transcode::protocol::canonical::keys;
use gemini_transcode::protocol::interactions::encoder::{
    encode_interactions_request, encode_turns, resolve_previous_interaction_id, InteractionsOptions,
    InteractionsTarget,
};
use gemini_transcode::protocol::interactions::response_decoder::decode_interaction;
use gemini_transcode::protocol::interactions::Interaction;
use gemini_transcode::protocol::{
    CanonicalMessage, CanonicalRole, CanonicalStopReason, ContentBlock, MessageContent, ToolCall,
    ToolEntry,
};
use gemini_transcode::{TranscodeConfig, TranscodeError};
use serde_json::json;

fn interaction(value: serde_json::Value) -> Interaction {
    serde_json::from_value(value).expect("interaction parse")
}

#[test]
fn text_and_reasoning_survive_encode_then_decode() {
    let config = TranscodeConfig::default();
    let answer = CanonicalMessage::ai(vec![
        ContentBlock::reasoning("Compare both"),
        ContentBlock::text("B is larger"),
    ]);
    let encoded = encode_turns(&[CanonicalMessage::human("A or B?"), answer.clone()], &config)
        .expect("encode");
    let outputs = serde_json::to_value(&encoded.turns[1].content).expect("json");
    assert_eq!(
        outputs,
        json!([
            {"type": "thought", "summary": [{"type": "text", "text": "Compare both"}]},
            {"type": "text", "text": "B is larger"}
        ])
    );

    let decoded = decode_interaction(&interaction(json!({
        "id": "int_7",
        "status": "completed",
        "outputs": outputs
    })))
    .expect("decode");
    assert_eq!(decoded.message.content, answer.content);
    assert_eq!(decoded.message.interaction_id(), Some("int_7"));
}

#[test]
fn plain_text_output_collapses_to_string() {
    let decoded = decode_interaction(&interaction(json!({
        "id": "int_1",
        "status": "completed",
        "outputs": [{"type": "text", "text": "Hel"}, {"type": "text", "text": "lo"}],
        "usage": {"total_input_tokens": 4, "total_output_tokens": 2, "total_thought_tokens": 1, "total_tokens": 7}
    })))
    .expect("decode");
    assert_eq!(decoded.message.content, MessageContent::Text("Hello".into()));
    assert_eq!(decoded.usage.reasoning_tokens, Some(1));
    assert_eq!(decoded.message.stop_reason(), CanonicalStopReason::EndOfTurn);
}

#[test]
fn signature_on_content_less_tool_turn_is_a_thought_item() {
    let config = TranscodeConfig::default();
    let history = vec![
        CanonicalMessage::human("Look it up"),
        CanonicalMessage::ai("")
            .with_tool_calls(vec![ToolCall {
                id: "fc_1".into(),
                name: "search".into(),
                args: json!({"q": "rust"}),
            }])
            .with_metadata(keys::THOUGHT_SIGNATURE, "c2ln"),
        CanonicalMessage::tool("fc_1", "3 results"),
    ];
    let encoded = encode_turns(&history, &config).expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.turns).expect("json"),
        json!([
            {"role": "user", "content": [{"type": "text", "text": "Look it up"}]},
            {"role": "model", "content": [
                {"type": "function_call", "id": "fc_1", "name": "search", "arguments": {"q": "rust"}},
                {"type": "thought", "signature": "c2ln"}
            ]},
            {"role": "user", "content": [
                {"type": "function_result", "call_id": "fc_1", "name": "search", "result": "3 results"}
            ]}
        ])
    );
}

#[test]
fn signature_joins_existing_thought_item() {
    let config = TranscodeConfig::default();
    let encoded = encode_turns(
        &[
            CanonicalMessage::human("q"),
            CanonicalMessage::ai(vec![ContentBlock::reasoning("hmm"), ContentBlock::text("a")])
                .with_metadata(keys::THOUGHT_SIGNATURE, "c2ln"),
        ],
        &config,
    )
    .expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.turns[1].content[0]).expect("json"),
        json!({"type": "thought", "signature": "c2ln", "summary": [{"type": "text", "text": "hmm"}]})
    );
}

#[test]
fn generic_assistant_role_keeps_its_signature() {
    let config = TranscodeConfig::default();
    let encoded = encode_turns(
        &[
            CanonicalMessage::human("hello"),
            CanonicalMessage::new(CanonicalRole::Generic("assistant".into()), "hi")
                .with_metadata(keys::THOUGHT_SIGNATURE, "sig"),
        ],
        &config,
    )
    .expect("encode");
    assert_eq!(
        serde_json::to_value(&encoded.turns[1]).expect("json"),
        json!({"role": "model", "content": [
            {"type": "text", "text": "hi"},
            {"type": "thought", "signature": "sig"}
        ]})
    );
}

#[test]
fn generic_model_role_anchors_previous_interaction() {
    let history = vec![
        CanonicalMessage::human("Plan a trip"),
        CanonicalMessage::new(CanonicalRole::Generic("model".into()), "Where to?")
            .with_metadata(keys::INTERACTION_ID, "int_g"),
        CanonicalMessage::human("Lisbon"),
    ];
    assert_eq!(resolve_previous_interaction_id(&history), Some("int_g"));
}

#[test]
fn tool_result_without_call_id_is_malformed() {
    let config = TranscodeConfig::default();
    let mut orphan = CanonicalMessage::tool("", "done");
    orphan.tool_call_id = None;
    let err = encode_turns(&[CanonicalMessage::human("x"), orphan], &config).unwrap_err();
    assert!(matches!(err, TranscodeError::MalformedContent(_)));
}

#[test]
fn empty_outputs_is_empty_response() {
    assert!(matches!(
        decode_interaction(&interaction(json!({"id": "int_3", "status": "failed", "outputs": []}))),
        Err(TranscodeError::EmptyResponse(_))
    ));
}

#[test]
fn request_continues_from_latest_interaction() {
    let config = TranscodeConfig::default();
    let history = vec![
        CanonicalMessage::system("Answer tersely."),
        CanonicalMessage::human("Plan a trip"),
        CanonicalMessage::ai("Where to?").with_metadata(keys::INTERACTION_ID, "int_a"),
        CanonicalMessage::human("Lisbon"),
    ];
    let previous = resolve_previous_interaction_id(&history).map(str::to_string);
    assert_eq!(previous.as_deref(), Some("int_a"));

    let options = InteractionsOptions {
        target: InteractionsTarget::Model("gemini-3-pro-preview".into()),
        previous_interaction_id: previous,
        stream: Some(true),
        tools: vec![
            ToolEntry::from_value(json!({"name": "book", "parameters": {"type": "object"}})),
            ToolEntry::from_value(json!({"codeExecution": {}})),
        ],
        ..InteractionsOptions::default()
    };
    let request = encode_interactions_request(&history, &options, &config).expect("encode");
    assert_eq!(
        serde_json::to_value(&request).expect("json"),
        json!({
            "model": "gemini-3-pro-preview",
            "input": [{"role": "user", "content": [{"type": "text", "text": "Lisbon"}]}],
            "system_instruction": "Answer tersely.",
            "previous_interaction_id": "int_a",
            "tools": [
                {"type": "function", "name": "book", "parameters": {"type": "object"}},
                {"type": "code_execution"}
            ],
            "stream": true
        })
    );
}
