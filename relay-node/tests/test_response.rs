use relay_node::response::{
    serialize_streaming_chunk, serialize_unary_response, sse_frame, StreamChunk, DONE_MESSAGE,
};

#[test]
fn unary_envelope_has_stable_field_order() {
    let body = serialize_unary_response(vec!["hello".to_string()], "m", 123).unwrap();
    assert_eq!(
        body,
        concat!(
            r#"{"choices":[{"finish_reason":"stop","index":0,"logprobs":null,"#,
            r#""message":{"content":"hello","role":"assistant"}}],"#,
            r#""created":123,"model":"m","object":"chat.completion"}"#
        )
    );
}

#[test]
fn unary_envelope_indexes_choices_in_order() {
    let completions = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let body = serialize_unary_response(completions, "m", 9).unwrap();

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let choices = json["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 3);
    for (i, choice) in choices.iter().enumerate() {
        assert_eq!(choice["index"].as_u64().unwrap() as usize, i);
        assert_eq!(choice["finish_reason"], "stop");
        assert!(choice["logprobs"].is_null());
        assert_eq!(choice["message"]["role"], "assistant");
    }
    assert_eq!(choices[0]["message"]["content"], "a");
    assert_eq!(choices[1]["message"]["content"], "b");
    assert_eq!(choices[2]["message"]["content"], "c");
}

#[test]
fn delta_chunk_carries_content_and_null_finish() {
    let body = serialize_streaming_chunk(StreamChunk::Delta("hel"), "m", 7).unwrap();
    assert_eq!(
        body,
        concat!(
            r#"{"choices":[{"finish_reason":null,"index":0,"logprobs":null,"#,
            r#""delta":{"content":"hel"}}],"#,
            r#""created":7,"model":"m","object":"chat.completion.chunk"}"#
        )
    );
}

#[test]
fn stop_chunk_carries_empty_delta() {
    let body = serialize_streaming_chunk(StreamChunk::Stop, "m", 7).unwrap();
    assert_eq!(
        body,
        concat!(
            r#"{"choices":[{"finish_reason":"stop","index":0,"logprobs":null,"#,
            r#""delta":{}}],"#,
            r#""created":7,"model":"m","object":"chat.completion.chunk"}"#
        )
    );
}

#[test]
fn chunk_content_is_json_escaped() {
    let body = serialize_streaming_chunk(StreamChunk::Delta("a \"b\"\n"), "m", 1).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["choices"][0]["delta"]["content"], "a \"b\"\n");
}

#[test]
fn sse_frame_wraps_payload() {
    assert_eq!(sse_frame("{}"), "data: {}\n\n");
    assert_eq!(sse_frame(DONE_MESSAGE), "data: [DONE]\n\n");
}
