//! Wire envelopes for unary and streamed chat completions.
//!
//! Field order on the wire is fixed by struct declaration order:
//! `choices, created, model, object`, with lower-case names throughout.

use serde::Serialize;

use relay_core::Result;

/// Sentinel payload of the frame that follows the terminal `stop` chunk.
pub const DONE_MESSAGE: &str = "[DONE]";

/// Serializer input for one streamed chunk: either a content delta or the
/// terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamChunk<'a> {
    Delta(&'a str),
    Stop,
}

#[derive(Debug, Serialize)]
struct UnaryEnvelope<'a> {
    choices: Vec<UnaryChoice>,
    created: u64,
    model: &'a str,
    object: &'static str,
}

#[derive(Debug, Serialize)]
struct UnaryChoice {
    finish_reason: &'static str,
    index: usize,
    logprobs: Option<()>,
    message: AssistantMessage,
}

#[derive(Debug, Serialize)]
struct AssistantMessage {
    content: String,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct ChunkEnvelope<'a> {
    choices: Vec<ChunkChoice<'a>>,
    created: u64,
    model: &'a str,
    object: &'static str,
}

#[derive(Debug, Serialize)]
struct ChunkChoice<'a> {
    finish_reason: Option<&'static str>,
    index: usize,
    logprobs: Option<()>,
    delta: Delta<'a>,
}

#[derive(Debug, Serialize)]
struct Delta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

/// Render the aggregate `chat.completion` envelope, one choice per
/// completed sequence in engine order.
pub fn serialize_unary_response(
    completions: Vec<String>,
    model: &str,
    created: u64,
) -> Result<String> {
    let choices = completions
        .into_iter()
        .enumerate()
        .map(|(index, content)| UnaryChoice {
            finish_reason: "stop",
            index,
            logprobs: None,
            message: AssistantMessage {
                content,
                role: "assistant",
            },
        })
        .collect();

    let envelope = UnaryEnvelope {
        choices,
        created,
        model,
        object: "chat.completion",
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Render one `chat.completion.chunk` envelope. The terminal chunk carries
/// `finish_reason: "stop"` and an empty delta; every other chunk carries
/// `finish_reason: null` and the content delta.
pub fn serialize_streaming_chunk(
    chunk: StreamChunk<'_>,
    model: &str,
    created: u64,
) -> Result<String> {
    let (finish_reason, content) = match chunk {
        StreamChunk::Delta(content) => (None, Some(content)),
        StreamChunk::Stop => (Some("stop"), None),
    };

    let envelope = ChunkEnvelope {
        choices: vec![ChunkChoice {
            finish_reason,
            index: 0,
            logprobs: None,
            delta: Delta { content },
        }],
        created,
        model,
        object: "chat.completion.chunk",
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Wrap one payload as a server-sent-event frame.
pub fn sse_frame(message: &str) -> String {
    format!("data: {message}\n\n")
}
