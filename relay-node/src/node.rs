//! The per-request chat-completion node.
//!
//! One instance owns one request for its whole life. The host graph calls
//! `open` to bind shared resources, then `process` once per scheduling
//! round. A streaming request is pumped one engine step per tick: the node
//! re-arms itself by emitting a loopback packet and stops re-arming on the
//! terminal tick, which carries the `stop` chunk and the `[DONE]` sentinel.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use relay_core::{GenerationHandle, GenerationStatus, RelayError, Result};

use crate::detokenizer::IncrementalDecoder;
use crate::ports::{HttpPayload, Packet, TickInput, TickOutput};
use crate::request::ChatCompletionRequest;
use crate::resources::{NodeResources, NodeResourcesMap};
use crate::response::{self, StreamChunk};

pub struct ChatCompletionNode {
    node_name: String,
    resources: Option<Arc<NodeResources>>,
    request: Option<ChatCompletionRequest>,
    handle: Option<Box<dyn GenerationHandle>>,
    decoder: Option<IncrementalDecoder>,
    /// Seconds since epoch, captured once on the tick that submits the
    /// request and echoed in every envelope.
    created: u64,
    /// Logical clock stamped onto emitted packets.
    timestamp: u64,
}

impl ChatCompletionNode {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            resources: None,
            request: None,
            handle: None,
            decoder: None,
            created: 0,
            timestamp: 0,
        }
    }

    /// Bind the shared resource bundle registered under this node's name.
    pub fn open(&mut self, resources: &NodeResourcesMap) -> Result<()> {
        let bundle = resources.get(&self.node_name).cloned().ok_or_else(|| {
            RelayError::NotFound(format!(
                "no resource bundle registered for node `{}`",
                self.node_name
            ))
        })?;
        self.resources = Some(bundle);
        info!(node = %self.node_name, "chat completion node open");
        Ok(())
    }

    /// Run one tick. Returns the packets to place on the output and
    /// loopback ports; an input with nothing on either port is a no-op.
    pub fn process(&mut self, input: TickInput) -> Result<TickOutput> {
        let resources = self
            .resources
            .clone()
            .ok_or_else(|| invariant("process called before open"))?;

        // The host may trigger a tick with no packets on either port.
        if input.is_empty() {
            return Ok(TickOutput::default());
        }

        if let Some(payload) = input.payload {
            self.submit(&resources, payload)?;
        }

        let Self {
            node_name,
            request,
            handle,
            decoder,
            created,
            timestamp,
            ..
        } = self;
        let request = request.as_ref().ok_or_else(|| invariant("no request in flight"))?;
        let handle = handle.as_mut().ok_or_else(|| invariant("no generation handle"))?;
        let decoder = decoder.as_mut().ok_or_else(|| invariant("no detokenizer"))?;
        let created = *created;

        let mut output = TickOutput::default();

        if !request.stream {
            // Unary: block until the whole generation is done and emit one
            // aggregate envelope. No loopback is ever produced.
            let outputs = handle.read_all()?;
            if outputs.is_empty() {
                return Err(invariant("generation completed with no sequences"));
            }
            let mut completions = Vec::with_capacity(outputs.len());
            for sequence in &outputs {
                completions.push(resources.tokenizer.decode(&sequence.generated_token_ids)?);
            }
            let body = response::serialize_unary_response(completions, &request.model, created)?;
            debug!(node = %node_name, response = %body, "complete unary response");
            output.response = Some(Packet::new(body, *timestamp));
        } else {
            match handle.status() {
                GenerationStatus::Finished => {
                    // Terminal tick: any text the detokenizer is still
                    // holding goes out as a last delta, then the stop chunk
                    // and the [DONE] sentinel, all in one output packet.
                    // No loopback, so the host never re-enters.
                    let mut body = String::new();
                    if let Some(chunk) = decoder.flush()? {
                        let delta = response::serialize_streaming_chunk(
                            StreamChunk::Delta(&chunk),
                            &request.model,
                            created,
                        )?;
                        body.push_str(&response::sse_frame(&delta));
                    }
                    let stop = response::serialize_streaming_chunk(
                        StreamChunk::Stop,
                        &request.model,
                        created,
                    )?;
                    body.push_str(&response::sse_frame(&stop));
                    body.push_str(&response::sse_frame(response::DONE_MESSAGE));
                    debug!(node = %node_name, response = %body, "generation finished");
                    output.response = Some(Packet::new(body, *timestamp));
                }
                GenerationStatus::Failed => {
                    return Err(RelayError::Engine(
                        "generation dropped by the pipeline".to_string(),
                    ));
                }
                GenerationStatus::Running => {
                    let mut outputs = handle.read_one()?;
                    if outputs.len() > 1 {
                        return Err(invariant("streaming supports exactly one sequence"));
                    }
                    // An empty read means the engine made no progress this
                    // step; emit nothing and re-arm.
                    if let Some((_, sequence)) = outputs.pop_first() {
                        let token = match sequence.generated_token_ids.as_slice() {
                            [token] => *token,
                            _ => {
                                return Err(invariant(
                                    "streaming expects exactly one new token per step",
                                ))
                            }
                        };
                        if let Some(chunk) = decoder.put(token)? {
                            let delta = response::serialize_streaming_chunk(
                                StreamChunk::Delta(&chunk),
                                &request.model,
                                created,
                            )?;
                            debug!(node = %node_name, chunk = %chunk, "partial response");
                            output.response =
                                Some(Packet::new(response::sse_frame(&delta), *timestamp));
                        }
                    }
                    output.loopback = Some(Packet::new(true, *timestamp));
                }
            }
        }

        if !output.is_empty() {
            *timestamp += 1;
        }
        Ok(output)
    }

    /// Release per-request state. The generation handle drops here; the
    /// pipeline's policy for abandoned generations is its own.
    pub fn close(&mut self) {
        self.request = None;
        self.handle = None;
        self.decoder = None;
        info!(node = %self.node_name, "chat completion node close");
    }

    /// Decode the payload, register the generation, and wake the executor.
    /// A node instance accepts exactly one request payload in its life.
    fn submit(&mut self, resources: &NodeResources, payload: HttpPayload) -> Result<()> {
        if self.request.is_some() || self.handle.is_some() || self.decoder.is_some() {
            return Err(invariant("request payload delivered twice"));
        }

        self.created = unix_timestamp();
        debug!(node = %self.node_name, body = %payload.body, "received request");

        let request = ChatCompletionRequest::parse(&payload.parsed_json)?;
        let prompt = request
            .prompt()
            .ok_or_else(|| invariant("decoded request lost its prompt"))?;
        let handle = resources
            .pipeline
            .add_request(prompt, request.generation_config())?;
        resources.notify_executor();

        self.decoder = Some(IncrementalDecoder::new(Arc::clone(&resources.tokenizer)));
        self.handle = Some(handle);
        self.request = Some(request);
        Ok(())
    }
}

fn invariant(message: &str) -> RelayError {
    RelayError::InvariantViolation(message.to_string())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
