//! Trait seams to the external continuous-batching engine.
//!
//! The engine multiplexes many in-flight generations over one model; the
//! node only ever talks to it through these traits. Implementations must be
//! internally thread-safe — handles are polled from many node instances in
//! parallel and the node performs no locking of its own.

use crate::error::Result;
use crate::types::{GenerationConfig, GenerationOutput, GenerationOutputs, GenerationStatus};

/// Per-request cursor into the shared pipeline.
///
/// Exclusively owned by one node instance and dropped when that node
/// closes; the pipeline's policy for abandoned handles is its own.
pub trait GenerationHandle: Send {
    /// Non-blocking read: tokens produced per live sequence since the last
    /// read. An empty map means no progress on this step.
    fn read_one(&mut self) -> Result<GenerationOutputs>;

    /// Blocking read: waits until the generation completes and returns
    /// every finished sequence.
    fn read_all(&mut self) -> Result<Vec<GenerationOutput>>;

    fn status(&self) -> GenerationStatus;
}

/// The shared text-generation engine, as visible to a node.
pub trait BatchingPipeline: Send + Sync {
    /// Register a generation and return its handle.
    fn add_request(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn GenerationHandle>>;
}

/// Token-id to text seam. Must tolerate concurrent `decode` calls from
/// multiple node instances.
pub trait TextDecoder: Send + Sync {
    fn decode(&self, token_ids: &[u32]) -> Result<String>;
}

/// Wakes the pipeline's executor thread after a request is registered.
pub trait Notifier: Send + Sync {
    fn notify(&self);
}
