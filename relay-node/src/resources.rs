//! Shared resources a node binds to at `open`.
//!
//! The map is populated by the external loader before any node opens and
//! torn down after every instance has closed; nodes only read it.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{BatchingPipeline, Notifier, TextDecoder};

/// Process-wide bundle shared by every node instance with the same name:
/// the batched pipeline, the tokenizer, and the signal that wakes the
/// pipeline's executor thread.
pub struct NodeResources {
    pub pipeline: Arc<dyn BatchingPipeline>,
    pub tokenizer: Arc<dyn TextDecoder>,
    pub notifier: Arc<dyn Notifier>,
}

impl NodeResources {
    pub fn new(
        pipeline: Arc<dyn BatchingPipeline>,
        tokenizer: Arc<dyn TextDecoder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pipeline,
            tokenizer,
            notifier,
        }
    }

    /// Wake the pipeline's executor thread after registering a request.
    pub fn notify_executor(&self) {
        self.notifier.notify();
    }
}

/// Resource bundles keyed by node-instance name.
pub type NodeResourcesMap = HashMap<String, Arc<NodeResources>>;
