//! Relay core types, engine trait seams, and error definitions.

pub mod error;
pub mod pipeline;
pub mod types;

pub use error::{RelayError, Result};
pub use pipeline::{BatchingPipeline, GenerationHandle, Notifier, TextDecoder};
pub use types::*;
