//! Typed port values exchanged with the host graph on each tick.

use serde_json::Value;

/// One HTTP request as delivered by the front-end: the raw body for
/// logging plus the already-parsed JSON document.
#[derive(Debug, Clone)]
pub struct HttpPayload {
    pub body: String,
    pub parsed_json: Value,
}

/// A value emitted on an output port, stamped with the node's logical
/// clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<T> {
    pub data: T,
    pub timestamp: u64,
}

impl<T> Packet<T> {
    pub fn new(data: T, timestamp: u64) -> Self {
        Self { data, timestamp }
    }
}

/// Everything a single `process` call receives. The host may deliver a
/// payload, a loopback re-arm signal, both, or neither.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub payload: Option<HttpPayload>,
    pub loopback: Option<bool>,
}

impl TickInput {
    /// A tick with no packets on either input port.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_payload(payload: HttpPayload) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    pub fn from_loopback() -> Self {
        Self {
            loopback: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none() && self.loopback.is_none()
    }
}

/// Everything a single `process` call emits: at most one response string
/// (a unary envelope or one or more SSE frames) and at most one loopback
/// re-arm signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutput {
    pub response: Option<Packet<String>>,
    pub loopback: Option<Packet<bool>>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.response.is_none() && self.loopback.is_none()
    }
}
