//! Chat-completions request decoding.
//!
//! The decoder is pure: it walks an already-parsed JSON document and either
//! produces a normalized request plus derived [`GenerationConfig`], or a
//! `BadRequest` naming the offending field. Unknown fields are ignored.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use relay_core::{GenerationConfig, RelayError, Result};

/// One `messages` entry: an open field-name to value mapping, e.g.
/// `{"role": "user", "content": "hi"}`.
pub type ChatEntry = HashMap<String, String>;

/// A decoded chat-completions request. Immutable once decoded; the owning
/// node consults it on every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatEntry>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversity_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_eos: Option<bool>,
}

impl ChatCompletionRequest {
    /// Decode a parsed JSON document into a normalized request.
    pub fn parse(doc: &Value) -> Result<Self> {
        let fields = doc
            .as_object()
            .ok_or_else(|| bad_request("request body must be a JSON object"))?;

        let model = match fields.get("model") {
            Some(Value::String(model)) => model.clone(),
            Some(_) => return Err(bad_request("`model` must be a string")),
            None => return Err(bad_request("`model` is required")),
        };

        let messages = parse_messages(fields)?;
        let stream = bool_field(fields, "stream")?.unwrap_or(false);

        let max_tokens = match int_field(fields, "max_tokens")? {
            Some(value) if value <= 0 => {
                return Err(bad_request("`max_tokens` must be greater than zero"))
            }
            Some(value) => Some(value as usize),
            None => None,
        };

        let temperature = float_field(fields, "temperature")?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(bad_request("`temperature` must be within [0, 2]"));
            }
        }

        let top_p = float_field(fields, "top_p")?;
        if let Some(p) = top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(bad_request("`top_p` must be within [0, 1]"));
            }
        }

        Ok(Self {
            model,
            messages,
            stream,
            max_tokens,
            temperature,
            top_p,
            top_k: int_field(fields, "top_k")?,
            repetition_penalty: float_field(fields, "repetition_penalty")?,
            length_penalty: float_field(fields, "length_penalty")?,
            diversity_penalty: float_field(fields, "diversity_penalty")?,
            seed: int_field(fields, "seed")?,
            best_of: int_field(fields, "best_of")?,
            n: int_field(fields, "n")?,
            ignore_eos: bool_field(fields, "ignore_eos")?,
        })
    }

    /// The text submitted to the engine: the `content` of the first
    /// message. Guaranteed present by [`parse`](Self::parse).
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|entry| entry.get("content"))
            .map(String::as_str)
    }

    /// Derive the engine parameter bundle. Knobs the client left unset keep
    /// the engine defaults.
    pub fn generation_config(&self) -> GenerationConfig {
        let mut config = GenerationConfig::default();

        if let Some(max_tokens) = self.max_tokens {
            config.max_new_tokens = max_tokens;
        }
        if let Some(ignore_eos) = self.ignore_eos {
            config.ignore_eos = ignore_eos;
        }

        // Beam search: one group, best_of beams inside it.
        config.num_groups = 1;
        if let Some(best_of) = self.best_of {
            config.group_size = best_of as usize;
        }
        if let Some(penalty) = self.diversity_penalty {
            config.diversity_penalty = penalty;
        }
        if let Some(penalty) = self.repetition_penalty {
            config.repetition_penalty = penalty;
        }
        if let Some(penalty) = self.length_penalty {
            config.length_penalty = penalty;
        }
        if let Some(n) = self.n {
            config.num_return_sequences = n as usize;
        }

        // Multinomial sampling.
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k as usize;
        }
        if let Some(top_p) = self.top_p {
            config.top_p = top_p;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = seed as u64;
        }
        config.do_sample = config.temperature > 0.0 && config.group_size == 1;

        config
    }
}

fn parse_messages(fields: &Map<String, Value>) -> Result<Vec<ChatEntry>> {
    let entries = match fields.get("messages") {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(bad_request("`messages` must be an array")),
        None => return Err(bad_request("`messages` is required")),
    };
    if entries.is_empty() {
        return Err(bad_request("`messages` must not be empty"));
    }

    let mut messages = Vec::with_capacity(entries.len());
    for entry in entries {
        let object = entry
            .as_object()
            .ok_or_else(|| bad_request("`messages` entries must be objects"))?;
        let mut message = ChatEntry::with_capacity(object.len());
        for (name, value) in object {
            let text = value
                .as_str()
                .ok_or_else(|| bad_request("`messages` entry values must be strings"))?;
            message.insert(name.clone(), text.to_string());
        }
        messages.push(message);
    }

    if !messages[0].contains_key("content") {
        return Err(bad_request("first message must have a `content` field"));
    }
    Ok(messages)
}

/// Optional float field. Only numbers the parser classified as
/// floating-point are accepted, so `"temperature": 1` is a type error.
fn float_field(fields: &Map<String, Value>, name: &str) -> Result<Option<f32>> {
    match fields.get(name) {
        None => Ok(None),
        Some(value) if value.is_f64() => Ok(value.as_f64().map(|f| f as f32)),
        Some(_) => Err(bad_request(&format!("`{name}` must be a float"))),
    }
}

/// Optional integer field, accepted over the parser's signed range. Range
/// validation is per-field; only `max_tokens` constrains its sign.
fn int_field(fields: &Map<String, Value>, name: &str) -> Result<Option<i64>> {
    match fields.get(name) {
        None => Ok(None),
        Some(value) => match value.as_i64() {
            Some(v) => Ok(Some(v)),
            None => Err(bad_request(&format!("`{name}` must be an integer"))),
        },
    }
}

fn bool_field(fields: &Map<String, Value>, name: &str) -> Result<Option<bool>> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(bad_request(&format!("`{name}` must be a boolean"))),
    }
}

fn bad_request(message: &str) -> RelayError {
    RelayError::BadRequest(message.to_string())
}
