//! Inbound request bodies for the Ollama-style endpoints and their
//! conversion into the payload forwarded upstream.
//!
//! Every request type declares the fields the gateway needs to understand
//! and keeps anything else in an ordered `extra` bag, so unknown options
//! (`options`, `format`, `keep_alive`, `images`, …) reach the upstream
//! untouched and in the order the caller sent them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered JSON object sent as the upstream request body.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing)]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing)]
    pub extra_params: Payload,
    #[serde(flatten)]
    pub extra: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing)]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing)]
    pub extra_params: Payload,
    #[serde(flatten)]
    pub extra: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,
    /// A single string or a list of strings.
    pub input: Value,
    #[serde(default, skip_serializing)]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing)]
    pub extra_params: Payload,
    #[serde(flatten)]
    pub extra: Payload,
}

/// A chat message. Fields other than `role` and `content` (tool calls,
/// images, …) are carried through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Payload,
}

pub trait IntoPayload: Serialize + Sized {
    /// Requested transport discipline. Defaults to streaming.
    fn stream(&self) -> bool;

    fn take_extra_params(&mut self) -> Payload;

    /// Assemble the upstream body: declared fields, then unknown keys in
    /// arrival order, then `extra_params` merged over them. The effective
    /// `stream` flag is always written so the upstream framing matches the
    /// discipline the gateway relays with.
    fn into_payload(mut self) -> serde_json::Result<(Payload, bool)> {
        let stream = self.stream();
        let extra_params = self.take_extra_params();

        let mut payload = match serde_json::to_value(&self)? {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        payload.extend(extra_params);
        payload.insert("stream".to_string(), Value::Bool(stream));

        Ok((payload, stream))
    }
}

macro_rules! impl_into_payload {
    ($($ty:ty),+) => {
        $(
            impl IntoPayload for $ty {
                fn stream(&self) -> bool {
                    self.stream.unwrap_or(true)
                }

                fn take_extra_params(&mut self) -> Payload {
                    std::mem::take(&mut self.extra_params)
                }
            }
        )+
    };
}

impl_into_payload!(GenerateRequest, ChatRequest, EmbedRequest);
