//! Decoding of buffered (non-streaming) upstream bodies.
//!
//! Two framings are accepted:
//! 1. a single JSON document, returned unchanged;
//! 2. newline-delimited JSON, reduced to `{"response": <concatenation>}` of
//!    every line's `response` field.
//!
//! One unparseable line rejects the whole body.

use serde_json::{json, Value};

use crate::errors::AppError;

pub fn decode_buffered(body: &[u8]) -> Result<Value, AppError> {
    let text = std::str::from_utf8(body).map_err(|e| {
        tracing::error!(raw = %String::from_utf8_lossy(body), "upstream body is not UTF-8");
        AppError::MalformedUpstreamResponse(e.to_string())
    })?;

    if let Ok(doc) = serde_json::from_str::<Value>(text) {
        return Ok(doc);
    }

    concat_ndjson(text)
}

fn concat_ndjson(text: &str) -> Result<Value, AppError> {
    let mut response = String::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let obj: Value = serde_json::from_str(line).map_err(|e| {
            tracing::error!(line = idx + 1, raw = %line, "JSON decoding error: {}", e);
            AppError::MalformedUpstreamResponse(format!("line {}: {}", idx + 1, e))
        })?;

        if let Some(part) = obj.get("response").and_then(Value::as_str) {
            response.push_str(part);
        }
    }

    Ok(json!({ "response": response }))
}
