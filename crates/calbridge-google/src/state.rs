//! Opaque OAuth `state` values.
//!
//! Hosts round-trip arbitrary parameters (return path, tenant, ...) through
//! the consent redirect. The parameters are JSON-encoded, base64-encoded with
//! the standard alphabet, and then `+`, `/`, `=` are swapped for `-`, `_`, `,`
//! so the value survives query strings and form posts unescaped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::error::{GoogleError, GoogleResult};

/// Encodes `params` into a `state` value.
pub fn encode_state(params: &Value) -> String {
    let json = params.to_string();
    STANDARD
        .encode(json.as_bytes())
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            '=' => ',',
            other => other,
        })
        .collect()
}

/// Decodes a `state` value produced by [`encode_state`].
pub fn decode_state(state: &str) -> GoogleResult<Value> {
    let standard: String = state
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            ',' => '=',
            other => other,
        })
        .collect();
    let bytes = STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| GoogleError::bad_request(format!("state is not valid base64: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GoogleError::bad_request(format!("state is not valid JSON: {}", e)))
}
