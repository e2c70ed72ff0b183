//! Errors raised while decoding asset payloads.
//!
//! Playback never fails: lookups that miss return `None`/`false` and log a
//! warning. Only parsing has a hard failure path.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field `{field}` in {context}")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
    #[error("{kind} `{name}` referenced by {owner} does not exist")]
    UnknownReference {
        kind: &'static str,
        name: String,
        owner: String,
    },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),
}
