//! Error types for the HTTP transport layer.

/// Errors that can occur while encoding or decoding the `X-PAYMENT` header.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload object carries no proof fields.
    #[error("payment payload is empty")]
    EmptyProof,
}
