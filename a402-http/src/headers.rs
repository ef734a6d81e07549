//! Codec for the `X-PAYMENT` header: standard base64 over the JSON
//! [`PaymentPayload`].
//!
//! Decoding validates as it parses: the version must be `1`, `scheme` and
//! `network` must be present and the `payload` object must be non-empty. Any
//! failure is a malformed payload.

use a402::proto::Base64Bytes;
use a402::proto::v1::PaymentPayload;

use crate::error::HttpError;

/// Encodes a [`PaymentPayload`] for the `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_x_payment(payload: &PaymentPayload) -> Result<String, HttpError> {
    Ok(payload.to_header()?)
}

/// Decodes an `X-PAYMENT` header value. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`HttpError`] on invalid base64, JSON that is not a version 1
/// payment payload, or an empty proof object.
pub fn decode_x_payment(header_value: &[u8]) -> Result<PaymentPayload, HttpError> {
    let bytes = Base64Bytes::from(header_value).decode()?;
    let payload: PaymentPayload = serde_json::from_slice(&bytes)?;
    if payload.payload.is_empty() {
        return Err(HttpError::EmptyProof);
    }
    Ok(payload)
}
