//! Error types for verification backends and the dispatcher.
//!
//! Backend failures are *expected* outcomes: the dispatcher folds a
//! [`BackendError`] into an invalid [`VerifyResponse`](crate::proto::VerifyResponse)
//! so a server never admits a request because a node was unreachable.
//! [`VerifyError`] is reserved for faults the protocol does not model.

use std::time::Duration;

/// Boxed error used as a `#[source]` for foreign error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A facilitator or chain RPC call that could not produce an answer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never completed (DNS, connect, TLS, reset).
    #[error("{context}: transport error: {source}")]
    Transport {
        /// Which call failed, e.g. `"POST /verify"`.
        context: &'static str,
        /// The underlying error.
        #[source]
        source: BoxError,
    },
    /// The backend did not answer in time.
    #[error("{context}: timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Which call timed out.
        context: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The backend answered with a non-success HTTP status.
    #[error("{context}: unexpected HTTP status {status}: {body}")]
    HttpStatus {
        /// Which call failed.
        context: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The response body, as text.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("{context}: malformed response: {source}")]
    Decode {
        /// Which call failed.
        context: &'static str,
        /// The decode error.
        #[source]
        source: BoxError,
    },
    /// A JSON-RPC node answered with an error object.
    #[error("{context}: JSON-RPC error {code}: {message}")]
    Rpc {
        /// The RPC method.
        context: &'static str,
        /// Error code from the node.
        code: i64,
        /// Error message from the node.
        message: String,
    },
}

impl BackendError {
    /// The `invalidReason` surfaced to the payer when this error ends a verification.
    #[must_use]
    pub fn reason(&self) -> String {
        format!("Verification backend unavailable: {self}")
    }
}

/// A fault while verifying that is not a verification outcome.
///
/// The HTTP layer answers these with `500`, never with a 402 challenge.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The payment payload could not be re-encoded for the facilitator.
    #[error("failed to encode payment payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while a client builds a payment proof.
#[derive(Debug, thiserror::Error)]
pub enum ProveError {
    /// The payer was asked to pay on a network it does not serve.
    #[error("payer for {scheme} cannot pay on network {network}")]
    UnsupportedNetwork {
        /// The payer's scheme.
        scheme: crate::scheme::Scheme,
        /// The requested network.
        network: crate::networks::Network,
    },
    /// The caller-supplied transfer function failed.
    #[error("payment transfer failed: {0}")]
    Transfer(#[source] BoxError),
    /// A requirement field could not be read in the scheme's native form.
    #[error("requirement field {field} is invalid: {value}")]
    InvalidRequirement {
        /// The wire name of the field, e.g. `"payTo"`.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}
