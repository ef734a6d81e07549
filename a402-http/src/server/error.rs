//! Error types for the x402 payment gate middleware.

use a402::error::VerifyError;

use crate::error::HttpError;

/// Why a request was not admitted.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// Required payment header is missing.
    #[error("{0} header is required")]
    PaymentHeaderRequired(&'static str),
    /// Payment header is present but does not decode to a payment payload.
    #[error("Invalid or malformed payment header: {0}")]
    MalformedPayload(#[source] HttpError),
    /// No accepted requirement names the payload's scheme and network.
    #[error("Unable to find matching payment requirements")]
    NoPaymentMatching,
    /// The verifier rejected the payment.
    #[error("{0}")]
    VerificationFailed(String),
}

/// Paygate error type.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// Payment verification failed.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// A fault the protocol does not model.
    #[error("Payment processing error: {0}")]
    Internal(#[from] VerifyError),
}
