//! The verified payment, as seen by the protected handler.

use a402::networks::Network;
use a402::proto::v1::{PaymentPayload, PaymentRequirements, RawProof};
use a402::scheme::Scheme;
use axum_core::extract::FromRequestParts;
use axum_core::response::{IntoResponse, Response};
use http::StatusCode;
use http::request::Parts;

/// Facts about the payment that admitted a request.
///
/// The middleware inserts one into the request extensions before calling the
/// protected service. In axum handlers it is also an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationContext {
    /// The scheme paid with.
    pub scheme: Scheme,
    /// The network paid on.
    pub network: Network,
    /// The transaction hash or signature, when the proof carries one.
    pub transaction: Option<String>,
    /// The amount the payer claims to have sent.
    pub amount: Option<String>,
    /// The raw proof object.
    pub payload: RawProof,
}

impl VerificationContext {
    /// The context for `payload`, verified against `requirements`.
    #[must_use]
    pub fn new(payload: PaymentPayload, requirements: &PaymentRequirements) -> Self {
        Self {
            scheme: requirements.scheme,
            network: requirements.network,
            transaction: payload.transaction().map(str::to_owned),
            amount: payload.amount(),
            payload: payload.payload,
        }
    }
}

/// Rejection when a handler asks for a [`VerificationContext`] on a route the
/// payment layer does not cover.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("verification context missing; is the route behind the payment layer?")]
pub struct MissingVerificationContext;

impl IntoResponse for MissingVerificationContext {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for VerificationContext {
    type Rejection = MissingVerificationContext;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(MissingVerificationContext)
    }
}
