//! Remote verification.
//!
//! A facilitator is a trusted service that checks payment proofs on a
//! merchant's behalf so the merchant does not need chain access. When one is
//! configured the [`PaymentVerifier`](crate::verify::PaymentVerifier) defers to
//! it entirely.
//!
//! The HTTP implementation lives in `a402-http` (`FacilitatorClient`).

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::BackendError;
use crate::proto::{VerifyRequest, VerifyResponse};

/// A service that verifies payments on the merchant's behalf.
pub trait Facilitator: Send + Sync {
    /// Verifies the payment described by `request`.
    ///
    /// The answer is authoritative. `Err` means the facilitator could not be
    /// asked or did not answer intelligibly.
    fn verify<'a>(
        &'a self,
        request: &'a VerifyRequest,
    ) -> BoxFuture<'a, Result<VerifyResponse, BackendError>>;
}

impl<T: Facilitator + ?Sized> Facilitator for Arc<T> {
    fn verify<'a>(
        &'a self,
        request: &'a VerifyRequest,
    ) -> BoxFuture<'a, Result<VerifyResponse, BackendError>> {
        (**self).verify(request)
    }
}
