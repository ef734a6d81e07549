//! The verification dispatcher.
//!
//! [`PaymentVerifier`] turns a decoded payload and the requirement it answers
//! into a [`VerifyResponse`]. The decision order is fixed:
//!
//! 1. With a facilitator configured, the facilitator decides. Nothing is
//!    re-derived locally.
//! 2. Otherwise the payload must name a known scheme and the requirement's
//!    scheme and network, and the verifier registered for that scheme checks
//!    the chain.
//!
//! Backend failures and timeouts come back as [`VerifyResponse::Invalid`] with
//! the failure in the reason. A payment is never accepted because a backend
//! could not be reached.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::{BackendError, VerifyError};
use crate::facilitator::Facilitator;
use crate::proto::v1::{PaymentPayload, PaymentRequirements};
use crate::proto::{VerifyRequest, VerifyResponse};
use crate::scheme::{Scheme, SchemeVerifier};

/// Reason given when a payload names a different scheme or network than the requirement.
pub const MISMATCH_REASON: &str = "Payment scheme or network does not match requirements";

/// One verifier slot per scheme.
#[derive(Clone, Default)]
struct SchemeVerifiers {
    eip712: Option<Arc<dyn SchemeVerifier>>,
    solana: Option<Arc<dyn SchemeVerifier>>,
}

impl SchemeVerifiers {
    const fn slot(&self, scheme: Scheme) -> Option<&Arc<dyn SchemeVerifier>> {
        match scheme {
            Scheme::Eip712 => self.eip712.as_ref(),
            Scheme::Solana => self.solana.as_ref(),
        }
    }

    const fn slot_mut(&mut self, scheme: Scheme) -> &mut Option<Arc<dyn SchemeVerifier>> {
        match scheme {
            Scheme::Eip712 => &mut self.eip712,
            Scheme::Solana => &mut self.solana,
        }
    }
}

/// Routes verification to a facilitator or to per-scheme chain verifiers.
///
/// Cheap to clone; share one per application.
///
/// ```
/// use std::time::Duration;
/// use a402::PaymentVerifier;
///
/// let verifier = PaymentVerifier::new().with_timeout(Duration::from_secs(5));
/// assert!(!verifier.is_delegated());
/// ```
#[derive(Clone)]
pub struct PaymentVerifier {
    facilitator: Option<Arc<dyn Facilitator>>,
    verifiers: SchemeVerifiers,
    timeout: Duration,
}

impl fmt::Debug for PaymentVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<Scheme> = Scheme::ALL
            .into_iter()
            .filter(|scheme| self.verifiers.slot(*scheme).is_some())
            .collect();
        f.debug_struct("PaymentVerifier")
            .field("delegated", &self.facilitator.is_some())
            .field("schemes", &schemes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for PaymentVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentVerifier {
    /// Upper bound on a single backend call, unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// A verifier with no backends; every payment is rejected until one is added.
    #[must_use]
    pub fn new() -> Self {
        Self {
            facilitator: None,
            verifiers: SchemeVerifiers::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Delegates all verification to `facilitator`.
    #[must_use]
    pub fn with_facilitator<F: Facilitator + 'static>(mut self, facilitator: F) -> Self {
        self.facilitator = Some(Arc::new(facilitator));
        self
    }

    /// Registers a chain verifier for its scheme, replacing any previous one.
    #[must_use]
    pub fn with_verifier<V: SchemeVerifier + 'static>(mut self, verifier: V) -> Self {
        let scheme = verifier.scheme();
        *self.verifiers.slot_mut(scheme) = Some(Arc::new(verifier));
        self
    }

    /// Sets the upper bound on each backend call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns `true` if a facilitator makes every decision.
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        self.facilitator.is_some()
    }

    /// Returns `true` if payments in `scheme` can be verified.
    #[must_use]
    pub const fn supports(&self, scheme: Scheme) -> bool {
        self.facilitator.is_some() || self.verifiers.slot(scheme).is_some()
    }

    /// The upper bound on each backend call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Verifies `payload` against `requirements`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] only for faults outside the protocol, such as
    /// failing to re-encode the payload for the facilitator. Every verification
    /// outcome, including an unreachable backend, is an `Ok`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "x402.verify",
            skip_all,
            fields(
                scheme = %payload.scheme,
                network = %payload.network,
                delegated = self.facilitator.is_some(),
            ),
            err
        )
    )]
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, VerifyError> {
        if let Some(facilitator) = &self.facilitator {
            let request = VerifyRequest::new(payload, requirements.clone())?;
            return Ok(self.bounded("POST /verify", facilitator.verify(&request)).await);
        }

        if let Err(unknown) = payload.scheme.parse::<Scheme>() {
            return Ok(VerifyResponse::invalid(unknown.to_string()));
        }
        if !payload.answers(requirements) {
            return Ok(VerifyResponse::invalid(MISMATCH_REASON));
        }

        let scheme = requirements.scheme;
        let Some(verifier) = self.verifiers.slot(scheme) else {
            return Ok(VerifyResponse::invalid(format!("Unsupported scheme: {scheme}")));
        };
        Ok(self
            .bounded(scheme.as_str(), verifier.verify(payload, requirements))
            .await)
    }

    /// Runs a backend call under the timeout and folds failures into a rejection.
    async fn bounded<F>(&self, context: &'static str, call: F) -> VerifyResponse
    where
        F: Future<Output = Result<VerifyResponse, BackendError>>,
    {
        let err = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => return response,
            Ok(Err(err)) => err,
            Err(_) => BackendError::Timeout {
                context,
                timeout: self.timeout,
            },
        };
        #[cfg(feature = "telemetry")]
        tracing::warn!(error = %err, "verification backend failed");
        VerifyResponse::invalid(err.reason())
    }
}
