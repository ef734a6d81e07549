//! Payment schemes and the per-scheme extension points.
//!
//! A [`Scheme`] names a proof format and the settlement mechanism behind it.
//! The set is closed: each variant has exactly one verifier implementation
//! (see `a402-evm` and `a402-svm`), and every dispatch over it is an
//! exhaustive `match`, so adding a scheme is a compile-checked change.
//!
//! - [`SchemeVerifier`] - server side, checks a proof against a requirement
//! - [`PaymentProver`] - client side, pays a requirement and returns the proof

use std::fmt;
use std::str::FromStr;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ProveError};
use crate::proto::VerifyResponse;
use crate::proto::v1::{PaymentPayload, PaymentRequirements, RawProof};

/// A supported payment scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// EVM token transfer proven by its transaction hash; the requirement
    /// carries EIP-712 domain metadata for the asset.
    #[serde(rename = "x402+eip712")]
    Eip712,
    /// Solana transfer proven by its transaction signature.
    #[serde(rename = "x402+solana")]
    Solana,
}

impl Scheme {
    /// Every supported scheme.
    pub const ALL: [Self; 2] = [Self::Eip712, Self::Solana];

    /// The wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eip712 => "x402+eip712",
            Self::Solana => "x402+solana",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheme identifier that is not in [`Scheme::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported scheme: {0}")]
pub struct UnknownScheme(pub String);

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == s)
            .ok_or_else(|| UnknownScheme(s.to_owned()))
    }
}

/// Checks a payment proof directly against the chain for one scheme.
///
/// Implementations answer "the chain says no" with
/// [`VerifyResponse::Invalid`] and reserve `Err` for a backend that could not
/// be asked at all.
pub trait SchemeVerifier: Send + Sync {
    /// The scheme this verifier handles.
    fn scheme(&self) -> Scheme;

    /// Verifies `payload` against `requirements`.
    ///
    /// The dispatcher has already checked that the payload names this scheme
    /// and the requirement's network.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, BackendError>>;
}

/// Pays a requirement on behalf of a client and returns the proof object.
pub trait PaymentProver: Send + Sync {
    /// The scheme this prover pays with.
    fn scheme(&self) -> Scheme;

    /// Makes the payment and returns the scheme-specific `payload` object.
    fn prove<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<RawProof, ProveError>>;
}
