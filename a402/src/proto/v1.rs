//! Protocol version 1 message types.
//!
//! # Key Types
//!
//! - [`X402Version1`] - Version marker that serializes as `1`
//! - [`PaymentRequirements`] - Payment terms set by the merchant
//! - [`PaymentRequired`] - HTTP 402 response body
//! - [`PaymentPayload`] - Proof of payment sent by the payer

use serde::{Deserialize, Serialize};
use serde_with::{VecSkipError, serde_as};

use super::{Base64Bytes, MinorUnits};
use crate::networks::Network;
use crate::scheme::Scheme;

/// Version marker for x402 protocol version 1.
pub type X402Version1 = super::Version<1>;

/// Convenience constant for constructing V1 protocol messages.
pub const V1: X402Version1 = super::Version;

/// Scheme-specific proof object carried in [`PaymentPayload::payload`].
pub type RawProof = serde_json::Map<String, serde_json::Value>;

/// Payment terms for one way of paying for a resource.
///
/// Built by [`crate::requirements::build`] or a [`crate::PriceTag`].
/// The `scheme` always matches `network.scheme()` for requirements built by
/// this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme.
    pub scheme: Scheme,
    /// The network the payment settles on.
    pub network: Network,
    /// Amount due, in minor units.
    pub max_amount_required: MinorUnits,
    /// The resource URL being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// Optional JSON schema of the resource's response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Recipient address or account.
    pub pay_to: String,
    /// How long the payer has to complete the payment.
    pub max_timeout_seconds: u64,
    /// Asset contract address or mint.
    pub asset: String,
    /// Scheme-specific metadata; omitted when the scheme needs none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// HTTP 402 Payment Required response body.
///
/// Entries of `accepts` that do not parse, such as schemes or networks this
/// crate does not know, are dropped while reading instead of failing the
/// whole body.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// Acceptable ways to pay, in the merchant's order of preference.
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Why the previous attempt, if any, was refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentRequired {
    /// A challenge listing `accepts`.
    #[must_use]
    pub const fn new(accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: V1,
            accepts,
            error: None,
        }
    }

    /// Attaches a refusal reason.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Proof of payment, sent base64-encoded in the `X-PAYMENT` header.
///
/// `scheme` and `network` are kept as the strings the payer sent so that an
/// unknown or mismatched value can be reported back instead of failing to
/// parse.
///
/// Known proof fields:
///
/// | scheme        | fields                                                        |
/// |---------------|---------------------------------------------------------------|
/// | `x402+eip712` | `transactionHash`, `amount`, `currency`, `payTo`, `chainId`   |
/// | `x402+solana` | `signature`, `amount`, `currency`, `payTo`                    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// The payment scheme identifier.
    pub scheme: String,
    /// The network name.
    pub network: String,
    /// The scheme-specific proof.
    pub payload: RawProof,
}

impl PaymentPayload {
    /// A payload answering `requirements` with `proof`.
    #[must_use]
    pub fn new(requirements: &PaymentRequirements, proof: RawProof) -> Self {
        Self {
            x402_version: V1,
            scheme: requirements.scheme.as_str().to_owned(),
            network: requirements.network.as_str().to_owned(),
            payload: proof,
        }
    }

    /// The `X-PAYMENT` header value for this payload: base64 of its JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof cannot be serialized.
    pub fn to_header(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(Base64Bytes::encode(json).to_string())
    }

    fn proof_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The EVM transaction hash, if present and non-empty.
    #[must_use]
    pub fn transaction_hash(&self) -> Option<&str> {
        self.proof_str("transactionHash")
    }

    /// The Solana transaction signature, if present and non-empty.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.proof_str("signature")
    }

    /// The transaction identifier, whichever of hash or signature is present.
    #[must_use]
    pub fn transaction(&self) -> Option<&str> {
        self.transaction_hash().or_else(|| self.signature())
    }

    /// The amount the payer claims to have sent, as a string.
    ///
    /// Accepts both string and numeric JSON values.
    #[must_use]
    pub fn amount(&self) -> Option<String> {
        match self.payload.get("amount")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns `true` if this payload names the same scheme and network as `requirements`.
    #[must_use]
    pub fn answers(&self, requirements: &PaymentRequirements) -> bool {
        self.scheme == requirements.scheme.as_str() && self.network == requirements.network.as_str()
    }
}
