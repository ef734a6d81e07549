//! Protocol types for x402 payment messages.
//!
//! This module defines the JSON shapes exchanged between payers, merchants and
//! facilitators. Only protocol version 1 is spoken; its message types live in
//! [`v1`].
//!
//! # Key Types
//!
//! - [`MinorUnits`] - An integer amount carried as a decimal string
//! - [`VerifyRequest`] / [`VerifyResponse`] - Facilitator verification messages
//! - [`ResourceRegistration`] / [`DiscoveredResources`] - Facilitator discovery messages
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{VecSkipError, serde_as};

use crate::networks::Network;

pub mod encoding;
pub mod v1;
pub mod version;

pub use encoding::Base64Bytes;
pub use version::Version;

/// An amount in the asset's smallest unit.
///
/// Serialized as a decimal string so JavaScript peers do not lose precision.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MinorUnits(u64);

impl MinorUnits {
    /// Returns the inner `u64` value.
    #[must_use]
    pub const fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MinorUnits {
    type Err = <u64 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl From<u64> for MinorUnits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MinorUnits> for u64 {
    fn from(value: MinorUnits) -> Self {
        value.0
    }
}

impl Serialize for MinorUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MinorUnits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map(Self).map_err(serde::de::Error::custom)
    }
}

/// Body of a facilitator `POST /verify` call.
///
/// The payload travels in header form: base64 of the decoded payload
/// re-serialized as JSON. Field order may differ from the client's header, the
/// content does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Protocol version (always 1).
    pub x402_version: v1::X402Version1,
    /// The base64 `X-PAYMENT` header value.
    pub payment_header: String,
    /// The requirement the payment answers.
    pub payment_requirements: v1::PaymentRequirements,
}

impl VerifyRequest {
    /// The facilitator request for `payload` answering `requirements`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn new(
        payload: &v1::PaymentPayload,
        requirements: v1::PaymentRequirements,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            x402_version: v1::V1,
            payment_header: payload.to_header()?,
            payment_requirements: requirements,
        })
    }
}

/// Outcome of verifying a payment.
///
/// On the wire this is `{"isValid": bool, "invalidReason": string?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResponse {
    /// The payment checks out.
    Valid,
    /// The payment was rejected.
    Invalid {
        /// Human-readable reason, surfaced to the payer.
        reason: String,
    },
}

impl VerifyResponse {
    /// Reason used when a facilitator rejects without saying why.
    pub const DEFAULT_INVALID_REASON: &'static str = "Payment verification failed";

    /// A rejection with the given reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the payment was accepted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The rejection reason, if any.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { reason } => Some(reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        VerifyResponseWire {
            is_valid: self.is_valid(),
            invalid_reason: self.invalid_reason().map(str::to_owned),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        if wire.is_valid {
            return Ok(Self::Valid);
        }
        let reason = wire
            .invalid_reason
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_INVALID_REASON.to_owned());
        Ok(Self::Invalid { reason })
    }
}

/// A payable resource announced to a facilitator's discovery index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRegistration {
    /// Display name.
    pub name: String,
    /// Full URL of the protected endpoint.
    pub endpoint: String,
    /// Address or account that receives payment.
    pub merchant_address: String,
    /// Network payments settle on.
    pub network: Network,
    /// Human price, as configured (e.g., `"0.05"`).
    pub price: String,
    /// Free-form category.
    pub category: String,
}

/// Response of a facilitator's discovery listing.
///
/// Entries that do not parse (for example, on a network this crate does not
/// support) are skipped.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveredResources {
    /// Registered resources.
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub items: Vec<ResourceRegistration>,
}
