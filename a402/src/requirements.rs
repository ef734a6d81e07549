//! Payment requirement builder.
//!
//! [`build`] is the one-shot form: resource, price, network and merchant in,
//! [`PaymentRequirements`] out. Servers that price a route once and answer many
//! requests use a [`PriceTag`], which validates the price up front and fills in
//! the per-request resource URL later.

use crate::amount::{AmountError, to_minor_units};
use crate::networks::Network;
use crate::proto::MinorUnits;
use crate::proto::v1::PaymentRequirements;

/// Seconds a payer has to complete a payment unless configured otherwise.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// MIME type advertised unless configured otherwise.
pub const DEFAULT_MIME_TYPE: &str = "application/json";

/// Builds the requirement for paying `price` on `network` to `merchant` for `resource`.
///
/// The scheme, asset and `extra` metadata come from the network table. The
/// description defaults to `Payment required for <resource>`.
///
/// # Errors
///
/// Returns [`AmountError::InvalidPrice`] if `price` is not a non-negative decimal.
pub fn build(
    resource: &str,
    price: &str,
    network: Network,
    merchant: &str,
    timeout_seconds: Option<u64>,
) -> Result<PaymentRequirements, AmountError> {
    let tag = PriceTag::new(network, merchant, price)?
        .with_timeout(timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
    Ok(tag.requirements(resource, None, DEFAULT_MIME_TYPE))
}

/// A validated price for one network, reusable across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTag {
    /// Network to pay on.
    pub network: Network,
    /// Recipient address or account.
    pub pay_to: String,
    /// Amount due, in minor units.
    pub amount: MinorUnits,
    /// How long the payer has to complete the payment.
    pub max_timeout_seconds: u64,
}

impl PriceTag {
    /// Prices a resource at `price` (e.g., `"0.05"`) on `network`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::InvalidPrice`] if `price` is not a non-negative decimal.
    pub fn new(
        network: Network,
        pay_to: impl Into<String>,
        price: &str,
    ) -> Result<Self, AmountError> {
        Ok(Self::from_minor_units(network, pay_to, to_minor_units(price)?))
    }

    /// Prices a resource at an exact minor unit amount.
    pub fn from_minor_units(
        network: Network,
        pay_to: impl Into<String>,
        amount: MinorUnits,
    ) -> Self {
        Self {
            network,
            pay_to: pay_to.into(),
            amount,
            max_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Sets the payment timeout.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.max_timeout_seconds = seconds;
        self
    }

    /// The requirement for paying this tag for `resource`.
    ///
    /// An empty or absent `description` becomes `Payment required for <resource>`.
    #[must_use]
    pub fn requirements(
        &self,
        resource: &str,
        description: Option<&str>,
        mime_type: &str,
    ) -> PaymentRequirements {
        let description = description
            .filter(|d| !d.is_empty())
            .map_or_else(|| format!("Payment required for {resource}"), str::to_owned);
        PaymentRequirements {
            scheme: self.network.scheme(),
            network: self.network,
            max_amount_required: self.amount,
            resource: resource.to_owned(),
            description,
            mime_type: mime_type.to_owned(),
            output_schema: None,
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            asset: self.network.asset().to_owned(),
            extra: self.network.extra(),
        }
    }
}
