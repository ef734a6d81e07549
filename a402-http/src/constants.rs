//! HTTP-specific constants for the x402 protocol.

/// Header carrying the base64 payment payload (client → server).
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// HTTP 402 Payment Required status code.
pub const HTTP_STATUS_PAYMENT_REQUIRED: u16 = 402;

/// A public facilitator, for callers that opt in explicitly.
///
/// Nothing in this crate falls back to it.
pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.payai.network";

/// Path of the facilitator verification endpoint, relative to its base URL.
pub const VERIFY_PATH: &str = "./verify";

/// Path of the facilitator discovery endpoint, relative to its base URL.
pub const DISCOVERY_PATH: &str = "./discovery/resources";
