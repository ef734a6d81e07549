//! Receipt-based verification for the `x402+eip712` scheme.
//!
//! A proof is accepted when the node returns a receipt for its
//! `transactionHash` and the receipt's `status` is `0x1`. Amount and recipient
//! are not re-derived from the receipt: for a token transfer the receipt's `to`
//! is the token contract, not the merchant.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use a402::error::BackendError;
use a402::proto::VerifyResponse;
use a402::proto::v1::{PaymentPayload, PaymentRequirements};
use a402::scheme::{Scheme, SchemeVerifier};
use alloy_network::ReceiptResponse;
use alloy_primitives::TxHash;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_transport::{TransportError, TransportErrorKind};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Proof carries no `transactionHash`.
pub const MISSING_HASH: &str = "Missing transaction hash";
/// `transactionHash` is not 32 bytes of hex.
pub const INVALID_HASH: &str = "Invalid transaction hash";
/// No receipt, or a reverted one.
pub const NOT_FOUND: &str = "Transaction failed or not found";

const GET_RECEIPT: &str = "eth_getTransactionReceipt";

/// Verifies `x402+eip712` proofs against an EVM JSON-RPC node.
#[derive(Clone)]
pub struct Eip712Verifier {
    provider: DynProvider,
    timeout: Duration,
}

impl fmt::Debug for Eip712Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eip712Verifier")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Eip712Verifier {
    /// Per-lookup timeout used unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Verifies through `provider`.
    #[must_use]
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        Self {
            provider: provider.erased(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Verifies through the node at `url` over HTTP.
    #[must_use]
    pub fn connect(url: Url) -> Self {
        Self::new(ProviderBuilder::new().connect_http(url))
    }

    /// Verifies through the node at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` does not parse.
    pub fn from_url(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::connect(Url::parse(url)?))
    }

    /// Sets the upper bound on one receipt lookup.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &DynProvider {
        &self.provider
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.eip712.verify", skip_all, fields(timeout = ?self.timeout), err)
    )]
    async fn check(&self, payload: &PaymentPayload) -> Result<VerifyResponse, BackendError> {
        let Some(hash) = payload.transaction_hash() else {
            return Ok(VerifyResponse::invalid(MISSING_HASH));
        };
        let Ok(hash) = TxHash::from_str(hash) else {
            return Ok(VerifyResponse::invalid(INVALID_HASH));
        };

        let lookup = self.provider.get_transaction_receipt(hash);
        let receipt = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| BackendError::Timeout {
                context: GET_RECEIPT,
                timeout: self.timeout,
            })?
            .map_err(backend_error)?;
        match receipt {
            Some(receipt) if ReceiptResponse::status(&receipt) => Ok(VerifyResponse::Valid),
            _ => Ok(VerifyResponse::invalid(NOT_FOUND)),
        }
    }
}

/// Maps a provider failure onto the backend taxonomy.
fn backend_error(err: TransportError) -> BackendError {
    let context = GET_RECEIPT;
    if let Some(payload) = err.as_error_resp() {
        return BackendError::Rpc {
            context,
            code: payload.code,
            message: payload.message.to_string(),
        };
    }
    if let Some(TransportErrorKind::HttpError(http)) = err.as_transport_err() {
        return BackendError::HttpStatus {
            context,
            status: http.status,
            body: http.body.clone(),
        };
    }
    if err.is_deser_error() {
        return BackendError::Decode {
            context,
            source: err.into(),
        };
    }
    BackendError::Transport {
        context,
        source: err.into(),
    }
}

impl SchemeVerifier for Eip712Verifier {
    fn scheme(&self) -> Scheme {
        Scheme::Eip712
    }

    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        _requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, BackendError>> {
        self.check(payload).boxed()
    }
}

#[cfg(test)]
mod tests {
    use a402::networks::Network;
    use a402::proto::v1::RawProof;
    use a402::requirements::build;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use super::*;

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    /// Answers a JSON-RPC call with `result` after `delay`, echoing the request id.
    struct RpcResult {
        result: Value,
        delay: Duration,
    }

    fn rpc_result(result: Value) -> RpcResult {
        RpcResult {
            result,
            delay: Duration::ZERO,
        }
    }

    impl Respond for RpcResult {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let id = request
                .body_json::<Value>()
                .map_or(Value::Null, |body| body["id"].clone());
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": id, "result": self.result}))
                .set_delay(self.delay)
        }
    }

    fn receipt(status: &str) -> Value {
        json!({
            "transactionHash": HASH,
            "transactionIndex": "0x3",
            "blockHash": "0x9f1c5e0f1d5d3b0e7a1c5c1b1a8f0e3d2c4b6a8e0f2d4c6b8a0e2f4d6c8b0a2e",
            "blockNumber": "0x1a2b3c",
            "from": "0x2222222222222222222222222222222222222222",
            "to": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
            "contractAddress": null,
            "cumulativeGasUsed": "0x1d4c0",
            "gasUsed": "0xea60",
            "effectiveGasPrice": "0x3b9aca00",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "type": "0x2",
            "status": status,
        })
    }

    fn requirements() -> PaymentRequirements {
        build(
            "https://api.example.com/weather",
            "0.05",
            Network::Base,
            "0x1111111111111111111111111111111111111111",
            None,
        )
        .unwrap()
    }

    fn payload_with(proof: Value) -> PaymentPayload {
        let proof: RawProof = serde_json::from_value(proof).unwrap();
        PaymentPayload::new(&requirements(), proof)
    }

    fn verifier(server: &MockServer) -> Eip712Verifier {
        Eip712Verifier::from_url(&server.uri()).unwrap()
    }

    async fn mock_receipt(server: &MockServer, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": GET_RECEIPT,
                "params": [HASH],
            })))
            .respond_with(rpc_result(result))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn successful_receipt_is_valid() {
        let server = MockServer::start().await;
        mock_receipt(&server, receipt("0x1")).await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"transactionHash": HASH})), &requirements())
            .await
            .unwrap();
        assert_eq!(result, VerifyResponse::Valid);
    }

    #[tokio::test]
    async fn reverted_receipt_is_rejected() {
        let server = MockServer::start().await;
        mock_receipt(&server, receipt("0x0")).await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"transactionHash": HASH})), &requirements())
            .await
            .unwrap();
        assert_eq!(result.invalid_reason(), Some(NOT_FOUND));
    }

    #[tokio::test]
    async fn unknown_transaction_is_rejected() {
        let server = MockServer::start().await;
        mock_receipt(&server, Value::Null).await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"transactionHash": HASH})), &requirements())
            .await
            .unwrap();
        assert_eq!(result.invalid_reason(), Some(NOT_FOUND));
    }

    #[tokio::test]
    async fn missing_or_malformed_hash_skips_the_node() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let verifier = verifier(&server);

        let missing = verifier
            .verify(&payload_with(json!({"amount": "50000"})), &requirements())
            .await
            .unwrap();
        assert_eq!(missing.invalid_reason(), Some(MISSING_HASH));

        let malformed = verifier
            .verify(&payload_with(json!({"transactionHash": "0x1234"})), &requirements())
            .await
            .unwrap();
        assert_eq!(malformed.invalid_reason(), Some(INVALID_HASH));
    }

    #[tokio::test]
    async fn node_error_is_a_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = verifier(&server)
            .verify(&payload_with(json!({"transactionHash": HASH})), &requirements())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn slow_node_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(RpcResult {
                result: receipt("0x1"),
                delay: Duration::from_millis(500),
            })
            .mount(&server)
            .await;

        let err = verifier(&server)
            .with_timeout(Duration::from_millis(50))
            .verify(&payload_with(json!({"transactionHash": HASH})), &requirements())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { context: GET_RECEIPT, .. }));
    }
}
