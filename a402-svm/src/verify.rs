//! Signature lookup for the `x402+solana` scheme.
//!
//! A proof is accepted when `getTransaction` finds its `signature` and the
//! transaction's `meta.err` is null or absent.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use a402::error::BackendError;
use a402::proto::VerifyResponse;
use a402::proto::v1::{PaymentPayload, PaymentRequirements};
use a402::scheme::{Scheme, SchemeVerifier};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::{RpcError, RpcRequest};
use solana_signature::Signature;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Proof carries no `signature`.
pub const MISSING_SIGNATURE: &str = "Missing transaction signature";
/// `signature` is not a base58 64-byte signature.
pub const INVALID_SIGNATURE: &str = "Invalid transaction signature";
/// Transaction unknown to the node, or landed with an error.
pub const NOT_FOUND: &str = "Transaction failed or not found";

const GET_TRANSACTION: &str = "getTransaction";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionConfig {
    encoding: &'static str,
    max_supported_transaction_version: u8,
}

const LOOKUP_CONFIG: GetTransactionConfig = GetTransactionConfig {
    encoding: "json",
    max_supported_transaction_version: 0,
};

/// The part of a `getTransaction` result verification reads.
///
/// A `null` result, an unknown signature, decodes as `None`.
#[derive(Debug, Deserialize)]
struct ConfirmedTransaction {
    meta: Option<TransactionMeta>,
}

#[derive(Debug, Deserialize)]
struct TransactionMeta {
    err: Option<serde_json::Value>,
}

impl ConfirmedTransaction {
    fn succeeded(&self) -> bool {
        self.meta.as_ref().is_none_or(|meta| meta.err.is_none())
    }
}

/// Verifies `x402+solana` proofs against a Solana JSON-RPC node.
#[derive(Clone)]
pub struct SolanaVerifier {
    rpc: Arc<RpcClient>,
    timeout: Duration,
}

impl fmt::Debug for SolanaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaVerifier")
            .field("rpc", &self.rpc.url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SolanaVerifier {
    /// Per-lookup timeout used unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Verifies through `rpc`.
    #[must_use]
    pub fn new(rpc: RpcClient) -> Self {
        Self {
            rpc: Arc::new(rpc),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Verifies through the node at `url`.
    #[must_use]
    pub fn connect(url: &Url) -> Self {
        Self::new(RpcClient::new(url.to_string()))
    }

    /// Verifies through the node at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` does not parse.
    pub fn from_url(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::connect(&Url::parse(url)?))
    }

    /// Sets the upper bound on one transaction lookup.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying RPC client.
    #[must_use]
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.solana.verify", skip_all, fields(rpc = %self.rpc.url()), err)
    )]
    async fn check(&self, payload: &PaymentPayload) -> Result<VerifyResponse, BackendError> {
        let Some(signature) = payload.signature() else {
            return Ok(VerifyResponse::invalid(MISSING_SIGNATURE));
        };
        let Ok(signature) = Signature::from_str(signature) else {
            return Ok(VerifyResponse::invalid(INVALID_SIGNATURE));
        };

        let params = serde_json::json!([signature.to_string(), LOOKUP_CONFIG]);
        let lookup = self
            .rpc
            .send::<Option<ConfirmedTransaction>>(RpcRequest::GetTransaction, params);
        let transaction = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| BackendError::Timeout {
                context: GET_TRANSACTION,
                timeout: self.timeout,
            })?
            .map_err(backend_error)?;
        match transaction {
            Some(transaction) if transaction.succeeded() => Ok(VerifyResponse::Valid),
            _ => Ok(VerifyResponse::invalid(NOT_FOUND)),
        }
    }
}

/// Maps an RPC client failure onto the backend taxonomy.
fn backend_error(err: ClientError) -> BackendError {
    let context = GET_TRANSACTION;
    match *err.kind {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            BackendError::Rpc {
                context,
                code,
                message,
            }
        }
        ClientErrorKind::Reqwest(source) => match source.status() {
            Some(status) => BackendError::HttpStatus {
                context,
                status: status.as_u16(),
                body: String::new(),
            },
            None => BackendError::Transport {
                context,
                source: source.into(),
            },
        },
        ClientErrorKind::SerdeJson(source) => BackendError::Decode {
            context,
            source: source.into(),
        },
        kind => BackendError::Transport {
            context,
            source: kind.into(),
        },
    }
}

impl SchemeVerifier for SolanaVerifier {
    fn scheme(&self) -> Scheme {
        Scheme::Solana
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
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SIGNATURE: &str =
        "4iisetCuxj7m9syj55dXFvxUqivy2zF3iLgevmpsjr62HQ9y6UxDGtJQ8y8mzWqtfiVVCBtHQsGLAGETiyYyPRy4";

    fn requirements() -> PaymentRequirements {
        build(
            "https://api.example.com/feed",
            "0.25",
            Network::SolanaMainnet,
            "GLrMcCztDV4Bu4TdN3NFiQmcVGHUh6LMGwkwbwLXm48N",
            None,
        )
        .unwrap()
    }

    fn payload_with(proof: serde_json::Value) -> PaymentPayload {
        let proof: RawProof = serde_json::from_value(proof).unwrap();
        PaymentPayload::new(&requirements(), proof)
    }

    fn verifier(server: &MockServer) -> SolanaVerifier {
        SolanaVerifier::from_url(&server.uri()).unwrap()
    }

    async fn mock_transaction(server: &MockServer, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": GET_TRANSACTION,
                "params": [SIGNATURE, {"encoding": "json", "maxSupportedTransactionVersion": 0}],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn landed_transaction_is_valid() {
        let server = MockServer::start().await;
        mock_transaction(&server, json!({"slot": 1, "meta": {"err": null, "fee": 5000}})).await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"signature": SIGNATURE})), &requirements())
            .await
            .unwrap();
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn errored_transaction_is_rejected() {
        let server = MockServer::start().await;
        mock_transaction(
            &server,
            json!({"slot": 1, "meta": {"err": {"InstructionError": [0, "Custom"]}}}),
        )
        .await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"signature": SIGNATURE})), &requirements())
            .await
            .unwrap();
        assert_eq!(result.invalid_reason(), Some(NOT_FOUND));
    }

    #[tokio::test]
    async fn unknown_signature_is_rejected() {
        let server = MockServer::start().await;
        mock_transaction(&server, serde_json::Value::Null).await;

        let result = verifier(&server)
            .verify(&payload_with(json!({"signature": SIGNATURE})), &requirements())
            .await
            .unwrap();
        assert_eq!(result.invalid_reason(), Some(NOT_FOUND));
    }

    #[tokio::test]
    async fn missing_or_malformed_signature_skips_the_node() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let verifier = verifier(&server);

        let missing = verifier
            .verify(&payload_with(json!({"amount": "250000"})), &requirements())
            .await
            .unwrap();
        assert_eq!(missing.invalid_reason(), Some(MISSING_SIGNATURE));

        let malformed = verifier
            .verify(&payload_with(json!({"signature": "not-base58!"})), &requirements())
            .await
            .unwrap();
        assert_eq!(malformed.invalid_reason(), Some(INVALID_SIGNATURE));
    }

    #[tokio::test]
    async fn rpc_error_object_is_a_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32004, "message": "Block not available for slot 1"},
            })))
            .mount(&server)
            .await;

        let err = verifier(&server)
            .verify(&payload_with(json!({"signature": SIGNATURE})), &requirements())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Rpc {
                context: GET_TRANSACTION,
                code: -32004,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unavailable_node_is_a_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = verifier(&server)
            .verify(&payload_with(json!({"signature": SIGNATURE})), &requirements())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::HttpStatus { status: 503, .. }));
    }
}
