//! The payment middleware and its error type.

use std::fmt;
use std::sync::Arc;

use a402::error::ProveError;
use a402::proto::v1::{PaymentPayload, PaymentRequirements, X402Version1};
use a402::scheme::{PaymentProver, Scheme};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;
use serde::Deserialize;
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, trace};

use crate::error::HttpError;
use crate::headers::encode_x_payment;

/// Why the middleware could not pay for a 402 response.
///
/// Every variant ends the flow: the request is not retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The 402 body is not a payment challenge.
    #[error("Failed to parse payment requirements: {0}")]
    ParseError(String),
    /// The challenge lists no requirement this crate understands.
    #[error("No payment requirements in 402 response")]
    NoPaymentRequirements,
    /// No prover is registered for the requested scheme.
    #[error("No payment option for scheme {scheme}")]
    NoMatchingPaymentOption {
        /// The scheme of the first accepted requirement.
        scheme: Scheme,
    },
    /// The prover could not pay.
    #[error(transparent)]
    Prove(#[from] ProveError),
    /// The payment payload could not be encoded.
    #[error("Failed to encode payment header: {0}")]
    Encode(#[from] HttpError),
    /// The encoded payload is not a valid header value.
    #[error("Payment header is not a valid HTTP header value")]
    InvalidHeader,
    /// The request body is a stream and cannot be sent twice.
    #[error("Request body cannot be cloned for the paid retry")]
    RequestNotCloneable,
}

/// Registered provers, at most one per scheme.
#[derive(Default, Clone)]
struct ClientProvers(Vec<Arc<dyn PaymentProver>>);

impl ClientProvers {
    fn insert(&mut self, prover: Arc<dyn PaymentProver>) {
        let scheme = prover.scheme();
        self.0.retain(|existing| existing.scheme() != scheme);
        self.0.push(prover);
    }

    fn find(&self, scheme: Scheme) -> Option<&dyn PaymentProver> {
        self.0
            .iter()
            .find(|prover| prover.scheme() == scheme)
            .map(AsRef::as_ref)
    }
}

/// Pays 402 challenges with registered [`PaymentProver`]s and retries once.
#[derive(Default, Clone)]
pub struct X402Client {
    provers: ClientProvers,
}

impl fmt::Debug for X402Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<Scheme> = self.provers.0.iter().map(|p| p.scheme()).collect();
        f.debug_struct("X402Client")
            .field("schemes", &schemes)
            .finish()
    }
}

impl X402Client {
    /// A client with no provers; every challenge fails until one is registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `prover` for its scheme, replacing any earlier one.
    #[must_use]
    pub fn register<P>(mut self, prover: P) -> Self
    where
        P: PaymentProver + 'static,
    {
        self.provers.insert(Arc::new(prover));
        self
    }

    /// Pays the challenge in `res` and returns the headers for the retry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the challenge cannot be read, lists nothing
    /// payable, has no matching prover, or the payment itself fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.reqwest.make_payment_headers", skip_all, err)
    )]
    pub async fn make_payment_headers(&self, res: Response) -> Result<HeaderMap, ClientError> {
        let requirements = &first_requirement(res).await?;
        let prover = self.provers.find(requirements.scheme).ok_or(
            ClientError::NoMatchingPaymentOption {
                scheme: requirements.scheme,
            },
        )?;

        #[cfg(feature = "telemetry")]
        debug!(
            scheme = %requirements.scheme,
            network = %requirements.network,
            amount = %requirements.max_amount_required,
            "Paying first accepted requirement"
        );

        let proof = prover.prove(requirements).await?;
        let header = encode_x_payment(&PaymentPayload::new(requirements, proof))?;
        let value = HeaderValue::from_str(&header).map_err(|_| ClientError::InvalidHeader)?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-payment"), value);
        Ok(headers)
    }
}

#[cfg_attr(
    feature = "telemetry",
    instrument(name = "x402.reqwest.next", skip_all)
)]
async fn run_next(
    next: rqm::Next<'_>,
    req: Request,
    extensions: &mut Extensions,
) -> rqm::Result<Response> {
    next.run(req, extensions).await
}

#[async_trait::async_trait]
impl rqm::Middleware for X402Client {
    /// Sends the request; on a 402, pays and sends it exactly once more.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.reqwest.handle", skip_all, err)
    )]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone();
        let res = run_next(next.clone(), req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?res.status(), "No payment required, returning response");
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        info!(url = %res.url(), "Received 402 Payment Required, paying");

        let mut retry = retry_req
            .ok_or_else(|| rqm::Error::Middleware(ClientError::RequestNotCloneable.into()))?;
        let headers = self
            .make_payment_headers(res)
            .await
            .map_err(|e| rqm::Error::Middleware(e.into()))?;
        retry.headers_mut().extend(headers);

        run_next(next, retry, extensions).await
    }
}

/// A 402 body as the client reads it; `accepts` entries stay raw until one is chosen.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Challenge {
    #[serde(rename = "x402Version")]
    _version: X402Version1,
    #[serde(default)]
    accepts: Vec<serde_json::Value>,
}

/// Reads a 402 response body and returns its first accepted requirement.
///
/// Only the first entry is considered. If it names a scheme or network this
/// crate does not know, the challenge is refused rather than paying a later
/// entry.
///
/// # Errors
///
/// Returns [`ClientError::ParseError`] if the body is not a version 1
/// challenge or its first entry does not parse, and
/// [`ClientError::NoPaymentRequirements`] if `accepts` is empty.
pub async fn first_requirement(response: Response) -> Result<PaymentRequirements, ClientError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::ParseError(e.to_string()))?;
    let challenge: Challenge =
        serde_json::from_slice(&bytes).map_err(|e| ClientError::ParseError(e.to_string()))?;
    let first = challenge
        .accepts
        .into_iter()
        .next()
        .ok_or(ClientError::NoPaymentRequirements)?;
    serde_json::from_value(first)
        .map_err(|e| ClientError::ParseError(format!("first accepted requirement: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use a402::networks::Network;
    use a402::proto::Base64Bytes;
    use a402::proto::v1::{PaymentRequirements, RawProof};
    use a402::requirements::build;
    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;
    use serde_json::{Value, json};
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::{ReqwestWithPayments, ReqwestWithPaymentsBuild};

    const MERCHANT: &str = "0x1111111111111111111111111111111111111111";

    struct StubProver {
        calls: Arc<AtomicUsize>,
    }

    impl PaymentProver for StubProver {
        fn scheme(&self) -> Scheme {
            Scheme::Eip712
        }

        fn prove<'a>(
            &'a self,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<RawProof, ProveError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let proof = json!({
                "transactionHash": "0xfeed",
                "amount": requirements.max_amount_required.to_string(),
            });
            async move { Ok(serde_json::from_value(proof).unwrap()) }.boxed()
        }
    }

    fn challenge(network: Network) -> Value {
        let requirements = build(
            "https://api.example.com/weather",
            "0.05",
            network,
            MERCHANT,
            None,
        )
        .unwrap();
        json!({"x402Version": 1, "accepts": [requirements]})
    }

    fn paying_client() -> (rqm::ClientWithMiddleware, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let x402 = X402Client::new().register(StubProver {
            calls: Arc::clone(&calls),
        });
        (reqwest::Client::new().with_payments(x402).build(), calls)
    }

    fn middleware_error(err: &rqm::Error) -> &ClientError {
        match err {
            rqm::Error::Middleware(inner) => inner.downcast_ref::<ClientError>().unwrap(),
            rqm::Error::Reqwest(e) => panic!("unexpected transport error: {e}"),
        }
    }

    #[tokio::test]
    async fn non_402_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let (client, calls) = paying_client();
        let res = client.get(format!("{}/free", server.uri())).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pays_and_retries_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(header_exists("X-PAYMENT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 21})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge(Network::Base)))
            .expect(1)
            .mount(&server)
            .await;

        let (client, calls) = paying_client();
        let res = client
            .get(format!("{}/weather", server.uri()))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let requests = server.received_requests().await.unwrap();
        let header = requests[1].headers.get("x-payment").unwrap();
        let decoded = Base64Bytes::from(header.as_bytes()).decode().unwrap();
        let payload: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(payload["scheme"], "x402+eip712");
        assert_eq!(payload["network"], "base");
        assert_eq!(payload["payload"]["transactionHash"], "0xfeed");
        assert_eq!(payload["payload"]["amount"], "50000");
    }

    #[tokio::test]
    async fn second_402_is_returned_without_another_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge(Network::Base)))
            .expect(2)
            .mount(&server)
            .await;

        let (client, calls) = paying_client();
        let res = client
            .get(format!("{}/weather", server.uri()))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_accepts_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(json!({"x402Version": 1, "accepts": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = paying_client();
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(matches!(
            middleware_error(&err),
            ClientError::NoPaymentRequirements
        ));
    }

    #[tokio::test]
    async fn unregistered_scheme_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(challenge(Network::SolanaMainnet)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, calls) = paying_client();
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(matches!(
            middleware_error(&err),
            ClientError::NoMatchingPaymentOption {
                scheme: Scheme::Solana
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_first_requirement_is_not_skipped() {
        let mut body = challenge(Network::Base);
        let unknown = json!({
            "scheme": "exact",
            "network": "base-sepolia",
            "maxAmountRequired": "1",
        });
        body["accepts"].as_array_mut().unwrap().insert(0, unknown);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let (client, calls) = paying_client();
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(matches!(middleware_error(&err), ClientError::ParseError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_challenge_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402).set_body_string("pay up"))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = paying_client();
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(matches!(middleware_error(&err), ClientError::ParseError(_)));
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let client = X402Client::new()
            .register(StubProver { calls: first })
            .register(StubProver { calls: second });
        assert_eq!(client.provers.0.len(), 1);
        assert_eq!(format!("{client:?}"), "X402Client { schemes: [Eip712] }");
    }
}
