//! A [`a402::facilitator::Facilitator`] implementation that talks to a _remote_
//! x402 facilitator over HTTP.
//!
//! [`FacilitatorClient`] covers `POST /verify` and the discovery index
//! (`POST` and `GET /discovery/resources`). Endpoint URLs are resolved relative
//! to the base URL, so a facilitator mounted under a path prefix works as long
//! as the base URL carries that prefix.
//!
//! Every request carries a timeout. With the `telemetry` feature, each call
//! runs in its own span and records `otel.status_code` and `error.message`.

use std::fmt::Display;
use std::time::Duration;

use a402::error::BackendError;
use a402::facilitator::Facilitator;
use a402::proto::{DiscoveredResources, ResourceRegistration, VerifyRequest, VerifyResponse};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::{HeaderMap, StatusCode};
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Instrument, Span};

use crate::constants::{DISCOVERY_PATH, VERIFY_PATH};

/// A client for a remote x402 facilitator.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator (always ends with `/`)
    base_url: Url,
    /// Full URL of `POST /verify`
    verify_url: Url,
    /// Full URL of the discovery index
    discovery_url: Url,
    client: Client,
    /// Custom headers sent with each request
    headers: HeaderMap,
    timeout: Duration,
}

/// Errors that can occur while talking to a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl FacilitatorClientError {
    /// Folds this error into the backend taxonomy used by the dispatcher.
    ///
    /// `timeout` is the bound the request ran under, reported if it expired.
    #[must_use]
    pub fn into_backend_error(self, timeout: Duration) -> BackendError {
        match self {
            Self::Http { context, source } | Self::ResponseBodyRead { context, source } => {
                if source.is_timeout() {
                    BackendError::Timeout { context, timeout }
                } else {
                    BackendError::Transport {
                        context,
                        source: source.into(),
                    }
                }
            }
            Self::JsonDeserialization { context, source } => BackendError::Decode {
                context,
                source: source.into(),
            },
            Self::HttpStatus {
                context,
                status,
                body,
            } => BackendError::HttpStatus {
                context,
                status: status.as_u16(),
                body,
            },
            Self::UrlParse { context, source } => BackendError::Transport {
                context,
                source: source.into(),
            },
        }
    }
}

impl FacilitatorClient {
    /// Per-request timeout used unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Returns the base URL used by this client.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./verify` URL relative to [`FacilitatorClient::base_url`].
    pub const fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Returns the computed `./discovery/resources` URL relative to [`FacilitatorClient::base_url`].
    pub const fn discovery_url(&self) -> &Url {
        &self.discovery_url
    }

    /// Returns any custom headers configured on the client.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the per-request timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Constructs a new [`FacilitatorClient`] from a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if URL construction fails.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let verify_url =
            base_url
                .join(VERIFY_PATH)
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./verify URL",
                    source: e,
                })?;
        let discovery_url =
            base_url
                .join(DISCOVERY_PATH)
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./discovery/resources URL",
                    source: e,
                })?;
        Ok(Self {
            client: Client::new(),
            base_url,
            verify_url,
            discovery_url,
            headers: HeaderMap::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Attaches custom headers to all future requests.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reuses an existing `reqwest` client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sends a `POST /verify` request.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport failure, a non-2xx
    /// status or an undecodable body.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        let context = "POST /verify";
        let result = self
            .send(self.client.post(self.verify_url.clone()).json(request), context)
            .await;
        let result = match result {
            Ok(response) => read_json(response, context).await,
            Err(err) => Err(err),
        };
        record_result_on_span(&result);
        result
    }

    /// Announces a paid resource to the facilitator's discovery index.
    ///
    /// The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport failure or a non-2xx status.
    pub async fn register_resource(
        &self,
        registration: &ResourceRegistration,
    ) -> Result<(), FacilitatorClientError> {
        let context = "POST /discovery/resources";
        let call = async move {
            let result = self
                .send(
                    self.client.post(self.discovery_url.clone()).json(registration),
                    context,
                )
                .await
                .map(drop);
            record_result_on_span(&result);
            result
        };
        #[cfg(feature = "telemetry")]
        let call = with_span(
            call,
            tracing::info_span!(
                "x402.facilitator_client.register_resource",
                resource = %registration.endpoint,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            ),
        );
        call.await
    }

    /// Lists the resources in the facilitator's discovery index.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport failure, a non-2xx
    /// status or an undecodable body.
    pub async fn list_resources(&self) -> Result<DiscoveredResources, FacilitatorClientError> {
        let context = "GET /discovery/resources";
        let call = async move {
            let result = match self
                .send(self.client.get(self.discovery_url.clone()), context)
                .await
            {
                Ok(response) => read_json(response, context).await,
                Err(err) => Err(err),
            };
            record_result_on_span(&result);
            result
        };
        #[cfg(feature = "telemetry")]
        let call = with_span(
            call,
            tracing::info_span!(
                "x402.facilitator_client.list_resources",
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            ),
        );
        call.await
    }

    /// Applies headers and timeout, sends, and rejects non-2xx statuses.
    ///
    /// `context` is a human-readable identifier used in tracing and error
    /// messages (e.g. `"POST /verify"`).
    async fn send(
        &self,
        mut req: RequestBuilder,
        context: &'static str,
    ) -> Result<Response, FacilitatorClientError> {
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }
        let response = req
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
        Err(FacilitatorClientError::HttpStatus {
            context,
            status,
            body,
        })
    }
}

async fn read_json<R>(
    response: Response,
    context: &'static str,
) -> Result<R, FacilitatorClientError>
where
    R: serde::de::DeserializeOwned,
{
    response
        .json::<R>()
        .await
        .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
}

impl Facilitator for FacilitatorClient {
    fn verify<'a>(
        &'a self,
        request: &'a VerifyRequest,
    ) -> BoxFuture<'a, Result<VerifyResponse, BackendError>> {
        let call = async move {
            Self::verify(self, request)
                .await
                .map_err(|e| e.into_backend_error(self.timeout))
        };
        #[cfg(feature = "telemetry")]
        let call = with_span(
            call,
            tracing::info_span!(
                "x402.facilitator_client.verify",
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            ),
        );
        call.boxed()
    }
}

/// Converts a string URL into a `FacilitatorClient`.
///
/// Trailing slashes are normalized to exactly one so that endpoint paths
/// resolve under the base path.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

/// Converts a String URL into a `FacilitatorClient`.
impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to facilitator failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

/// Instruments a future with a given tracing span.
#[cfg(feature = "telemetry")]
fn with_span<F: Future>(fut: F, span: Span) -> impl Future<Output = F::Output> {
    fut.instrument(span)
}

#[cfg(test)]
mod tests {
    use a402::networks::Network;
    use a402::proto::v1::{PaymentPayload, RawProof};
    use a402::requirements::build;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn verify_request() -> VerifyRequest {
        let requirements = build(
            "https://api.example.com/weather",
            "0.05",
            Network::Base,
            "0x1111111111111111111111111111111111111111",
            None,
        )
        .unwrap();
        let proof: RawProof = serde_json::from_value(json!({"transactionHash": "0xabc"})).unwrap();
        let payload = PaymentPayload::new(&requirements, proof);
        VerifyRequest::new(&payload, requirements).unwrap()
    }

    fn client(server: &MockServer) -> FacilitatorClient {
        FacilitatorClient::try_from(server.uri()).unwrap()
    }

    #[test]
    fn endpoints_resolve_under_base_path() {
        let client = FacilitatorClient::try_from("https://facilitator.example/x402//").unwrap();
        assert_eq!(client.base_url().as_str(), "https://facilitator.example/x402/");
        assert_eq!(
            client.verify_url().as_str(),
            "https://facilitator.example/x402/verify"
        );
        assert_eq!(
            client.discovery_url().as_str(),
            "https://facilitator.example/x402/discovery/resources"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = FacilitatorClient::try_from("not a url").unwrap_err();
        assert!(matches!(err, FacilitatorClientError::UrlParse { .. }));
    }

    #[tokio::test]
    async fn verify_posts_header_and_requirements() {
        let server = MockServer::start().await;
        let request = verify_request();
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(json!({
                "x402Version": 1,
                "paymentHeader": request.payment_header,
                "paymentRequirements": {"network": "base", "maxAmountRequired": "50000"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"isValid": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).verify(&request).await.unwrap();
        assert!(response.is_valid());
    }

    #[tokio::test]
    async fn verify_passes_rejections_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": false,
                "invalidReason": "insufficient_funds",
            })))
            .mount(&server)
            .await;

        let response = client(&server).verify(&verify_request()).await.unwrap();
        assert_eq!(response.invalid_reason(), Some("insufficient_funds"));
    }

    #[tokio::test]
    async fn server_error_maps_to_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server);
        let request = verify_request();
        let err = Facilitator::verify(&client, &request).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::HttpStatus {
                context: "POST /verify",
                status: 500,
                ..
            }
        ));
    }

    fn registration() -> ResourceRegistration {
        ResourceRegistration {
            name: "weather".to_owned(),
            endpoint: "https://api.example.com/weather".to_owned(),
            merchant_address: "0x1111111111111111111111111111111111111111".to_owned(),
            network: Network::Base,
            price: "0.05".to_owned(),
            category: "data".to_owned(),
        }
    }

    #[tokio::test]
    async fn discovery_round_trip() {
        let server = MockServer::start().await;
        let registration = registration();
        Mock::given(method("POST"))
            .and(path("/discovery/resources"))
            .and(body_partial_json(
                json!({"name": "weather", "merchantAddress": registration.merchant_address}),
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/discovery/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [serde_json::to_value(&registration).unwrap()],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client.register_resource(&registration).await.unwrap();
        let listed = client.list_resources().await.unwrap();
        assert_eq!(listed.items, vec![registration]);
    }

    #[cfg(feature = "telemetry")]
    mod spans {
        use std::fmt;
        use std::sync::{Arc, Mutex};

        use tracing::Subscriber;
        use tracing::field::{Field, Visit};
        use tracing::span::{Id, Record};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
        use tracing_subscriber::registry::LookupSpan;

        use super::*;

        /// Collects `span:field` for every value recorded on an open span.
        #[derive(Clone, Default)]
        struct Recorded(Arc<Mutex<Vec<String>>>);

        struct FieldNames<'a> {
            span: &'static str,
            seen: &'a mut Vec<String>,
        }

        impl Visit for FieldNames<'_> {
            fn record_debug(&mut self, field: &Field, _value: &dyn fmt::Debug) {
                self.seen.push(format!("{}:{}", self.span, field.name()));
            }
        }

        impl<S> Layer<S> for Recorded
        where
            S: Subscriber + for<'a> LookupSpan<'a>,
        {
            fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
                let Some(span) = ctx.span(id) else {
                    return;
                };
                let mut seen = self.0.lock().unwrap();
                values.record(&mut FieldNames {
                    span: span.name(),
                    seen: &mut *seen,
                });
            }
        }

        #[tokio::test(flavor = "current_thread")]
        async fn discovery_calls_record_their_outcome() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
                .mount(&server)
                .await;

            let recorded = Recorded::default();
            let subscriber = tracing_subscriber::registry().with(recorded.clone());
            let _guard = tracing::subscriber::set_default(subscriber);

            let client = client(&server);
            client.register_resource(&registration()).await.unwrap_err();
            client.list_resources().await.unwrap();

            let seen = recorded.0.lock().unwrap().clone();
            for expected in [
                "x402.facilitator_client.register_resource:otel.status_code",
                "x402.facilitator_client.register_resource:error.message",
                "x402.facilitator_client.list_resources:otel.status_code",
            ] {
                assert!(seen.iter().any(|s| s == expected), "{expected} not in {seen:?}");
            }
        }
    }
}
