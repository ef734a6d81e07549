//! Core payment gate logic.
//!
//! [`Paygate`] runs one request through the x402 exchange: extract the header,
//! decode it, pick the matching requirement, verify, and either call the
//! protected service or answer with a challenge.

use std::convert::Infallible;

use a402::PaymentVerifier;
use a402::proto::VerifyResponse;
use a402::proto::v1::{PaymentPayload, PaymentRequired, PaymentRequirements};
use axum_core::extract::Request;
use axum_core::response::{IntoResponse, Response};
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::json;
use tower::Service;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::Instrument;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::context::VerificationContext;
use super::error::{PaygateError, VerificationError};
use crate::constants::X_PAYMENT_HEADER;
use crate::headers::decode_x_payment;

/// Description and MIME type of a protected resource, plus an optional fixed URL.
#[derive(Debug, Clone, Default)]
pub struct ResourceInfoBuilder {
    /// Description of the protected resource; empty means the default wording
    pub description: String,
    /// MIME type of the protected resource
    pub mime_type: Option<String>,
    /// Optional explicit URL of the protected resource
    pub url: Option<String>,
}

impl ResourceInfoBuilder {
    /// Determines the resource URL for `req`.
    ///
    /// An explicit `url` wins. Otherwise the request path and query are
    /// appended to the base URL (see [`resource_url`]), and without a base URL
    /// the `Host` header is used as the origin.
    pub fn resolve_url(&self, base_url: Option<&Url>, req: &Request) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let uri = req.uri();
        if let Some(base_url) = base_url {
            return resource_url(base_url, uri.path(), uri.query());
        }
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        #[cfg(feature = "telemetry")]
        tracing::warn!(
            host,
            "X402Middleware base_url is not configured; using the Host header as origin for resource resolution"
        );
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        format!("http://{host}{path_and_query}")
    }
}

/// Appends `path` to the path of `base`, keeping any prefix `base` carries.
///
/// `https://api.example.com/v1` and `https://api.example.com/v1/` both give
/// `https://api.example.com/v1/weather` for `/weather`.
#[must_use]
pub fn resource_url(base: &Url, path: &str, query: Option<&str>) -> String {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    url.set_path(&format!("{prefix}/{path}"));
    url.set_query(query);
    url.to_string()
}

/// Payment gate for one request.
#[derive(Debug, Clone)]
pub struct Paygate {
    /// Verifies the decoded payment
    pub verifier: PaymentVerifier,
    /// Accepted payment requirements, never empty
    pub accepts: Vec<PaymentRequirements>,
}

impl Paygate {
    /// Calls the inner service with proper telemetry instrumentation.
    async fn call_inner<S>(mut inner: S, req: Request) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        #[cfg(feature = "telemetry")]
        let result = inner
            .call(req)
            .instrument(tracing::info_span!("inner"))
            .await;
        #[cfg(not(feature = "telemetry"))]
        let result = inner.call(req).await;
        match result {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Handles an incoming request, processing payment if required.
    ///
    /// Rejections become their HTTP responses (see the module docs).
    ///
    /// # Errors
    ///
    /// This method is infallible (`Infallible` error type).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.handle_request", skip_all, fields(accepts = self.accepts.len()))
    )]
    pub async fn handle_request<S>(self, inner: S, req: Request) -> Result<Response, Infallible>
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        match self.handle_request_fallible(inner, req).await {
            Ok(response) => Ok(response),
            Err(err) => Ok(error_into_response(err, &self.accepts)),
        }
    }

    /// Handles an incoming request, returning rejections as [`PaygateError`].
    ///
    /// # Errors
    ///
    /// Returns [`PaygateError`] if the request is not admitted.
    pub async fn handle_request_fallible<S>(
        &self,
        inner: S,
        mut req: Request,
    ) -> Result<Response, PaygateError>
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        let header = extract_payment_header(req.headers())
            .ok_or(VerificationError::PaymentHeaderRequired(X_PAYMENT_HEADER))?;
        let payload = decode_x_payment(header).map_err(VerificationError::MalformedPayload)?;
        let selected = select_requirements(&payload, &self.accepts)?;

        let verdict = self.verifier.verify(&payload, selected).await?;
        if let VerifyResponse::Invalid { reason } = verdict {
            #[cfg(feature = "telemetry")]
            tracing::info!(%reason, "Payment rejected");
            return Err(VerificationError::VerificationFailed(reason).into());
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(scheme = %selected.scheme, network = %selected.network, "Payment verified");

        req.extensions_mut()
            .insert(VerificationContext::new(payload, selected));
        Ok(Self::call_inner(inner, req).await)
    }
}

/// Extracts the payment header value from the header map.
fn extract_payment_header(header_map: &HeaderMap) -> Option<&[u8]> {
    header_map.get(X_PAYMENT_HEADER).map(HeaderValue::as_bytes)
}

/// Finds the accepted requirement the payload answers.
fn select_requirements<'a>(
    payload: &PaymentPayload,
    accepts: &'a [PaymentRequirements],
) -> Result<&'a PaymentRequirements, VerificationError> {
    accepts
        .iter()
        .find(|requirements| payload.answers(requirements))
        .ok_or(VerificationError::NoPaymentMatching)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Converts a [`PaygateError`] into its HTTP response.
///
/// Protocol rejections become a `402` challenge listing `accepts`; a header
/// that does not decode is a `400` and internal faults a `500`, both with a
/// bare `{"error": ...}` body.
pub fn error_into_response(err: PaygateError, accepts: &[PaymentRequirements]) -> Response {
    let challenge = PaymentRequired::new(accepts.to_vec());
    match err {
        PaygateError::Verification(VerificationError::PaymentHeaderRequired(_)) => {
            json_response(StatusCode::PAYMENT_REQUIRED, &challenge)
        }
        PaygateError::Verification(err @ VerificationError::MalformedPayload(_)) => {
            json_response(StatusCode::BAD_REQUEST, &json!({"error": err.to_string()}))
        }
        PaygateError::Verification(err) => json_response(
            StatusCode::PAYMENT_REQUIRED,
            &challenge.with_error(err.to_string()),
        ),
        err @ PaygateError::Internal(_) => {
            #[cfg(feature = "telemetry")]
            tracing::error!(error = %err, "Payment processing failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({"error": err.to_string()}),
            )
        }
    }
}
