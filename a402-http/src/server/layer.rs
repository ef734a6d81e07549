//! The tower [`Layer`] and [`Service`] wrapping protected routes.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use a402::PaymentVerifier;
use a402::requirements::{DEFAULT_MIME_TYPE, PriceTag};
use axum_core::extract::Request;
use axum_core::response::Response;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use url::Url;

use super::paygate::{Paygate, ResourceInfoBuilder};
use crate::facilitator::{FacilitatorClient, FacilitatorClientError};

/// The main X402 middleware instance for enforcing x402 payments on routes.
///
/// Create a single instance per application and use it to build payment layers
/// for protected routes.
#[derive(Clone, Debug)]
pub struct X402Middleware {
    verifier: PaymentVerifier,
    base_url: Option<Url>,
}

impl X402Middleware {
    /// Creates a middleware that verifies with `verifier`.
    #[must_use]
    pub const fn new(verifier: PaymentVerifier) -> Self {
        Self {
            verifier,
            base_url: None,
        }
    }

    /// Creates a middleware that delegates verification to the facilitator at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn try_new(url: &str) -> Result<Self, FacilitatorClientError> {
        let facilitator = FacilitatorClient::try_from(url)?;
        Ok(Self::new(PaymentVerifier::new().with_facilitator(facilitator)))
    }

    /// Returns the verifier used by every layer built from this instance.
    pub const fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    /// Sets the base URL used to construct resource URLs dynamically.
    ///
    /// If [`X402LayerBuilder::with_resource`] is not called, this base URL is combined with
    /// each request's path/query to compute the resource. If not set, the `Host` header is used.
    #[must_use]
    pub fn with_base_url(&self, base_url: Url) -> Self {
        let mut this = self.clone();
        this.base_url = Some(base_url);
        this
    }

    /// Sets the price tag for the protected route.
    ///
    /// Creates a layer builder that can be further configured with additional
    /// price tags and resource information.
    #[must_use]
    pub fn with_price_tag(&self, price_tag: PriceTag) -> X402LayerBuilder {
        X402LayerBuilder {
            verifier: self.verifier.clone(),
            base_url: self.base_url.clone().map(Arc::new),
            price_tags: Arc::new(vec![price_tag]),
            resource: Arc::new(ResourceInfoBuilder::default()),
        }
    }
}

impl TryFrom<&str> for X402Middleware {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

/// Builder for configuring the X402 middleware layer.
#[derive(Clone, Debug)]
pub struct X402LayerBuilder {
    verifier: PaymentVerifier,
    base_url: Option<Arc<Url>>,
    price_tags: Arc<Vec<PriceTag>>,
    resource: Arc<ResourceInfoBuilder>,
}

impl X402LayerBuilder {
    /// Adds another payment option.
    ///
    /// Allows specifying multiple accepted payment methods (e.g., different networks).
    #[must_use]
    pub fn with_price_tag(mut self, price_tag: PriceTag) -> Self {
        Arc::make_mut(&mut self.price_tags).push(price_tag);
        self
    }

    /// Sets a description of what the payment grants access to.
    ///
    /// This is included in 402 responses to inform clients what they're paying for.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.resource).description = description.into();
        self
    }

    /// Sets the MIME type of the protected resource.
    ///
    /// Defaults to `application/json` if not specified.
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.resource).mime_type = Some(mime.into());
        self
    }

    /// Sets the full URL of the protected resource.
    ///
    /// When set, this URL is used directly instead of constructing it from the base URL
    /// and request URI. This is the preferred approach in production.
    #[must_use]
    pub fn with_resource(mut self, resource: &Url) -> Self {
        Arc::make_mut(&mut self.resource).url = Some(resource.to_string());
        self
    }
}

impl<S> Layer<S> for X402LayerBuilder
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = X402MiddlewareService;

    fn layer(&self, inner: S) -> Self::Service {
        X402MiddlewareService {
            verifier: self.verifier.clone(),
            base_url: self.base_url.clone(),
            price_tags: Arc::clone(&self.price_tags),
            resource: Arc::clone(&self.resource),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Service that enforces x402 payments on incoming requests.
#[derive(Clone)]
#[allow(missing_debug_implementations)] // BoxCloneSyncService does not implement Debug
pub struct X402MiddlewareService {
    /// Payment verifier (facilitator or direct)
    verifier: PaymentVerifier,
    /// Base URL for constructing resource URLs
    base_url: Option<Arc<Url>>,
    /// Accepted price tags, in order of preference
    price_tags: Arc<Vec<PriceTag>>,
    /// Resource information
    resource: Arc<ResourceInfoBuilder>,
    /// The inner service being wrapped
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl Service<Request> for X402MiddlewareService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    /// Delegates readiness polling to the wrapped inner service.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    /// Intercepts the request, injects payment enforcement logic, and forwards to the wrapped service.
    fn call(&mut self, req: Request) -> Self::Future {
        let verifier = self.verifier.clone();
        let base_url = self.base_url.clone();
        let price_tags = Arc::clone(&self.price_tags);
        let resource = Arc::clone(&self.resource);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // No price tags configured: nothing to enforce
            if price_tags.is_empty() {
                return inner.call(req).await;
            }

            let url = resource.resolve_url(base_url.as_deref(), &req);
            let mime_type = resource.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE);
            let accepts = price_tags
                .iter()
                .map(|tag| tag.requirements(&url, Some(&resource.description), mime_type))
                .collect();

            Paygate { verifier, accepts }.handle_request(inner, req).await
        })
    }
}
