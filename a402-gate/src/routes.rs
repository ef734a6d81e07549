//! Verifier selection and the gateway router.

use std::sync::Arc;

use a402::PaymentVerifier;
use a402::networks::Network;
use a402::requirements::{DEFAULT_TIMEOUT_SECONDS, PriceTag};
use a402_evm::Eip712Verifier;
use a402_http::facilitator::FacilitatorClient;
use a402_http::server::{VerificationContext, X402Middleware};
use a402_svm::SolanaVerifier;
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors;
use url::Url;

use crate::config::{GateConfig, RouteConfig};
use crate::error::GateError;

/// The facilitator client for `config`, if one is configured.
///
/// # Errors
///
/// Returns [`GateError::Facilitator`] if the URL is invalid.
pub fn facilitator_client(config: &GateConfig) -> Result<Option<FacilitatorClient>, GateError> {
    let Some(url) = config.facilitator_url() else {
        return Ok(None);
    };
    let client = FacilitatorClient::try_from(url)?.with_timeout(config.verify_timeout());
    Ok(Some(client))
}

/// Builds the verifier: the facilitator when configured, otherwise direct
/// chain verification for every supported network.
///
/// # Errors
///
/// Returns an error if the facilitator or an RPC URL is invalid.
pub fn build_verifier(config: &GateConfig) -> Result<PaymentVerifier, GateError> {
    let timeout = config.verify_timeout();
    if let Some(facilitator) = facilitator_client(config)? {
        tracing::info!(url = %facilitator.base_url(), "Delegating verification to facilitator");
        return Ok(PaymentVerifier::new()
            .with_facilitator(facilitator)
            .with_timeout(timeout));
    }

    let rpc_url = |network: Network| -> Result<Url, GateError> {
        let url = config.rpc.url_for(network)?;
        tracing::info!(%network, rpc = %url, "Verifying directly on chain");
        Ok(url)
    };
    let eip712 = Eip712Verifier::connect(rpc_url(Network::Base)?).with_timeout(timeout);
    let solana = SolanaVerifier::connect(&rpc_url(Network::SolanaMainnet)?).with_timeout(timeout);
    Ok(PaymentVerifier::new()
        .with_verifier(eip712)
        .with_verifier(solana)
        .with_timeout(timeout))
}

/// Builds the gateway router: `/health` plus one paid route per entry in `config.routes`.
///
/// # Errors
///
/// Returns an error if the verifier cannot be built or a route price is invalid.
pub fn router(config: &GateConfig) -> Result<Router, GateError> {
    let mut middleware = X402Middleware::new(build_verifier(config)?);
    if let Some(public_url) = &config.public_url {
        middleware = middleware.with_base_url(public_url.clone());
    }

    let mut app = Router::new().route("/health", get(health));
    for route in &config.routes {
        app = paid_route(app, &middleware, route)?;
    }

    Ok(app.layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any),
    ))
}

fn paid_route(
    app: Router,
    middleware: &X402Middleware,
    route: &RouteConfig,
) -> Result<Router, GateError> {
    let tag = PriceTag::new(route.network, route.pay_to.clone(), &route.price)
        .map_err(|source| GateError::InvalidPrice {
            path: route.path.clone(),
            source,
        })?
        .with_timeout(route.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

    let mut layer = middleware.with_price_tag(tag);
    if let Some(description) = &route.description {
        layer = layer.with_description(description.clone());
    }
    if let Some(mime_type) = &route.mime_type {
        layer = layer.with_mime_type(mime_type.clone());
    }

    tracing::info!(
        path = %route.path,
        price = %route.price,
        network = %route.network,
        "Registered paid route"
    );

    let content = Arc::new(route.content.clone());
    let handler = move |payment: VerificationContext| {
        let content = Arc::clone(&content);
        async move { paid_content(&content, &payment) }
    };
    Ok(app.route(&route.path, get(handler).layer(layer)))
}

fn paid_content(content: &Value, payment: &VerificationContext) -> Json<Value> {
    Json(json!({
        "data": content,
        "payment": {
            "scheme": payment.scheme,
            "network": payment.network,
            "transaction": payment.transaction,
        },
    }))
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
