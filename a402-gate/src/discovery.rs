//! Announces the gateway's paid routes to a facilitator's discovery index.

use a402::proto::ResourceRegistration;
use a402_http::facilitator::FacilitatorClient;

use crate::config::GateConfig;

/// The registration for every configured route.
#[must_use]
pub fn registrations(config: &GateConfig) -> Vec<ResourceRegistration> {
    let prefix = config.discovery.name_prefix.as_deref().unwrap_or_default();
    config
        .routes
        .iter()
        .map(|route| ResourceRegistration {
            name: format!("{prefix}{}", route.path),
            endpoint: config.endpoint_for(&route.path),
            merchant_address: route.pay_to.clone(),
            network: route.network,
            price: route.price.clone(),
            category: config.discovery.category.clone(),
        })
        .collect()
}

/// Registers every route with `facilitator` and returns how many succeeded.
///
/// Failures are logged and skipped; the gateway serves routes either way.
pub async fn register_routes(config: &GateConfig, facilitator: &FacilitatorClient) -> usize {
    let mut registered = 0;
    for registration in registrations(config) {
        match facilitator.register_resource(&registration).await {
            Ok(()) => {
                tracing::info!(endpoint = %registration.endpoint, "Registered with discovery");
                registered += 1;
            }
            Err(e) => tracing::warn!(
                endpoint = %registration.endpoint,
                error = %e,
                "Discovery registration failed"
            ),
        }
    }
    registered
}
