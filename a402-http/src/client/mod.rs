//! Reqwest middleware that pays for `402 Payment Required` responses.
//!
//! [`X402Client`] sits in a `reqwest-middleware` stack. A response that is not
//! a 402 goes back to the caller untouched. On a 402 the middleware reads the
//! challenge body and pays the first accepted requirement with the prover
//! registered for its scheme. It then resends the request once with the
//! `X-PAYMENT` header and returns that second response whatever its status.
//!
//! ```ignore
//! use a402_evm::Eip712Payer;
//! use a402_http::client::{ReqwestWithPayments, ReqwestWithPaymentsBuild, X402Client};
//!
//! let payer = Eip712Payer::new(|transfer| async move { send_usdc(transfer).await });
//! let client = reqwest::Client::new()
//!     .with_payments(X402Client::new().register(payer))
//!     .build();
//! let weather = client.get("https://api.example.com/weather").send().await?;
//! ```

mod middleware;

pub use middleware::*;

use reqwest::{Client, ClientBuilder};
use reqwest_middleware as rqm;

/// Adds x402 payment handling to reqwest clients.
///
/// Implemented on [`Client`] and [`ClientBuilder`].
pub trait ReqwestWithPayments<A> {
    /// Wraps the client or builder with `x402_client`.
    fn with_payments(self, x402_client: X402Client) -> ReqwestWithPaymentsBuilder<A>;
}

impl ReqwestWithPayments<Self> for Client {
    fn with_payments(self, x402_client: X402Client) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            x402_client,
        }
    }
}

impl ReqwestWithPayments<Self> for ClientBuilder {
    fn with_payments(self, x402_client: X402Client) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            x402_client,
        }
    }
}

/// A reqwest client or builder paired with the payment middleware.
#[allow(missing_debug_implementations)] // generic A may not implement Debug
pub struct ReqwestWithPaymentsBuilder<A> {
    inner: A,
    x402_client: X402Client,
}

/// Builds the final client from a [`ReqwestWithPaymentsBuilder`].
pub trait ReqwestWithPaymentsBuild {
    /// The type returned by [`build`](Self::build).
    type BuildResult;
    /// The type returned by [`builder`](Self::builder).
    type BuilderResult;

    /// Builds the client, consuming the builder.
    fn build(self) -> Self::BuildResult;

    /// Returns the middleware client builder, for stacking further middleware.
    fn builder(self) -> Self::BuilderResult;
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<Client> {
    type BuildResult = rqm::ClientWithMiddleware;
    type BuilderResult = rqm::ClientBuilder;

    fn build(self) -> Self::BuildResult {
        self.builder().build()
    }

    fn builder(self) -> Self::BuilderResult {
        rqm::ClientBuilder::new(self.inner).with(self.x402_client)
    }
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<ClientBuilder> {
    type BuildResult = Result<rqm::ClientWithMiddleware, reqwest::Error>;
    type BuilderResult = Result<rqm::ClientBuilder, reqwest::Error>;

    fn build(self) -> Self::BuildResult {
        Ok(self.builder()?.build())
    }

    fn builder(self) -> Self::BuilderResult {
        let client = self.inner.build()?;
        Ok(rqm::ClientBuilder::new(client).with(self.x402_client))
    }
}
