//! Client-side proof construction for the `x402+solana` scheme.
//!
//! A [`SolanaPayer`] wraps an async function that sends the USDC described by
//! a [`SolanaTransfer`] and resolves to the transaction signature.

use std::future::Future;
use std::str::FromStr;

use a402::error::{BoxError, ProveError};
use a402::proto::v1::{PaymentRequirements, RawProof};
use a402::scheme::{PaymentProver, Scheme};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use solana_pubkey::Pubkey;
use solana_signature::Signature;

use crate::networks::{USDC_CURRENCY, usdc_mint};

/// A USDC transfer the payer must make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolanaTransfer {
    /// Token mint.
    pub mint: Pubkey,
    /// Recipient wallet.
    pub pay_to: Pubkey,
    /// Amount in minor units.
    pub amount: u64,
}

/// Pays `x402+solana` requirements with a caller-supplied transfer function.
pub struct SolanaPayer<F> {
    transfer: F,
}

impl<F> std::fmt::Debug for SolanaPayer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaPayer").finish_non_exhaustive()
    }
}

impl<F, Fut> SolanaPayer<F>
where
    F: Fn(SolanaTransfer) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Signature, BoxError>> + Send,
{
    /// Wraps `transfer`, which sends the funds and resolves to the signature.
    pub const fn new(transfer: F) -> Self {
        Self { transfer }
    }
}

fn transfer_for(requirements: &PaymentRequirements) -> Result<SolanaTransfer, ProveError> {
    let network = requirements.network;
    let mint = usdc_mint(network).ok_or(ProveError::UnsupportedNetwork {
        scheme: Scheme::Solana,
        network,
    })?;
    let pay_to =
        Pubkey::from_str(&requirements.pay_to).map_err(|_| ProveError::InvalidRequirement {
            field: "payTo",
            value: requirements.pay_to.clone(),
        })?;
    Ok(SolanaTransfer {
        mint,
        pay_to,
        amount: requirements.max_amount_required.inner(),
    })
}

impl<F, Fut> PaymentProver for SolanaPayer<F>
where
    F: Fn(SolanaTransfer) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Signature, BoxError>> + Send,
{
    fn scheme(&self) -> Scheme {
        Scheme::Solana
    }

    fn prove<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<RawProof, ProveError>> {
        async move {
            let transfer = transfer_for(requirements)?;
            let signature = (self.transfer)(transfer)
                .await
                .map_err(ProveError::Transfer)?;

            let mut proof = RawProof::new();
            proof.insert("signature".into(), Value::String(signature.to_string()));
            proof.insert(
                "amount".into(),
                Value::String(requirements.max_amount_required.to_string()),
            );
            proof.insert("currency".into(), USDC_CURRENCY.into());
            proof.insert("payTo".into(), Value::String(requirements.pay_to.clone()));
            Ok(proof)
        }
        .boxed()
    }
}
