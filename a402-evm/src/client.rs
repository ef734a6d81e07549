//! Client-side proof construction for the `x402+eip712` scheme.
//!
//! Moving funds is the caller's business: an [`Eip712Payer`] wraps an async
//! function that performs the USDC transfer described by an [`EvmTransfer`] and
//! returns its transaction hash. The payer turns that hash into the proof
//! object the merchant expects.

use std::future::Future;
use std::str::FromStr;

use a402::error::{BoxError, ProveError};
use a402::proto::v1::{PaymentRequirements, RawProof};
use a402::scheme::{PaymentProver, Scheme};
use alloy_primitives::{Address, TxHash, U256};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::networks::{USDC_CURRENCY, evm_chain_id};

/// A USDC transfer the payer must make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmTransfer {
    /// Numeric chain id.
    pub chain_id: u64,
    /// Token contract.
    pub asset: Address,
    /// Recipient.
    pub pay_to: Address,
    /// Amount in minor units.
    pub amount: U256,
}

/// Pays `x402+eip712` requirements with a caller-supplied transfer function.
pub struct Eip712Payer<F> {
    transfer: F,
}

impl<F> std::fmt::Debug for Eip712Payer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eip712Payer").finish_non_exhaustive()
    }
}

impl<F, Fut> Eip712Payer<F>
where
    F: Fn(EvmTransfer) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TxHash, BoxError>> + Send,
{
    /// Wraps `transfer`, which sends the funds and resolves to the transaction hash.
    pub const fn new(transfer: F) -> Self {
        Self { transfer }
    }

    fn transfer_for(requirements: &PaymentRequirements) -> Result<EvmTransfer, ProveError> {
        let network = requirements.network;
        let chain_id = evm_chain_id(network).ok_or(ProveError::UnsupportedNetwork {
            scheme: Scheme::Eip712,
            network,
        })?;
        let asset = parse_address("asset", &requirements.asset)?;
        let pay_to = parse_address("payTo", &requirements.pay_to)?;
        Ok(EvmTransfer {
            chain_id,
            asset,
            pay_to,
            amount: U256::from(requirements.max_amount_required.inner()),
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ProveError> {
    Address::from_str(value).map_err(|_| ProveError::InvalidRequirement {
        field,
        value: value.to_owned(),
    })
}

impl<F, Fut> PaymentProver for Eip712Payer<F>
where
    F: Fn(EvmTransfer) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TxHash, BoxError>> + Send,
{
    fn scheme(&self) -> Scheme {
        Scheme::Eip712
    }

    fn prove<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<RawProof, ProveError>> {
        async move {
            let transfer = Self::transfer_for(requirements)?;
            let hash = (self.transfer)(transfer)
                .await
                .map_err(ProveError::Transfer)?;

            let mut proof = RawProof::new();
            proof.insert("transactionHash".into(), Value::String(hash.to_string()));
            proof.insert(
                "amount".into(),
                Value::String(requirements.max_amount_required.to_string()),
            );
            proof.insert("currency".into(), USDC_CURRENCY.into());
            proof.insert("payTo".into(), Value::String(requirements.pay_to.clone()));
            proof.insert("chainId".into(), transfer.chain_id.into());
            Ok(proof)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use a402::networks::Network;
    use a402::requirements::build;
    use alloy_primitives::b256;
    use serde_json::json;

    use super::*;
    use crate::networks::{BASE_CHAIN_ID, USDC_BASE};

    const MERCHANT: &str = "0x1111111111111111111111111111111111111111";
    const HASH: TxHash = b256!("5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060");

    #[tokio::test]
    async fn proof_carries_hash_and_terms() {
        let payer = Eip712Payer::new(|transfer: EvmTransfer| async move {
            assert_eq!(transfer.chain_id, BASE_CHAIN_ID);
            assert_eq!(transfer.asset, USDC_BASE);
            assert_eq!(transfer.amount, U256::from(50_000));
            Ok(HASH)
        });
        let requirements = build("https://x/y", "0.05", Network::Base, MERCHANT, None).unwrap();

        let proof = payer.prove(&requirements).await.unwrap();
        assert_eq!(
            Value::Object(proof),
            json!({
                "transactionHash": HASH.to_string(),
                "amount": "50000",
                "currency": "USDC",
                "payTo": MERCHANT,
                "chainId": 8453,
            })
        );
    }

    #[tokio::test]
    async fn refuses_non_evm_networks() {
        let payer = Eip712Payer::new(|_: EvmTransfer| async { Ok(HASH) });
        let requirements = build(
            "https://x/y",
            "1",
            Network::SolanaMainnet,
            "GLrMcCztDV4Bu4TdN3NFiQmcVGHUh6LMGwkwbwLXm48N",
            None,
        )
        .unwrap();

        let err = payer.prove(&requirements).await.unwrap_err();
        assert!(matches!(err, ProveError::UnsupportedNetwork { .. }));
    }

    #[tokio::test]
    async fn transfer_failure_is_reported() {
        let payer = Eip712Payer::new(|_: EvmTransfer| async {
            Err::<TxHash, BoxError>("rejected by wallet".into())
        });
        let requirements = build("https://x/y", "0.05", Network::Base, MERCHANT, None).unwrap();

        let err = payer.prove(&requirements).await.unwrap_err();
        assert_eq!(err.to_string(), "payment transfer failed: rejected by wallet");
    }
}
