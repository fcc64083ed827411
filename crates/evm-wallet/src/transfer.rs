//! The transfer pipeline.
//!
//! ```text
//! Validating -> ShapeResolved -> FeeResolved -> Signed -> Broadcast
//! ```
//!
//! Each stage tags its errors with [`Stage`]. When the caller gave no fee
//! fields, the fee stage runs exactly one estimate and fills the regular
//! tier in before building; the filled fields are never re-estimated.

use alloy_primitives::U256;
use chain_eth::PrivateKey;
use tracing::{debug, info, instrument};

use crate::context::{ChainContext, ContextRequest, ContextResolver};
use crate::crypto::WalletCrypto;
use crate::error::{Stage, StageExt, TransferError, WalletError};
use crate::fees;
use crate::request::{FeeOverride, TransferOptions, TransferRequest};
use crate::rpc::CallRequest;
use crate::sign_params::{SignParamsBuilder, SignableTransaction};
use crate::units::to_base_units;

/// Gas of a plain value transfer without calldata.
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Target, value, calldata and gas of a transfer, before pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferShape {
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    pub tx_hash: String,
    pub nonce: u64,
    pub chain_id: u64,
}

pub struct TransferOrchestrator<'a> {
    resolver: &'a ContextResolver,
    crypto: &'a dyn WalletCrypto,
    native_decimals: u8,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(resolver: &'a ContextResolver, crypto: &'a dyn WalletCrypto, native_decimals: u8) -> Self {
        Self {
            resolver,
            crypto,
            native_decimals,
        }
    }

    #[instrument(skip_all, fields(recipient = %recipient, token = options.contract_address.as_deref()))]
    pub async fn execute(
        &self,
        key: &PrivateKey,
        recipient: &str,
        amount: &str,
        options: TransferOptions,
    ) -> Result<BroadcastResult, TransferError> {
        let request = TransferRequest::validate(self.crypto, recipient, amount, options).at(Stage::Validating)?;
        let ctx = self
            .resolver
            .resolve(ContextRequest {
                rpc_url: request.rpc_url.as_deref(),
                signer: Some(key),
                contract_address: request.contract_address.as_deref(),
                abi: request.abi.as_ref(),
            })
            .await
            .at(Stage::Validating)?;

        let shape = resolve_shape(&ctx, &request, self.native_decimals)
            .await
            .at(Stage::ShapeResolved)?;
        debug!(to = %shape.to, gas_limit = shape.gas_limit, "transfer shape resolved");

        let fee = match request.fee {
            Some(fee) => fee,
            None => {
                let estimate = fees::estimate(&ctx, &shape.to, shape.value, &shape.data)
                    .await
                    .at(Stage::FeeResolved)?;
                FeeOverride::from(estimate.tiers.regular.pricing)
            }
        };
        let tx = SignParamsBuilder::from_context(&ctx)
            .nonce_override(request.nonce)
            .build(&shape, Some(&fee))
            .at(Stage::FeeResolved)?;

        sign_and_broadcast(&ctx, self.crypto, key, &tx).await
    }
}

/// Hands `tx` to the signer and submits the signed bytes. Signer errors are
/// tagged [`Stage::Signed`], broadcaster errors [`Stage::Broadcast`].
pub(crate) async fn sign_and_broadcast(
    ctx: &ChainContext,
    crypto: &dyn WalletCrypto,
    key: &PrivateKey,
    tx: &SignableTransaction,
) -> Result<BroadcastResult, TransferError> {
    let signed = crypto
        .sign_transaction(key, tx)
        .map_err(|e| match e {
            WalletError::SigningFailed(_) => e,
            other => WalletError::SigningFailed(other.to_string()),
        })
        .at(Stage::Signed)?;

    let tx_hash = ctx
        .rpc
        .send_raw_transaction(&signed.raw_tx)
        .await
        .map_err(|e| match e {
            WalletError::BroadcastFailed(_) => e,
            other => WalletError::BroadcastFailed(other.to_string()),
        })
        .at(Stage::Broadcast)?;

    info!(%tx_hash, nonce = tx.nonce, chain_id = tx.chain_id, tx_type = tx.tx_type(), "transaction broadcast");
    Ok(BroadcastResult {
        tx_hash,
        nonce: tx.nonce,
        chain_id: tx.chain_id,
    })
}

/// Picks target, value, calldata and gas limit.
///
/// Token transfers send `transfer(recipient, amount)` to the contract with
/// zero value. Native transfers send the amount in wei to the recipient.
pub async fn resolve_shape(
    ctx: &ChainContext,
    request: &TransferRequest,
    native_decimals: u8,
) -> Result<TransferShape, WalletError> {
    let (to, value, data) = match &ctx.contract {
        Some(token) => {
            let decimals = token.decimals(ctx.rpc.as_ref()).await?;
            let amount = to_base_units(request.amount, decimals)?;
            let data = token.encode_transfer(&request.recipient, amount)?;
            (token.address().to_string(), U256::ZERO, data)
        }
        None => {
            let value = to_base_units(request.amount, native_decimals)?;
            (request.recipient.clone(), value, request.data.clone())
        }
    };

    let gas_limit = match request.gas_limit {
        Some(gas_limit) => gas_limit,
        None if ctx.contract.is_none() && data.is_empty() => NATIVE_TRANSFER_GAS,
        None => {
            let call = CallRequest::new(to.clone())
                .from(ctx.signer_address.clone())
                .value(value)
                .data(data.clone());
            ctx.rpc.estimate_gas(&call).await?
        }
    };

    Ok(TransferShape {
        to,
        value,
        data,
        gas_limit,
    })
}
