use alloy_primitives::U256;

use crate::context::ChainContext;
use crate::error::WalletError;
use crate::fees::FeePricing;
use crate::request::FeeOverride;
use crate::rpc::FeeData;
use crate::transfer::TransferShape;
use crate::units::GWEI;

/// Tip used when neither the caller nor the node supplied one (0.1 gwei).
pub const DEFAULT_PRIORITY_FEE: u128 = GWEI / 10;
/// Max fee used when neither the caller nor the node supplied one (3 gwei).
pub const DEFAULT_MAX_FEE: u128 = 3 * GWEI;

/// Exactly what the signer receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableTransaction {
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub chain_id: u64,
    pub pricing: FeePricing,
}

impl SignableTransaction {
    pub fn tx_type(&self) -> u8 {
        self.pricing.tx_type()
    }
}

/// Maps a resolved transfer onto a [`SignableTransaction`].
#[derive(Debug, Clone, Copy)]
pub struct SignParamsBuilder<'a> {
    observed: &'a FeeData,
    chain_id: u64,
    nonce: Option<u64>,
}

impl<'a> SignParamsBuilder<'a> {
    pub fn new(observed: &'a FeeData, chain_id: u64, nonce: Option<u64>) -> Self {
        Self {
            observed,
            chain_id,
            nonce,
        }
    }

    pub fn from_context(ctx: &'a ChainContext) -> Self {
        Self::new(&ctx.observed_fees, ctx.chain_id, ctx.nonce)
    }

    /// A caller-supplied nonce replaces the context nonce.
    pub fn nonce_override(mut self, nonce: Option<u64>) -> Self {
        if nonce.is_some() {
            self.nonce = nonce;
        }
        self
    }

    pub fn build(
        &self,
        shape: &TransferShape,
        fee: Option<&FeeOverride>,
    ) -> Result<SignableTransaction, WalletError> {
        let nonce = self.nonce.ok_or(WalletError::MissingNonce)?;
        let pricing = match fee {
            Some(FeeOverride::Legacy { gas_price }) => FeePricing::Legacy { gas_price: *gas_price },
            Some(FeeOverride::Dynamic { max_fee_per_gas, max_priority_fee_per_gas }) => {
                self.dynamic_pricing(*max_fee_per_gas, *max_priority_fee_per_gas)?
            }
            None => self.dynamic_pricing(None, None)?,
        };

        Ok(SignableTransaction {
            to: shape.to.clone(),
            value: shape.value,
            data: shape.data.clone(),
            nonce,
            gas_limit: shape.gas_limit,
            chain_id: self.chain_id,
            pricing,
        })
    }

    fn dynamic_pricing(
        &self,
        max_fee: Option<u128>,
        priority_fee: Option<u128>,
    ) -> Result<FeePricing, WalletError> {
        let priority_fee = priority_fee
            .or(self.observed.max_priority_fee_per_gas)
            .unwrap_or(DEFAULT_PRIORITY_FEE);
        let max_fee = max_fee
            .or(self.observed.max_fee_per_gas)
            .unwrap_or(DEFAULT_MAX_FEE);

        if max_fee < priority_fee {
            return Err(WalletError::InvertedFeePriority { max_fee, priority_fee });
        }
        Ok(FeePricing::Dynamic {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority_fee,
        })
    }
}
