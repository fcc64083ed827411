//! Fee model detection and tier computation.
//!
//! A node's fee response is classified as either a legacy single gas price or
//! a dynamic (EIP-1559) base fee plus tip. From that signal three tiers are
//! derived:
//!
//! | tier    | dynamic (per component) | legacy gas price |
//! |---------|-------------------------|------------------|
//! | regular | 1.0x                    | 1.00x            |
//! | express | 1.2x                    | 1.10x            |
//! | instant | 1.5x                    | 1.25x            |
//!
//! Dynamic `maxFeePerGas` and `maxPriorityFeePerGas` are capped at
//! [`MAX_DYNAMIC_FEE_PER_GAS`] in every tier. Legacy prices are not capped.
//! All multipliers are applied with integer arithmetic and floor.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::context::ChainContext;
use crate::error::WalletError;
use crate::rpc::{CallRequest, FeeData};
use crate::units::{to_display_units, GWEI};

/// Upper bound for any dynamic fee component, per unit of gas.
pub const MAX_DYNAMIC_FEE_PER_GAS: u128 = 100 * GWEI;

/// Dynamic tier multipliers in tenths.
const EXPRESS_TENTHS: u128 = 12;
const INSTANT_TENTHS: u128 = 15;

/// Legacy tier multipliers in percent.
const EXPRESS_PERCENT: u128 = 110;
const INSTANT_PERCENT: u128 = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeModel {
    Legacy,
    Dynamic,
}

/// Live fee signal classified from a node response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSignals {
    Legacy {
        gas_price: u128,
    },
    Dynamic {
        base_fee_per_gas: u128,
        suggested_priority_fee: u128,
    },
}

impl FeeSignals {
    /// Classifies `fees`.
    ///
    /// A response with both `max_fee_per_gas` and `max_priority_fee_per_gas`
    /// is dynamic. Its base fee is taken from the response, then from
    /// `latest_base_fee`, and finally recovered as `(maxFee - tip) / 2`.
    /// Otherwise a gas price makes it legacy.
    pub fn from_observed(fees: &FeeData, latest_base_fee: Option<u128>) -> Result<Self, WalletError> {
        if let (Some(max_fee), Some(tip)) = (fees.max_fee_per_gas, fees.max_priority_fee_per_gas) {
            let base_fee_per_gas = fees
                .base_fee_per_gas
                .or(latest_base_fee)
                .unwrap_or_else(|| max_fee.saturating_sub(tip) / 2);
            return Ok(FeeSignals::Dynamic {
                base_fee_per_gas,
                suggested_priority_fee: tip,
            });
        }

        match fees.gas_price {
            Some(gas_price) => Ok(FeeSignals::Legacy { gas_price }),
            None => Err(WalletError::FeeSignalUnavailable),
        }
    }

    pub fn model(&self) -> FeeModel {
        match self {
            FeeSignals::Legacy { .. } => FeeModel::Legacy,
            FeeSignals::Dynamic { .. } => FeeModel::Dynamic,
        }
    }
}

/// Per-gas pricing of a transaction, either legacy or dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePricing {
    Legacy {
        gas_price: u128,
    },
    Dynamic {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl FeePricing {
    /// EIP-2718 transaction type: 0 for legacy, 2 for dynamic.
    pub fn tx_type(&self) -> u8 {
        match self {
            FeePricing::Legacy { .. } => 0,
            FeePricing::Dynamic { .. } => 2,
        }
    }

    /// Worst-case price per unit of gas.
    pub fn max_price_per_gas(&self) -> u128 {
        match *self {
            FeePricing::Legacy { gas_price } => gas_price,
            FeePricing::Dynamic { max_fee_per_gas, .. } => max_fee_per_gas,
        }
    }
}

/// One priced tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub pricing: FeePricing,
    pub gas_limit: u64,
    /// `gas_limit × price`, in wei.
    pub estimated_cost: U256,
}

impl FeeQuote {
    fn new(pricing: FeePricing, gas_limit: u64) -> Self {
        let estimated_cost = U256::from(gas_limit) * U256::from(pricing.max_price_per_gas());
        Self {
            pricing,
            gas_limit,
            estimated_cost,
        }
    }

    /// [`Self::estimated_cost`] in native display units.
    pub fn estimated_cost_native(&self, native_decimals: u8) -> Result<Decimal, WalletError> {
        to_display_units(self.estimated_cost, native_decimals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeTiers {
    pub regular: FeeQuote,
    pub express: FeeQuote,
    pub instant: FeeQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub chain_id: u64,
    pub gas_limit: u64,
    pub model: FeeModel,
    pub tiers: FeeTiers,
}

/// Prices all three tiers for `gas_limit` gas. Performs no I/O.
pub fn compute_tiers(signals: &FeeSignals, gas_limit: u64) -> FeeTiers {
    let quote = |pricing| FeeQuote::new(pricing, gas_limit);

    match *signals {
        FeeSignals::Legacy { gas_price } => FeeTiers {
            regular: quote(FeePricing::Legacy { gas_price }),
            express: quote(FeePricing::Legacy { gas_price: percent_of(gas_price, EXPRESS_PERCENT) }),
            instant: quote(FeePricing::Legacy { gas_price: percent_of(gas_price, INSTANT_PERCENT) }),
        },
        FeeSignals::Dynamic { base_fee_per_gas, suggested_priority_fee } => {
            let tier = |tenths: u128| {
                let base = tenths_of(base_fee_per_gas, tenths);
                let tip = tenths_of(suggested_priority_fee, tenths);
                quote(capped_dynamic(base.saturating_add(tip), tip))
            };
            FeeTiers {
                regular: tier(10),
                express: tier(EXPRESS_TENTHS),
                instant: tier(INSTANT_TENTHS),
            }
        }
    }
}

/// Estimates gas once for the `(signer, to, value, data)` skeleton and prices
/// it with the context's fee signal.
#[instrument(skip_all, fields(chain_id = ctx.chain_id, to = %to))]
pub async fn estimate(
    ctx: &ChainContext,
    to: &str,
    value: U256,
    data: &[u8],
) -> Result<FeeEstimate, WalletError> {
    let signals = ctx.fee_signals()?;

    let call = CallRequest::new(to)
        .from(ctx.signer_address.clone())
        .value(value)
        .data(data.to_vec());
    let gas_limit = ctx.rpc.estimate_gas(&call).await?;

    let tiers = compute_tiers(&signals, gas_limit);
    debug!(
        gas_limit,
        model = ?signals.model(),
        regular = tiers.regular.pricing.max_price_per_gas(),
        "fee estimate"
    );

    Ok(FeeEstimate {
        chain_id: ctx.chain_id,
        gas_limit,
        model: signals.model(),
        tiers,
    })
}

fn capped_dynamic(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> FeePricing {
    FeePricing::Dynamic {
        max_fee_per_gas: max_fee_per_gas.min(MAX_DYNAMIC_FEE_PER_GAS),
        max_priority_fee_per_gas: max_priority_fee_per_gas.min(MAX_DYNAMIC_FEE_PER_GAS),
    }
}

fn tenths_of(value: u128, tenths: u128) -> u128 {
    value.saturating_mul(tenths) / 10
}

fn percent_of(value: u128, percent: u128) -> u128 {
    value.saturating_mul(percent) / 100
}
