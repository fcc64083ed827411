//! Caller-facing transfer options and their validated form.

use chain_eth::abi::ContractAbi;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::crypto::WalletCrypto;
use crate::error::WalletError;
use crate::fees::FeePricing;
use crate::units::{parse_amount, parse_gwei};

/// Optional transfer settings. Fee fields are in wei.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferOptions {
    pub rpc_url: Option<String>,
    /// Token contract; a native transfer when absent.
    pub contract_address: Option<String>,
    /// JSON ABI of the token contract.
    pub abi: Option<serde_json::Value>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
    /// 0x-prefixed calldata for native transfers.
    pub data: Option<String>,
}

impl TransferOptions {
    pub fn token(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: Some(contract_address.into()),
            ..Self::default()
        }
    }

    pub fn gas_price_gwei(mut self, gwei: &str) -> Result<Self, WalletError> {
        self.gas_price = Some(parse_gwei(gwei)?);
        Ok(self)
    }

    pub fn max_fee_gwei(mut self, gwei: &str) -> Result<Self, WalletError> {
        self.max_fee_per_gas = Some(parse_gwei(gwei)?);
        Ok(self)
    }

    pub fn max_priority_fee_gwei(mut self, gwei: &str) -> Result<Self, WalletError> {
        self.max_priority_fee_per_gas = Some(parse_gwei(gwei)?);
        Ok(self)
    }
}

/// Caller fee fields after validation. A transfer carries at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeOverride {
    Legacy {
        gas_price: u128,
    },
    /// At least one field is set.
    Dynamic {
        max_fee_per_gas: Option<u128>,
        max_priority_fee_per_gas: Option<u128>,
    },
}

impl FeeOverride {
    /// Returns `None` when no fee field was given.
    pub fn from_fields(
        gas_price: Option<u128>,
        max_fee_per_gas: Option<u128>,
        max_priority_fee_per_gas: Option<u128>,
    ) -> Result<Option<Self>, WalletError> {
        match (gas_price, max_fee_per_gas, max_priority_fee_per_gas) {
            (None, None, None) => Ok(None),
            (Some(gas_price), None, None) => Ok(Some(FeeOverride::Legacy { gas_price })),
            (Some(_), _, _) => Err(WalletError::ConflictingFeeFields),
            (None, max_fee, priority) => {
                if let (Some(max_fee), Some(priority_fee)) = (max_fee, priority) {
                    if max_fee < priority_fee {
                        return Err(WalletError::InvertedFeePriority { max_fee, priority_fee });
                    }
                }
                Ok(Some(FeeOverride::Dynamic {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority,
                }))
            }
        }
    }
}

impl From<FeePricing> for FeeOverride {
    fn from(pricing: FeePricing) -> Self {
        match pricing {
            FeePricing::Legacy { gas_price } => FeeOverride::Legacy { gas_price },
            FeePricing::Dynamic { max_fee_per_gas, max_priority_fee_per_gas } => FeeOverride::Dynamic {
                max_fee_per_gas: Some(max_fee_per_gas),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
            },
        }
    }
}

/// A fully validated transfer.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Checksummed recipient.
    pub recipient: String,
    pub amount: Decimal,
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub abi: Option<ContractAbi>,
    pub fee: Option<FeeOverride>,
    pub gas_limit: Option<u64>,
    pub nonce: Option<u64>,
    pub data: Vec<u8>,
}

impl TransferRequest {
    /// Validates recipient, amount, fee fields, ABI and calldata.
    pub fn validate(
        crypto: &dyn WalletCrypto,
        recipient: &str,
        amount: &str,
        options: TransferOptions,
    ) -> Result<Self, WalletError> {
        let recipient = crypto.normalize_address(recipient)?;
        let amount = parse_amount(amount)?;
        let fee = FeeOverride::from_fields(
            options.gas_price,
            options.max_fee_per_gas,
            options.max_priority_fee_per_gas,
        )?;
        let abi = options.abi.map(ContractAbi::from_value).transpose()?;
        let data = match options.data.as_deref() {
            Some(hex_data) => decode_calldata(hex_data)?,
            None => Vec::new(),
        };

        Ok(Self {
            recipient,
            amount,
            rpc_url: options.rpc_url,
            contract_address: options.contract_address,
            abi,
            fee,
            gas_limit: options.gas_limit,
            nonce: options.nonce,
            data,
        })
    }
}

fn decode_calldata(raw: &str) -> Result<Vec<u8>, WalletError> {
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(body).map_err(|e| WalletError::Abi(format!("calldata `{raw}`: {e}")))
}
