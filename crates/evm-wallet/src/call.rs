//! Contract method calls through a caller-supplied ABI.
//!
//! A read runs `eth_call` and returns the raw return data. A write goes
//! through the same stages as a transfer: the gas limit is estimated unless
//! given, the regular fee tier fills in missing fee fields, and the result
//! is signed and broadcast.

use alloy_primitives::U256;
use chain_eth::abi::ContractAbi;
use chain_eth::{erc20, PrivateKey};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::context::{ContextRequest, ContextResolver};
use crate::crypto::WalletCrypto;
use crate::error::{Stage, StageExt, TransferError, WalletError};
use crate::fees::compute_tiers;
use crate::request::FeeOverride;
use crate::rpc::{CallRequest, EvmRpc};
use crate::sign_params::SignParamsBuilder;
use crate::transfer::{sign_and_broadcast, BroadcastResult, TransferShape};
use crate::units::{parse_amount, to_base_units};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodType {
    Read,
    Write,
}

/// One contract method call. Fee fields are in wei.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub contract_address: String,
    pub method: String,
    pub method_type: MethodType,
    /// Arguments in declaration order.
    #[serde(default)]
    pub params: Vec<Value>,
    /// JSON ABI of the contract; the bundled ERC-20 ABI when absent.
    #[serde(default)]
    pub abi: Option<Value>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Native value attached to a write, in display units.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<u128>,
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub nonce: Option<u64>,
}

impl ContractCall {
    pub fn read(contract_address: impl Into<String>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::new(contract_address.into(), method.into(), MethodType::Read, params)
    }

    pub fn write(contract_address: impl Into<String>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::new(contract_address.into(), method.into(), MethodType::Write, params)
    }

    fn new(contract_address: String, method: String, method_type: MethodType, params: Vec<Value>) -> Self {
        Self {
            contract_address,
            method,
            method_type,
            params,
            abi: None,
            rpc_url: None,
            value: None,
            gas_limit: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: None,
        }
    }

    pub fn with_abi(mut self, abi: Value) -> Self {
        self.abi = Some(abi);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Raw return data of a read.
    Returned(Vec<u8>),
    Sent(BroadcastResult),
}

/// A [`ContractCall`] after its arguments were encoded.
struct EncodedCall {
    contract: String,
    data: Vec<u8>,
    value: U256,
    fee: Option<FeeOverride>,
}

pub struct ContractCaller<'a> {
    resolver: &'a ContextResolver,
    crypto: &'a dyn WalletCrypto,
    native_decimals: u8,
}

impl<'a> ContractCaller<'a> {
    pub fn new(resolver: &'a ContextResolver, crypto: &'a dyn WalletCrypto, native_decimals: u8) -> Self {
        Self {
            resolver,
            crypto,
            native_decimals,
        }
    }

    /// Runs `call`. Writes need `key`; reads use it only as the `from`
    /// address of the `eth_call`.
    #[instrument(skip_all, fields(contract = %call.contract_address, method = %call.method, kind = ?call.method_type))]
    pub async fn execute(&self, key: Option<&PrivateKey>, call: ContractCall) -> Result<CallOutcome, TransferError> {
        let encoded = self.encode(&call).at(Stage::Validating)?;

        match call.method_type {
            MethodType::Read => self.read(key, &call, encoded).await.map(CallOutcome::Returned),
            MethodType::Write => {
                let key = key.ok_or(WalletError::MissingSigner).at(Stage::Validating)?;
                self.write(key, &call, encoded).await.map(CallOutcome::Sent)
            }
        }
    }

    fn encode(&self, call: &ContractCall) -> Result<EncodedCall, WalletError> {
        let contract = self.crypto.normalize_address(&call.contract_address)?;
        let abi = match &call.abi {
            Some(abi) => ContractAbi::from_value(abi.clone())?,
            None => erc20::default_abi()?,
        };
        let data = abi.encode_call(&call.method, &call.params)?;
        let value = match call.value.as_deref() {
            Some(amount) => to_base_units(parse_amount(amount)?, self.native_decimals)?,
            None => U256::ZERO,
        };
        let fee = FeeOverride::from_fields(call.gas_price, call.max_fee_per_gas, call.max_priority_fee_per_gas)?;

        Ok(EncodedCall {
            contract,
            data,
            value,
            fee,
        })
    }

    async fn read(
        &self,
        key: Option<&PrivateKey>,
        call: &ContractCall,
        encoded: EncodedCall,
    ) -> Result<Vec<u8>, TransferError> {
        let from = key.map(|key| self.crypto.address_of(key)).transpose().at(Stage::Validating)?;
        let rpc = self.resolver.connect(call.rpc_url.as_deref()).at(Stage::Validating)?;
        ensure_code(rpc.as_ref(), &encoded.contract).await.at(Stage::Validating)?;

        let request = CallRequest::new(encoded.contract).from(from).data(encoded.data);
        rpc.call(&request).await.at(Stage::ShapeResolved)
    }

    async fn write(
        &self,
        key: &PrivateKey,
        call: &ContractCall,
        encoded: EncodedCall,
    ) -> Result<BroadcastResult, TransferError> {
        let ctx = self
            .resolver
            .resolve(ContextRequest {
                rpc_url: call.rpc_url.as_deref(),
                signer: Some(key),
                ..ContextRequest::default()
            })
            .await
            .at(Stage::Validating)?;
        ensure_code(ctx.rpc.as_ref(), &encoded.contract).await.at(Stage::Validating)?;

        let gas_limit = match call.gas_limit {
            Some(gas_limit) => gas_limit,
            None => {
                let request = CallRequest::new(encoded.contract.clone())
                    .from(ctx.signer_address.clone())
                    .value(encoded.value)
                    .data(encoded.data.clone());
                ctx.rpc.estimate_gas(&request).await.at(Stage::ShapeResolved)?
            }
        };
        let shape = TransferShape {
            to: encoded.contract,
            value: encoded.value,
            data: encoded.data,
            gas_limit,
        };
        debug!(to = %shape.to, gas_limit, "contract call shape resolved");

        // The gas limit is already known, so the tiers are priced without
        // another estimate.
        let fee = match encoded.fee {
            Some(fee) => fee,
            None => {
                let signals = ctx.fee_signals().at(Stage::FeeResolved)?;
                FeeOverride::from(compute_tiers(&signals, gas_limit).regular.pricing)
            }
        };
        let tx = SignParamsBuilder::from_context(&ctx)
            .nonce_override(call.nonce)
            .build(&shape, Some(&fee))
            .at(Stage::FeeResolved)?;

        sign_and_broadcast(&ctx, self.crypto, key, &tx).await
    }
}

async fn ensure_code(rpc: &dyn EvmRpc, contract: &str) -> Result<(), WalletError> {
    if rpc.code(contract).await?.is_empty() {
        return Err(WalletError::NotAContract(contract.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_payload() {
        let call: ContractCall = serde_json::from_str(
            r#"{
                "contractAddress": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                "method": "approve",
                "methodType": "write",
                "params": ["0x000000000000000000000000000000000000dEaD", "1000"],
                "gasPrice": 2000000000,
                "nonce": 3
            }"#,
        )
        .unwrap();

        assert_eq!(call.method_type, MethodType::Write);
        assert_eq!(call.params.len(), 2);
        assert_eq!(call.gas_price, Some(2_000_000_000));
        assert_eq!(call.nonce, Some(3));
        assert!(call.abi.is_none());
    }

    #[test]
    fn constructors_set_method_type() {
        assert_eq!(ContractCall::read("0x01", "decimals", vec![]).method_type, MethodType::Read);
        assert_eq!(ContractCall::write("0x01", "approve", vec![]).method_type, MethodType::Write);
    }
}
