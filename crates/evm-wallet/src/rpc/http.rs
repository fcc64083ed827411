use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy_json_rpc::{ErrorPayload, RpcError};
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionInput, TransactionRequest};
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use tracing::debug;

use super::{BlockFees, BlockTag, CallRequest, Connector, EvmRpc, FeeData};
use crate::error::WalletError;

/// JSON-RPC error code for an unknown method.
const METHOD_NOT_FOUND: i64 = -32601;

/// [`EvmRpc`] over HTTP, backed by an alloy provider.
pub struct JsonRpcClient {
    provider: RootProvider,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WalletError> {
        let url = url.into();
        let endpoint: reqwest::Url = url
            .parse()
            .map_err(|e| WalletError::Config(format!("invalid RPC URL `{url}`: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let client = RpcClient::new(Http::with_client(http, endpoint), false);

        Ok(Self {
            provider: RootProvider::new(client),
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EvmRpc for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn fee_data(&self, latest: &BlockFees) -> Result<FeeData, WalletError> {
        let (gas_price, priority) = tokio::join!(
            async { self.provider.get_gas_price().await },
            async { self.provider.get_max_priority_fee_per_gas().await },
        );
        let priority = dynamic_support(priority)?;
        Ok(assemble_fee_data(gas_price?, priority, latest.base_fee_per_gas))
    }

    async fn latest_block(&self) -> Result<BlockFees, WalletError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| WalletError::Rpc("latest block not found".into()))?;
        Ok(BlockFees {
            number: block.header.number,
            base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
        })
    }

    async fn transaction_count(&self, address: &str, tag: BlockTag) -> Result<u64, WalletError> {
        let count = self.provider.get_transaction_count(parse_address(address)?);
        let count = match tag {
            BlockTag::Latest => count.latest(),
            BlockTag::Pending => count.pending(),
        };
        Ok(count.await?)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, WalletError> {
        Ok(self.provider.estimate_gas(transaction_request(call)?).await?)
    }

    async fn code(&self, address: &str) -> Result<Vec<u8>, WalletError> {
        let code = self.provider.get_code_at(parse_address(address)?).await?;
        Ok(code.to_vec())
    }

    async fn balance(&self, address: &str) -> Result<U256, WalletError> {
        Ok(self.provider.get_balance(parse_address(address)?).await?)
    }

    async fn call(&self, call: &CallRequest) -> Result<Vec<u8>, WalletError> {
        let output = self.provider.call(transaction_request(call)?).await?;
        Ok(output.to_vec())
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, WalletError> {
        let pending = self
            .provider
            .send_raw_transaction(raw_tx)
            .await
            .map_err(|e| WalletError::BroadcastFailed(e.to_string()))?;
        Ok(pending.tx_hash().to_string())
    }
}

/// Opens a [`JsonRpcClient`] per endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, rpc_url: &str, timeout: Duration) -> Result<Arc<dyn EvmRpc>, WalletError> {
        Ok(Arc::new(JsonRpcClient::new(rpc_url, timeout)?))
    }
}

/// Interprets the `eth_maxPriorityFeePerGas` answer.
///
/// A node that rejects the method outright has no EIP-1559 support and the
/// chain is priced as legacy. Every other failure is a failed read.
fn dynamic_support(answer: Result<u128, TransportError>) -> Result<Option<u128>, WalletError> {
    match answer {
        Ok(tip) => Ok(Some(tip)),
        Err(RpcError::ErrorResp(payload)) if is_unsupported_method(&payload) => {
            debug!(code = payload.code, message = %payload.message, "node has no dynamic fee support");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn is_unsupported_method(payload: &ErrorPayload) -> bool {
    if payload.code == METHOD_NOT_FOUND {
        return true;
    }
    let message = payload.message.to_lowercase();
    ["not supported", "unsupported", "does not exist"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Dynamic fields are reported only when both a tip and a block base fee
/// exist; `maxFee = 2 * base + tip`.
fn assemble_fee_data(gas_price: u128, priority: Option<u128>, base_fee: Option<u128>) -> FeeData {
    let max_fee = match (base_fee, priority) {
        (Some(base), Some(tip)) => base.checked_mul(2).and_then(|b| b.checked_add(tip)),
        _ => None,
    };

    FeeData {
        gas_price: Some(gas_price),
        max_fee_per_gas: max_fee,
        max_priority_fee_per_gas: max_fee.and(priority),
        base_fee_per_gas: base_fee,
    }
}

fn transaction_request(call: &CallRequest) -> Result<TransactionRequest, WalletError> {
    let mut request = TransactionRequest::default()
        .to(parse_address(&call.to)?)
        .value(call.value)
        .input(TransactionInput::new(Bytes::from(call.data.clone())));
    if let Some(from) = &call.from {
        request = request.from(parse_address(from)?);
    }
    Ok(request)
}

fn parse_address(address: &str) -> Result<Address, WalletError> {
    Address::from_str(address).map_err(|e| WalletError::InvalidAddress(format!("{address}: {e}")))
}
