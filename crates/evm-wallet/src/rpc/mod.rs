//! Node access.
//!
//! Everything the wallet reads from or writes to a chain goes through
//! [`EvmRpc`]. [`JsonRpcClient`] is the HTTP implementation over an alloy
//! provider; tests plug in their own.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;

use crate::error::WalletError;

mod http;

pub use http::{HttpConnector, JsonRpcClient};

/// Raw fee suggestion as reported by a node, all values in wei.
///
/// Which fields are populated depends on the node and chain; see
/// [`crate::fees::FeeSignals::from_observed`] for how they are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub base_fee_per_gas: Option<u128>,
}

/// The slice of the latest block header the fee engine needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockFees {
    pub number: u64,
    /// Absent on pre-London chains.
    pub base_fee_per_gas: Option<u128>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// Call skeleton for `eth_call` and `eth_estimateGas`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<String>,
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

impl CallRequest {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Self::default()
        }
    }

    pub fn from(mut self, from: Option<String>) -> Self {
        self.from = from;
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/// JSON-RPC surface of an EVM node.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Current fee suggestion. Dynamic fields are derived from `latest`, so
    /// the caller reads the block once and passes it in.
    async fn fee_data(&self, latest: &BlockFees) -> Result<FeeData, WalletError>;

    async fn latest_block(&self) -> Result<BlockFees, WalletError>;

    /// Transaction count of `address` at `tag`. With [`BlockTag::Pending`]
    /// this is the next usable nonce.
    async fn transaction_count(&self, address: &str, tag: BlockTag) -> Result<u64, WalletError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, WalletError>;

    /// Deployed bytecode at `address`; empty for externally owned accounts.
    async fn code(&self, address: &str) -> Result<Vec<u8>, WalletError>;

    async fn balance(&self, address: &str) -> Result<U256, WalletError>;

    async fn call(&self, call: &CallRequest) -> Result<Vec<u8>, WalletError>;

    /// Submits signed bytes and returns the transaction hash.
    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, WalletError>;
}

/// Opens an [`EvmRpc`] for an endpoint URL.
pub trait Connector: Send + Sync {
    fn connect(&self, rpc_url: &str, timeout: Duration) -> Result<Arc<dyn EvmRpc>, WalletError>;
}
