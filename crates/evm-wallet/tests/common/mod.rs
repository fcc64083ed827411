//! In-memory node and signer doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use chain_eth::erc20;
use chain_eth::transaction::SignedEthTransaction;
use evm_wallet::crypto::{LocalCrypto, WalletCrypto};
use evm_wallet::rpc::{BlockFees, BlockTag, CallRequest, Connector, EvmRpc, FeeData};
use evm_wallet::sign_params::SignableTransaction;
use evm_wallet::units::GWEI;
use evm_wallet::{EvmWallet, PrivateKey, WalletConfig, WalletError};

pub const RPC_URL: &str = "http://mock.rpc";
pub const SIGNER: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
pub const RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";
pub const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const TX_HASH: &str = "0x5e1f0c8b2d7a4e6f9c3b1a0d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f";

/// Every request the wallet made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    ChainId,
    FeeData,
    LatestBlock,
    TransactionCount(String, BlockTag),
    EstimateGas(CallRequest),
    Code(String),
    Balance(String),
    Call(CallRequest),
    SendRawTransaction(Vec<u8>),
}

pub struct MockRpc {
    pub chain_id: u64,
    pub fee_data: FeeData,
    pub base_fee: Option<u128>,
    pub nonce: u64,
    pub gas_estimate: u64,
    pub code: HashMap<String, Vec<u8>>,
    pub balances: HashMap<String, U256>,
    pub token_decimals: u8,
    pub token_balance: U256,
    pub token_name: String,
    pub token_symbol: String,
    pub token_supply: U256,
    /// Return data for selectors outside the ERC-20 getters.
    pub call_results: HashMap<[u8; 4], Vec<u8>>,
    pub broadcast_error: Option<String>,
    log: Mutex<Vec<RpcCall>>,
}

impl MockRpc {
    /// A London chain: base fee 20 gwei, tip 1 gwei.
    pub fn dynamic() -> Self {
        let base = 20 * GWEI;
        let tip = GWEI;
        Self::with_fees(
            FeeData {
                gas_price: Some(base + tip),
                max_fee_per_gas: Some(2 * base + tip),
                max_priority_fee_per_gas: Some(tip),
                base_fee_per_gas: Some(base),
            },
            Some(base),
        )
    }

    /// A pre-London chain quoting 15 gwei.
    pub fn legacy() -> Self {
        Self::with_fees(
            FeeData {
                gas_price: Some(15 * GWEI),
                ..FeeData::default()
            },
            None,
        )
    }

    pub fn with_fees(fee_data: FeeData, base_fee: Option<u128>) -> Self {
        let mut code = HashMap::new();
        code.insert(TOKEN.to_lowercase(), vec![0x60, 0x80, 0x60, 0x40]);
        Self {
            chain_id: 11_155_111,
            fee_data,
            base_fee,
            nonce: 7,
            gas_estimate: 52_000,
            code,
            balances: HashMap::new(),
            token_decimals: 6,
            token_balance: U256::from(2_500_000u64),
            token_name: "USD Coin".into(),
            token_symbol: "USDC".into(),
            token_supply: U256::from(1_000_000_000_000u64),
            call_results: HashMap::new(),
            broadcast_error: None,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.log.lock().unwrap().clone()
    }

    pub fn estimate_gas_calls(&self) -> Vec<CallRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RpcCall::EstimateGas(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &RpcCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RpcCall::SendRawTransaction(raw) => Some(raw),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RpcCall) {
        self.log.lock().unwrap().push(call);
    }
}

pub fn word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

fn abi_string(s: &str) -> Vec<u8> {
    let mut out = word(U256::from(32u8));
    out.extend(word(U256::from(s.len())));
    let mut body = s.as_bytes().to_vec();
    body.resize(s.len().div_ceil(32) * 32, 0);
    out.extend(body);
    out
}

#[async_trait]
impl EvmRpc for MockRpc {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.record(RpcCall::ChainId);
        Ok(self.chain_id)
    }

    async fn fee_data(&self, _latest: &BlockFees) -> Result<FeeData, WalletError> {
        self.record(RpcCall::FeeData);
        Ok(self.fee_data)
    }

    async fn latest_block(&self) -> Result<BlockFees, WalletError> {
        self.record(RpcCall::LatestBlock);
        Ok(BlockFees {
            number: 1_000,
            base_fee_per_gas: self.base_fee,
        })
    }

    async fn transaction_count(&self, address: &str, tag: BlockTag) -> Result<u64, WalletError> {
        self.record(RpcCall::TransactionCount(address.to_string(), tag));
        Ok(self.nonce)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, WalletError> {
        self.record(RpcCall::EstimateGas(call.clone()));
        Ok(self.gas_estimate)
    }

    async fn code(&self, address: &str) -> Result<Vec<u8>, WalletError> {
        self.record(RpcCall::Code(address.to_string()));
        Ok(self.code.get(&address.to_lowercase()).cloned().unwrap_or_default())
    }

    async fn balance(&self, address: &str) -> Result<U256, WalletError> {
        self.record(RpcCall::Balance(address.to_string()));
        Ok(self.balances.get(&address.to_lowercase()).copied().unwrap_or_default())
    }

    async fn call(&self, call: &CallRequest) -> Result<Vec<u8>, WalletError> {
        self.record(RpcCall::Call(call.clone()));
        let selector: [u8; 4] = call
            .data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| WalletError::Rpc("missing selector".into()))?;

        if let Some(result) = self.call_results.get(&selector) {
            return Ok(result.clone());
        }
        match selector {
            erc20::DECIMALS_SELECTOR => Ok(word(U256::from(self.token_decimals))),
            erc20::BALANCE_OF_SELECTOR => Ok(word(self.token_balance)),
            erc20::TOTAL_SUPPLY_SELECTOR => Ok(word(self.token_supply)),
            erc20::NAME_SELECTOR => Ok(abi_string(&self.token_name)),
            erc20::SYMBOL_SELECTOR => Ok(abi_string(&self.token_symbol)),
            other => Err(WalletError::Rpc(format!("execution reverted: 0x{}", hex::encode(other)))),
        }
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, WalletError> {
        self.record(RpcCall::SendRawTransaction(raw_tx.to_vec()));
        match &self.broadcast_error {
            Some(msg) => Err(WalletError::Rpc(msg.clone())),
            None => Ok(TX_HASH.to_string()),
        }
    }
}

/// Hands out the same [`MockRpc`] for every URL and remembers the URLs.
pub struct MockConnector {
    pub rpc: Arc<MockRpc>,
    pub urls: Mutex<Vec<String>>,
}

impl Connector for MockConnector {
    fn connect(&self, rpc_url: &str, _timeout: Duration) -> Result<Arc<dyn EvmRpc>, WalletError> {
        self.urls.lock().unwrap().push(rpc_url.to_string());
        Ok(self.rpc.clone())
    }
}

/// Signs with [`LocalCrypto`] and keeps a copy of every signer input.
#[derive(Default)]
pub struct RecordingCrypto {
    pub signed: Mutex<Vec<SignableTransaction>>,
    pub fail_with: Option<String>,
}

impl RecordingCrypto {
    pub fn last(&self) -> SignableTransaction {
        self.signed.lock().unwrap().last().cloned().expect("nothing was signed")
    }

    pub fn count(&self) -> usize {
        self.signed.lock().unwrap().len()
    }
}

impl WalletCrypto for RecordingCrypto {
    fn derive_private_key(&self, mnemonic: &str, path: &str) -> Result<PrivateKey, WalletError> {
        LocalCrypto.derive_private_key(mnemonic, path)
    }

    fn new_address(&self, key: &PrivateKey) -> Result<chain_eth::keys::NewAddress, WalletError> {
        LocalCrypto.new_address(key)
    }

    fn validate_address(&self, address: &str) -> chain_eth::address::AddressCheck {
        LocalCrypto.validate_address(address)
    }

    fn sign_transaction(
        &self,
        key: &PrivateKey,
        tx: &SignableTransaction,
    ) -> Result<SignedEthTransaction, WalletError> {
        self.signed.lock().unwrap().push(tx.clone());
        if let Some(msg) = &self.fail_with {
            return Err(WalletError::Rpc(msg.clone()));
        }
        LocalCrypto.sign_transaction(key, tx)
    }
}

pub struct Harness {
    pub wallet: EvmWallet,
    pub rpc: Arc<MockRpc>,
    pub connector: Arc<MockConnector>,
    pub crypto: Arc<RecordingCrypto>,
}

pub fn harness(rpc: MockRpc) -> Harness {
    harness_with(rpc, WalletConfig::with_rpc_url(RPC_URL), RecordingCrypto::default())
}

pub fn harness_with(rpc: MockRpc, config: WalletConfig, crypto: RecordingCrypto) -> Harness {
    let rpc = Arc::new(rpc);
    let connector = Arc::new(MockConnector {
        rpc: rpc.clone(),
        urls: Mutex::new(Vec::new()),
    });
    let crypto = Arc::new(crypto);
    let wallet = EvmWallet::with_parts(config, connector.clone(), crypto.clone());
    Harness {
        wallet,
        rpc,
        connector,
        crypto,
    }
}

/// Private key 0x…01, whose address is [`SIGNER`].
pub fn signer_key() -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    PrivateKey::from_bytes(bytes).unwrap()
}
