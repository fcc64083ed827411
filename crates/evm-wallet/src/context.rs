//! Per-call chain snapshot.

use std::sync::Arc;

use chain_eth::abi::ContractAbi;
use chain_eth::PrivateKey;
use tracing::{debug, instrument};

use crate::config::WalletConfig;
use crate::contract::TokenContract;
use crate::crypto::WalletCrypto;
use crate::error::WalletError;
use crate::fees::FeeSignals;
use crate::rpc::{BlockTag, Connector, EvmRpc, FeeData};

/// Everything one wallet call needs to know about the chain, read once at
/// the start of the call.
#[derive(Clone)]
pub struct ChainContext {
    pub rpc: Arc<dyn EvmRpc>,
    pub chain_id: u64,
    pub observed_fees: FeeData,
    /// Base fee of the latest block, if the chain has one.
    pub latest_base_fee: Option<u128>,
    pub signer_address: Option<String>,
    /// Pending-inclusive nonce of the signer.
    pub nonce: Option<u64>,
    pub contract: Option<TokenContract>,
}

impl ChainContext {
    /// Classifies the observed fee data. Fails with `FeeSignalUnavailable`
    /// when the node reported neither a gas price nor dynamic fees.
    pub fn fee_signals(&self) -> Result<FeeSignals, WalletError> {
        FeeSignals::from_observed(&self.observed_fees, self.latest_base_fee)
    }
}

impl std::fmt::Debug for ChainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainContext")
            .field("chain_id", &self.chain_id)
            .field("observed_fees", &self.observed_fees)
            .field("latest_base_fee", &self.latest_base_fee)
            .field("signer_address", &self.signer_address)
            .field("nonce", &self.nonce)
            .field("contract", &self.contract.as_ref().map(TokenContract::address))
            .finish_non_exhaustive()
    }
}

/// Optional inputs to [`ContextResolver::resolve`].
#[derive(Default, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub rpc_url: Option<&'a str>,
    pub signer: Option<&'a PrivateKey>,
    pub contract_address: Option<&'a str>,
    /// ABI for the contract; the bundled ERC-20 ABI when absent.
    pub abi: Option<&'a ContractAbi>,
}

pub struct ContextResolver {
    config: WalletConfig,
    connector: Arc<dyn Connector>,
    crypto: Arc<dyn WalletCrypto>,
}

impl ContextResolver {
    pub fn new(config: WalletConfig, connector: Arc<dyn Connector>, crypto: Arc<dyn WalletCrypto>) -> Self {
        Self {
            config,
            connector,
            crypto,
        }
    }

    /// Opens a connection to the explicit endpoint or the configured one.
    pub fn connect(&self, rpc_url: Option<&str>) -> Result<Arc<dyn EvmRpc>, WalletError> {
        let url = self.config.resolve_rpc_url(rpc_url)?;
        self.connector.connect(&url, self.config.timeout())
    }

    /// Connects and reads fee data, chain id, nonce and contract code
    /// concurrently. The latest block is read once and feeds the fee data.
    #[instrument(skip_all, fields(contract = request.contract_address, signer = request.signer.is_some()))]
    pub async fn resolve(&self, request: ContextRequest<'_>) -> Result<ChainContext, WalletError> {
        let rpc = self.connect(request.rpc_url)?;
        let signer_address = request.signer.map(|key| self.crypto.address_of(key)).transpose()?;
        let contract = match request.contract_address {
            Some(address) => {
                let normalized = self.crypto.normalize_address(address)?;
                Some(match request.abi {
                    Some(abi) => TokenContract::bind(normalized, abi.clone())?,
                    None => TokenContract::erc20(normalized)?,
                })
            }
            None => None,
        };

        let fees = async {
            let block = rpc.latest_block().await?;
            let observed = rpc.fee_data(&block).await?;
            Ok::<_, WalletError>((block, observed))
        };
        let chain_id = async {
            match self.config.chain_id {
                Some(id) => Ok(id),
                None => rpc.chain_id().await,
            }
        };
        let nonce = async {
            match &signer_address {
                Some(address) => rpc.transaction_count(address, BlockTag::Pending).await.map(Some),
                None => Ok(None),
            }
        };
        let code_check = async {
            match &contract {
                Some(token) => match rpc.code(token.address()).await {
                    Ok(code) if code.is_empty() => Err(WalletError::NotAContract(token.address().to_string())),
                    Ok(_) => Ok(()),
                    Err(e) => Err(e),
                },
                None => Ok(()),
            }
        };

        let ((block, observed_fees), chain_id, nonce, ()) = tokio::try_join!(fees, chain_id, nonce, code_check)?;

        debug!(chain_id, nonce, block = block.number, "chain context resolved");

        Ok(ChainContext {
            rpc,
            chain_id,
            observed_fees,
            latest_base_fee: block.base_fee_per_gas,
            signer_address,
            nonce,
            contract,
        })
    }
}
