use std::sync::Arc;

use alloy_primitives::U256;
use chain_eth::keys::{self, DEFAULT_DERIVATION_PATH};
use chain_eth::PrivateKey;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use zeroize::Zeroizing;

use crate::call::{CallOutcome, ContractCall, ContractCaller};
use crate::config::WalletConfig;
use crate::context::{ChainContext, ContextRequest, ContextResolver};
use crate::contract::{TokenContract, TokenInfo};
use crate::crypto::{LocalCrypto, WalletCrypto};
use crate::error::{TransferError, WalletError};
use crate::fees::{self, FeeEstimate};
use crate::request::TransferOptions;
use crate::rpc::{Connector, HttpConnector};
use crate::transfer::{BroadcastResult, TransferOrchestrator};
use crate::units::{parse_amount, to_base_units, to_display_units};

/// Word count of mnemonics made by [`EvmWallet::generate_wallet`].
pub const DEFAULT_MNEMONIC_WORDS: usize = 12;

/// A freshly generated or recovered account.
pub struct GeneratedWallet {
    pub mnemonic: Zeroizing<String>,
    pub derivation_path: String,
    pub address: String,
    pub public_key: String,
    pub private_key: PrivateKey,
}

impl std::fmt::Debug for GeneratedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedWallet")
            .field("derivation_path", &self.derivation_path)
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Entry point for EVM balance reads, fee estimates and transfers.
pub struct EvmWallet {
    config: WalletConfig,
    crypto: Arc<dyn WalletCrypto>,
    resolver: ContextResolver,
}

impl EvmWallet {
    /// HTTP JSON-RPC transport and the local `chain-eth` signer.
    pub fn new(config: WalletConfig) -> Self {
        Self::with_parts(config, Arc::new(HttpConnector), Arc::new(LocalCrypto))
    }

    pub fn with_parts(
        config: WalletConfig,
        connector: Arc<dyn Connector>,
        crypto: Arc<dyn WalletCrypto>,
    ) -> Self {
        let resolver = ContextResolver::new(config.clone(), connector, Arc::clone(&crypto));
        Self {
            config,
            crypto,
            resolver,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub async fn resolve_context(&self, request: ContextRequest<'_>) -> Result<ChainContext, WalletError> {
        self.resolver.resolve(request).await
    }

    /// Prices a transfer of `amount` to `recipient` without signing it.
    ///
    /// With a contract bound in `ctx` the estimate is for the token's
    /// `transfer` call; otherwise for a native transfer carrying `data`.
    #[instrument(skip_all, fields(chain_id = ctx.chain_id, recipient = %recipient))]
    pub async fn estimate_fees(
        &self,
        ctx: &ChainContext,
        recipient: &str,
        amount: &str,
        data: Option<&[u8]>,
    ) -> Result<FeeEstimate, WalletError> {
        let recipient = self.crypto.normalize_address(recipient)?;
        let amount = parse_amount(amount)?;

        match &ctx.contract {
            Some(token) => {
                let decimals = token.decimals(ctx.rpc.as_ref()).await?;
                let calldata = token.encode_transfer(&recipient, to_base_units(amount, decimals)?)?;
                fees::estimate(ctx, token.address(), U256::ZERO, &calldata).await
            }
            None => {
                let value = to_base_units(amount, self.config.native_decimals)?;
                fees::estimate(ctx, &recipient, value, data.unwrap_or_default()).await
            }
        }
    }

    /// Validates, prices, signs and broadcasts a transfer.
    pub async fn transfer(
        &self,
        key: &PrivateKey,
        recipient: &str,
        amount: &str,
        options: TransferOptions,
    ) -> Result<BroadcastResult, TransferError> {
        TransferOrchestrator::new(&self.resolver, self.crypto.as_ref(), self.config.native_decimals)
            .execute(key, recipient, amount, options)
            .await
    }

    /// Reads from or writes to an arbitrary contract method. Writes are
    /// signed with `key`; reads ignore the fee, nonce and value fields.
    pub async fn contract_call(
        &self,
        key: Option<&PrivateKey>,
        call: ContractCall,
    ) -> Result<CallOutcome, TransferError> {
        ContractCaller::new(&self.resolver, self.crypto.as_ref(), self.config.native_decimals)
            .execute(key, call)
            .await
    }

    /// Native balance of `address`, or its balance of `contract_address`,
    /// in display units.
    #[instrument(skip_all, fields(address = %address, token = contract_address))]
    pub async fn get_balance(
        &self,
        address: &str,
        contract_address: Option<&str>,
        rpc_url: Option<&str>,
    ) -> Result<Decimal, WalletError> {
        let address = self.crypto.normalize_address(address)?;
        let rpc = self.resolver.connect(rpc_url)?;

        match contract_address {
            Some(contract) => {
                let token = TokenContract::erc20(self.crypto.normalize_address(contract)?)?;
                let (raw, decimals) =
                    tokio::try_join!(token.balance_of(rpc.as_ref(), &address), token.decimals(rpc.as_ref()))?;
                to_display_units(raw, decimals)
            }
            None => {
                let raw = rpc.balance(&address).await?;
                to_display_units(raw, self.config.native_decimals)
            }
        }
    }

    #[instrument(skip_all, fields(token = %contract_address))]
    pub async fn get_token_info(
        &self,
        contract_address: &str,
        rpc_url: Option<&str>,
    ) -> Result<TokenInfo, WalletError> {
        let token = TokenContract::erc20(self.crypto.normalize_address(contract_address)?)?;
        let rpc = self.resolver.connect(rpc_url)?;
        token.token_info(rpc.as_ref()).await
    }

    pub fn generate_mnemonic(word_count: usize) -> Result<Zeroizing<String>, WalletError> {
        Ok(Zeroizing::new(keys::generate_mnemonic(word_count)?))
    }

    /// Derives an account from `mnemonic`, or from a new 12-word mnemonic
    /// when none is given, at `path` (default `m/44'/60'/0'/0/0`).
    pub fn generate_wallet(
        &self,
        mnemonic: Option<&str>,
        path: Option<&str>,
    ) -> Result<GeneratedWallet, WalletError> {
        let mnemonic = match mnemonic {
            Some(phrase) => Zeroizing::new(phrase.trim().to_string()),
            None => Self::generate_mnemonic(DEFAULT_MNEMONIC_WORDS)?,
        };
        let derivation_path = path.unwrap_or(DEFAULT_DERIVATION_PATH).to_string();

        let private_key = self.crypto.derive_private_key(&mnemonic, &derivation_path)?;
        let account = self.crypto.new_address(&private_key)?;
        info!(address = %account.address, path = %derivation_path, "wallet derived");

        Ok(GeneratedWallet {
            mnemonic,
            derivation_path,
            address: account.address,
            public_key: account.public_key,
            private_key,
        })
    }
}
