use std::fmt;

use chain_eth::EthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC URL is required")]
    MissingRpcUrl,

    #[error("Not a contract: no code deployed at {0}")]
    NotAContract(String),

    #[error("Conflicting fee fields: gasPrice cannot be combined with maxFeePerGas or maxPriorityFeePerGas")]
    ConflictingFeeFields,

    #[error("Invalid fee config: maxFeePerGas ({max_fee} wei) must be >= maxPriorityFeePerGas ({priority_fee} wei)")]
    InvertedFeePriority { max_fee: u128, priority_fee: u128 },

    #[error("Fee signal unavailable: provider returned no gas price and no dynamic fee data")]
    FeeSignalUnavailable,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Nonce unavailable: no signer was resolved and no nonce override given")]
    MissingNonce,

    #[error("Signer required: write calls need a private key")]
    MissingSigner,

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<EthError> for WalletError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidAddress(msg) => WalletError::InvalidAddress(msg),
            EthError::InvalidMnemonic(msg) => WalletError::InvalidMnemonic(msg),
            EthError::DerivationFailed(msg) => WalletError::DerivationFailed(msg),
            EthError::AbiError(msg) => WalletError::Abi(msg),
            other => WalletError::SigningFailed(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        WalletError::Rpc(e.to_string())
    }
}

impl From<alloy_transport::TransportError> for WalletError {
    fn from(e: alloy_transport::TransportError) -> Self {
        WalletError::Rpc(e.to_string())
    }
}

/// Step of the transfer pipeline an error was raised in.
///
/// Every stage before [`Stage::Broadcast`] fails before anything leaves the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Validating,
    ShapeResolved,
    FeeResolved,
    Signed,
    Broadcast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::ShapeResolved => "shape resolution",
            Stage::FeeResolved => "fee resolution",
            Stage::Signed => "signing",
            Stage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// A [`WalletError`] tagged with the pipeline stage that produced it.
#[derive(Debug, Error)]
#[error("transfer failed during {stage}: {source}")]
pub struct TransferError {
    pub stage: Stage,
    #[source]
    pub source: WalletError,
}

impl TransferError {
    pub fn new(stage: Stage, source: WalletError) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> &WalletError {
        &self.source
    }

    /// True when the failure happened before the signed bytes were handed
    /// to the broadcaster.
    pub fn nothing_sent(&self) -> bool {
        self.stage < Stage::Broadcast
    }
}

pub(crate) trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T, TransferError>;
}

impl<T> StageExt<T> for Result<T, WalletError> {
    fn at(self, stage: Stage) -> Result<T, TransferError> {
        self.map_err(|e| TransferError::new(stage, e))
    }
}
