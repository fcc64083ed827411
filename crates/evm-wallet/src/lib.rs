//! EVM wallet: fee-model resolution and transfer construction.
//!
//! A transfer flows through
//!
//! 1. [`context::ContextResolver`] which reads fee data, nonce and chain id
//!    from the node and binds the token contract if any,
//! 2. [`transfer::resolve_shape`] which picks target, value, calldata and gas,
//! 3. [`fees::estimate`] which runs only when the caller gave no fee fields,
//! 4. [`sign_params::SignParamsBuilder`] which emits a type 0 or type 2
//!    transaction for the [`crypto::WalletCrypto`] signer,
//! 5. the node's `eth_sendRawTransaction`.
//!
//! [`EvmWallet`] ties these together and adds balance, token info, generic
//! contract calls and key generation helpers.

pub mod call;
pub mod config;
pub mod context;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod fees;
pub mod request;
pub mod rpc;
pub mod sign_params;
pub mod transfer;
pub mod units;
pub mod wallet;

pub use call::{CallOutcome, ContractCall, MethodType};
pub use config::WalletConfig;
pub use context::{ChainContext, ContextRequest};
pub use error::{Stage, TransferError, WalletError};
pub use fees::{FeeEstimate, FeeModel, FeePricing, FeeQuote, FeeSignals};
pub use request::{FeeOverride, TransferOptions};
pub use transfer::BroadcastResult;
pub use wallet::{EvmWallet, GeneratedWallet};

pub use chain_eth::PrivateKey;
