//! EVM key, address and transaction primitives.
//!
//! This crate provides:
//! - BIP-39 / BIP-32 key derivation and a zeroizing private-key type
//! - Address derivation and EIP-55 validation
//! - Legacy (EIP-155) and EIP-1559 transaction encoding and signing
//! - ERC-20 call encoding and a small JSON-ABI selector lookup

pub mod abi;
pub mod address;
pub mod erc20;
pub mod error;
pub mod keys;
pub mod transaction;

pub use error::EthError;
pub use keys::PrivateKey;
