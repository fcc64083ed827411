//! Key, address and signing operations the wallet delegates.

use chain_eth::address::{self, AddressCheck};
use chain_eth::keys::{self, NewAddress};
use chain_eth::transaction::{self, EthTransaction, SignedEthTransaction, TxFee};
use chain_eth::PrivateKey;

use crate::error::WalletError;
use crate::fees::FeePricing;
use crate::sign_params::SignableTransaction;

pub trait WalletCrypto: Send + Sync {
    fn derive_private_key(&self, mnemonic: &str, path: &str) -> Result<PrivateKey, WalletError>;

    fn new_address(&self, key: &PrivateKey) -> Result<NewAddress, WalletError>;

    fn validate_address(&self, address: &str) -> AddressCheck;

    fn sign_transaction(
        &self,
        key: &PrivateKey,
        tx: &SignableTransaction,
    ) -> Result<SignedEthTransaction, WalletError>;

    fn address_of(&self, key: &PrivateKey) -> Result<String, WalletError> {
        Ok(self.new_address(key)?.address)
    }

    /// Checksummed form of `address`, or `InvalidAddress`.
    fn normalize_address(&self, address: &str) -> Result<String, WalletError> {
        let check = self.validate_address(address);
        if check.is_valid {
            Ok(check.normalized)
        } else {
            Err(WalletError::InvalidAddress(address.to_string()))
        }
    }
}

/// [`WalletCrypto`] backed by the in-process `chain-eth` signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCrypto;

impl WalletCrypto for LocalCrypto {
    fn derive_private_key(&self, mnemonic: &str, path: &str) -> Result<PrivateKey, WalletError> {
        Ok(keys::derive_private_key(mnemonic, path)?)
    }

    fn new_address(&self, key: &PrivateKey) -> Result<NewAddress, WalletError> {
        Ok(keys::new_address(key)?)
    }

    fn validate_address(&self, address: &str) -> AddressCheck {
        address::validate_address(address)
    }

    fn sign_transaction(
        &self,
        key: &PrivateKey,
        tx: &SignableTransaction,
    ) -> Result<SignedEthTransaction, WalletError> {
        let value = u128::try_from(tx.value)
            .map_err(|_| WalletError::SigningFailed(format!("value {} exceeds u128", tx.value)))?;
        let fee = match tx.pricing {
            FeePricing::Legacy { gas_price } => TxFee::Legacy { gas_price },
            FeePricing::Dynamic { max_fee_per_gas, max_priority_fee_per_gas } => TxFee::Eip1559 {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            },
        };

        let eth_tx = EthTransaction {
            chain_id: tx.chain_id,
            nonce: tx.nonce,
            fee,
            gas_limit: tx.gas_limit,
            to: tx.to.clone(),
            value,
            data: tx.data.clone(),
        };
        transaction::sign_transaction(&eth_tx, key)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))
    }
}
