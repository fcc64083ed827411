//! secp256k1 key handling: BIP-39 mnemonics, BIP-32 derivation and the
//! zeroizing private-key wrapper used by the signer.

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use k256::ecdsa::SigningKey;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::address::public_key_to_address;
use crate::error::EthError;

/// Default BIP-44 path for the first EVM account.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// A secp256k1 private key, wiped from memory on drop.
#[derive(Clone)]
pub struct PrivateKey(Zeroizing<[u8; 32]>);

impl PrivateKey {
    /// Wraps raw key bytes, rejecting zero and out-of-range scalars.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, EthError> {
        let key = Self(Zeroizing::new(bytes));
        key.signing_key()?;
        Ok(key)
    }

    /// Parses a 64-character hex key, with or without `0x`.
    pub fn from_hex(hex_key: &str) -> Result<Self, EthError> {
        let trimmed = hex_key.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let decoded = Zeroizing::new(
            hex::decode(body).map_err(|e| EthError::InvalidPrivateKey(format!("invalid hex: {e}")))?,
        );
        if decoded.len() != 32 {
            return Err(EthError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                decoded.len()
            )));
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn signing_key(&self) -> Result<SigningKey, EthError> {
        let bytes: &[u8; 32] = &self.0;
        SigningKey::from_bytes(bytes.into())
            .map_err(|e| EthError::InvalidPrivateKey(e.to_string()))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Address and compressed public key derived from a private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub address: String,
    /// `0x`-prefixed 33-byte SEC1 compressed public key.
    pub public_key: String,
}

/// Derives the checksummed address and public key of `key`.
pub fn new_address(key: &PrivateKey) -> Result<NewAddress, EthError> {
    let signing_key = key.signing_key()?;
    let public_key = k256::PublicKey::from(signing_key.verifying_key());
    let compressed = signing_key.verifying_key().to_sec1_bytes();

    Ok(NewAddress {
        address: public_key_to_address(&public_key)?,
        public_key: format!("0x{}", hex::encode(compressed)),
    })
}

/// Generates a fresh English mnemonic with 12, 15, 18, 21 or 24 words.
pub fn generate_mnemonic(word_count: usize) -> Result<String, EthError> {
    if !(12..=24).contains(&word_count) || word_count % 3 != 0 {
        return Err(EthError::InvalidMnemonic(format!(
            "unsupported word count {word_count}"
        )));
    }

    // 32 bits of entropy per 3 words.
    let mut entropy = Zeroizing::new(vec![0u8; word_count / 3 * 4]);
    rand::rngs::OsRng.fill_bytes(entropy.as_mut_slice());
    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy.as_slice())
        .map_err(|e| EthError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derives the private key at `path` (BIP-32) from a BIP-39 mnemonic with an
/// empty passphrase.
pub fn derive_private_key(mnemonic: &str, path: &str) -> Result<PrivateKey, EthError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, mnemonic)
        .map_err(|e| EthError::InvalidMnemonic(e.to_string()))?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let path: DerivationPath = path
        .parse()
        .map_err(|e: bip32::Error| EthError::DerivationFailed(e.to_string()))?;
    let xprv = XPrv::derive_from_path(seed.as_slice(), &path)
        .map_err(|e| EthError::DerivationFailed(e.to_string()))?;

    let mut bytes: [u8; 32] = xprv.to_bytes().into();
    let key = PrivateKey::from_bytes(bytes);
    bytes.zeroize();
    key.map_err(|e| EthError::DerivationFailed(e.to_string()))
}
