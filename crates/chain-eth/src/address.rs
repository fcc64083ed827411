use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Result of validating a user-supplied address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCheck {
    pub is_valid: bool,
    /// EIP-55 checksummed form; empty when `is_valid` is false.
    pub normalized: String,
}

/// Returns the 40 hex characters after the `0x` prefix, or an error
/// describing why `address` is not shaped like an EVM address.
fn hex_body(address: &str) -> Result<&str, EthError> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if body.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            body.len()
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress("address contains non-hex characters".into()));
    }

    Ok(body)
}

/// Parses a 0x-prefixed hex address into its 20 raw bytes. Checksums are not
/// verified here; use [`validate_address`] for user input.
pub fn parse_address(address: &str) -> Result<[u8; 20], EthError> {
    let body = hex_body(address)?;
    let bytes = hex::decode(body).map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Applies EIP-55 mixed-case checksum encoding.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let lower = hex_body(address)?.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        // Nibble i of the hash decides the case of character i.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

/// Validates an address string and returns its checksummed form.
///
/// All-lowercase and all-uppercase inputs carry no checksum and are accepted
/// as-is; mixed-case inputs must match their EIP-55 encoding.
pub fn validate_address(address: &str) -> AddressCheck {
    let invalid = AddressCheck { is_valid: false, normalized: String::new() };

    let body = match hex_body(address) {
        Ok(body) => body,
        Err(_) => return invalid,
    };
    let normalized = match checksum_address(address) {
        Ok(normalized) => normalized,
        Err(_) => return invalid,
    };

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && &normalized[2..] != body {
        return invalid;
    }

    AddressCheck { is_valid: true, normalized }
}

/// Returns the checksummed address or an [`EthError::InvalidAddress`].
pub fn normalize_address(address: &str) -> Result<String, EthError> {
    let check = validate_address(address);
    if check.is_valid {
        Ok(check.normalized)
    } else {
        Err(EthError::InvalidAddress(format!("`{address}` is not a valid EVM address")))
    }
}

/// Derives the checksummed address of a secp256k1 public key.
///
/// The address is the last 20 bytes of keccak256 over the 64-byte
/// uncompressed point (without the 0x04 tag).
pub fn public_key_to_address(public_key: &PublicKey) -> Result<String, EthError> {
    let uncompressed = public_key.to_encoded_point(false);
    let bytes = uncompressed.as_bytes();
    if bytes.len() != 65 || bytes[0] != 0x04 {
        return Err(EthError::InvalidPublicKey("expected a 65-byte uncompressed point".into()));
    }

    let hash = Keccak256::digest(&bytes[1..]);
    checksum_address(&format!("0x{}", hex::encode(&hash[12..])))
}
