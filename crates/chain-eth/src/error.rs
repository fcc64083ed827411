use thiserror::Error;

/// Errors raised by the EVM key, address, ABI and signing primitives.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("abi error: {0}")]
    AbiError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_private_key() {
        let err = EthError::InvalidPrivateKey("key too short".into());
        assert_eq!(err.to_string(), "invalid private key: key too short");
    }

    #[test]
    fn display_invalid_address() {
        let err = EthError::InvalidAddress("bad checksum".into());
        assert_eq!(err.to_string(), "invalid address: bad checksum");
    }

    #[test]
    fn display_invalid_mnemonic() {
        let err = EthError::InvalidMnemonic("unknown word".into());
        assert_eq!(err.to_string(), "invalid mnemonic: unknown word");
    }

    #[test]
    fn display_derivation_failed() {
        let err = EthError::DerivationFailed("bad path".into());
        assert_eq!(err.to_string(), "key derivation failed: bad path");
    }

    #[test]
    fn display_signing_error() {
        let err = EthError::SigningError("invalid signature".into());
        assert_eq!(err.to_string(), "signing error: invalid signature");
    }

    #[test]
    fn display_abi_error() {
        let err = EthError::AbiError("no function `mint`".into());
        assert_eq!(err.to_string(), "abi error: no function `mint`");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(EthError::TransactionBuildError("missing nonce".into()));
        assert!(err.to_string().contains("missing nonce"));
    }
}
