//! Wallet configuration.
//!
//! Loaded from TOML, optionally overridden from the environment:
//!
//! ```toml
//! rpc_url = "https://ethereum-sepolia-rpc.publicnode.com"
//! chain_id = 11155111
//! timeout_ms = 30000
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::WalletError;

/// Environment variable overriding [`WalletConfig::rpc_url`].
pub const ENV_RPC_URL: &str = "EVM_RPC_URL";
/// Environment variable overriding [`WalletConfig::chain_id`].
pub const ENV_CHAIN_ID: &str = "EVM_CHAIN_ID";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_NATIVE_DECIMALS: u8 = 18;
/// 10^77 is the largest power of ten a uint256 holds.
const MAX_NATIVE_DECIMALS: u8 = 77;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalletConfig {
    /// Fallback endpoint when a call does not pass one explicitly.
    pub rpc_url: Option<String>,
    /// When unset the chain id is read with `eth_chainId`.
    pub chain_id: Option<u64>,
    /// Transport timeout for every RPC round-trip.
    pub timeout_ms: u64,
    /// Decimals of the chain's native currency.
    pub native_decimals: u8,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            native_decimals: DEFAULT_NATIVE_DECIMALS,
        }
    }
}

impl WalletConfig {
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(rpc_url.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, WalletError> {
        let config: Self = toml::from_str(source).map_err(|e| WalletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `EVM_RPC_URL` / `EVM_CHAIN_ID` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, WalletError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, WalletError> {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|u| !u.trim().is_empty()) {
            self.rpc_url = Some(url);
        }
        if let Some(raw) = lookup(ENV_CHAIN_ID) {
            let chain_id = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| WalletError::Config(format!("{ENV_CHAIN_ID}={raw}: {e}")))?;
            self.chain_id = Some(chain_id);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Picks the explicit endpoint if given, else the configured one. Blank
    /// values count as absent.
    pub fn resolve_rpc_url(&self, explicit: Option<&str>) -> Result<String, WalletError> {
        let non_blank = |url: &str| Some(url.trim()).filter(|url| !url.is_empty()).map(str::to_string);
        explicit
            .and_then(non_blank)
            .or_else(|| self.rpc_url.as_deref().and_then(non_blank))
            .ok_or(WalletError::MissingRpcUrl)
    }

    fn validate(&self) -> Result<(), WalletError> {
        if self.timeout_ms == 0 {
            return Err(WalletError::Config("timeout_ms must be greater than zero".into()));
        }
        if self.native_decimals > MAX_NATIVE_DECIMALS {
            return Err(WalletError::Config(format!(
                "native_decimals {} exceeds the supported maximum of {MAX_NATIVE_DECIMALS}",
                self.native_decimals
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WalletConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.native_decimals, 18);
        assert!(config.rpc_url.is_none());
    }

    #[test]
    fn parses_toml() {
        let config = WalletConfig::from_toml_str(
            r#"
            rpc_url = "https://rpc.example"
            chain_id = 11155111
            timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc_url.as_deref(), Some("https://rpc.example"));
        assert_eq!(config.chain_id, Some(11155111));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.native_decimals, 18);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_timeout() {
        assert!(WalletConfig::from_toml_str("rpc = \"x\"").is_err());
        assert!(WalletConfig::from_toml_str("timeout_ms = 0").is_err());
    }

    #[test]
    fn overrides_replace_values() {
        let config = WalletConfig::with_rpc_url("https://a.example")
            .with_overrides(|key| match key {
                ENV_RPC_URL => Some("https://b.example".into()),
                ENV_CHAIN_ID => Some("137".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.rpc_url.as_deref(), Some("https://b.example"));
        assert_eq!(config.chain_id, Some(137));
    }

    #[test]
    fn bad_chain_id_override_fails() {
        let result = WalletConfig::default()
            .with_overrides(|key| (key == ENV_CHAIN_ID).then(|| "mainnet".to_string()));
        assert!(matches!(result, Err(WalletError::Config(_))));
    }

    #[test]
    fn explicit_rpc_url_wins() {
        let config = WalletConfig::with_rpc_url("https://stored.example");
        assert_eq!(config.resolve_rpc_url(Some("https://explicit.example")).unwrap(), "https://explicit.example");
        assert_eq!(config.resolve_rpc_url(None).unwrap(), "https://stored.example");
    }

    #[test]
    fn missing_rpc_url() {
        let config = WalletConfig::default();
        assert!(matches!(config.resolve_rpc_url(None), Err(WalletError::MissingRpcUrl)));
        assert!(matches!(config.resolve_rpc_url(Some("  ")), Err(WalletError::MissingRpcUrl)));
    }

    #[test]
    fn blank_explicit_rpc_url_falls_back_to_stored() {
        let config = WalletConfig::with_rpc_url("https://stored.example");
        assert_eq!(config.resolve_rpc_url(Some("")).unwrap(), "https://stored.example");
        assert_eq!(config.resolve_rpc_url(Some("   ")).unwrap(), "https://stored.example");
    }

    #[test]
    fn native_decimals_limit() {
        assert!(WalletConfig::from_toml_str("native_decimals = 77").is_ok());
        assert!(WalletConfig::from_toml_str("native_decimals = 78").is_err());
    }
}
