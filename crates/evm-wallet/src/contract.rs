//! Token contract handle: calldata encoding and read-only ERC-20 calls.

use alloy_primitives::U256;
use chain_eth::abi::{self, ContractAbi};
use chain_eth::erc20;

use crate::error::WalletError;
use crate::rpc::{CallRequest, EvmRpc};
use crate::units::to_abi_word;

/// A token contract bound to an address and an ABI.
///
/// Selectors are taken from the ABI when it declares the function and fall
/// back to the standard ERC-20 selectors otherwise.
#[derive(Debug, Clone)]
pub struct TokenContract {
    address: String,
    abi: ContractAbi,
    transfer_selector: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

impl TokenContract {
    /// Binds `address` (already normalized) to `abi`. The ABI must expose a
    /// `transfer(address, uintN)` function.
    pub fn bind(address: impl Into<String>, abi: ContractAbi) -> Result<Self, WalletError> {
        let transfer = abi.function("transfer")?;
        if !matches!(transfer.inputs.as_slice(), [to, amount] if to.is_address() && amount.is_uint()) {
            return Err(WalletError::Abi(format!(
                "`{}` is not a token transfer; expected transfer(address,uint256)",
                transfer.signature()
            )));
        }
        let transfer_selector = abi::function_selector(&transfer.signature());
        Ok(Self {
            address: address.into(),
            abi,
            transfer_selector,
        })
    }

    /// Binds `address` to the bundled ERC-20 ABI.
    pub fn erc20(address: impl Into<String>) -> Result<Self, WalletError> {
        Self::bind(address, erc20::default_abi()?)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    pub fn transfer_selector(&self) -> [u8; 4] {
        self.transfer_selector
    }

    /// Calldata for `transfer(recipient, amount)`, `amount` in token base units.
    pub fn encode_transfer(&self, recipient: &str, amount: U256) -> Result<Vec<u8>, WalletError> {
        Ok(erc20::encode_transfer_with(self.transfer_selector, recipient, to_abi_word(amount))?)
    }

    pub async fn decimals(&self, rpc: &dyn EvmRpc) -> Result<u8, WalletError> {
        let data = self.call_getter(rpc, "decimals", erc20::DECIMALS_SELECTOR).await?;
        Ok(abi::decode_u8(&data)?)
    }

    pub async fn balance_of(&self, rpc: &dyn EvmRpc, owner: &str) -> Result<U256, WalletError> {
        let call = CallRequest::new(self.address.clone()).data(erc20::encode_balance_of(owner)?);
        let data = rpc.call(&call).await?;
        Ok(U256::from_be_bytes(abi::decode_uint256(&data)?))
    }

    pub async fn name(&self, rpc: &dyn EvmRpc) -> Result<String, WalletError> {
        let data = self.call_getter(rpc, "name", erc20::NAME_SELECTOR).await?;
        Ok(abi::decode_string(&data)?)
    }

    pub async fn symbol(&self, rpc: &dyn EvmRpc) -> Result<String, WalletError> {
        let data = self.call_getter(rpc, "symbol", erc20::SYMBOL_SELECTOR).await?;
        Ok(abi::decode_string(&data)?)
    }

    pub async fn total_supply(&self, rpc: &dyn EvmRpc) -> Result<U256, WalletError> {
        let data = self.call_getter(rpc, "totalSupply", erc20::TOTAL_SUPPLY_SELECTOR).await?;
        Ok(U256::from_be_bytes(abi::decode_uint256(&data)?))
    }

    /// Reads name, symbol, decimals and total supply concurrently.
    pub async fn token_info(&self, rpc: &dyn EvmRpc) -> Result<TokenInfo, WalletError> {
        let (name, symbol, decimals, total_supply) = tokio::try_join!(
            self.name(rpc),
            self.symbol(rpc),
            self.decimals(rpc),
            self.total_supply(rpc),
        )?;
        Ok(TokenInfo {
            address: self.address.clone(),
            name,
            symbol,
            decimals,
            total_supply,
        })
    }

    async fn call_getter(
        &self,
        rpc: &dyn EvmRpc,
        function: &str,
        fallback: [u8; 4],
    ) -> Result<Vec<u8>, WalletError> {
        let selector = self.abi.selector(function).unwrap_or(fallback);
        let call = CallRequest::new(self.address.clone()).data(erc20::encode_getter(selector));
        rpc.call(&call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    const DEAD: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn erc20_binding_uses_standard_transfer_selector() {
        let token = TokenContract::erc20(USDC).unwrap();
        assert_eq!(token.transfer_selector(), erc20::TRANSFER_SELECTOR);
        assert_eq!(token.address(), USDC);
    }

    #[test]
    fn encode_transfer_layout() {
        let token = TokenContract::erc20(USDC).unwrap();
        let data = token.encode_transfer(DEAD, U256::from(100_000u64)).unwrap();

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &erc20::TRANSFER_SELECTOR);
        assert_eq!(&data[16..36], &chain_eth::address::parse_address(DEAD).unwrap());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(100_000u64));
    }

    #[test]
    fn custom_abi_selector_is_used() {
        let abi = ContractAbi::from_json(
            r#"[{"type":"function","name":"transfer","inputs":[{"type":"address"},{"type":"uint96"}]}]"#,
        )
        .unwrap();
        let token = TokenContract::bind(USDC, abi).unwrap();
        assert_eq!(token.transfer_selector(), abi::function_selector("transfer(address,uint96)"));
    }

    #[test]
    fn transfer_with_other_inputs_is_rejected() {
        for inputs in [
            r#"[{"type":"uint256"},{"type":"address"}]"#,
            r#"[{"type":"address"},{"type":"uint256"},{"type":"bytes"}]"#,
            r#"[{"type":"address"},{"type":"string"}]"#,
            r#"[]"#,
        ] {
            let json = format!(r#"[{{"type":"function","name":"transfer","inputs":{inputs}}}]"#);
            let abi = ContractAbi::from_json(&json).unwrap();
            assert!(matches!(TokenContract::bind(USDC, abi), Err(WalletError::Abi(_))), "{inputs}");
        }
    }

    #[test]
    fn abi_without_transfer_is_rejected() {
        let abi = ContractAbi::from_json(r#"[{"type":"function","name":"approve","inputs":[]}]"#).unwrap();
        assert!(matches!(TokenContract::bind(USDC, abi), Err(WalletError::Abi(_))));
    }
}
