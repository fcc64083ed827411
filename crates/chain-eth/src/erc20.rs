use crate::abi::{encode_function_call, AbiParam, ContractAbi};
use crate::address::parse_address;
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `balanceOf(address)`: `0x70a08231`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Function selector for `decimals()`: `0x313ce567`.
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Function selector for `name()`: `0x06fdde03`.
pub const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];

/// Function selector for `symbol()`: `0x95d89b41`.
pub const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

/// Function selector for `totalSupply()`: `0x18160ddd`.
pub const TOTAL_SUPPLY_SELECTOR: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];

/// The standard ERC-20 JSON ABI, used when a caller binds a token contract
/// without supplying its own ABI.
pub const ERC20_ABI_JSON: &str = include_str!("abi/erc20.json");

/// Parses [`ERC20_ABI_JSON`].
pub fn default_abi() -> Result<ContractAbi, EthError> {
    ContractAbi::from_json(ERC20_ABI_JSON)
}

/// Encodes a `transfer(address,uint256)`-shaped call. The selector is
/// [`TRANSFER_SELECTOR`] or one looked up in a custom ABI.
///
/// `amount` is the token amount in base units as a big-endian uint256.
pub fn encode_transfer_with(
    selector: [u8; 4],
    to: &str,
    amount: [u8; 32],
) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(to)?;
    let params = [AbiParam::Address(addr), AbiParam::Uint256(amount)];
    Ok(encode_function_call(selector, &params))
}

/// Encodes an ERC-20 `balanceOf(address)` call.
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(owner)?;
    Ok(encode_function_call(BALANCE_OF_SELECTOR, &[AbiParam::Address(addr)]))
}

/// Encodes a zero-argument call such as `decimals()` or `symbol()`.
pub fn encode_getter(selector: [u8; 4]) -> Vec<u8> {
    encode_function_call(selector, &[])
}
