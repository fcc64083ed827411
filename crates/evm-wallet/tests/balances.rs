mod common;

use std::str::FromStr;

use alloy_primitives::U256;
use common::*;
use evm_wallet::{EvmWallet, WalletError};
use rust_decimal::Decimal;

#[tokio::test]
async fn native_balance_in_ether() {
    let mut rpc = MockRpc::dynamic();
    rpc.balances
        .insert(SIGNER.to_lowercase(), U256::from(1_500_000_000_000_000_000u128));
    let h = harness(rpc);

    let balance = h.wallet.get_balance(SIGNER, None, None).await.unwrap();
    assert_eq!(balance, Decimal::from_str("1.5").unwrap());
}

#[tokio::test]
async fn token_balance_uses_token_decimals() {
    let h = harness(MockRpc::dynamic());

    let balance = h.wallet.get_balance(SIGNER, Some(TOKEN), None).await.unwrap();
    // 2_500_000 raw at 6 decimals.
    assert_eq!(balance, Decimal::from_str("2.5").unwrap());
}

#[tokio::test]
async fn balance_of_unknown_account_is_zero() {
    let h = harness(MockRpc::dynamic());
    assert_eq!(h.wallet.get_balance(RECIPIENT, None, None).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn balance_rejects_bad_address() {
    let h = harness(MockRpc::dynamic());
    let err = h.wallet.get_balance("nope", None, None).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}

#[tokio::test]
async fn token_info_reads_all_fields() {
    let h = harness(MockRpc::dynamic());

    let info = h.wallet.get_token_info(&TOKEN.to_lowercase(), None).await.unwrap();

    assert_eq!(info.address, TOKEN);
    assert_eq!(info.name, "USD Coin");
    assert_eq!(info.symbol, "USDC");
    assert_eq!(info.decimals, 6);
    assert_eq!(info.total_supply, U256::from(1_000_000_000_000u64));
    assert_eq!(h.rpc.calls().len(), 4);
}

#[test]
fn generated_mnemonics_have_requested_length() {
    for words in [12, 15, 18, 21, 24] {
        let mnemonic = EvmWallet::generate_mnemonic(words).unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), words);
    }
    assert!(matches!(EvmWallet::generate_mnemonic(13), Err(WalletError::InvalidMnemonic(_))));
}
