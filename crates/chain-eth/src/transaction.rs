use alloy_rlp::{BufMut, Encodable, RlpEncodable, EMPTY_LIST_CODE};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature};
use sha3::{Digest, Keccak256};

use crate::address::parse_address;
use crate::error::EthError;
use crate::keys::PrivateKey;

/// EIP-2718 type byte of a dynamic-fee transaction.
const EIP1559_TX_TYPE: u8 = 0x02;

/// How the transaction pays for gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFee {
    /// Pre-London single gas price (type 0, EIP-155 replay protected).
    Legacy { gas_price: u128 },
    /// Base fee plus tip (type 2).
    Eip1559 {
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    },
}

impl TxFee {
    /// EIP-2718 transaction type: 0 for legacy, 2 for dynamic fee.
    pub fn tx_type(&self) -> u8 {
        match self {
            TxFee::Legacy { .. } => 0,
            TxFee::Eip1559 { .. } => EIP1559_TX_TYPE,
        }
    }
}

/// An unsigned EVM transaction.
#[derive(Debug, Clone)]
pub struct EthTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub fee: TxFee,
    pub gas_limit: u64,
    /// Target address as a 0x-prefixed hex string.
    pub to: String,
    /// Native value in wei.
    pub value: u128,
    /// Calldata (empty for plain native transfers).
    pub data: Vec<u8>,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
pub struct SignedEthTransaction {
    /// Raw bytes: RLP list for legacy, `0x02 || rlp` for EIP-1559.
    pub raw_tx: Vec<u8>,
    /// Keccak-256 of `raw_tx`, 0x-prefixed.
    pub tx_hash: String,
}

/// Returns the payload whose keccak256 is signed.
///
/// - legacy: `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`
/// - EIP-1559: `0x02 || rlp([chainId, nonce, tip, maxFee, gas, to, value, data, accessList])`
pub fn encode_unsigned_tx(tx: &EthTransaction) -> Result<Vec<u8>, EthError> {
    let to = RlpAddress(parse_address(&tx.to)?);
    let data = RlpBytes(tx.data.clone());
    let mut out = Vec::new();

    match tx.fee {
        TxFee::Legacy { gas_price } => {
            LegacySigningFields {
                nonce: tx.nonce,
                gas_price,
                gas_limit: tx.gas_limit,
                to,
                value: tx.value,
                data,
                chain_id: tx.chain_id,
                zero_r: 0,
                zero_s: 0,
            }
            .encode(&mut out);
        }
        TxFee::Eip1559 { max_priority_fee_per_gas, max_fee_per_gas } => {
            out.push(EIP1559_TX_TYPE);
            Eip1559UnsignedFields {
                chain_id: tx.chain_id,
                nonce: tx.nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit: tx.gas_limit,
                to,
                value: tx.value,
                data,
                access_list: EmptyList,
            }
            .encode(&mut out);
        }
    }

    Ok(out)
}

/// Signs `tx` with `key` and returns the broadcastable bytes and hash.
pub fn sign_transaction(
    tx: &EthTransaction,
    key: &PrivateKey,
) -> Result<SignedEthTransaction, EthError> {
    if let TxFee::Eip1559 { max_priority_fee_per_gas, max_fee_per_gas } = tx.fee {
        if max_fee_per_gas < max_priority_fee_per_gas {
            return Err(EthError::TransactionBuildError(format!(
                "max fee {max_fee_per_gas} is below priority fee {max_priority_fee_per_gas}"
            )));
        }
    }

    let payload = encode_unsigned_tx(tx)?;
    let msg_hash = Keccak256::digest(&payload);

    let signing_key = key.signing_key()?;
    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(msg_hash.as_slice())
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let y_parity = u64::from(recovery_id.is_y_odd());
    let r = RlpU256(signature.r().to_bytes().into());
    let s = RlpU256(signature.s().to_bytes().into());
    let to = RlpAddress(parse_address(&tx.to)?);
    let data = RlpBytes(tx.data.clone());

    let mut raw_tx = Vec::new();
    match tx.fee {
        TxFee::Legacy { gas_price } => {
            // EIP-155: v = chain_id * 2 + 35 + y_parity.
            let v = tx
                .chain_id
                .checked_mul(2)
                .and_then(|v| v.checked_add(35 + y_parity))
                .ok_or_else(|| EthError::TransactionBuildError("chain id too large".into()))?;
            LegacySignedFields {
                nonce: tx.nonce,
                gas_price,
                gas_limit: tx.gas_limit,
                to,
                value: tx.value,
                data,
                v,
                r,
                s,
            }
            .encode(&mut raw_tx);
        }
        TxFee::Eip1559 { max_priority_fee_per_gas, max_fee_per_gas } => {
            raw_tx.push(EIP1559_TX_TYPE);
            Eip1559SignedFields {
                chain_id: tx.chain_id,
                nonce: tx.nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit: tx.gas_limit,
                to,
                value: tx.value,
                data,
                access_list: EmptyList,
                y_parity,
                r,
                s,
            }
            .encode(&mut raw_tx);
        }
    }

    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw_tx)));
    Ok(SignedEthTransaction { raw_tx, tx_hash })
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct LegacySigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    chain_id: u64,
    zero_r: u8,
    zero_s: u8,
}

#[derive(RlpEncodable)]
struct LegacySignedFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

#[derive(RlpEncodable)]
struct Eip1559UnsignedFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    access_list: EmptyList,
}

#[derive(RlpEncodable)]
struct Eip1559SignedFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    access_list: EmptyList,
    y_parity: u64,
    r: RlpU256,
    s: RlpU256,
}

/// 20-byte address encoded as an RLP string.
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// Arbitrary calldata encoded as an RLP string.
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// 256-bit big-endian integer, encoded with leading zeros stripped.
struct RlpU256([u8; 32]);

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}

/// The empty EIP-2930 access list.
struct EmptyList;

impl Encodable for EmptyList {
    fn encode(&self, out: &mut dyn BufMut) {
        out.put_u8(EMPTY_LIST_CODE);
    }

    fn length(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

    fn test_key() -> PrivateKey {
        let mut key = [0u8; 32];
        key[31] = 1;
        PrivateKey::from_bytes(key).unwrap()
    }

    fn dynamic_fee() -> TxFee {
        TxFee::Eip1559 {
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 50_000_000_000,
        }
    }

    fn native_transfer(chain_id: u64, value: u128, fee: TxFee) -> EthTransaction {
        EthTransaction {
            chain_id,
            nonce: 0,
            fee,
            gas_limit: 21_000,
            to: TEST_ADDRESS.to_string(),
            value,
            data: Vec::new(),
        }
    }

    #[test]
    fn tx_type_tags() {
        assert_eq!(TxFee::Legacy { gas_price: 1 }.tx_type(), 0);
        assert_eq!(dynamic_fee().tx_type(), 2);
    }

    #[test]
    fn token_call_payload_carries_calldata() {
        let mut amount = [0u8; 32];
        amount[31] = 100;
        let tx = EthTransaction {
            chain_id: 1,
            nonce: 5,
            fee: dynamic_fee(),
            gas_limit: 65_000,
            to: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".into(),
            value: 0,
            data: crate::erc20::encode_transfer_with(crate::erc20::TRANSFER_SELECTOR, TEST_ADDRESS, amount)
                .unwrap(),
        };

        let encoded = encode_unsigned_tx(&tx).unwrap();
        let needle = hex::encode(&tx.data);
        assert!(hex::encode(&encoded).contains(&needle));
    }

    #[test]
    fn invalid_target_address_is_rejected() {
        let mut tx = native_transfer(1, 0, dynamic_fee());
        tx.to = "bad-address".into();
        assert!(encode_unsigned_tx(&tx).is_err());
        assert!(sign_transaction(&tx, &test_key()).is_err());
    }

    #[test]
    fn unsigned_eip1559_starts_with_type_byte() {
        let tx = native_transfer(1, 0, dynamic_fee());
        let encoded = encode_unsigned_tx(&tx).unwrap();
        assert_eq!(encoded[0], 0x02);
    }

    #[test]
    fn unsigned_legacy_is_rlp_list() {
        let tx = native_transfer(1, 0, TxFee::Legacy { gas_price: 1 });
        let encoded = encode_unsigned_tx(&tx).unwrap();
        assert!(encoded[0] >= 0xc0, "legacy payload must be a bare RLP list");
    }

    #[test]
    fn legacy_eip155_reference_vector() {
        // Example from EIP-155: nonce 9, 20 gwei, 21000 gas, 1 ether, chain 1.
        let tx = EthTransaction {
            chain_id: 1,
            nonce: 9,
            fee: TxFee::Legacy { gas_price: 20_000_000_000 },
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".into(),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        };

        let encoded = encode_unsigned_tx(&tx).unwrap();
        assert_eq!(
            hex::encode(&encoded),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );

        let key = PrivateKey::from_hex(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let signed = sign_transaction(&tx, &key).unwrap();
        assert_eq!(
            hex::encode(&signed.raw_tx),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn sign_eip1559_produces_hash() {
        let tx = native_transfer(1, 1_000_000_000_000_000_000, dynamic_fee());
        let signed = sign_transaction(&tx, &test_key()).unwrap();

        assert_eq!(signed.raw_tx[0], 0x02);
        assert!(signed.tx_hash.starts_with("0x"));
        assert_eq!(signed.tx_hash.len(), 66);
    }

    #[test]
    fn sign_is_deterministic() {
        let tx = native_transfer(1, 0, dynamic_fee());
        let a = sign_transaction(&tx, &test_key()).unwrap();
        let b = sign_transaction(&tx, &test_key()).unwrap();
        assert_eq!(a.raw_tx, b.raw_tx);
        assert_eq!(a.tx_hash, b.tx_hash);
    }

    #[test]
    fn different_chains_differ() {
        let tx1 = native_transfer(1, 0, TxFee::Legacy { gas_price: 100 });
        let tx2 = native_transfer(137, 0, TxFee::Legacy { gas_price: 100 });

        let s1 = sign_transaction(&tx1, &test_key()).unwrap();
        let s2 = sign_transaction(&tx2, &test_key()).unwrap();
        assert_ne!(s1.raw_tx, s2.raw_tx);
    }

    #[test]
    fn inverted_dynamic_fee_is_rejected() {
        let fee = TxFee::Eip1559 { max_priority_fee_per_gas: 10, max_fee_per_gas: 5 };
        let tx = native_transfer(1, 0, fee);
        assert!(matches!(
            sign_transaction(&tx, &test_key()),
            Err(EthError::TransactionBuildError(_))
        ));
    }

    #[test]
    fn empty_list_encodes_as_c0() {
        let mut buf = Vec::new();
        EmptyList.encode(&mut buf);
        assert_eq!(buf, vec![0xc0]);
    }

    #[test]
    fn rlp_u256_zero_encodes_as_empty_string() {
        let mut buf = Vec::new();
        RlpU256([0u8; 32]).encode(&mut buf);
        assert_eq!(buf, vec![0x80]);
    }

    #[test]
    fn rlp_bytes_encodes_as_string() {
        let mut buf = Vec::new();
        RlpBytes(vec![0xaa, 0xbb]).encode(&mut buf);
        assert_eq!(buf, vec![0x82, 0xaa, 0xbb]);
    }
}
