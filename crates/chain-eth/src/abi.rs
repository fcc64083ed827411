//! Minimal ABI support for EVM contract calls.
//!
//! Covers what token transfers and simple contract calls need: static-word
//! encoding of call arguments, selector lookup from a JSON ABI, and decoding
//! of `uint256` / `string` return values. Dynamic argument types (`string`,
//! `bytes`, arrays, tuples) are not encoded.

use std::str::FromStr;

use alloy_primitives::{I256, U256};
use serde::Deserialize;
use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::address::parse_address;
use crate::error::EthError;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer as a big-endian 32-byte array.
    Uint256([u8; 32]),
    /// A two's-complement signed integer, sign-extended to 32 bytes.
    Int256([u8; 32]),
    Bool(bool),
    /// `bytes1`..`bytes32`, right-padded.
    FixedBytes([u8; 32]),
}

/// Encodes a function call as `selector || word(params[0]) || word(params[1]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

fn encode_param(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint256(value) | AbiParam::Int256(value) | AbiParam::FixedBytes(value) => *value,
        AbiParam::Bool(flag) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*flag);
            word
        }
    }
}

/// Computes the 4-byte selector of a canonical signature such as
/// `transfer(address,uint256)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// One `inputs` entry of a JSON ABI function.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiInput {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of a JSON ABI. Events, errors and constructors are kept but
/// never matched by [`ContractAbi::selector`].
#[derive(Debug, Clone, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

/// Shape of a type that is encoded as a single head word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordKind {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
}

fn word_kind(kind: &str) -> Option<WordKind> {
    let int_bits = |digits: &str| -> Option<usize> {
        if digits.is_empty() {
            return Some(256);
        }
        let bits: usize = digits.parse().ok()?;
        (bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
    };

    match kind {
        "address" => Some(WordKind::Address),
        "bool" => Some(WordKind::Bool),
        _ => {
            if let Some(digits) = kind.strip_prefix("uint") {
                int_bits(digits).map(WordKind::Uint)
            } else if let Some(digits) = kind.strip_prefix("int") {
                int_bits(digits).map(WordKind::Int)
            } else if let Some(digits) = kind.strip_prefix("bytes") {
                let len: usize = digits.parse().ok()?;
                (1..=32).contains(&len).then_some(WordKind::FixedBytes(len))
            } else {
                None
            }
        }
    }
}

impl AbiInput {
    /// Canonical type name; `uint` and `int` are aliases of their 256-bit forms.
    pub fn canonical_type(&self) -> &str {
        match self.kind.as_str() {
            "uint" => "uint256",
            "int" => "int256",
            other => other,
        }
    }

    /// True when the type is encoded in one 32-byte word.
    pub fn is_static_word(&self) -> bool {
        word_kind(&self.kind).is_some()
    }

    pub fn is_address(&self) -> bool {
        word_kind(&self.kind) == Some(WordKind::Address)
    }

    pub fn is_uint(&self) -> bool {
        matches!(word_kind(&self.kind), Some(WordKind::Uint(_)))
    }

    /// Encodes a JSON argument as this input's type.
    ///
    /// Integers are accepted as JSON numbers or as decimal / `0x` hex
    /// strings, fixed bytes as `0x` hex of exactly the declared length.
    pub fn encode_value(&self, value: &Value) -> Result<AbiParam, EthError> {
        let kind = word_kind(&self.kind).ok_or_else(|| {
            EthError::AbiError(format!("argument `{}`: type `{}` is not supported", self.name, self.kind))
        })?;
        let bad = |reason: &str| EthError::AbiError(format!("argument `{}` ({}): {reason}", self.name, self.kind));

        match kind {
            WordKind::Address => {
                let text = value.as_str().ok_or_else(|| bad("expected an address string"))?;
                Ok(AbiParam::Address(parse_address(text)?))
            }
            WordKind::Bool => match value {
                Value::Bool(flag) => Ok(AbiParam::Bool(*flag)),
                Value::String(text) if text == "true" || text == "false" => Ok(AbiParam::Bool(text == "true")),
                _ => Err(bad("expected a boolean")),
            },
            WordKind::Uint(bits) => {
                let parsed = U256::from_str(&numeric_text(value).ok_or_else(|| bad("expected an integer"))?)
                    .map_err(|e| bad(&e.to_string()))?;
                if parsed.bit_len() > bits {
                    return Err(bad("value out of range"));
                }
                Ok(AbiParam::Uint256(parsed.to_be_bytes::<32>()))
            }
            WordKind::Int(bits) => {
                let text = numeric_text(value).ok_or_else(|| bad("expected an integer"))?;
                let parsed = match text.strip_prefix("0x") {
                    Some(_) => I256::from_hex_str(&text),
                    None => I256::from_dec_str(&text),
                }
                .map_err(|e| bad(&e.to_string()))?;
                let limit = U256::from(1u8) << (bits - 1);
                let magnitude = parsed.unsigned_abs();
                let in_range =
                    if parsed.is_negative() { magnitude <= limit } else { magnitude < limit };
                if !in_range {
                    return Err(bad("value out of range"));
                }
                Ok(AbiParam::Int256(parsed.to_be_bytes::<32>()))
            }
            WordKind::FixedBytes(len) => {
                let text = value.as_str().ok_or_else(|| bad("expected 0x-prefixed hex"))?;
                let body = text.strip_prefix("0x").ok_or_else(|| bad("expected 0x-prefixed hex"))?;
                let bytes = hex::decode(body).map_err(|e| bad(&e.to_string()))?;
                if bytes.len() != len {
                    return Err(bad(&format!("expected {len} bytes, got {}", bytes.len())));
                }
                let mut word = [0u8; 32];
                word[..len].copy_from_slice(&bytes);
                Ok(AbiParam::FixedBytes(word))
            }
        }
    }
}

/// Integer arguments arrive as JSON numbers or strings.
fn numeric_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

impl AbiEntry {
    /// Canonical signature, e.g. `balanceOf(address)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(AbiInput::canonical_type).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// A parsed JSON contract ABI.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    entries: Vec<AbiEntry>,
}

impl ContractAbi {
    /// Parses a JSON ABI array (the format emitted by solc and used by
    /// ethers/web3 contract bindings).
    pub fn from_json(json: &str) -> Result<Self, EthError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_str(json).map_err(|e| EthError::AbiError(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Builds an ABI from already-parsed JSON.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EthError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_value(value).map_err(|e| EthError::AbiError(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Returns the first function named `name`.
    pub fn function(&self, name: &str) -> Result<&AbiEntry, EthError> {
        self.entries
            .iter()
            .find(|e| e.kind == "function" && e.name == name)
            .ok_or_else(|| EthError::AbiError(format!("no function `{name}` in abi")))
    }

    /// Returns the selector of the first function named `name`.
    pub fn selector(&self, name: &str) -> Result<[u8; 4], EthError> {
        self.function(name).map(|e| function_selector(&e.signature()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.selector(name).is_ok()
    }

    /// Encodes a call of the function named `name` taking `args.len()`
    /// arguments. Every argument must be a single-word type.
    pub fn encode_call(&self, name: &str, args: &[Value]) -> Result<Vec<u8>, EthError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.kind == "function" && e.name == name && e.inputs.len() == args.len())
            .ok_or_else(|| {
                EthError::AbiError(format!("no function `{name}` taking {} arguments in abi", args.len()))
            })?;

        let params = entry
            .inputs
            .iter()
            .zip(args)
            .map(|(input, value)| input.encode_value(value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(encode_function_call(function_selector(&entry.signature()), &params))
    }
}

/// Decodes a single `uint256` return value (the first ABI word).
pub fn decode_uint256(data: &[u8]) -> Result<[u8; 32], EthError> {
    if data.len() < 32 {
        return Err(EthError::AbiError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    let mut result = [0u8; 32];
    result.copy_from_slice(&data[..32]);
    Ok(result)
}

/// Decodes a `uint8`-sized return value such as ERC-20 `decimals()`.
pub fn decode_u8(data: &[u8]) -> Result<u8, EthError> {
    let word = decode_uint256(data)?;
    if word[..31].iter().any(|&b| b != 0) {
        return Err(EthError::AbiError("value does not fit in uint8".into()));
    }
    Ok(word[31])
}

/// Decodes a single dynamic `string` return value.
///
/// Some legacy tokens (MKR, SAI) return `bytes32` instead; a 32-byte payload
/// is decoded as a NUL-padded string.
pub fn decode_string(data: &[u8]) -> Result<String, EthError> {
    if data.len() == 32 {
        let end = data.iter().position(|&b| b == 0).unwrap_or(32);
        return String::from_utf8(data[..end].to_vec())
            .map_err(|e| EthError::AbiError(format!("invalid utf-8: {e}")));
    }

    let offset = word_to_usize(data, 0)?;
    let len = word_to_usize(data, offset)?;
    let start = offset
        .checked_add(32)
        .ok_or_else(|| EthError::AbiError("string offset out of bounds".into()))?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| EthError::AbiError("string length out of bounds".into()))?;

    String::from_utf8(data[start..end].to_vec())
        .map_err(|e| EthError::AbiError(format!("invalid utf-8: {e}")))
}

fn word_to_usize(data: &[u8], at: usize) -> Result<usize, EthError> {
    let word = at
        .checked_add(32)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| EthError::AbiError(format!("word at offset {at} out of bounds")))?;
    if word[..24].iter().any(|&b| b != 0) {
        return Err(EthError::AbiError("offset does not fit in usize".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| EthError::AbiError("offset does not fit in usize".into()))
}
